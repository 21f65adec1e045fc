use glamx::UVec2;

/// Decoded pixel data, as produced by an image decoder.
///
/// The pixel layout is whatever the decoder and the backend agreed on; the engine core only
/// needs the dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    size: UVec2,
    pixels: Vec<u8>,
}

impl Image {
    pub fn new(size: UVec2, pixels: Vec<u8>) -> Self {
        Self { size, pixels }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.x
    }

    pub fn height(&self) -> u32 {
        self.size.y
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
