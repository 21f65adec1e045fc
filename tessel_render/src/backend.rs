//! The seam between the resource cache and whatever actually talks to a device.
//!
//! A backend receives ids minted by the cache and the data to put behind them. For any id the
//! cache guarantees that `create_*` comes first and `destroy_*` comes last, and that draw
//! calls only reference ids whose data was loaded.

use crate::HandleId;
use crate::scene::DrawableId;
use glamx::{Affine3A, UVec2, Vec2};
use std::sync::Arc;
use tessel_asset::{Image, MeshData};
use web_time::Duration;

/// Per-frame information handed to the draw entry points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub frame: u64,
    pub delta_time: Duration,
}

impl FrameContext {
    pub fn new(frame: u64, delta_time: Duration) -> Self {
        Self { frame, delta_time }
    }
}

/// A textured quad. Text is drawn from its glyph atlas and carries the string to lay out.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDraw {
    pub drawable: DrawableId,
    pub texture: HandleId,
    pub size: UVec2,
    pub position: Vec2,
    pub text: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshDraw {
    pub drawable: DrawableId,
    pub mesh: HandleId,
    pub vertex_count: u32,
    pub diffuse: Option<HandleId>,
    pub normal: Option<HandleId>,
    pub transform: Affine3A,
}

/// Everything the engine core needs from a device. Every method does nothing by default so a
/// backend only implements what it supports.
#[allow(unused_variables)]
pub trait RenderBackend {
    fn create_texture(&mut self, id: HandleId) {}
    fn destroy_texture(&mut self, id: HandleId) {}
    fn load_texture(&mut self, id: HandleId, image: &Image) {}
    fn resize_texture(&mut self, id: HandleId, size: UVec2) {}

    fn create_mesh(&mut self, id: HandleId) {}
    fn destroy_mesh(&mut self, id: HandleId) {}
    fn load_mesh(&mut self, id: HandleId, mesh: &MeshData) {}

    fn begin_frame(&mut self, frame: &FrameContext) {}
    fn render_texture(&mut self, frame: &FrameContext, draw: &TextureDraw) {}
    fn render_mesh(&mut self, frame: &FrameContext, draw: &MeshDraw) {}
    fn end_frame(&mut self, frame: &FrameContext) {}

    /// Tears down the device context. Called once, on the render thread, after every resource
    /// was destroyed.
    fn release(&mut self) {}
}

/// Accepts every call and does nothing with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl RenderBackend for NullBackend {}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn create_texture(&mut self, id: HandleId) {
        (**self).create_texture(id)
    }

    fn destroy_texture(&mut self, id: HandleId) {
        (**self).destroy_texture(id)
    }

    fn load_texture(&mut self, id: HandleId, image: &Image) {
        (**self).load_texture(id, image)
    }

    fn resize_texture(&mut self, id: HandleId, size: UVec2) {
        (**self).resize_texture(id, size)
    }

    fn create_mesh(&mut self, id: HandleId) {
        (**self).create_mesh(id)
    }

    fn destroy_mesh(&mut self, id: HandleId) {
        (**self).destroy_mesh(id)
    }

    fn load_mesh(&mut self, id: HandleId, mesh: &MeshData) {
        (**self).load_mesh(id, mesh)
    }

    fn begin_frame(&mut self, frame: &FrameContext) {
        (**self).begin_frame(frame)
    }

    fn render_texture(&mut self, frame: &FrameContext, draw: &TextureDraw) {
        (**self).render_texture(frame, draw)
    }

    fn render_mesh(&mut self, frame: &FrameContext, draw: &MeshDraw) {
        (**self).render_mesh(frame, draw)
    }

    fn end_frame(&mut self, frame: &FrameContext) {
        (**self).end_frame(frame)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
