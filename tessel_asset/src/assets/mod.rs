//! Plain data produced by the (external) decoders.
//!
//! These are what a [`LazyResource`](crate::LazyResource) loads and what the renderer uploads
//! to its backend. Drawables refer to them through the shared asset handles below.

mod image;
mod mesh;

pub use self::image::Image;
pub use self::mesh::MeshData;

use crate::LazyResource;
use std::sync::Arc;

pub type ImageAsset = Arc<LazyResource<Image>>;
pub type MeshAsset = Arc<LazyResource<MeshData>>;
