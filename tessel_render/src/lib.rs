//! Backend resource management of the Tessel engine.
//!
//! The [`ResourceCache`] turns a [`SceneSnapshot`] into calls against a [`RenderBackend`],
//! addressing backend resources through ids minted by an [`IdAllocator`].

pub mod backend;
pub mod cache;
mod id_allocator;
pub mod recording;
pub mod scene;

pub use backend::{FrameContext, MeshDraw, NullBackend, RenderBackend, TextureDraw};
pub use cache::{BackendResource, EntryStatus, FrameStats, ResourceCache};
pub use id_allocator::{AllocatorError, HandleId, IdAllocator};
pub use recording::{BackendCall, CallLog, RecordingBackend};
pub use scene::{Drawable, DrawableId, Scene, SceneSnapshot};
