//! Asset resources of the Tessel engine.
//!
//! Logical assets are [`LazyResource`]s: they know how to produce their data, share it with
//! everyone who asked while it is alive, and forget it as soon as nobody holds it anymore.

pub mod assets;
mod error;
mod future;
mod lazy;

pub use assets::*;
pub use error::{BoxedError, LoadError};
pub use future::ResourceFuture;
pub use lazy::{AssetId, LazyResource, LoadPolicy, LoadResult};
