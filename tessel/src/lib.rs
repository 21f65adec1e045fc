//! Tessel keeps a logic thread and a render thread in step.
//!
//! The logic thread owns a [`Scene`](tessel_render::Scene) and asks its [`Canvas`] to render
//! it. Depending on the [`ThreadingMode`] the canvas either forwards the request to a
//! dedicated render thread through a command queue or runs it right away. On the render side
//! the [`ResourceCache`](tessel_render::ResourceCache) creates, uploads and destroys backend
//! resources so that they match the scene of every frame.
//!
//! ```ignore
//! let engine = Engine::from_env()?;
//! let mut canvas = engine.create_canvas(MyBackend::new)?;
//!
//! let mut scene = Scene::new();
//! scene.add(Drawable::sprite(engine.resource("player", load_player), Vec2::ZERO));
//!
//! canvas.render(&scene)?;
//! canvas.sync()?;
//! canvas.close();
//! ```

mod canvas;
mod config;
mod context;
mod dispatcher;
mod engine;
mod frame_counter;
mod queue;

pub use canvas::{Canvas, CanvasError};
pub use config::{CanvasConfig, ThreadingMode};
pub use context::{Command, RenderContext};
pub use dispatcher::{CommandDispatcher, ImmediateDispatcher, StartupError, ThreadedDispatcher};
pub use engine::{Engine, EngineError};
pub use frame_counter::FrameCounter;
pub use queue::{CommandQueue, DEFAULT_SYNC_TIMEOUT, QueueError, SyncError};

pub use tessel_asset as asset;
pub use tessel_render as render;
pub use tessel_utils as utils;
pub use ::tracing;
