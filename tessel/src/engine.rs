use crate::canvas::{Canvas, CanvasError};
use crate::config::CanvasConfig;
use snafu::{Snafu, ensure};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tessel_asset::{BoxedError, LazyResource};
use tessel_render::RenderBackend;
use tessel_utils::EngineArgs;
use tracing::{debug, info};

static RUNNING: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum EngineError {
    #[snafu(display("Another engine instance is already running in this process"))]
    AlreadyRunning,
}

type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Process-wide engine context. At most one instance is alive at a time, and every canvas is
/// created through it.
#[derive(Debug)]
pub struct Engine {
    config: CanvasConfig,
}

impl Engine {
    /// Creates the engine with the configuration given on the command line.
    pub fn from_env() -> Result<Engine> {
        Self::with_config(CanvasConfig::from_args(&EngineArgs::from_env()))
    }

    pub fn new(args: &EngineArgs) -> Result<Engine> {
        Self::with_config(CanvasConfig::from_args(args))
    }

    pub fn with_config(config: CanvasConfig) -> Result<Engine> {
        let claimed = RUNNING
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        ensure!(claimed, AlreadyRunningErr);

        info!(
            "Engine started ({:?}, sync timeout {:?})",
            config.threading, config.sync_timeout
        );

        Ok(Engine { config })
    }

    pub fn is_running() -> bool {
        RUNNING.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Creates a canvas with the engine's configuration.
    pub fn create_canvas<F, B>(&self, factory: F) -> Result<Canvas, CanvasError>
    where
        F: FnOnce() -> B + Send + 'static,
        B: RenderBackend + 'static,
    {
        Canvas::new(&self.config, factory)
    }

    pub fn create_canvas_with<F, B>(
        &self,
        config: &CanvasConfig,
        factory: F,
    ) -> Result<Canvas, CanvasError>
    where
        F: FnOnce() -> B + Send + 'static,
        B: RenderBackend + 'static,
    {
        Canvas::new(config, factory)
    }

    /// Creates a lazily loaded resource using the engine's load policy.
    pub fn resource<T, F, E>(&self, label: impl Into<String>, loader: F) -> Arc<LazyResource<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxedError>,
    {
        LazyResource::named(label, self.config.load_policy, loader)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        RUNNING.store(false, Ordering::Release);
        debug!("Engine stopped");
    }
}
