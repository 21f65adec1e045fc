use crate::frame_counter::FrameCounter;
use std::fmt::{Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use tessel_render::{FrameContext, FrameStats, RenderBackend, ResourceCache, SceneSnapshot};
use tracing::{debug, error, instrument};
use web_time::{Duration, Instant};

/// Deferred unit of work, executed exactly once against the render thread's state.
pub type Command = Box<dyn FnOnce(&mut RenderContext) + Send>;

/// Everything owned by the render role of a canvas.
pub struct RenderContext {
    backend: Box<dyn RenderBackend>,
    cache: ResourceCache,
    frame: u64,
    last_frame: Option<Instant>,
    frame_counter: FrameCounter,
    last_stats: FrameStats,
    released: bool,
}

impl RenderContext {
    pub fn new(backend: Box<dyn RenderBackend>, cache: ResourceCache) -> Self {
        Self {
            backend,
            cache,
            frame: 0,
            last_frame: None,
            frame_counter: FrameCounter::default(),
            last_stats: FrameStats::default(),
            released: false,
        }
    }

    #[instrument(skip_all, fields(frame = self.frame))]
    #[profiling::function]
    pub fn render_frame(&mut self, scene: &SceneSnapshot) -> FrameStats {
        let now = Instant::now();
        let delta_time = match self.last_frame.replace(now) {
            Some(last) => {
                let delta = now.duration_since(last);
                self.frame_counter.record(delta);
                delta
            }
            None => Duration::ZERO,
        };

        let frame = FrameContext::new(self.frame, delta_time);

        self.backend.begin_frame(&frame);
        let stats = self.cache.update_cache(scene, &mut *self.backend, &frame);
        self.backend.end_frame(&frame);

        self.frame += 1;
        self.last_stats = stats;
        stats
    }

    /// Executes `command` against this context. A panicking command is logged and otherwise
    /// ignored, so later commands still run.
    pub(crate) fn run(&mut self, command: Command) {
        profiling::scope!("render command");
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| command(self))) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            error!("Render command panicked: {message}");
        }
    }

    /// Number of frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frame_counter
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn backend(&mut self) -> &mut dyn RenderBackend {
        &mut *self.backend
    }

    /// Destroys every cached resource and releases the backend. Only the first call does
    /// anything.
    pub(crate) fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let destroyed = self.cache.clear(&mut *self.backend);
        self.backend.release();

        debug!(
            "Render context released after {} frames, {destroyed} resources destroyed",
            self.frame
        );
    }
}

impl Debug for RenderContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("frame", &self.frame)
            .field("last_stats", &self.last_stats)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
