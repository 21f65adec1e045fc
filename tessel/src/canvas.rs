//! The logic thread's handle to one render surface.

use crate::config::{CanvasConfig, ThreadingMode};
use crate::context::RenderContext;
use crate::dispatcher::{CommandDispatcher, ImmediateDispatcher, StartupError, ThreadedDispatcher};
use crate::queue::{QueueError, SyncError};
use crossbeam_channel::bounded;
use snafu::{OptionExt, ResultExt, Snafu};
use tessel_render::{RenderBackend, Scene};
use tracing::{debug, instrument};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum CanvasError {
    #[snafu(display("Couldn't start the render role: {source}"))]
    Startup { source: StartupError },

    #[snafu(display("Couldn't submit to the render role: {source}"))]
    Submit { source: QueueError },

    #[snafu(display("Couldn't wait for the render role: {source}"))]
    Sync { source: SyncError },

    #[snafu(display("The render role dropped the query without answering"))]
    NoReply,
}

type Result<T, E = CanvasError> = std::result::Result<T, E>;

pub struct Canvas {
    dispatcher: Box<dyn CommandDispatcher>,
    stale: bool,
    frames_requested: u64,
}

impl Canvas {
    /// Creates the render role described by `config`. The backend is created by `factory` on
    /// the thread that will own it.
    pub fn new<F, B>(config: &CanvasConfig, factory: F) -> Result<Canvas>
    where
        F: FnOnce() -> B + Send + 'static,
        B: RenderBackend + 'static,
    {
        let cache = config.resource_cache();
        let dispatcher: Box<dyn CommandDispatcher> = match config.threading {
            ThreadingMode::Threaded => Box::new(
                ThreadedDispatcher::spawn(factory, cache, config.sync_timeout)
                    .context(StartupErr)?,
            ),
            ThreadingMode::Immediate => Box::new(ImmediateDispatcher::new(factory(), cache)),
        };

        debug!("Created {:?} canvas", config.threading);

        Ok(Canvas {
            dispatcher,
            stale: false,
            frames_requested: 0,
        })
    }

    /// Requests a frame of `scene` as it is right now. Later changes to the scene don't affect
    /// the requested frame.
    #[instrument(skip_all)]
    #[profiling::function]
    pub fn render(&mut self, scene: &Scene) -> Result<()> {
        let snapshot = scene.snapshot();
        self.dispatcher
            .submit(Box::new(move |ctx: &mut RenderContext| {
                ctx.render_frame(&snapshot);
            }))
            .context(SubmitErr)?;

        self.frames_requested += 1;
        Ok(())
    }

    /// Blocks until everything submitted so far has run, bounded by the configured timeout.
    ///
    /// A timeout marks the canvas as stale until a later sync succeeds.
    pub fn sync(&mut self) -> Result<(), SyncError> {
        match self.dispatcher.sync() {
            Ok(()) => {
                if self.stale {
                    debug!("Render role caught up again");
                }
                self.stale = false;
                Ok(())
            }
            Err(e) => {
                if let SyncError::TimedOut { .. } = e {
                    self.stale = true;
                }
                Err(e)
            }
        }
    }

    /// Submits an arbitrary command against the render context.
    pub fn submit<F>(&mut self, command: F) -> Result<(), QueueError>
    where
        F: FnOnce(&mut RenderContext) + Send + 'static,
    {
        self.dispatcher.submit(Box::new(command))
    }

    /// Runs `query` on the render role and waits for its answer.
    pub fn query<F, R>(&mut self, query: F) -> Result<R>
    where
        F: FnOnce(&mut RenderContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        self.submit(move |ctx| {
            let _ = tx.send(query(ctx));
        })
        .context(SubmitErr)?;
        self.sync().context(SyncErr)?;

        rx.try_recv().ok().context(NoReplyErr)
    }

    /// Shuts the render role down. Anything still queued is dropped.
    pub fn close(&mut self) {
        if self.dispatcher.is_closed() {
            return;
        }
        debug!(
            "Closing canvas after {} requested frame(s)",
            self.frames_requested
        );
        self.dispatcher.close();
    }

    /// Whether the last sync timed out, meaning the render role may lag behind the scene.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }

    pub fn mode(&self) -> ThreadingMode {
        self.dispatcher.mode()
    }

    pub fn frames_requested(&self) -> u64 {
        self.frames_requested
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        self.close();
    }
}
