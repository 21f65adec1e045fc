//! Strategies for getting commands from the logic thread to the render role.

use crate::ThreadingMode;
use crate::context::{Command, RenderContext};
use crate::queue::{ClosedErr, ClosedSyncErr, CommandQueue, QueueError, SyncError};
use crossbeam_channel::bounded;
use snafu::{OptionExt, ResultExt, Snafu};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tessel_render::{RenderBackend, ResourceCache};
use tracing::{debug, error, info};
use web_time::Duration;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum StartupError {
    #[snafu(display("Couldn't spawn the render thread: {source}"))]
    Spawn { source: std::io::Error },

    #[snafu(display("The render thread exited before the backend was ready"))]
    BackendInit,
}

pub trait CommandDispatcher {
    fn submit(&mut self, command: Command) -> Result<(), QueueError>;

    /// Waits until every submitted command has run.
    fn sync(&mut self) -> Result<(), SyncError>;

    /// Stops accepting commands and tears the render context down. Calling it again does
    /// nothing.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    fn mode(&self) -> ThreadingMode;
}

/// Runs the render role on a dedicated thread fed through a [`CommandQueue`].
pub struct ThreadedDispatcher {
    queue: Arc<CommandQueue>,
    thread: Option<JoinHandle<()>>,
    sync_timeout: Duration,
}

impl ThreadedDispatcher {
    /// Spawns the render thread and waits until `factory` created the backend on it.
    pub fn spawn<F, B>(
        factory: F,
        cache: ResourceCache,
        sync_timeout: Duration,
    ) -> Result<Self, StartupError>
    where
        F: FnOnce() -> B + Send + 'static,
        B: RenderBackend + 'static,
    {
        let queue = Arc::new(CommandQueue::new());
        let (ready_tx, ready_rx) = bounded(1);

        let thread = {
            let queue = queue.clone();
            thread::Builder::new()
                .name("tessel-render".to_string())
                .spawn(move || {
                    profiling::register_thread!("render");

                    let mut ctx = RenderContext::new(Box::new(factory()), cache);
                    let _ = ready_tx.send(());

                    queue.drain(&mut ctx);
                    ctx.teardown();

                    debug!("Render thread exited");
                })
                .context(SpawnErr)?
        };

        if ready_rx.recv().is_err() {
            error!("Render thread exited during backend creation");
            let _ = thread.join();
            return BackendInitErr.fail();
        }

        info!("Render thread started");

        Ok(Self {
            queue,
            thread: Some(thread),
            sync_timeout,
        })
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }
}

impl CommandDispatcher for ThreadedDispatcher {
    fn submit(&mut self, command: Command) -> Result<(), QueueError> {
        self.queue.enqueue(command)
    }

    fn sync(&mut self) -> Result<(), SyncError> {
        self.queue.sync(self.sync_timeout)
    }

    fn close(&mut self) {
        self.queue.request_exit();

        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            error!("Render thread panicked during shutdown");
        }
    }

    fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    fn mode(&self) -> ThreadingMode {
        ThreadingMode::Threaded
    }
}

impl Drop for ThreadedDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs every command on the submitting thread right away. Used where no render thread can be
/// spawned, or when the caller wants deterministic single-threaded execution.
pub struct ImmediateDispatcher {
    context: Option<RenderContext>,
}

impl ImmediateDispatcher {
    pub fn new<B: RenderBackend + 'static>(backend: B, cache: ResourceCache) -> Self {
        Self {
            context: Some(RenderContext::new(Box::new(backend), cache)),
        }
    }
}

impl CommandDispatcher for ImmediateDispatcher {
    fn submit(&mut self, command: Command) -> Result<(), QueueError> {
        let ctx = self.context.as_mut().context(ClosedErr)?;
        ctx.run(command);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), SyncError> {
        self.context.as_ref().context(ClosedSyncErr)?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut ctx) = self.context.take() {
            ctx.teardown();
        }
    }

    fn is_closed(&self) -> bool {
        self.context.is_none()
    }

    fn mode(&self) -> ThreadingMode {
        ThreadingMode::Immediate
    }
}

impl Drop for ImmediateDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}
