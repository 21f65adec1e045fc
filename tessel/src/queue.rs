//! Command queue shared between the logic thread and the render thread.
//!
//! The logic thread appends [`Command`]s and may block in [`CommandQueue::sync`] until
//! everything it enqueued so far has run. The render thread sits in [`CommandQueue::drain`],
//! executing commands in submission order until an exit is requested.
//!
//! Progress is tracked with two counters. A waiter remembers how many commands were enqueued
//! when it started waiting and returns once that many have finished executing, so it never
//! mistakes an empty queue with a command still running for a drained one.

use crate::context::{Command, RenderContext};
use parking_lot::{Condvar, Mutex};
use snafu::{Snafu, ensure};
use std::collections::VecDeque;
use std::mem;
use tracing::{error, trace, warn};
use web_time::{Duration, Instant};

/// How long [`CommandQueue::sync`] waits unless configured otherwise.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum QueueError {
    #[snafu(display("The render thread is shutting down and no longer accepts commands"))]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum SyncError {
    #[snafu(display(
        "Render thread didn't drain the command queue within {timeout:?}, {pending} command(s) outstanding"
    ))]
    TimedOut { timeout: Duration, pending: u64 },

    #[snafu(display("The render thread was shut down"), context(suffix(SyncErr)))]
    Closed,
}

#[derive(Default)]
struct QueueState {
    commands: VecDeque<Command>,
    exit_requested: bool,
    enqueued: u64,
    executed: u64,
}

#[derive(Default)]
pub struct CommandQueue {
    state: Mutex<QueueState>,
    signal: Condvar,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, command: Command) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        ensure!(!state.exit_requested, ClosedErr);

        state.commands.push_back(command);
        state.enqueued += 1;
        drop(state);

        self.signal.notify_all();
        Ok(())
    }

    /// Blocks until every command enqueued before this call has been executed, or `timeout`
    /// elapsed.
    #[profiling::function]
    pub fn sync(&self, timeout: Duration) -> Result<(), SyncError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        let target = state.enqueued;

        while state.executed < target {
            ensure!(!state.exit_requested, ClosedSyncErr);

            // too far out to represent, wait without a bound
            let Some(deadline) = deadline else {
                self.signal.wait(&mut state);
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || self.signal.wait_for(&mut state, remaining).timed_out() {
                if state.executed >= target {
                    break;
                }

                let pending = target - state.executed;
                error!(
                    "Timed out after {timeout:?} waiting for the render thread, {pending} command(s) outstanding"
                );
                return TimedOutErr { timeout, pending }.fail();
            }
        }

        ensure!(!state.exit_requested, ClosedSyncErr);
        Ok(())
    }

    /// Asks the draining thread to stop. Returns whether this was the first request.
    pub fn request_exit(&self) -> bool {
        let mut state = self.state.lock();
        let first = !state.exit_requested;
        state.exit_requested = true;
        drop(state);

        self.signal.notify_all();
        first
    }

    /// Executes commands in submission order until an exit is requested.
    ///
    /// A command that is running when the exit is requested finishes. Commands still queued at
    /// that point are dropped without running.
    pub fn drain(&self, ctx: &mut RenderContext) {
        loop {
            let command = {
                let mut state = self.state.lock();
                loop {
                    if state.exit_requested {
                        let dropped = mem::take(&mut state.commands);
                        drop(state);
                        if !dropped.is_empty() {
                            warn!("Dropping {} queued command(s) on shutdown", dropped.len());
                        }
                        return;
                    }
                    if let Some(command) = state.commands.pop_front() {
                        break command;
                    }
                    self.signal.wait(&mut state);
                }
            };

            ctx.run(command);

            let mut state = self.state.lock();
            state.executed += 1;
            if state.commands.is_empty() {
                trace!("Command queue drained after {} command(s)", state.executed);
                drop(state);
                self.signal.notify_all();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().commands.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().exit_requested
    }

    /// Commands enqueued and executed over the lifetime of the queue.
    pub fn counters(&self) -> (u64, u64) {
        let state = self.state.lock();
        (state.enqueued, state.executed)
    }
}
