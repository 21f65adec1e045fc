//! Single-flight, weakly cached resource loading.
//!
//! A [`LazyResource`] wraps a loader function. The first request after the resource became
//! unavailable starts exactly one load, and every request that queues up until that load
//! finishes receives the same [`Arc`]. The resource only keeps a [`Weak`] reference to what it
//! produced, so as soon as every requester dropped its strong reference the result is freed
//! and the next request loads it again.
//!
//! ```ignore
//! let image = LazyResource::new(|| decode_png("ui/button.png"));
//!
//! let first = image.get().wait()?;
//! let second = image.get().wait()?; // resolved from the cache, no second decode
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

use crate::error::{BoxedError, LoaderErr, PanickedErr, SpawnErr};
use crate::{LoadError, ResourceFuture};
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::any::Any;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, trace, warn};

pub type LoadResult<T> = Result<Arc<T>, LoadError>;

type Loader<T> = dyn Fn() -> Result<T, BoxedError> + Send + Sync;
type Promise<T> = oneshot::Sender<LoadResult<T>>;

static NEXT_ASSET_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a logical asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    fn next() -> Self {
        Self(NEXT_ASSET_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the loader of a [`LazyResource`] runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// The loader runs synchronously on the thread of the first requester. The future returned
    /// to that requester is already resolved when `get` returns.
    #[default]
    Inline,
    /// The loader runs on its own short-lived thread and the requesters are resolved when it
    /// finishes. Keeps slow I/O off latency sensitive threads like the render thread.
    Detached,
}

struct LoadState<T> {
    cached: Weak<T>,
    pending: Vec<Promise<T>>,
    loading: bool,
}

pub struct LazyResource<T> {
    id: AssetId,
    label: String,
    policy: LoadPolicy,
    loader: Box<Loader<T>>,
    state: Mutex<LoadState<T>>,
    loads: AtomicUsize,
}

impl<T: Send + Sync + 'static> LazyResource<T> {
    pub fn new<F, E>(loader: F) -> Arc<Self>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxedError>,
    {
        Self::with_policy(LoadPolicy::Inline, loader)
    }

    pub fn with_policy<F, E>(policy: LoadPolicy, loader: F) -> Arc<Self>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxedError>,
    {
        Self::named("", policy, loader)
    }

    /// Creates a resource with a label that shows up in log messages.
    pub fn named<F, E>(label: impl Into<String>, policy: LoadPolicy, loader: F) -> Arc<Self>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxedError>,
    {
        Arc::new(LazyResource {
            id: AssetId::next(),
            label: label.into(),
            policy,
            loader: Box::new(move || loader().map_err(Into::into)),
            state: Mutex::new(LoadState {
                cached: Weak::new(),
                pending: Vec::new(),
                loading: false,
            }),
            loads: AtomicUsize::new(0),
        })
    }

    /// Registers interest in the loaded value.
    ///
    /// Resolves immediately if a previously loaded value is still alive. Otherwise the request is
    /// queued, and if no load is in flight one is started according to the [`LoadPolicy`].
    pub fn get(self: &Arc<Self>) -> ResourceFuture<T> {
        let mut state = self.state.lock();

        if let Some(value) = state.cached.upgrade() {
            return ResourceFuture::ready(self.id, Ok(value));
        }

        let (promise, future) = ResourceFuture::promise(self.id);
        state.pending.push(promise);

        let start_load = !state.loading;
        state.loading = true;
        drop(state);

        if start_load {
            self.start_load();
        }

        future
    }

    /// Runs the loader right away on the calling thread and resolves everything queued so far.
    ///
    /// Meant for eager loading. Requests made while this runs are queued and receive its result.
    /// Does nothing if a load is already in flight, since that load resolves the same queue.
    pub fn load(&self) {
        let mut state = self.state.lock();
        if state.loading {
            trace!("Asset {} {} is already loading", self.id, self.label);
            return;
        }
        state.loading = true;
        drop(state);

        self.run_loader();
    }

    fn start_load(self: &Arc<Self>) {
        match self.policy {
            LoadPolicy::Inline => self.run_loader(),
            LoadPolicy::Detached => {
                let resource = Arc::clone(self);
                let spawned = thread::Builder::new()
                    .name(format!("tessel-loader-{}", self.id.get()))
                    .spawn(move || {
                        profiling::register_thread!("loader");
                        resource.run_loader();
                    });

                if let Err(e) = spawned {
                    self.resolve(Err(SpawnErr {
                        asset: self.id,
                        message: e.to_string(),
                    }
                    .build()));
                }
            }
        }
    }

    #[profiling::function]
    fn run_loader(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        trace!("Loading asset {} {}", self.id, self.label);

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (self.loader)())) {
            Ok(Ok(value)) => Ok(Arc::new(value)),
            Ok(Err(reason)) => Err(LoaderErr {
                asset: self.id,
                reason: Arc::<dyn Error + Send + Sync>::from(reason),
            }
            .build()),
            Err(payload) => Err(PanickedErr {
                asset: self.id,
                message: panic_message(payload.as_ref()),
            }
            .build()),
        };

        self.resolve(outcome);
    }

    fn resolve(&self, outcome: LoadResult<T>) {
        let pending = {
            let mut state = self.state.lock();
            state.cached = match &outcome {
                Ok(value) => Arc::downgrade(value),
                Err(_) => Weak::new(),
            };
            state.loading = false;
            mem::take(&mut state.pending)
        };

        match &outcome {
            Ok(_) => debug!(
                "Loaded asset {} {} for {} requester(s)",
                self.id,
                self.label,
                pending.len()
            ),
            Err(e) => warn!("{e}"),
        }

        for promise in pending {
            // a requester that stopped listening doesn't need the result
            let _ = promise.send(outcome.clone());
        }
    }
}

impl<T> LazyResource<T> {
    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    /// Whether a previously loaded value is still alive somewhere.
    pub fn is_ready(&self) -> bool {
        self.state.lock().cached.strong_count() > 0
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Returns the loaded value if it is still alive, without ever starting a load.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.state.lock().cached.upgrade()
    }

    /// How often the loader has been invoked over the lifetime of this resource.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl<T> Debug for LazyResource<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyResource")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("policy", &self.policy)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn asset_ids_are_unique() {
        let a = LazyResource::new(|| Ok::<_, io::Error>(1));
        let b = LazyResource::new(|| Ok::<_, io::Error>(1));

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn peek_never_loads() {
        let resource = LazyResource::new(|| Ok::<_, io::Error>(5u32));

        assert!(resource.peek().is_none());
        assert_eq!(resource.load_count(), 0);

        let value = resource.get().wait().unwrap();
        assert_eq!(resource.peek().as_deref(), Some(&5));

        drop(value);
        assert!(resource.peek().is_none());
        assert_eq!(resource.load_count(), 1);
    }

    #[test]
    fn panicking_loader_does_not_wedge() {
        let resource = LazyResource::new(|| -> Result<u32, io::Error> { panic!("decoder bug") });

        let err = resource.get().wait().unwrap_err();
        assert!(matches!(err, LoadError::Panicked { ref message, .. } if message == "decoder bug"));
        assert!(!resource.is_loading());
        assert!(!resource.is_ready());
    }

    #[test]
    fn dropping_resource_abandons_pending_requests() {
        let resource = LazyResource::new(|| Ok::<_, io::Error>(1u8));
        let (promise, future) = ResourceFuture::promise(resource.id());
        resource.state.lock().pending.push(promise);

        let id = resource.id();
        drop(resource);

        let err = future.wait().unwrap_err();
        assert!(matches!(err, LoadError::Abandoned { asset } if asset == id));
    }
}
