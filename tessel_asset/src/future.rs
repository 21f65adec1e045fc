use crate::error::AbandonedErr;
use crate::{AssetId, LoadResult};
use futures::channel::oneshot;
use futures::future::FusedFuture;
use futures::{FutureExt, executor};
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

enum Slot<T> {
    Ready(LoadResult<T>),
    Waiting(oneshot::Receiver<LoadResult<T>>),
    Done,
}

/// The requester side of a [`LazyResource::get`](crate::LazyResource::get) call.
///
/// Resolves to the shared value every requester of the same load receives, or to the error
/// that load ended with.
pub struct ResourceFuture<T> {
    asset: AssetId,
    slot: Slot<T>,
}

impl<T> ResourceFuture<T> {
    pub(crate) fn ready(asset: AssetId, result: LoadResult<T>) -> Self {
        Self {
            asset,
            slot: Slot::Ready(result),
        }
    }

    pub(crate) fn promise(asset: AssetId) -> (oneshot::Sender<LoadResult<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        let future = Self {
            asset,
            slot: Slot::Waiting(rx),
        };
        (tx, future)
    }

    pub fn asset(&self) -> AssetId {
        self.asset
    }

    /// Takes the result if it is available, leaving the future untouched otherwise.
    pub fn try_resolve(&mut self) -> Option<LoadResult<T>> {
        (&mut *self).now_or_never()
    }

    /// Blocks the calling thread until the result is available.
    pub fn wait(self) -> LoadResult<T> {
        executor::block_on(self)
    }
}

impl<T> Future for ResourceFuture<T> {
    type Output = LoadResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let result = match std::mem::replace(&mut this.slot, Slot::Done) {
            Slot::Ready(result) => result,
            Slot::Waiting(mut rx) => match rx.poll_unpin(cx) {
                Poll::Pending => {
                    this.slot = Slot::Waiting(rx);
                    return Poll::Pending;
                }
                Poll::Ready(Ok(result)) => result,
                Poll::Ready(Err(oneshot::Canceled)) => {
                    Err(AbandonedErr { asset: this.asset }.build())
                }
            },
            Slot::Done => Err(AbandonedErr { asset: this.asset }.build()),
        };

        Poll::Ready(result)
    }
}

impl<T> FusedFuture for ResourceFuture<T> {
    fn is_terminated(&self) -> bool {
        matches!(self.slot, Slot::Done)
    }
}

impl<T> Debug for ResourceFuture<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = match self.slot {
            Slot::Ready(_) => "ready",
            Slot::Waiting(_) => "waiting",
            Slot::Done => "done",
        };

        f.debug_struct("ResourceFuture")
            .field("asset", &self.asset)
            .field("state", &state)
            .finish()
    }
}
