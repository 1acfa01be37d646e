//! Single-assignment completion signal.
//!
//! [`signal`] returns a `(Signal, Completion)` pair over a
//! `futures_channel::oneshot` channel. The signal is consumed by
//! [`Signal::complete`], so a value is delivered at most once; dropping it
//! without completing cancels the channel and the completion resolves to
//! [`SyncError::Abandoned`]. Either way the completion fires exactly once.
//!
//! A `Completion` can be awaited, polled with [`Completion::try_take`], or
//! blocked on from a thread that is not the one delivering it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_channel::oneshot;
use futures_util::FutureExt;

use crate::error::{SyncError, SyncResult};

/// Create a connected signal/completion pair.
pub fn signal<T>() -> (Signal<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (Signal { tx }, Completion { rx })
}

/// Sending half. Completes its [`Completion`] exactly once.
#[derive(Debug)]
pub struct Signal<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Signal<T> {
    /// Deliver `value`. A completion that was already dropped is ignored.
    pub fn complete(self, value: T) {
        let _ = self.tx.send(value);
    }

    /// Whether the receiving side is gone.
    pub fn is_canceled(&self) -> bool {
        self.tx.is_canceled()
    }
}

/// Receiving half.
///
/// Must not be blocked on from the context that is supposed to deliver it.
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    /// Take the outcome if it has arrived. After a value is taken, later
    /// calls report [`SyncError::Abandoned`].
    pub fn try_take(&mut self) -> Option<SyncResult<T>> {
        match self.rx.try_recv() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(SyncError::Abandoned)),
        }
    }

    /// Block the current thread until the outcome arrives.
    pub fn wait(self) -> SyncResult<T> {
        futures_executor::block_on(self)
    }
}

impl<T> Future for Completion<T> {
    type Output = SyncResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx.poll_unpin(cx).map(|outcome| outcome.map_err(|oneshot::Canceled| SyncError::Abandoned))
    }
}
