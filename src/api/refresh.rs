//! Single-flight coordination for token refresh. Every caller that hits a 401 while a
//! refresh is running awaits the same shared future instead of starting its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::error::ApiResult;

/// Resolves to the new access token.
pub(crate) type RefreshFuture = Shared<BoxFuture<'static, ApiResult<String>>>;

#[derive(Default)]
pub(crate) struct RefreshGate {
    slot: Arc<Mutex<Option<RefreshFuture>>>,
    started: AtomicU64,
}

impl RefreshGate {
    /// Join the in-flight refresh, or start one with `start` if none is running.
    /// The slot empties itself when the refresh completes.
    pub(crate) fn join_or_start<F>(&self, start: F) -> RefreshFuture
    where
        F: FnOnce() -> BoxFuture<'static, ApiResult<String>>,
    {
        let mut slot = self.slot.lock();
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }
        self.started.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(&self.slot);
        let inner = start();
        let fut = async move {
            let out = inner.await;
            if let Some(s) = weak.upgrade() {
                *s.lock() = None;
            }
            out
        }
        .boxed()
        .shared();
        *slot = Some(fut.clone());
        fut
    }

    pub(crate) fn in_flight(&self) -> bool { self.slot.lock().is_some() }

    /// Number of refreshes started over the gate's lifetime.
    pub(crate) fn started(&self) -> u64 { self.started.load(Ordering::Relaxed) }
}
