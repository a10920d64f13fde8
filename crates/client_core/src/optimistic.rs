//! Optimistic local write followed by server confirmation, with a full
//! refetch when the server rejects the change.

use std::{future::Future, hash::Hash};

use tokio::sync::Mutex;
use tracing::warn;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    Confirmed,
    PendingSync,
    Reconciling,
}

/// Local state that tracks per-key sync phases and can adopt a fresh server copy.
pub trait SyncTracked: Clone + Send {
    type Key: Copy + Eq + Hash + Send + Sync;
    type Fresh: Send;

    fn mark(&mut self, keys: &[Self::Key], phase: SyncPhase);

    /// Replaces local state with server truth; every key ends `Confirmed`.
    fn adopt(&mut self, fresh: Self::Fresh);

    /// Puts the entries for `keys` back the way they were in `before`,
    /// leaving every other entry alone.
    fn restore(&mut self, keys: &[Self::Key], before: &Self);
}

/// Applies `mutator` immediately, then awaits `remote`. On failure the state
/// is replaced by `rollback_fetch`; if that fails too, the entries for `keys`
/// are restored from the pre-mutation snapshot. Concurrent edits to other
/// keys are kept. The remote error is always returned to the caller.
pub async fn apply_optimistic<S, R, Remote, Fetch, FetchFut>(
    state: &Mutex<S>,
    keys: &[S::Key],
    mutator: impl FnOnce(&mut S),
    remote: Remote,
    rollback_fetch: Fetch,
) -> Result<R, ClientError>
where
    S: SyncTracked,
    Remote: Future<Output = Result<R, ClientError>>,
    Fetch: FnOnce() -> FetchFut,
    FetchFut: Future<Output = Result<S::Fresh, ClientError>>,
{
    let before = {
        let mut guard = state.lock().await;
        let before = guard.clone();
        mutator(&mut *guard);
        guard.mark(keys, SyncPhase::PendingSync);
        before
    };

    let err = match remote.await {
        Ok(value) => {
            state.lock().await.mark(keys, SyncPhase::Confirmed);
            return Ok(value);
        }
        Err(err) => err,
    };

    state.lock().await.mark(keys, SyncPhase::Reconciling);
    match rollback_fetch().await {
        Ok(fresh) => state.lock().await.adopt(fresh),
        Err(fetch_err) => {
            warn!("reconcile refetch failed, restoring edited entries: {fetch_err}");
            let mut guard = state.lock().await;
            guard.restore(keys, &before);
            guard.mark(keys, SyncPhase::Confirmed);
        }
    }

    Err(err)
}
