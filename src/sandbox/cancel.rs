#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Cancels an in-flight evaluation from any thread.
///
/// The sandbox polls the handle from the engine's interrupt hook, or kills
/// the worker process, so cancelling stops the script itself rather than
/// discarding its result.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Creates a handle that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drop guard that cancels an evaluation if the future awaiting it goes away.
pub(crate) struct CancelOnDrop(Option<CancelHandle>);

impl CancelOnDrop {
    /// Arms the guard for `handle`.
    pub(crate) fn new(handle: CancelHandle) -> Self {
        Self(Some(handle))
    }

    /// Prevents the guard from cancelling on drop.
    pub(crate) fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.cancel();
        }
    }
}
