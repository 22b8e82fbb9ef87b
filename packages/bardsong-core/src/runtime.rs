//! Task spawning abstraction for runtime independence.
//!
//! The session core spawns background work (per-session event pumps,
//! supervision timers) through [`TaskSpawner`] instead of calling
//! `tokio::spawn` directly, so an embedding bot can route tasks onto its own
//! runtime handle.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// Implementations should ensure tasks keep running even if the spawner
/// value itself is dropped.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    ///
    /// The task runs independently of the caller and continues until
    /// completion; cancellation happens through tokens passed into the
    /// future, not through the spawner.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner used by default.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
