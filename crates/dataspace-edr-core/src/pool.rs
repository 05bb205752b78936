// crates/dataspace-edr-core/src/pool.rs
// ============================================================================
// Module: Transport Worker Pool
// Description: Bounded pool for blocking control-plane calls.
// Purpose: Keep blocking transport off the async scheduler with a hard cap.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`WorkerPool`] runs blocking closures on tokio's blocking threads while a
//! semaphore caps how many run at once.
//! Invariants:
//! - At most `size` closures execute concurrently.
//! - A closure holds its permit until it returns, even if the awaiting future
//!   was dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::EdcClientError;

// ============================================================================
// SECTION: Worker Pool
// ============================================================================

/// Bounded pool of blocking transport workers.
///
/// # Invariants
/// - `size` is at least one.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    /// Concurrency permits.
    permits: Arc<Semaphore>,
    /// Configured pool size.
    size: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `size` closures at once.
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Returns the configured pool size.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Runs a blocking closure on the pool.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::Interrupted`] when the pool is closed or the
    /// worker panicked, otherwise the closure's own result.
    pub async fn run<T, F>(&self, task: F) -> Result<T, EdcClientError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, EdcClientError> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| EdcClientError::Interrupted("waiting for a transport worker".to_string()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        })
        .await
        .map_err(|err| EdcClientError::Interrupted(format!("running transport worker: {err}")))?
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

/// Default worker pool size.
pub const DEFAULT_POOL_SIZE: usize = 20;

// ============================================================================
// SECTION: Tests
// ============================================================================
