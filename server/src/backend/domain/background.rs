//! Detached executor for side effects that must never hold up a response.

use log::{debug, error};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Runs labelled background jobs on the tokio runtime.
///
/// A failed job is logged under its label and counted; it never reaches the
/// code that submitted it.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    failures: Arc<AtomicU64>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a job. Callers may drop the handle; tests await it.
    pub fn spawn<F>(&self, label: &'static str, job: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let failures = Arc::clone(&self.failures);
        tokio::spawn(async move {
            match job.await {
                Ok(()) => debug!("Background task '{}' finished", label),
                Err(e) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    error!("Background task '{}' failed: {:#}", label, e);
                }
            }
        })
    }

    /// Number of jobs that have failed since startup
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
