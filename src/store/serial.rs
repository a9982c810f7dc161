//! Serial execution context for stores
//!
//! A [`SerialQueue`] owns a context value (a file location, a database
//! connection) on a dedicated worker thread and runs submitted jobs against it
//! one at a time, in submission order. Results travel back over a oneshot
//! channel per job, so they also resolve in submission order.

use super::StoreFuture;
use crate::{FeedCacheError, Result};
use std::sync::mpsc;
use std::thread;
use tokio::sync::oneshot;

type Job<C> = Box<dyn FnOnce(&mut C) + Send>;

/// Single worker that serialises every operation on its context
pub struct SerialQueue<C> {
    name: String,
    sender: mpsc::Sender<Job<C>>,
}

impl<C: Send + 'static> SerialQueue<C> {
    /// Start the worker thread. It exits once the queue is dropped and every
    /// queued job has run.
    pub fn spawn(name: impl Into<String>, context: C) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Job<C>>();

        let worker_name = name.clone();
        thread::Builder::new().name(name.clone()).spawn(move || {
            let mut context = context;
            for job in receiver {
                job(&mut context);
            }
            tracing::trace!(queue = %worker_name, "Serial queue drained");
        })?;

        tracing::debug!(queue = %name, "Serial queue started");
        Ok(Self { name, sender })
    }

    /// Queue `job` behind everything submitted before it
    ///
    /// The job is enqueued before this returns; the future only waits for its result.
    pub fn submit<T, F>(&self, job: F) -> StoreFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut C) -> Result<T> + Send + 'static,
    {
        let (reply, result) = oneshot::channel();
        let queued = self.sender.send(Box::new(move |context: &mut C| {
            // The caller may have dropped the future; the side effect still happened
            let _ = reply.send(job(context));
        }));

        let name = self.name.clone();
        if queued.is_err() {
            return Box::pin(async move { Err(worker_stopped(&name)) });
        }

        Box::pin(async move {
            match result.await {
                Ok(outcome) => outcome,
                Err(_) => Err(worker_stopped(&name)),
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn worker_stopped(name: &str) -> FeedCacheError {
    FeedCacheError::StoreUnavailable(format!("{} worker stopped", name))
}
