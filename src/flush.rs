//! Flush policies and the background flush worker.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Controls when plain `set`/`delete` calls reach the disk.
///
/// Flush, overwrite, and the end of a scope always write regardless of
/// policy.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Only write when `flush()`, `overwrite()`, or a scope exit asks for it.
    #[default]
    Manual,
    /// Write after every `set`/`delete` on the store.
    Immediate,
    /// Background thread writes on a timer and whenever the store is poked.
    Async(Duration),
}

/// Background thread that calls a flush closure on a timer or when poked.
///
/// The thread exits once every sender for its channel is gone; dropping the
/// worker joins it.
pub struct AsyncFlushWorker {
    join_handle: Option<thread::JoinHandle<()>>,
}

impl AsyncFlushWorker {
    /// Spawn a worker on `rx`. The caller keeps the sender and drops it to
    /// shut the worker down.
    pub fn spawn<F>(interval: Duration, flush_fn: F, rx: mpsc::Receiver<()>) -> std::io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let join_handle = thread::Builder::new()
            .name("json-store-flush".into())
            .spawn(move || loop {
                match rx.recv_timeout(interval) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Timeout) => flush_fn(),
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        log::debug!("flush worker stopping");
                        break;
                    }
                }
            })?;
        Ok(Self {
            join_handle: Some(join_handle),
        })
    }
}

impl Drop for AsyncFlushWorker {
    fn drop(&mut self) {
        if let Some(h) = self.join_handle.take() {
            if h.join().is_err() {
                log::error!("flush worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for AsyncFlushWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFlushWorker")
            .field("running", &self.join_handle.is_some())
            .finish()
    }
}
