//! The fixed-size worker pool that parses requests and stages responses
//! off the reactor thread.
//!
//! Each worker pulls one ready connection off the shared task queue at a
//! time, runs it through [`Connection::process`], and hands it back to
//! the reactor by re-arming its interest (read if the request wasn't
//! complete yet, write once a response is staged). The one path a worker
//! cannot finish on its own — staging the response itself failed and the
//! connection has to be torn down — is handed back via a close channel
//! plus a wake-up, since only the reactor thread mutates the connection
//! table.

use crate::connection::{Connection, ProcessOutcome};
use crate::queue::TaskQueue;
use mio::{Registry, Token, Waker};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type SharedConnection = Arc<Mutex<Connection>>;

/// A fixed set of named worker threads, spawned once at startup and left
/// running for the lifetime of the process.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        count: usize,
        queue: Arc<TaskQueue<SharedConnection>>,
        registry: Arc<Registry>,
        document_root: Arc<PathBuf>,
        close_tx: Sender<Token>,
        waker: Arc<Waker>,
    ) -> Self {
        let handles = (0..count)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let registry = Arc::clone(&registry);
                let document_root = Arc::clone(&document_root);
                let close_tx = close_tx.clone();
                let waker = Arc::clone(&waker);
                thread::Builder::new()
                    .name(format!("worker-{id}"))
                    .spawn(move || worker_loop(&queue, &registry, &document_root, &close_tx, &waker))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { handles }
    }

    /// Block until every worker thread has exited. Workers never exit on
    /// their own today, so this is only useful in tests that drop the
    /// queue out from under a pool.
    #[cfg(test)]
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    queue: &TaskQueue<SharedConnection>,
    registry: &Registry,
    document_root: &Path,
    close_tx: &Sender<Token>,
    waker: &Waker,
) {
    loop {
        let conn = queue.take();
        let mut guard = conn.lock().unwrap();
        let outcome = guard.process(document_root);
        match outcome {
            ProcessOutcome::NeedMoreData => {
                if let Err(e) = guard.reregister_read(registry) {
                    tracing::warn!(error = %e, "failed to reregister connection for read");
                }
            }
            ProcessOutcome::Ready { .. } => {
                if let Err(e) = guard.reregister_write(registry) {
                    tracing::warn!(error = %e, "failed to reregister connection for write");
                }
            }
            ProcessOutcome::Fatal => {
                let token = guard.token;
                drop(guard);
                let _ = close_tx.send(token);
                if let Err(e) = waker.wake() {
                    tracing::warn!(error = %e, "failed to wake reactor for worker-initiated close");
                }
            }
        }
    }
}
