/*!
 * Privileged Replication
 * Runs another replicator's backend read inside an execution context
 */

use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

use super::{Replica, Replicator};
use crate::vfs::object::FileObject;
use crate::vfs::types::{VfsError, VfsResult};

/// Task handed to an executor
pub type ReplicationTask<'a> = Box<dyn FnOnce() -> VfsResult<Replica> + Send + 'a>;

/// Context a replication runs in (e.g. elevated rights, isolated thread)
pub trait PrivilegedExecutor: Send + Sync {
    fn execute(&self, task: ReplicationTask<'_>) -> VfsResult<Replica>;
}

/// Runs the task on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl PrivilegedExecutor for InlineExecutor {
    fn execute(&self, task: ReplicationTask<'_>) -> VfsResult<Replica> {
        task()
    }
}

/// Runs the task on a dedicated scoped thread and waits for it
#[derive(Debug, Clone)]
pub struct IsolatedThreadExecutor {
    thread_name: String,
}

impl IsolatedThreadExecutor {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl Default for IsolatedThreadExecutor {
    fn default() -> Self {
        Self::new("strata-replicate")
    }
}

impl PrivilegedExecutor for IsolatedThreadExecutor {
    fn execute(&self, task: ReplicationTask<'_>) -> VfsResult<Replica> {
        let failed = |detail: String| VfsError::operation("replicate", &self.thread_name, detail);
        thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name(self.thread_name.clone())
                .spawn_scoped(scope, task)
                .map_err(|e| failed(format!("could not spawn executor thread: {}", e)))?;
            handle.join().unwrap_or_else(|_| {
                error!(thread = %self.thread_name, "replication task panicked");
                Err(failed("replication task panicked".to_string()))
            })
        })
    }
}

/// Delegates to `inner`, running each replication under `executor`
pub struct PrivilegedReplicator {
    inner: Arc<dyn Replicator>,
    executor: Arc<dyn PrivilegedExecutor>,
}

impl PrivilegedReplicator {
    pub fn new(inner: Arc<dyn Replicator>, executor: Arc<dyn PrivilegedExecutor>) -> Self {
        Self { inner, executor }
    }

    pub fn inner(&self) -> &Arc<dyn Replicator> {
        &self.inner
    }
}

impl Replicator for PrivilegedReplicator {
    fn replicate(&self, file: &FileObject) -> VfsResult<Replica> {
        debug!(name = %file.name(), "privileged replication");
        let inner = &self.inner;
        self.executor.execute(Box::new(move || inner.replicate(file)))
    }

    fn outstanding(&self) -> usize {
        self.inner.outstanding()
    }

    fn close(&self) {
        self.inner.close();
    }
}
