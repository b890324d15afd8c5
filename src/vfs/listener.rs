/*!
 * File Listeners
 * Synchronous create/delete notifications per file name
 */

use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::name::Name;
use super::object::FileObject;

/// Kind of state transition being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    Created,
    Deleted,
}

impl fmt::Display for FileChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileChangeKind::Created => write!(f, "created"),
            FileChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// Event delivered to listeners after the backend reflects the change
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    file: FileObject,
    kind: FileChangeKind,
}

impl FileChangeEvent {
    pub(crate) fn new(file: FileObject, kind: FileChangeKind) -> Self {
        Self { file, kind }
    }

    /// The file object the mutation was performed through
    pub fn file(&self) -> &FileObject {
        &self.file
    }

    pub fn kind(&self) -> FileChangeKind {
        self.kind
    }
}

/// Receives create/delete transitions of one file
///
/// Called on the mutating thread before the mutating call returns. Mutating
/// the same file from inside a callback re-enters the state machine.
pub trait FileListener: Send + Sync {
    fn file_created(&self, event: &FileChangeEvent);

    fn file_deleted(&self, event: &FileChangeEvent);
}

/// Any closure can listen to both kinds of event
impl<F> FileListener for F
where
    F: Fn(&FileChangeEvent) + Send + Sync,
{
    fn file_created(&self, event: &FileChangeEvent) {
        self(event)
    }

    fn file_deleted(&self, event: &FileChangeEvent) {
        self(event)
    }
}

fn same_listener(a: &Arc<dyn FileListener>, b: &Arc<dyn FileListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Listener table of one filesystem, keyed by name
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: RwLock<HashMap<Name, Vec<Arc<dyn FileListener>>, RandomState>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &Name, listener: Arc<dyn FileListener>) {
        self.listeners
            .write()
            .entry(name.clone())
            .or_default()
            .push(listener);
    }

    /// Remove one registration; returns whether it was present
    pub fn remove(&self, name: &Name, listener: &Arc<dyn FileListener>) -> bool {
        let mut listeners = self.listeners.write();
        let Some(registered) = listeners.get_mut(name) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|l| !same_listener(l, listener));
        let removed = registered.len() != before;
        if registered.is_empty() {
            listeners.remove(name);
        }
        removed
    }

    pub fn count(&self, name: &Name) -> usize {
        self.listeners.read().get(name).map_or(0, Vec::len)
    }

    /// Deliver an event to every listener of the event's file
    ///
    /// The table lock is released before any callback runs.
    pub fn fire(&self, event: &FileChangeEvent) {
        let targets = match self.listeners.read().get(event.file().name()) {
            Some(registered) => registered.clone(),
            None => return,
        };
        for listener in targets {
            match event.kind() {
                FileChangeKind::Created => listener.file_created(event),
                FileChangeKind::Deleted => listener.file_deleted(event),
            }
        }
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}
