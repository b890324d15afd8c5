/*!
 * Replicator Tests
 * Scratch copies, their release, and isolated-thread replication
 */

use pretty_assertions::assert_eq;
use std::io::Read;
use std::sync::Arc;
use tempfile::TempDir;

use super::common::mem_manager;
use strata_vfs::{
    DefaultReplicator, FileSystemManager, IsolatedThreadExecutor, PrivilegedReplicator,
    Replicator, VfsError,
};

#[test]
fn test_replicate_and_release() {
    let (manager, _) = mem_manager();
    let file = manager.resolve("mem:///lib/native.so").unwrap();
    file.content().write_all(b"\x7fELF payload").unwrap();

    let replica = manager.replicate(&file).unwrap();
    assert!(replica.is_active());
    assert_eq!(replica.len(), 12);
    assert_eq!(replica.source(), file.name());
    assert_eq!(replica.path().extension().and_then(|e| e.to_str()), Some("so"));
    assert_eq!(std::fs::read(replica.path()).unwrap(), b"\x7fELF payload");
    assert_eq!(manager.replicator().outstanding(), 1);

    let path = replica.path().to_path_buf();
    replica.release().unwrap();
    assert!(!path.exists());
    assert_eq!(manager.replicator().outstanding(), 0);
}

#[test]
fn test_drop_releases_replica() {
    let (manager, _) = mem_manager();
    let file = manager.resolve("mem:///data.bin").unwrap();
    file.content().write_all(&[1, 2, 3]).unwrap();

    let path = {
        let replica = manager.replicate(&file).unwrap();
        let mut copy = Vec::new();
        replica.open().unwrap().read_to_end(&mut copy).unwrap();
        assert_eq!(copy, vec![1, 2, 3]);
        replica.path().to_path_buf()
    };
    assert!(!path.exists());
    assert_eq!(manager.replicator().outstanding(), 0);
}

#[test]
fn test_close_purges_outstanding_replicas() {
    let (manager, _) = mem_manager();
    let file = manager.resolve("mem:///keep.txt").unwrap();
    file.content().write_all(b"kept").unwrap();

    let first = manager.replicate(&file).unwrap();
    let second = manager.replicate(&file).unwrap();
    assert_ne!(first.path(), second.path());
    assert_eq!(manager.replicator().outstanding(), 2);

    manager.close();
    assert!(!first.path().exists());
    assert!(!second.is_active());
    assert_eq!(manager.replicator().outstanding(), 0);
    assert!(manager.replicate(&file).is_err());

    // Late release of a purged replica is harmless
    first.release().unwrap();
}

#[test]
fn test_folders_and_missing_files_cannot_be_replicated() {
    let (manager, _) = mem_manager();
    let folder = manager.resolve("mem:///dir").unwrap();
    folder.create_folder().unwrap();
    assert!(matches!(manager.replicate(&folder), Err(VfsError::FileTypeConflict { .. })));

    let missing = manager.resolve("mem:///dir/missing").unwrap();
    assert!(matches!(manager.replicate(&missing), Err(VfsError::FileTypeConflict { .. })));
    assert_eq!(manager.replicator().outstanding(), 0);
}

#[test]
fn test_privileged_replication_in_configured_dir() {
    let scratch = TempDir::new().unwrap();
    let dir = scratch.path().join("replicas");
    let replicator = PrivilegedReplicator::new(
        Arc::new(DefaultReplicator::new(Some(dir.clone()))),
        Arc::new(IsolatedThreadExecutor::new("test-replicate")),
    );
    let manager = FileSystemManager::builder()
        .with_provider_id("mem", "mem")
        .with_replicator(Arc::new(replicator))
        .build()
        .unwrap();

    let file = manager.resolve("mem:///x.txt").unwrap();
    file.content().write_all(b"isolated").unwrap();

    let replica = manager.replicate(&file).unwrap();
    assert!(replica.path().starts_with(&dir));
    assert_eq!(std::fs::read(replica.path()).unwrap(), b"isolated");
    assert_eq!(manager.replicator().outstanding(), 1);

    drop(replica);
    assert_eq!(manager.replicator().outstanding(), 0);
    // Configured directories are left in place
    assert!(dir.is_dir());
}
