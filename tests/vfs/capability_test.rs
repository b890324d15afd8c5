/*!
 * Capability Tests
 * Undeclared capabilities fail before the backend is touched
 */

use mockall::mock;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::SystemTime;

use super::common::mem_manager;
use strata_vfs::{
    Backend, Capability, CapabilitySet, FileObject, FileProvider, FileSystemManager, FileType,
    Name, RandomAccessMode, Selectors, VfsError, VfsResult,
};

mock! {
    pub Store {}

    impl Backend for Store {
        fn capabilities(&self) -> CapabilitySet;
        fn file_type(&self, name: &Name) -> io::Result<FileType>;
        fn list_children(&self, name: &Name) -> io::Result<Vec<String>>;
        fn create_folder(&self, name: &Name) -> io::Result<()>;
        fn create_file(&self, name: &Name) -> io::Result<()>;
        fn delete(&self, name: &Name) -> io::Result<()>;
        fn read(&self, name: &Name) -> io::Result<Box<dyn Read + Send>>;
        fn write(&self, name: &Name, data: &[u8]) -> io::Result<()>;
        fn size(&self, name: &Name) -> io::Result<u64>;
    }
}

/// Provider handing out one prepared backend
struct FixedProvider {
    backend: Arc<dyn Backend>,
}

impl FileProvider for FixedProvider {
    fn id(&self) -> &str {
        "fixed"
    }

    fn open(&self, _root: &Name, _parent: Option<&FileObject>) -> VfsResult<Arc<dyn Backend>> {
        Ok(Arc::clone(&self.backend))
    }
}

/// Manager whose `mock` scheme is backed by a store declaring `caps` and
/// expecting no call other than the capability query
fn strict_manager(caps: CapabilitySet) -> FileSystemManager {
    let mut store = MockStore::new();
    store.expect_capabilities().times(1).return_const(caps);
    FileSystemManager::builder()
        .with_provider(
            "mock",
            Arc::new(FixedProvider {
                backend: Arc::new(store),
            }),
        )
        .build()
        .unwrap()
}

fn missing(result: VfsResult<impl Sized>, expected: Capability) {
    match result {
        Err(VfsError::UnsupportedOperation { capability, .. }) => assert_eq!(capability, expected),
        Err(other) => panic!("expected missing {}, got {}", expected, other),
        Ok(_) => panic!("expected missing {}, got success", expected),
    }
}

#[test]
fn test_empty_capabilities_reject_everything() {
    let manager = strict_manager(CapabilitySet::empty());
    let file = manager.resolve("mock:///a/b.txt").unwrap();
    let content = file.content();

    missing(file.create_file(), Capability::Create);
    missing(file.create_folder(), Capability::Create);
    missing(file.delete(), Capability::Delete);
    missing(file.delete_with(&Selectors::SELECT_CHILDREN), Capability::Delete);
    missing(file.children(), Capability::ListChildren);
    missing(file.child("x"), Capability::ListChildren);
    missing(content.input_stream(), Capability::ReadContent);
    missing(content.output_stream(), Capability::WriteContent);
    missing(content.append_stream(), Capability::AppendContent);
    missing(content.write_all(b"x"), Capability::WriteContent);
    missing(content.random_access(RandomAccessMode::Read), Capability::RandomAccessRead);
    missing(content.attributes(), Capability::GetAttributes);
    missing(content.last_modified(), Capability::GetLastModified);
    missing(content.set_last_modified(SystemTime::now()), Capability::SetLastModified);
    missing(content.certificates(), Capability::Signing);
}

#[test]
fn test_read_only_rejects_mutation() {
    let manager = strict_manager(CapabilitySet::read_only());
    let file = manager.resolve("mock:///a/b.txt").unwrap();

    assert!(file.file_system().has_capability(Capability::ReadContent));
    missing(file.create_file(), Capability::Create);
    missing(file.delete(), Capability::Delete);
    missing(file.content().output_stream(), Capability::WriteContent);
    missing(
        file.content().random_access(RandomAccessMode::ReadWrite),
        Capability::RandomAccessWrite,
    );
}

#[test]
fn test_copy_into_read_only_destination() {
    let manager = strict_manager(CapabilitySet::read_only());
    let dest = manager.resolve("mock:///copy.txt").unwrap();

    let (mem, _) = mem_manager();
    let source = mem.resolve("mem:///source.txt").unwrap();
    source.content().write_all(b"data").unwrap();

    missing(dest.copy_from(&source, &Selectors::SELECT_SELF), Capability::Create);
}

#[test]
fn test_capabilities_queried_once() {
    let manager = strict_manager(CapabilitySet::read_only());
    let fs = Arc::clone(manager.resolve("mock:///").unwrap().file_system());
    for _ in 0..3 {
        assert_eq!(fs.capabilities(), CapabilitySet::read_only());
        manager.resolve("mock:///other").unwrap();
    }
}
