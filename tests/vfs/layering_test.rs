/*!
 * Layering Tests
 * Filesystems opened from files of other filesystems
 */

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

use super::common::{mem_manager, write_archive};
use strata_vfs::{
    aggregate_layer_metadata, Capability, FileObject, FileSystemManager, LayerChain, VfsError,
};

fn sample_archive(manager: &FileSystemManager) -> FileObject {
    let zip = manager.resolve("mem:///pkg/lib.zip").unwrap();
    write_archive(
        &zip,
        json!({
            "entries": { "res/a.txt": "alpha", "res/deep/b.txt": "beta" },
            "folders": ["empty"],
        }),
    );
    zip
}

#[test]
fn test_resolve_inside_archive() {
    let (manager, archives) = mem_manager();
    let zip = sample_archive(&manager);

    let entry = manager.resolve("archive:mem:///pkg/lib.zip!/res/a.txt").unwrap();
    assert_eq!(entry.content().read_to_vec().unwrap(), b"alpha");
    assert_eq!(entry.file_system().root_name().uri(), "archive:mem:///pkg/lib.zip!/");
    assert!(entry.file_system().parent_layer().unwrap().ptr_eq(&zip));
    assert_eq!(archives.opens(), 1);

    let root = entry.file_system().root();
    let names: Vec<String> = root
        .children()
        .unwrap()
        .iter()
        .map(|c| c.name().base_name().to_string())
        .collect();
    assert_eq!(names, vec!["empty", "res"]);
    assert!(root.resolve_file("empty").unwrap().is_folder().unwrap());
    assert!(!root.resolve_file("missing.txt").unwrap().exists().unwrap());
}

#[test]
fn test_layered_file_system_is_shared() {
    let (manager, archives) = mem_manager();
    let zip = sample_archive(&manager);

    let first = manager.create_file_system("archive", &zip).unwrap();
    let second = manager.create_file_system("ARCHIVE", &zip).unwrap();
    assert!(Arc::ptr_eq(first.file_system(), second.file_system()));
    assert!(first.name().is_root());

    let via_name = manager.resolve("archive:mem:///pkg/lib.zip!/res/deep/b.txt").unwrap();
    assert!(Arc::ptr_eq(via_name.file_system(), first.file_system()));
    assert_eq!(archives.opens(), 1);
    assert_eq!(manager.file_system_count(), 2);
}

#[test]
fn test_layered_file_system_is_read_only() {
    let (manager, _) = mem_manager();
    let zip = sample_archive(&manager);
    let root = manager.create_file_system("archive", &zip).unwrap();

    let fs = root.file_system();
    assert!(fs.has_capability(Capability::Signing));
    assert!(!fs.has_capability(Capability::Create));
    assert!(matches!(
        root.resolve_file("new.txt").unwrap().create_file(),
        Err(VfsError::UnsupportedOperation { capability: Capability::Create, .. })
    ));
}

#[test]
fn test_layering_rejections() {
    let (manager, _) = mem_manager();
    let zip = sample_archive(&manager);

    // Wrong source type
    let folder = manager.resolve("mem:///pkg").unwrap();
    match manager.create_file_system("archive", &folder) {
        Err(VfsError::LayeringUnsupported { scheme, reason, .. }) => {
            assert_eq!(scheme, "archive");
            assert_eq!(reason, "expected a file, found a folder");
        }
        other => panic!("unexpected {:?}", other.map(|f| f.url().to_string())),
    }

    // Nonexistent source
    let missing = manager.resolve("mem:///pkg/absent.zip").unwrap();
    assert!(matches!(
        manager.create_file_system("archive", &missing),
        Err(VfsError::LayeringUnsupported { .. })
    ));

    // Provider that only serves roots
    assert!(matches!(
        manager.create_file_system("mem", &zip),
        Err(VfsError::LayeringUnsupported { .. })
    ));

    // File of another manager
    let (other, _) = mem_manager();
    assert!(matches!(
        other.create_file_system("archive", &zip),
        Err(VfsError::LayeringUnsupported { .. })
    ));

    // No provider at all
    assert!(matches!(
        manager.create_file_system("tar", &zip),
        Err(VfsError::ProviderCreation { .. })
    ));
}

#[test]
fn test_broken_archive_can_be_fixed() {
    let (manager, archives) = mem_manager();
    let zip = manager.resolve("mem:///broken.zip").unwrap();
    zip.content().write_all(b"not json").unwrap();

    assert!(matches!(
        manager.create_file_system("archive", &zip),
        Err(VfsError::ProviderCreation { .. })
    ));
    assert_eq!(manager.file_system_count(), 1);

    write_archive(&zip, json!({ "entries": { "ok.txt": "fine" } }));
    let root = manager.create_file_system("archive", &zip).unwrap();
    assert_eq!(
        root.resolve_file("ok.txt").unwrap().content().read_to_vec().unwrap(),
        b"fine"
    );
    assert_eq!(archives.opens(), 1);
}

#[test]
fn test_nested_layers() {
    let (manager, _) = mem_manager();
    let inner = json!({ "entries": { "deepest.txt": "bottom" } }).to_string();
    let outer = manager.resolve("mem:///outer.zip").unwrap();
    write_archive(&outer, json!({ "entries": { "inner.zip": inner } }));

    let deepest = manager
        .resolve("archive:archive:mem:///outer.zip!/inner.zip!/deepest.txt")
        .unwrap();
    assert_eq!(deepest.content().read_to_vec().unwrap(), b"bottom");

    let chain: Vec<String> = LayerChain::of(&deepest)
        .map(|fs| fs.root_name().uri().to_string())
        .collect();
    assert_eq!(
        chain,
        vec![
            "archive:archive:mem:///outer.zip!/inner.zip!/",
            "archive:mem:///outer.zip!/",
            "mem:///",
        ]
    );

    let urls = aggregate_layer_metadata(&deepest, |file| Ok(file.url().to_string())).unwrap();
    assert_eq!(
        urls,
        vec![
            "archive:archive:mem:///outer.zip!/inner.zip!/deepest.txt",
            "archive:mem:///outer.zip!/inner.zip",
            "mem:///outer.zip",
        ]
    );
}

#[test]
fn test_close_closes_layers() {
    let (manager, _) = mem_manager();
    let zip = sample_archive(&manager);
    let layered = manager.create_file_system("archive", &zip).unwrap();

    manager.close();
    assert!(layered.file_system().is_closed());
    assert!(zip.file_system().is_closed());
}

#[test]
fn test_entry_with_bang_resolves_by_its_url() {
    let (manager, archives) = mem_manager();
    let zip = manager.resolve("mem:///pkg/odd!name.zip").unwrap();
    write_archive(&zip, json!({ "entries": { "b!c.txt": "bang" } }));

    let root = manager.create_file_system("archive", &zip).unwrap();
    let entry = root.resolve_file("b!c.txt").unwrap();
    assert_eq!(entry.url(), "archive:mem:///pkg/odd%21name.zip!/b%21c.txt");
    assert_eq!(entry.name().base_name(), "b!c.txt");

    let again = manager.resolve(entry.url()).unwrap();
    assert!(again.ptr_eq(&entry));
    assert!(Arc::ptr_eq(again.file_system(), root.file_system()));
    assert_eq!(again.content().read_to_vec().unwrap(), b"bang");
    assert_eq!(archives.opens(), 1);
}

#[test]
fn test_layered_scheme_without_separator_is_malformed() {
    let (manager, _) = mem_manager();
    sample_archive(&manager);
    assert!(matches!(
        manager.resolve("archive:mem:///pkg/lib.zip"),
        Err(VfsError::MalformedName { .. })
    ));
}
