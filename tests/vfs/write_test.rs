/*!
 * Write Tests
 * Create, delete, copy, content streams and listener notifications
 */

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;

use super::common::{mem_manager, scratch_folder, EventRecorder};
use strata_vfs::{FileChangeKind, FileListener, FileObject, FileType, Selectors, VfsError};

fn child_names(folder: &FileObject) -> BTreeSet<String> {
    folder
        .children()
        .unwrap()
        .iter()
        .map(|child| child.name().base_name().to_string())
        .collect()
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_create_folder() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);

    // Direct child
    let folder = scratch.resolve_file("dir1").unwrap();
    assert!(!folder.exists().unwrap());
    folder.create_folder().unwrap();
    assert!(folder.is_folder().unwrap());
    assert_eq!(folder.children().unwrap().len(), 0);

    // Descendant with missing ancestors
    let deep = scratch.resolve_file("dir2/dir1/dir1").unwrap();
    deep.create_folder().unwrap();
    assert!(deep.is_folder().unwrap());
    assert!(scratch.resolve_file("dir2/dir1").unwrap().is_folder().unwrap());

    // Again, no-op
    deep.create_folder().unwrap();
    assert!(deep.is_folder().unwrap());
}

#[test]
fn test_create_file() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);

    let file = scratch.resolve_file("file1.txt").unwrap();
    assert!(!file.exists().unwrap());
    file.create_file().unwrap();
    assert!(file.is_file().unwrap());
    assert_eq!(file.content().size().unwrap(), 0);

    let deep = scratch.resolve_file("dir1/dir1/file1.txt").unwrap();
    deep.create_file().unwrap();
    assert!(deep.is_file().unwrap());
    assert!(scratch.resolve_file("dir1/dir1").unwrap().is_folder().unwrap());

    deep.create_file().unwrap();
    assert_eq!(deep.content().size().unwrap(), 0);
}

#[test]
fn test_create_existing_file_keeps_content() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);

    let file = scratch.resolve_file("kept.txt").unwrap();
    file.content().write_all(b"keep me").unwrap();

    let recorder = Arc::new(EventRecorder::default());
    let listener: Arc<dyn FileListener> = recorder.clone();
    file.file_system().add_listener(&file, listener);

    file.create_file().unwrap();
    assert_eq!(file.file_type().unwrap(), FileType::File);
    assert_eq!(file.content().read_to_vec().unwrap(), b"keep me");

    // A fresh lookup asks the backend rather than the cached type
    file.refresh();
    assert!(file.is_file().unwrap());
    assert_eq!(file.content().size().unwrap(), 7);
    assert!(recorder.take().is_empty());
}

#[test]
fn test_file_folder_conflicts() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);

    let file = scratch.resolve_file("dir1/file1.txt").unwrap();
    file.create_file().unwrap();
    assert!(matches!(
        file.create_folder(),
        Err(VfsError::FileTypeConflict { expected: FileType::Folder, actual: FileType::File, .. })
    ));

    // A file in the way of an ancestor
    let below = scratch.resolve_file("dir1/file1.txt/child").unwrap();
    assert!(matches!(
        below.create_file(),
        Err(VfsError::FileTypeConflict { .. })
    ));
    assert!(matches!(
        below.create_folder(),
        Err(VfsError::FileTypeConflict { .. })
    ));

    let folder = scratch.resolve_file("dir1").unwrap();
    assert!(matches!(
        folder.create_file(),
        Err(VfsError::FileTypeConflict { expected: FileType::File, actual: FileType::Folder, .. })
    ));
}

#[test]
fn test_delete() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);
    scratch.resolve_file("file1.txt").unwrap().create_file().unwrap();
    scratch.resolve_file("emptydir").unwrap().create_folder().unwrap();
    scratch.resolve_file("dir1/file1.txt").unwrap().create_file().unwrap();
    scratch.resolve_file("dir1/dir2/file2.txt").unwrap().create_file().unwrap();

    // A file
    let file = scratch.resolve_file("file1.txt").unwrap();
    assert_eq!(file.delete_with(&Selectors::SELECT_ALL).unwrap(), 1);
    assert!(!file.exists().unwrap());

    // An empty folder
    let empty = scratch.resolve_file("emptydir").unwrap();
    assert_eq!(empty.delete().unwrap(), 1);
    assert!(!empty.exists().unwrap());

    // Recursive
    let dir = scratch.resolve_file("dir1").unwrap();
    let nested = dir.resolve_file("dir2/file2.txt").unwrap();
    assert!(nested.exists().unwrap());
    assert_eq!(dir.delete().unwrap(), 4);
    assert!(!dir.exists().unwrap());
    assert!(!nested.exists().unwrap());

    // Nothing there
    let missing = scratch.resolve_file("some-folder/some-file").unwrap();
    assert_eq!(missing.delete().unwrap(), 0);
    assert!(!missing.exists().unwrap());
}

#[test]
fn test_delete_descendants_only() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);
    scratch.resolve_file("a/b.txt").unwrap().create_file().unwrap();
    scratch.resolve_file("c").unwrap().create_folder().unwrap();

    assert_eq!(scratch.delete_with(&Selectors::EXCLUDE_SELF).unwrap(), 3);
    assert!(scratch.is_folder().unwrap());
    assert!(scratch.children().unwrap().is_empty());
}

#[test]
fn test_delete_refuses_non_empty_folder() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);
    scratch.resolve_file("dir/keep.txt").unwrap().create_file().unwrap();

    let dir = scratch.resolve_file("dir").unwrap();
    let err = dir.delete_with(&Selectors::SELECT_SELF).unwrap_err();
    assert!(matches!(err, VfsError::BackendIo { ref detail, .. } if detail == "folder is not empty"));
    assert!(dir.exists().unwrap());
    assert!(dir.resolve_file("keep.txt").unwrap().exists().unwrap());
}

#[test]
fn test_copy_same_file_system() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);

    let file = scratch.resolve_file("file1.txt").unwrap();
    let content = "Here is some sample content for the file.  Blah Blah Blah.";
    let mut out = file.content().output_stream().unwrap();
    out.write_all(content.as_bytes()).unwrap();
    out.finish().unwrap();
    assert_eq!(file.content().read_to_vec().unwrap(), content.as_bytes());

    let copy = scratch.resolve_file("file1copy.txt").unwrap();
    assert!(!copy.exists().unwrap());
    copy.copy_from(&file, &Selectors::SELECT_SELF).unwrap();
    assert_eq!(copy.content().read_to_vec().unwrap(), content.as_bytes());
}

#[test]
fn test_copy_tree_replaces_destination() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);
    scratch.resolve_file("src/a.txt").unwrap().content().write_all(b"a").unwrap();
    scratch.resolve_file("src/sub/b.txt").unwrap().content().write_all(b"b").unwrap();
    scratch.resolve_file("dst/stale.txt").unwrap().create_file().unwrap();

    let src = scratch.resolve_file("src").unwrap();
    let dst = scratch.resolve_file("dst").unwrap();
    dst.copy_from(&src, &Selectors::SELECT_ALL).unwrap();

    assert_eq!(child_names(&dst), names(&["a.txt", "sub"]));
    assert_eq!(dst.resolve_file("sub/b.txt").unwrap().content().read_to_vec().unwrap(), b"b");
    // Source untouched
    assert_eq!(child_names(&src), names(&["a.txt", "sub"]));
}

#[test]
fn test_copy_rejects_overlap_and_missing_source() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);
    let dir = scratch.resolve_file("dir").unwrap();
    dir.create_folder().unwrap();

    let inside = dir.resolve_file("inner").unwrap();
    assert!(matches!(
        inside.copy_from(&dir, &Selectors::SELECT_ALL),
        Err(VfsError::BackendIo { .. })
    ));
    assert!(matches!(
        dir.copy_from(&dir, &Selectors::SELECT_SELF),
        Err(VfsError::BackendIo { .. })
    ));

    let missing = scratch.resolve_file("nope.txt").unwrap();
    let target = scratch.resolve_file("target.txt").unwrap();
    assert!(matches!(
        target.copy_from(&missing, &Selectors::SELECT_SELF),
        Err(VfsError::BackendIo { .. })
    ));
    assert!(!target.exists().unwrap());
}

#[test]
fn test_list_children() {
    let (manager, _) = mem_manager();
    let folder = scratch_folder(&manager);
    let mut expected = BTreeSet::new();
    assert!(folder.children().unwrap().is_empty());

    folder.resolve_file("dir1").unwrap().create_folder().unwrap();
    expected.insert("dir1".to_string());
    assert_eq!(child_names(&folder), expected);

    folder.resolve_file("file1.html").unwrap().create_file().unwrap();
    expected.insert("file1.html".to_string());
    assert_eq!(child_names(&folder), expected);

    folder.resolve_file("dir2/file1.txt").unwrap().create_file().unwrap();
    expected.insert("dir2".to_string());
    assert_eq!(child_names(&folder), expected);

    // Through an output stream
    folder
        .resolve_file("file2.txt")
        .unwrap()
        .content()
        .output_stream()
        .unwrap()
        .finish()
        .unwrap();
    expected.insert("file2.txt".to_string());
    assert_eq!(child_names(&folder), expected);

    folder.resolve_file("dir1").unwrap().delete().unwrap();
    expected.remove("dir1");
    assert_eq!(child_names(&folder), expected);

    folder.resolve_file("file1.html").unwrap().delete().unwrap();
    expected.remove("file1.html");
    assert_eq!(child_names(&folder), expected);

    folder.delete().unwrap();
    folder.create_folder().unwrap();
    assert!(folder.children().unwrap().is_empty());
}

#[test]
fn test_children_of_a_file_is_conflict() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);
    let file = scratch.resolve_file("plain.txt").unwrap();
    file.create_file().unwrap();
    assert!(matches!(file.children(), Err(VfsError::FileTypeConflict { .. })));
    assert!(file.child("x").is_err());
    assert!(scratch.child("plain.txt").unwrap().unwrap().ptr_eq(&file));
    assert!(scratch.child("absent").unwrap().is_none());
}

#[test]
fn test_append_and_replace_content() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);
    let file = scratch.resolve_file("log.txt").unwrap();

    file.content().write_all(b"one").unwrap();
    let mut out = file.content().append_stream().unwrap();
    out.write_all(b" two").unwrap();
    out.finish().unwrap();
    assert_eq!(file.content().read_to_vec().unwrap(), b"one two");

    // Dropping an unfinished writer still commits
    {
        let mut out = file.content().output_stream().unwrap();
        out.write_all(b"three").unwrap();
    }
    assert_eq!(file.content().read_to_vec().unwrap(), b"three");
    assert_eq!(file.content().size().unwrap(), 5);
}

#[test]
fn test_folder_has_no_content() {
    let (manager, _) = mem_manager();
    let scratch = scratch_folder(&manager);
    assert!(matches!(scratch.content().size(), Err(VfsError::FileTypeConflict { .. })));
    assert!(matches!(
        scratch.content().input_stream(),
        Err(VfsError::FileTypeConflict { .. })
    ));
    assert!(matches!(
        scratch.content().output_stream(),
        Err(VfsError::FileTypeConflict { .. })
    ));
}

#[test]
fn test_listener() {
    let (manager, _) = mem_manager();
    let base = scratch_folder(&manager);
    let child = base.resolve_file("newfile.txt").unwrap();
    assert!(!child.exists().unwrap());

    let fs = Arc::clone(base.file_system());
    let recorder = Arc::new(EventRecorder::default());
    let listener: Arc<dyn FileListener> = recorder.clone();
    fs.add_listener(&child, Arc::clone(&listener));
    assert_eq!(fs.listener_count(&child), 1);

    let url = child.url().to_string();
    let created = || vec![(FileChangeKind::Created, url.clone())];
    let deleted = || vec![(FileChangeKind::Deleted, url.clone())];

    // Create as a folder, then again without an event
    child.create_folder().unwrap();
    assert_eq!(recorder.take(), created());
    child.create_folder().unwrap();
    assert!(recorder.take().is_empty());

    // Delete, then again without an event
    child.delete().unwrap();
    assert_eq!(recorder.take(), deleted());
    child.delete().unwrap();
    assert!(recorder.take().is_empty());

    // Create as a file
    child.create_file().unwrap();
    assert_eq!(recorder.take(), created());
    child.create_file().unwrap();
    assert!(recorder.take().is_empty());
    child.delete().unwrap();
    assert_eq!(recorder.take(), deleted());

    // Create by writing to it, then rewrite without an event
    child.content().output_stream().unwrap().finish().unwrap();
    assert_eq!(recorder.take(), created());
    child.content().output_stream().unwrap().finish().unwrap();
    assert!(recorder.take().is_empty());

    // Copy a folder over the top
    let other = base.resolve_file("folder1").unwrap();
    other.create_folder().unwrap();
    child.copy_from(&other, &Selectors::SELECT_SELF).unwrap();
    let mut expected = deleted();
    expected.extend(created());
    assert_eq!(recorder.take(), expected);
    assert!(child.is_folder().unwrap());

    assert!(fs.remove_listener(&child, &listener));
    assert!(!fs.remove_listener(&child, &listener));
    child.delete().unwrap();
    assert!(recorder.take().is_empty());
}

#[test]
fn test_closure_listener_sees_handle_through_other_path() {
    let (manager, _) = mem_manager();
    let base = scratch_folder(&manager);
    let target = base.resolve_file("watched").unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener: Arc<dyn FileListener> = Arc::new(move |event: &strata_vfs::FileChangeEvent| {
        sink.lock().push(event.kind());
    });
    base.file_system().add_listener(&target, listener);

    // Created through a different (but cached, so identical) handle
    manager.resolve("mem:///scratch/watched").unwrap().create_folder().unwrap();
    base.delete_with(&Selectors::EXCLUDE_SELF).unwrap();
    assert_eq!(*seen.lock(), vec![FileChangeKind::Created, FileChangeKind::Deleted]);
}
