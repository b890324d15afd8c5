/*!
 * Cache Tests
 * Handle identity under the default and no-cache policies
 */

use std::sync::{Arc, Barrier};
use std::thread;

use strata_vfs::{CachePolicy, FileObject, FileSystemManager};

fn manager_with(policy: CachePolicy) -> FileSystemManager {
    FileSystemManager::builder()
        .with_provider_id("mem", "mem")
        .with_cache_policy(policy)
        .build()
        .unwrap()
}

#[test]
fn test_default_policy_shares_handles() {
    let manager = manager_with(CachePolicy::Default);
    let a = manager.resolve("mem:///dir/file.txt").unwrap();
    let b = manager.resolve("mem:///dir/./x/../file.txt").unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(a, b);

    // Type learned through one handle is visible through the other
    a.create_file().unwrap();
    assert!(b.is_file().unwrap());
    assert_eq!(a.file_system().cache_policy(), CachePolicy::Default);
}

#[test]
fn test_no_cache_policy_builds_fresh_handles() {
    let manager = manager_with(CachePolicy::NoCache);
    let a = manager.resolve("mem:///dir/file.txt").unwrap();
    let b = manager.resolve("mem:///dir/file.txt").unwrap();
    assert!(!a.ptr_eq(&b));
    assert_ne!(a, b);
    assert_eq!(a.name(), b.name());
    assert!(Arc::ptr_eq(a.file_system(), b.file_system()));
    assert_eq!(a.file_system().cached_count(), 0);

    a.create_file().unwrap();
    assert!(b.exists().unwrap());
}

#[test]
fn test_scheme_override() {
    let manager = FileSystemManager::builder()
        .with_provider_id("mem", "mem")
        .with_provider_id("scratch", "mem")
        .with_scheme_cache_policy("scratch", CachePolicy::NoCache)
        .build()
        .unwrap();
    let cached = manager.resolve("mem:///a").unwrap();
    let uncached = manager.resolve("scratch:///a").unwrap();
    assert_eq!(cached.file_system().cache_policy(), CachePolicy::Default);
    assert_eq!(uncached.file_system().cache_policy(), CachePolicy::NoCache);
}

#[test]
fn test_concurrent_first_resolution_yields_one_handle() {
    let manager = manager_with(CachePolicy::Default);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let manager = manager.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager.resolve("mem:///shared/target.bin").unwrap()
            })
        })
        .collect();

    let files: Vec<FileObject> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for file in &files[1..] {
        assert!(file.ptr_eq(&files[0]));
        assert!(Arc::ptr_eq(file.file_system(), files[0].file_system()));
    }
    assert_eq!(manager.file_system_count(), 1);
}

#[test]
fn test_policy_parsing() {
    assert_eq!("none".parse::<CachePolicy>().unwrap(), CachePolicy::NoCache);
    assert_eq!("NO_CACHE".parse::<CachePolicy>().unwrap(), CachePolicy::NoCache);
    assert_eq!("default".parse::<CachePolicy>().unwrap(), CachePolicy::Default);
    assert_eq!(CachePolicy::NoCache.to_string(), "no_cache");
    assert!("sometimes".parse::<CachePolicy>().is_err());
}

#[test]
fn test_concurrent_creates_share_ancestors() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    let manager = manager_with(CachePolicy::Default);
    let threads = 4;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|seed| {
            let manager = manager.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed as u64);
                barrier.wait();
                let mut created = BTreeSet::new();
                for _ in 0..50 {
                    let uri = format!(
                        "mem:///tree/d{}/e{}/f{}.txt",
                        rng.gen_range(0..3),
                        rng.gen_range(0..3),
                        rng.gen_range(0..10)
                    );
                    manager.resolve(&uri).unwrap().create_file().unwrap();
                    created.insert(uri);
                }
                created
            })
        })
        .collect();

    let mut all = BTreeSet::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }
    for uri in &all {
        assert!(manager.resolve(uri).unwrap().is_file().unwrap());
    }

    let tree = manager.resolve("mem:///tree").unwrap();
    let files = tree.find_files(&strata_vfs::Selectors::SELECT_FILES, Default::default()).unwrap();
    assert_eq!(files.len(), all.len());
}
