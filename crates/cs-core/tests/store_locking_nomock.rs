//! Store load-once and lock arbitration with real threads.
//!
//! Covers:
//! - Concurrent loads run the parser once and share one document
//! - Version mismatch after a successful load keeps the document cached
//! - Readers share, writers exclude, timeouts return no lock
//! - Release semantics for unheld locks and unknown names

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use cs_core::{Document, Error, Header, LoadRequest, NodeTree, Result, Store, Version};

struct CountingParser {
    calls: AtomicUsize,
    version: Version,
    delay: Duration,
}

impl CountingParser {
    fn new(version: Version) -> Self {
        CountingParser {
            calls: AtomicUsize::new(0),
            version,
            delay: Duration::ZERO,
        }
    }

    fn slow(version: Version, delay: Duration) -> Self {
        CountingParser {
            delay,
            ..CountingParser::new(version)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl cs_core::DocumentParser for CountingParser {
    fn parse(&self, request: &LoadRequest) -> Result<Document> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        let mut tree = NodeTree::new("root")?;
        let root = tree.root();
        let params = tree.add_key_values(root, "parameters")?;
        tree.add_value(params, "x", "1")?;
        tree.add_value(params, "y", "2")?;
        Ok(Document::new(
            Header::new(request.name.clone(), self.version),
            request.settings.clone(),
            tree,
        ))
    }
}

fn loaded_store() -> Store {
    let store = Store::default();
    let request = store.request("cfg", "mem://cfg", Version::new(1, 0));
    store
        .load(&request, &CountingParser::new(Version::new(1, 0)))
        .unwrap();
    store
}

#[test]
fn test_concurrent_load_parses_once() {
    const THREADS: usize = 8;
    let store = Arc::new(Store::default());
    let parser = Arc::new(CountingParser::slow(
        Version::new(1, 0),
        Duration::from_millis(30),
    ));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let parser = Arc::clone(&parser);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let request = store.request("cfg", "mem://cfg", Version::new(1, 0));
                barrier.wait();
                store.load(&request, parser.as_ref()).unwrap()
            })
        })
        .collect();

    let documents: Vec<Arc<Document>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(parser.calls(), 1);
    assert!(documents.iter().all(|d| Arc::ptr_eq(d, &documents[0])));
    assert_eq!(
        documents[0].find("parameters/x").and_then(|n| n.value()),
        Some("1")
    );
    assert!(documents[0].find("parameters/z").is_none());
}

#[test]
fn test_version_mismatch_keeps_document_cached() {
    let store = Store::default();
    let parser = CountingParser::new(Version::new(1, 0));

    let v1 = store.request("cfg", "mem://cfg", Version::new(1, 0));
    store.load(&v1, &parser).unwrap();

    let v2 = store.request("cfg", "mem://cfg", Version::new(2, 0));
    match store.load(&v2, &parser).unwrap_err() {
        Error::VersionMismatch {
            name,
            expected,
            actual,
        } => {
            assert_eq!(name, "cfg");
            assert_eq!(expected, Version::new(2, 0));
            assert_eq!(actual, Version::new(1, 0));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(store.is_loaded("cfg"));
    assert!(store.load(&v1, &parser).is_ok());
    assert_eq!(parser.calls(), 1);
}

#[test]
fn test_first_load_with_wrong_version_still_caches() {
    let store = Store::default();
    let parser = CountingParser::new(Version::new(3, 1));
    let request = store.request("cfg", "mem://cfg", Version::new(3, 0));
    assert!(matches!(
        store.load(&request, &parser),
        Err(Error::VersionMismatch { .. })
    ));
    assert!(store.is_loaded("cfg"));
    assert_eq!(store.document("cfg").unwrap().version(), Version::new(3, 1));
}

#[test]
fn test_readers_share_and_writer_waits() {
    let store = Arc::new(loaded_store());
    let long = Duration::from_secs(5);

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.acquire_read("cfg", long).unwrap())
        })
        .collect();
    for reader in readers {
        assert!(reader.join().unwrap().is_some());
    }
    assert_eq!(store.lock_state("cfg").unwrap().readers, 2);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.acquire_write("cfg", long).unwrap())
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!store.lock_state("cfg").unwrap().writer);

    assert!(store.release_read("cfg").unwrap());
    assert!(store.release_read("cfg").unwrap());

    let ticket = writer.join().unwrap().expect("writer gets the lock");
    assert_eq!(ticket.mode, cs_core::LockMode::Write);
    assert!(store.lock_state("cfg").unwrap().writer);
    assert!(store.release_write("cfg").unwrap());
}

#[test]
fn test_writer_times_out_with_no_lock() {
    let store = loaded_store();
    assert!(store
        .acquire_read("cfg", Duration::from_millis(10))
        .unwrap()
        .is_some());

    let outcome = store
        .acquire_write("cfg", Duration::from_millis(50))
        .unwrap();
    assert!(outcome.is_none());
    assert_eq!(store.lock_state("cfg").unwrap().readers, 1);
    assert!(!store.lock_state("cfg").unwrap().writer);
}

#[test]
fn test_release_unheld_and_unknown() {
    let store = loaded_store();
    assert!(!store.release_read("cfg").unwrap());
    assert!(!store.release_write("cfg").unwrap());
    assert!(matches!(
        store.release_read("missing"),
        Err(Error::NotLoaded { .. })
    ));
    assert!(matches!(
        store.acquire_write("missing", Duration::from_millis(1)),
        Err(Error::NotLoaded { .. })
    ));
}

#[test]
fn test_release_from_another_thread() {
    let store = Arc::new(loaded_store());
    assert!(store
        .acquire_write("cfg", Duration::from_millis(10))
        .unwrap()
        .is_some());

    let other = Arc::clone(&store);
    let released = thread::spawn(move || other.release_write("cfg").unwrap())
        .join()
        .unwrap();
    assert!(released);
    assert!(store.lock_state("cfg").unwrap().is_free());
}
