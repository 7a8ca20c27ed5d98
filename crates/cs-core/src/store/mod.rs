//! The document store.
//!
//! Each document name moves through `Unloaded → Loading → Loaded` exactly
//! once per process. The first caller to miss the cache takes the load guard,
//! re-checks, and runs the parser; every concurrent caller for the same name
//! blocks on the guard and then finds the document already cached.
//!
//! Every cached document owns a [`DocumentLock`](lock::DocumentLock),
//! created together with the cache entry and never removed.

pub mod lock;
pub mod parser;

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cs_common::{Error, LockMode, Result, Version};
use cs_tree::{Document, DocumentSnapshot};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::bind::table::TableCache;
use crate::bind::transform::{Transformer, TransformerRegistry};
use crate::bind::BindKey;
use crate::config::StoreConfig;
use crate::logging::event_names;

use self::lock::{DocumentLock, LockState, LockTicket, ReadGuard, WriteGuard};
use self::parser::{DocumentParser, LoadRequest};

/// One cached document and its lock.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    document: RwLock<Arc<Document>>,
    pub(crate) lock: Arc<DocumentLock>,
}

impl CacheEntry {
    fn new(document: Document) -> Self {
        CacheEntry {
            document: RwLock::new(Arc::new(document)),
            lock: Arc::new(DocumentLock::new()),
        }
    }

    /// The document as of now. Later `modify` calls swap in a new `Arc`.
    pub(crate) fn current(&self) -> Arc<Document> {
        Arc::clone(&self.document.read())
    }
}

/// One cached document as seen by [`Store::status`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus {
    pub name: String,
    pub version: Version,
    pub nodes: usize,
    pub lock: LockState,
    /// Short snapshot id of the current content.
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub documents: Vec<DocumentStatus>,
    pub bound_instances: usize,
    pub binding_tables: usize,
}

/// Process-wide document cache, lock table and bind cache.
///
/// Share it behind an `Arc` (or a `static`); every method takes `&self`.
pub struct Store {
    pub(crate) config: StoreConfig,
    documents: DashMap<String, Arc<CacheEntry>>,
    load_guard: Mutex<()>,
    pub(crate) bound: DashMap<BindKey, Arc<dyn Any + Send + Sync>>,
    pub(crate) bind_guard: Mutex<()>,
    pub(crate) tables: TableCache,
    pub(crate) transformers: RwLock<TransformerRegistry>,
}

impl Default for Store {
    fn default() -> Self {
        Store::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .field("documents", &self.loaded_names())
            .field("bound", &self.bound.len())
            .finish()
    }
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        Store {
            config,
            documents: DashMap::new(),
            load_guard: Mutex::new(()),
            bound: DashMap::new(),
            bind_guard: Mutex::new(()),
            tables: TableCache::default(),
            transformers: RwLock::new(TransformerRegistry::default()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A load request carrying this store's section settings.
    pub fn request(
        &self,
        name: impl Into<String>,
        locator: impl Into<String>,
        version: Version,
    ) -> LoadRequest {
        LoadRequest::new(name, locator, version).with_settings(self.config.settings.clone())
    }

    /// Load a document once and check its version.
    ///
    /// The parser runs at most once per name across all threads. The
    /// version check runs on every call, after the document is cached: a
    /// document whose header version differs from `request.version` stays
    /// cached under its name and this call fails with
    /// [`Error::VersionMismatch`].
    pub fn load<P>(&self, request: &LoadRequest, parser: &P) -> Result<Arc<Document>>
    where
        P: DocumentParser + ?Sized,
    {
        let entry = match self.lookup(&request.name) {
            Some(entry) => {
                tracing::trace!(
                    event = event_names::STORE_CACHE_HIT,
                    document = %request.name,
                    "document already cached"
                );
                entry
            }
            None => self.load_guarded(request, parser)?,
        };

        let document = entry.current();
        if document.version() != request.version {
            tracing::warn!(
                event = event_names::STORE_VERSION_MISMATCH,
                document = %request.name,
                expected = %request.version,
                actual = %document.version(),
                "cached document has a different version"
            );
            return Err(Error::VersionMismatch {
                name: request.name.clone(),
                expected: request.version,
                actual: document.version(),
            });
        }
        Ok(document)
    }

    fn load_guarded<P>(&self, request: &LoadRequest, parser: &P) -> Result<Arc<CacheEntry>>
    where
        P: DocumentParser + ?Sized,
    {
        let _guard = self.load_guard.lock();
        if let Some(entry) = self.lookup(&request.name) {
            return Ok(entry);
        }

        let started = Instant::now();
        let document = parser.parse(request).map_err(|err| {
            tracing::warn!(
                event = event_names::STORE_LOAD_FAILED,
                document = %request.name,
                locator = %request.locator,
                error = %err,
                "parser failed"
            );
            err
        })?;

        if document.name() != request.name {
            return Err(Error::Load {
                name: request.name.clone(),
                reason: format!("parser returned a document named `{}`", document.name()),
            });
        }

        let node_count = document.node_count();
        let version = document.version();
        let entry = Arc::new(CacheEntry::new(document));
        self.documents
            .insert(request.name.clone(), Arc::clone(&entry));

        tracing::info!(
            event = event_names::STORE_LOADED,
            document = %request.name,
            locator = %request.locator,
            format = %request.format,
            version = %version,
            nodes = node_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "document loaded"
        );
        Ok(entry)
    }

    fn lookup(&self, name: &str) -> Option<Arc<CacheEntry>> {
        self.documents.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn entry(&self, name: &str) -> Result<Arc<CacheEntry>> {
        self.lookup(name).ok_or_else(|| Error::NotLoaded {
            name: name.to_string(),
        })
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// The cached document, without a version check or a lock.
    pub fn document(&self, name: &str) -> Result<Arc<Document>> {
        Ok(self.entry(name)?.current())
    }

    /// Names of every cached document, sorted.
    pub fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.documents.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Wait up to `timeout` for a read lock.
    ///
    /// `Ok(None)` means the wait timed out; a name that was never loaded is
    /// [`Error::NotLoaded`] before any wait.
    pub fn acquire_read(&self, name: &str, timeout: Duration) -> Result<Option<LockTicket>> {
        self.acquire(name, LockMode::Read, timeout)
    }

    /// Wait up to `timeout` for the write lock. See [`Store::acquire_read`].
    pub fn acquire_write(&self, name: &str, timeout: Duration) -> Result<Option<LockTicket>> {
        self.acquire(name, LockMode::Write, timeout)
    }

    pub fn acquire(
        &self,
        name: &str,
        mode: LockMode,
        timeout: Duration,
    ) -> Result<Option<LockTicket>> {
        let entry = self.entry(name)?;
        let started = Instant::now();
        if !entry.lock.try_acquire_for(mode, timeout) {
            tracing::warn!(
                event = event_names::LOCK_TIMEOUT,
                document = %name,
                mode = %mode,
                timeout_ms = timeout.as_millis() as u64,
                "lock wait timed out"
            );
            return Ok(None);
        }
        let waited = started.elapsed();
        tracing::debug!(
            event = event_names::LOCK_ACQUIRED,
            document = %name,
            mode = %mode,
            waited_ms = waited.as_millis() as u64,
            "lock acquired"
        );
        Ok(Some(LockTicket {
            document: name.to_string(),
            mode,
            waited,
        }))
    }

    /// Drop one read lock. `Ok(false)` when no reader holds it.
    ///
    /// The caller does not have to be the one that acquired.
    pub fn release_read(&self, name: &str) -> Result<bool> {
        self.release(name, LockMode::Read)
    }

    /// Drop the write lock. `Ok(false)` when no writer holds it.
    pub fn release_write(&self, name: &str) -> Result<bool> {
        self.release(name, LockMode::Write)
    }

    pub fn release(&self, name: &str, mode: LockMode) -> Result<bool> {
        let entry = self.entry(name)?;
        let released = entry.lock.release(mode);
        if released {
            tracing::debug!(
                event = event_names::LOCK_RELEASED,
                document = %name,
                mode = %mode,
                "lock released"
            );
        } else {
            tracing::debug!(
                event = event_names::LOCK_RELEASE_IGNORED,
                document = %name,
                mode = %mode,
                "release on a lock not held in that mode"
            );
        }
        Ok(released)
    }

    /// Read lock released on drop. `None` for `timeout` uses the configured
    /// default; `Ok(None)` means the wait timed out.
    pub fn read_guard(&self, name: &str, timeout: Option<Duration>) -> Result<Option<ReadGuard>> {
        let entry = self.entry(name)?;
        let timeout = timeout.unwrap_or_else(|| self.config.default_lock_timeout());
        Ok(self
            .acquire(name, LockMode::Read, timeout)?
            .map(|_| ReadGuard::new(Arc::clone(&entry.lock), name)))
    }

    /// Write lock released on drop. See [`Store::read_guard`].
    pub fn write_guard(&self, name: &str, timeout: Option<Duration>) -> Result<Option<WriteGuard>> {
        let entry = self.entry(name)?;
        let timeout = timeout.unwrap_or_else(|| self.config.default_lock_timeout());
        Ok(self
            .acquire(name, LockMode::Write, timeout)?
            .map(|_| WriteGuard::new(Arc::clone(&entry.lock), name)))
    }

    pub fn lock_state(&self, name: &str) -> Result<LockState> {
        Ok(self.entry(name)?.lock.state())
    }

    /// Edit a cached document while holding its write lock.
    ///
    /// `edit` runs on a copy; the copy replaces the cached document only if
    /// `edit` succeeds, and is stamped as modified by `user`. Readers holding
    /// an earlier `Arc<Document>` keep their view. Bound instances are not
    /// refreshed; use [`Store::bind_update`] for that.
    pub fn modify<F>(&self, name: &str, user: &str, edit: F) -> Result<Arc<Document>>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        let entry = self.entry(name)?;
        if !entry.lock.is_write_locked() {
            return Err(Error::WriteLockNotHeld {
                name: name.to_string(),
            });
        }

        let mut copy = Document::clone(&entry.current());
        edit(&mut copy)?;
        copy.touch(user);

        let updated = Arc::new(copy);
        *entry.document.write() = Arc::clone(&updated);
        tracing::info!(
            event = event_names::STORE_MODIFIED,
            document = %name,
            user = %user,
            nodes = updated.node_count(),
            "document modified"
        );
        Ok(updated)
    }

    /// Fingerprint of the cached document.
    pub fn snapshot(&self, name: &str) -> Result<DocumentSnapshot> {
        let document = self.document(name)?;
        Ok(DocumentSnapshot::capture(&document))
    }

    /// Add or replace a transformer used by later binds.
    pub fn register_transformer(
        &self,
        id: impl Into<String>,
        transformer: Arc<dyn Transformer>,
    ) -> Option<Arc<dyn Transformer>> {
        self.transformers.write().register(id, transformer)
    }

    /// Number of cached bound instances.
    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    /// Diagnostic summary of every cached document, sorted by name.
    pub fn status(&self) -> StoreStatus {
        let documents = self
            .loaded_names()
            .into_iter()
            .filter_map(|name| {
                let entry = self.lookup(&name)?;
                let document = entry.current();
                let snapshot = DocumentSnapshot::capture(&document);
                Some(DocumentStatus {
                    version: document.version(),
                    nodes: document.node_count(),
                    lock: entry.lock.state(),
                    fingerprint: snapshot.short_id().to_string(),
                    name,
                })
            })
            .collect();
        StoreStatus {
            documents,
            bound_instances: self.bound.len(),
            binding_tables: self.tables.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_tree::{Header, NodeTree};

    fn parser(version: Version) -> impl Fn(&LoadRequest) -> Result<Document> {
        move |request: &LoadRequest| {
            let mut tree = NodeTree::new("root")?;
            let root = tree.root();
            let params = tree.add_key_values(root, "parameters")?;
            tree.add_value(params, "x", "1")?;
            Ok(Document::new(
                Header::new(request.name.clone(), version),
                request.settings.clone(),
                tree,
            ))
        }
    }

    #[test]
    fn test_load_then_cache_hit() {
        let store = Store::default();
        let request = store.request("cfg", "mem://cfg", Version::new(1, 0));
        let first = store.load(&request, &parser(Version::new(1, 0))).unwrap();
        let second = store
            .load(&request, &|_: &LoadRequest| -> Result<Document> {
                Err(Error::Load {
                    name: "cfg".to_string(),
                    reason: "must not run".to_string(),
                })
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(store.is_loaded("cfg"));
        assert_eq!(store.loaded_names(), vec!["cfg".to_string()]);
    }

    #[test]
    fn test_parser_error_leaves_nothing_cached() {
        let store = Store::default();
        let request = store.request("cfg", "mem://cfg", Version::new(1, 0));
        let failing = |_: &LoadRequest| -> Result<Document> {
            Err(Error::Load {
                name: "cfg".to_string(),
                reason: "unreadable".to_string(),
            })
        };
        assert!(matches!(store.load(&request, &failing), Err(Error::Load { .. })));
        assert!(!store.is_loaded("cfg"));
    }

    #[test]
    fn test_header_name_must_match_request() {
        let store = Store::default();
        let request = store.request("cfg", "mem://cfg", Version::new(1, 0));
        let renaming = |request: &LoadRequest| -> Result<Document> {
            Ok(Document::new(
                Header::new("other", request.version),
                request.settings.clone(),
                NodeTree::new("root")?,
            ))
        };
        let err = store.load(&request, &renaming).unwrap_err();
        assert!(err.to_string().contains("other"));
        assert!(!store.is_loaded("cfg"));
        assert!(!store.is_loaded("other"));
    }

    #[test]
    fn test_unknown_name_is_not_loaded() {
        let store = Store::default();
        assert!(matches!(
            store.acquire_read("nope", Duration::from_millis(1)),
            Err(Error::NotLoaded { .. })
        ));
        assert!(matches!(store.release_write("nope"), Err(Error::NotLoaded { .. })));
        assert!(matches!(store.lock_state("nope"), Err(Error::NotLoaded { .. })));
        assert!(matches!(store.document("nope"), Err(Error::NotLoaded { .. })));
    }

    #[test]
    fn test_guards_track_lock_state() {
        let store = Store::default();
        let request = store.request("cfg", "mem://cfg", Version::new(1, 0));
        store.load(&request, &parser(Version::new(1, 0))).unwrap();

        {
            let _a = store.read_guard("cfg", None).unwrap().unwrap();
            let _b = store.read_guard("cfg", None).unwrap().unwrap();
            assert_eq!(store.lock_state("cfg").unwrap().readers, 2);
            assert!(store
                .write_guard("cfg", Some(Duration::from_millis(20)))
                .unwrap()
                .is_none());
        }
        assert!(store.lock_state("cfg").unwrap().is_free());
    }

    #[test]
    fn test_modify_swaps_document() {
        let store = Store::default();
        let request = store.request("cfg", "mem://cfg", Version::new(1, 0));
        let before = store.load(&request, &parser(Version::new(1, 0))).unwrap();

        let edit = |doc: &mut Document| -> Result<()> {
            let x = doc
                .find("parameters/x")
                .map(|n| n.id())
                .ok_or_else(|| Error::InvalidTree("x missing".to_string()))?;
            doc.tree_mut().set_value(x, "2")?;
            Ok(())
        };
        assert!(matches!(
            store.modify("cfg", "ops", edit),
            Err(Error::WriteLockNotHeld { .. })
        ));

        let guard = store.write_guard("cfg", None).unwrap().unwrap();
        let after = store.modify("cfg", "ops", edit).unwrap();
        drop(guard);

        assert_eq!(before.parameter("", "x"), Some("1"));
        assert_eq!(after.parameter("", "x"), Some("2"));
        assert_eq!(store.document("cfg").unwrap().parameter("", "x"), Some("2"));
        assert_eq!(
            after.header().modified_by.as_ref().map(|s| s.user.as_str()),
            Some("ops")
        );
        assert!(!store.snapshot("cfg").unwrap().matches(&DocumentSnapshot::capture(&before)));
    }

    #[test]
    fn test_status_reports_documents() {
        let store = Store::default();
        for name in ["b", "a"] {
            let request = store.request(name, "mem://", Version::new(1, 0));
            store.load(&request, &parser(Version::new(1, 0))).unwrap();
        }
        let _reader = store.read_guard("a", None).unwrap().unwrap();

        let status = store.status();
        let names: Vec<&str> = status.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(status.documents[0].lock.readers, 1);
        assert_eq!(status.documents[0].nodes, 3);
        assert_eq!(status.documents[0].fingerprint.len(), 12);
        assert_eq!(status.bound_instances, 0);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["documents"][1]["name"], "b");
        assert_eq!(json["documents"][1]["version"], "1.0");
        assert_eq!(json["documents"][1]["lock"]["writer"], false);
    }
}
