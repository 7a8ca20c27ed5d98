//! Typed binding of document subtrees.
//!
//! A target type implements [`Bindable`]: a default search path plus a
//! [`BindingTable`] describing where each field comes from. [`Store::bind`]
//! finds the subtree, fills a fresh `T` from it and caches the result under
//! `(T, document, effective path)`. Later binds with the same key return the
//! cached handle without touching the document or its lock.
//! [`Store::bind_update`] re-runs the table over the cached instance.

mod processor;
pub mod table;
pub mod transform;

use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;

use cs_common::{Error, LockMode, Result};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::logging::event_names;
use crate::store::lock::ReadGuard;
use crate::store::Store;

use self::processor::{apply_table, BindContext};

pub use self::table::{BindingTable, FieldBinding, SourceKind};

/// A type that can be populated from a document subtree.
pub trait Bindable: Default + Clone + Send + Sync + 'static {
    /// Default search path, joined in front of the caller's path.
    const PATH: &'static str = "";

    fn bindings() -> BindingTable<Self>;
}

/// Shared handle to a bound instance.
///
/// Every bind of the same key hands out a clone of the same handle, so an
/// update bind is visible through all of them.
pub struct Bound<T>(Arc<RwLock<T>>);

impl<T> Bound<T> {
    fn new(value: T) -> Self {
        Bound(Arc::new(RwLock::new(value)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// A copy of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.read().clone()
    }

    /// Whether both handles point at the same cached instance.
    pub fn ptr_eq(&self, other: &Bound<T>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Bound<T> {
    fn clone(&self) -> Self {
        Bound(Arc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bound").field(&*self.0.read()).finish()
    }
}

/// Bind cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct BindKey {
    type_id: TypeId,
    document: String,
    path: String,
}

impl BindKey {
    fn new<T: 'static>(document: &str, path: &str) -> Self {
        BindKey {
            type_id: TypeId::of::<T>(),
            document: document.to_string(),
            path: path.to_string(),
        }
    }
}

/// Join a type's declared path with a caller path. Either may be empty.
pub fn effective_path(type_path: &str, caller_path: &str) -> String {
    let type_path = type_path.trim_matches('/');
    let caller_path = caller_path.trim_matches('/');
    match (type_path.is_empty(), caller_path.is_empty()) {
        (false, false) => format!("{}/{}", type_path, caller_path),
        (false, true) => type_path.to_string(),
        (true, _) => caller_path.to_string(),
    }
}

impl Store {
    /// Bind `T` to the subtree at `T::PATH` joined with `path`.
    ///
    /// A cached instance for the same key is returned as-is. Otherwise the
    /// document is read-locked for at most the configured bind timeout
    /// (five minutes by default), which surfaces as
    /// [`Error::LockTimeout`].
    pub fn bind<T: Bindable>(&self, document: &str, path: &str) -> Result<Bound<T>> {
        self.bind_with(document, path, false)
    }

    /// Re-run the binding table over the cached instance for this key.
    ///
    /// Fails with [`Error::UpdateWithoutExisting`] when nothing was bound yet,
    /// and with a write-mode [`Error::LockTimeout`] when a [`Bound::read`]
    /// guard outlives the bind timeout.
    pub fn bind_update<T: Bindable>(&self, document: &str, path: &str) -> Result<Bound<T>> {
        self.bind_with(document, path, true)
    }

    fn bind_with<T: Bindable>(&self, document: &str, path: &str, update: bool) -> Result<Bound<T>> {
        let path = effective_path(T::PATH, path);
        let key = BindKey::new::<T>(document, &path);

        if !update {
            if let Some(bound) = self.cached_bound::<T>(&key) {
                tracing::debug!(
                    event = event_names::BIND_CACHE_HIT,
                    document = %document,
                    path = %path,
                    bound_type = type_name::<T>(),
                    "bound instance reused"
                );
                return Ok(bound);
            }
        }

        let _guard = self.bind_guard.lock();
        let existing = self.cached_bound::<T>(&key);
        if !update {
            if let Some(bound) = existing {
                return Ok(bound);
            }
        }

        self.bind_locked(key, existing, update).map_err(|err| {
            tracing::warn!(
                event = event_names::BIND_FAILED,
                document = %document,
                path = %path,
                bound_type = type_name::<T>(),
                error = %err,
                "bind failed"
            );
            err
        })
    }

    /// The part of a bind that runs under the bind guard.
    fn bind_locked<T: Bindable>(
        &self,
        key: BindKey,
        existing: Option<Bound<T>>,
        update: bool,
    ) -> Result<Bound<T>> {
        let entry = self.entry(&key.document)?;
        let timeout = self.config.bind_timeout();
        if !entry.lock.try_read_for(timeout) {
            tracing::warn!(
                event = event_names::LOCK_TIMEOUT,
                document = %key.document,
                mode = %LockMode::Read,
                timeout_ms = self.config.bind_timeout_ms,
                "bind gave up waiting for the read lock"
            );
            return Err(Error::LockTimeout {
                name: key.document.clone(),
                mode: LockMode::Read,
                timeout_ms: self.config.bind_timeout_ms,
            });
        }
        let _read = ReadGuard::new(Arc::clone(&entry.lock), key.document.as_str());

        let document = entry.current();
        let node = document
            .find(&key.path)
            .ok_or_else(|| Error::PathNotFound {
                document: key.document.clone(),
                path: key.path.clone(),
            })?;

        let mut target = match (&existing, update) {
            (Some(bound), true) => bound.get(),
            (None, true) => {
                return Err(Error::UpdateWithoutExisting {
                    type_name: type_name::<T>(),
                    document: key.document.clone(),
                    path: key.path.clone(),
                })
            }
            (_, false) => T::default(),
        };

        let table = self.tables.get::<T>();
        {
            let transformers = self.transformers.read();
            let ctx = BindContext {
                document: &document,
                transformers: &transformers,
                tables: &self.tables,
            };
            apply_table(&*table, &mut target, node, &ctx)?;
        }

        let bound = match existing {
            Some(bound) => {
                // Readers of the shared handle may hold it for as long as
                // they like; give up after the bind timeout.
                let Some(mut slot) = bound.0.try_write_for(timeout) else {
                    tracing::warn!(
                        event = event_names::LOCK_TIMEOUT,
                        document = %key.document,
                        path = %key.path,
                        bound_type = type_name::<T>(),
                        timeout_ms = self.config.bind_timeout_ms,
                        "update gave up waiting for readers of the bound instance"
                    );
                    return Err(Error::LockTimeout {
                        name: key.document.clone(),
                        mode: LockMode::Write,
                        timeout_ms: self.config.bind_timeout_ms,
                    });
                };
                *slot = target;
                drop(slot);
                tracing::debug!(
                    event = event_names::BIND_UPDATED,
                    document = %key.document,
                    path = %key.path,
                    bound_type = type_name::<T>(),
                    "bound instance updated"
                );
                bound
            }
            None => {
                let bound = Bound::new(target);
                tracing::debug!(
                    event = event_names::BIND_COMPLETED,
                    document = %key.document,
                    path = %key.path,
                    bound_type = type_name::<T>(),
                    fields = table.len(),
                    "bound new instance"
                );
                self.bound.insert(key, Arc::new(bound.clone()));
                bound
            }
        };
        Ok(bound)
    }

    fn cached_bound<T: Bindable>(&self, key: &BindKey) -> Option<Bound<T>> {
        self.bound
            .get(key)
            .and_then(|entry| entry.value().downcast_ref::<Bound<T>>().cloned())
    }
}
