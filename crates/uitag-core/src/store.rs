//! Process-wide caches for assembled model configuration and permissions.
//!
//! Locks guard the maps only; they are released before any fetch. Two
//! concurrent misses for the same model therefore both fetch, and the later
//! write replaces the earlier one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use log::{error, info};

use crate::error::UiResult;
use crate::permissions::{self, PermissionSet};
use crate::resolver::assemble;
use crate::types::{ActionMap, ButtonId, ParsedUIConfig, RawTagField};

/// Where raw tag rows come from.
pub trait TagSource {
    fn fetch_tags(&self, model: &str) -> UiResult<Vec<RawTagField>>;
}

/// Where the user's permission identifiers come from.
pub trait PermissionSource {
    fn fetch_permissions(&self) -> UiResult<PermissionSet>;
}

impl<T: TagSource + ?Sized> TagSource for &T {
    fn fetch_tags(&self, model: &str) -> UiResult<Vec<RawTagField>> {
        (**self).fetch_tags(model)
    }
}

impl<T: PermissionSource + ?Sized> PermissionSource for &T {
    fn fetch_permissions(&self) -> UiResult<PermissionSet> {
        (**self).fetch_permissions()
    }
}

// ---------------------------------------------------------------------------
// Model configuration
// ---------------------------------------------------------------------------

/// Per-model cache of assembled configuration. Entries live until
/// invalidated; the same `Arc` is handed out on every hit.
pub struct ConfigStore<S> {
    source: S,
    cache: Mutex<HashMap<String, Arc<ParsedUIConfig>>>,
}

impl<S: TagSource> ConfigStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<ParsedUIConfig>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached configuration for `model`, fetching and assembling on a miss
    /// or when `force_refresh` is set. A failed fetch leaves the cache as it was.
    pub fn get_config(&self, model: &str, force_refresh: bool) -> UiResult<Arc<ParsedUIConfig>> {
        if !force_refresh {
            if let Some(hit) = self.cached(model) {
                return Ok(hit);
            }
        }

        let rows = self.source.fetch_tags(model)?;
        let config = Arc::new(assemble(model, &rows));
        self.entries().insert(model.to_string(), Arc::clone(&config));
        info!("cached configuration for {model}");
        Ok(config)
    }

    /// Synchronous peek; never fetches.
    pub fn cached(&self, model: &str) -> Option<Arc<ParsedUIConfig>> {
        self.entries().get(model).cloned()
    }

    /// Drop one model, or every model with `None`.
    pub fn invalidate(&self, model: Option<&str>) {
        let mut entries = self.entries();
        match model {
            Some(m) => {
                entries.remove(m);
                info!("invalidated configuration for {m}");
            }
            None => {
                entries.clear();
                info!("invalidated all cached configuration");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// Single cached permission set for the current user.
pub struct PermissionStore<P> {
    source: P,
    current: RwLock<Option<Arc<PermissionSet>>>,
}

impl<P: PermissionSource> PermissionStore<P> {
    pub fn new(source: P) -> Self {
        Self {
            source,
            current: RwLock::new(None),
        }
    }

    /// Cached set, fetched on first use or when `force_refresh` is set. A
    /// failed fetch is logged and yields an empty set that is not cached.
    pub fn permissions(&self, force_refresh: bool) -> Arc<PermissionSet> {
        if !force_refresh {
            let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(set) = current.as_ref() {
                return Arc::clone(set);
            }
        }

        match self.source.fetch_permissions() {
            Ok(set) => {
                let set = Arc::new(set);
                *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&set));
                info!("cached {} permissions", set.len());
                set
            }
            Err(e) => {
                error!("permission fetch failed: {e}");
                Arc::new(PermissionSet::default())
            }
        }
    }

    /// Forget the cached set, e.g. on logout.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_authorized(
        &self,
        button: &ButtonId,
        model: &str,
        action_permission: Option<&ActionMap>,
    ) -> bool {
        permissions::is_authorized(&self.permissions(false), button, model, action_permission)
    }
}
