//! Storage layer.
//!
//! One physical `redb` environment holds every keyspace:
//!
//! ```text
//! __meta__            namespace registry (name -> NamespaceMeta)
//! __auth__            credential records (id -> CredentialRecord)
//! <namespace>         one keyspace per user namespace (key -> JSON value)
//! ```
//!
//! The [`Store`] owns the engine handle plus a concurrent cache of the
//! registry, and is passed by `Arc` to every route handler. Operations are
//! grouped by concern: [`registry`] for namespace lifecycle, [`documents`]
//! for CRUD and ranged listing, [`credentials`] for API keys, and [`query`]
//! for translating logical scan options into engine ranges.

pub mod credentials;
pub mod documents;
pub mod engine;
pub mod query;
pub mod registry;

use std::path::Path;

use dashmap::DashMap;

use crate::error::Result;
use engine::Engine;
pub use credentials::{CredentialInfo, CredentialRecord, GeneratedKey};
pub use documents::WritePolicy;
pub use query::{ScanOptions, DEFAULT_LIMIT, MAX_LIMIT};
pub use registry::{validate_name, NamespaceMeta};

/// Registry metadata keyspace.
pub(crate) const META_TABLE: &str = "__meta__";
/// Credential keyspace.
pub(crate) const AUTH_TABLE: &str = "__auth__";
/// Names no caller may create, list, or delete through the public API.
pub(crate) const RESERVED_NAMES: &[&str] = &[META_TABLE, AUTH_TABLE];

/// The namespaced document store.
///
/// Owns the storage engine and a concurrent name -> metadata map mirroring
/// the `__meta__` keyspace. The map is loaded once at open and maintained on
/// every create/delete; the on-disk metadata stays authoritative.
pub struct Store {
    engine: Engine,
    namespaces: DashMap<String, NamespaceMeta>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("namespaces", &self.namespaces.len())
            .finish()
    }
}

impl Store {
    /// Opens the store rooted at `path` and loads the namespace registry.
    pub fn open(path: &Path) -> Result<Self> {
        let engine = Engine::open(path)?;
        let store = Self {
            engine,
            namespaces: DashMap::new(),
        };
        store.load_registry()?;
        Ok(store)
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn cache(&self) -> &DashMap<String, NamespaceMeta> {
        &self.namespaces
    }
}
