//! Namespace registry.
//!
//! Tracks which logical databases exist. Each namespace has a record in the
//! `__meta__` keyspace; the record is authoritative. Deleting a namespace
//! purges its documents and removes the record in one engine transaction, so
//! a recovered process can never observe documents without their metadata or
//! vice versa.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::engine::keyspace;
use super::{Store, META_TABLE, RESERVED_NAMES};
use crate::error::{Error, Result};

/// Maximum namespace name length in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Registry record for one namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceMeta {
    /// Namespace name, unique and case-sensitive.
    pub name: String,
    /// When the namespace was created.
    pub created_at: DateTime<Utc>,
}

/// Validates a namespace name.
///
/// Names are 1-64 characters from `[A-Za-z0-9_-]`, and the reserved internal
/// keyspace names are rejected outright so no caller can reach the metadata
/// or credential keyspaces through the public namespace API.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidName(format!(
            "name cannot be longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidName(
            "name can only contain letters, numbers, '_' and '-'".to_string(),
        ));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(Error::InvalidName(format!("'{}' is a reserved name", name)));
    }
    Ok(())
}

impl Store {
    /// Loads every registry record into the in-memory cache. Called once at
    /// open, before the first request is served.
    pub(crate) fn load_registry(&self) -> Result<()> {
        let rows = self.engine().scan(
            META_TABLE,
            std::ops::Bound::Unbounded,
            std::ops::Bound::Unbounded,
            usize::MAX,
        )?;
        for (name, raw) in rows {
            let meta: NamespaceMeta = serde_json::from_slice(&raw)?;
            self.cache().insert(name, meta);
        }
        info!(namespaces = self.cache().len(), "Namespace registry loaded");
        Ok(())
    }

    /// Creates a namespace. Fails with `InvalidName` on a malformed or
    /// reserved name and `AlreadyExists` if the registry already has it.
    #[instrument(skip(self))]
    pub fn create_namespace(&self, name: &str) -> Result<NamespaceMeta> {
        validate_name(name)?;

        let meta = NamespaceMeta {
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let encoded = serde_json::to_vec(&meta)?;

        let txn = self.engine().raw().begin_write()?;
        let inserted = {
            let mut table = txn.open_table(keyspace(META_TABLE))?;
            if table.get(name)?.is_some() {
                false
            } else {
                table.insert(name, encoded.as_slice())?;
                true
            }
        };
        if !inserted {
            txn.abort()?;
            return Err(Error::AlreadyExists(format!("db '{}'", name)));
        }
        // Drop any keyspace left behind by a write that raced an earlier
        // delete, then allocate a fresh one alongside the registry record.
        txn.delete_table(keyspace(name))?;
        txn.open_table(keyspace(name))?;
        txn.commit()?;

        self.cache().insert(name.to_string(), meta.clone());
        info!(db = %name, "Namespace created");
        Ok(meta)
    }

    /// Deletes a namespace and every document stored under it.
    ///
    /// Document purge and metadata removal commit as one transaction;
    /// metadata removal never precedes the purge.
    #[instrument(skip(self))]
    pub fn delete_namespace(&self, name: &str) -> Result<()> {
        if RESERVED_NAMES.contains(&name) {
            return Err(Error::InvalidName(format!("'{}' is a reserved name", name)));
        }

        let txn = self.engine().raw().begin_write()?;
        // Purge the documents first, then drop the registry record.
        txn.delete_table(keyspace(name))?;
        let existed = {
            let mut table = txn.open_table(keyspace(META_TABLE))?;
            // Bind before the block ends so the access guard drops ahead of
            // the table.
            let existed = table.remove(name)?.is_some();
            existed
        };
        if !existed {
            txn.abort()?;
            return Err(Error::NotFound(format!("db '{}'", name)));
        }
        txn.commit()?;

        self.cache().remove(name);
        info!(db = %name, "Namespace deleted");
        Ok(())
    }

    /// Returns all namespace names in ascending lexicographic order,
    /// excluding reserved keyspaces.
    pub fn list_namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cache()
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Whether the namespace exists. Reserved names never exist publicly.
    pub fn namespace_exists(&self, name: &str) -> bool {
        self.cache().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> Store {
        Store::open(&dir.path().join("test.redb")).unwrap()
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("users").is_ok());
        assert!(validate_name("my-app_2024").is_ok());
        assert!(validate_name("A").is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name("no spaces").is_err());
        assert!(validate_name("dots.bad").is_err());
        assert!(validate_name(&"a".repeat(65)).is_err());
        assert!(validate_name("__meta__").is_err());
        assert!(validate_name("__auth__").is_err());
    }

    #[test]
    fn test_create_and_exists() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        assert!(!store.namespace_exists("orders"));
        store.create_namespace("orders").unwrap();
        assert!(store.namespace_exists("orders"));

        match store.create_namespace("orders") {
            Err(Error::AlreadyExists(_)) => {}
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
    }

    #[test]
    fn test_list_is_sorted_regardless_of_creation_order() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        for name in ["zebra", "apple", "mango"] {
            store.create_namespace(name).unwrap();
        }
        assert_eq!(store.list_namespaces(), vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_empty_registry_lists_empty() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.list_namespaces().is_empty());
    }

    #[test]
    fn test_delete_missing_namespace() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        match store.delete_namespace("ghost") {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_cascades_to_documents() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.create_namespace("cache").unwrap();
        for key in ["a", "b", "c"] {
            store.engine().put("cache", key, b"{}").unwrap();
        }

        store.delete_namespace("cache").unwrap();
        assert!(!store.list_namespaces().contains(&"cache".to_string()));

        // Recreating the namespace starts from an empty keyspace.
        store.create_namespace("cache").unwrap();
        assert_eq!(store.engine().get("cache", "a").unwrap(), None);
    }

    #[test]
    fn test_recreate_purges_writes_raced_with_delete() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.create_namespace("cache").unwrap();
        store.delete_namespace("cache").unwrap();
        // A writer that lost the race with the delete recreates the keyspace
        // at the engine level, below the registry's awareness.
        store.engine().put("cache", "ghost", b"1").unwrap();

        // Recreating the namespace must not resurrect the orphaned write.
        store.create_namespace("cache").unwrap();
        assert_eq!(store.engine().get("cache", "ghost").unwrap(), None);
    }

    #[test]
    fn test_reserved_names_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        match store.create_namespace("__meta__") {
            Err(Error::InvalidName(_)) => {}
            other => panic!("expected InvalidName, got {:?}", other),
        }
        match store.delete_namespace("__auth__") {
            Err(Error::InvalidName(_)) => {}
            other => panic!("expected InvalidName, got {:?}", other),
        }
        assert!(!store.list_namespaces().iter().any(|n| n.starts_with("__")));
    }

    #[test]
    fn test_registry_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.redb");
        {
            let store = Store::open(&path).unwrap();
            store.create_namespace("persist").unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert!(store.namespace_exists("persist"));
        assert_eq!(store.list_namespaces(), vec!["persist"]);
    }
}
