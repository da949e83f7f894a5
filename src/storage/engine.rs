//! Storage engine binding.
//!
//! Thin wrapper around a single `redb` environment. Every method is one
//! transaction: writes use an implicit write transaction committed before
//! returning, reads and scans run on a consistent snapshot. Higher layers
//! (registry, documents, credentials) never touch `redb` types directly
//! except through [`Engine::raw`], which the registry uses to combine the
//! two-step namespace delete into a single transaction.

use std::ops::Bound;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, TableError};
use tracing::{debug, info};

use crate::error::Result;

/// Table type used for every keyspace: UTF-8 keys, opaque byte values.
pub type Keyspace<'a> = TableDefinition<'a, &'static str, &'static [u8]>;

/// Builds the table definition for a named keyspace.
pub fn keyspace(name: &str) -> Keyspace<'_> {
    TableDefinition::new(name)
}

/// Owns the process-wide `redb` environment.
///
/// Initialized once at startup and shared behind an `Arc` by every request
/// handler; the engine itself provides single-writer/multiple-reader
/// discipline and snapshot isolation for scans.
pub struct Engine {
    db: Database,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish()
    }
}

impl Engine {
    /// Opens (or creates) the storage environment at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        info!(path = %path.display(), "Storage engine opened");
        Ok(Self { db })
    }

    /// Direct access to the environment for callers that need to compose
    /// multiple table operations into one transaction.
    pub(crate) fn raw(&self) -> &Database {
        &self.db
    }

    /// Unconditionally stores `value` under `key`.
    pub fn put(&self, table: &str, key: &str, value: &[u8]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut t = txn.open_table(keyspace(table))?;
            t.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Stores `value` under `key` only if the key is currently vacant.
    /// Returns `true` if the write happened.
    pub fn put_if_absent(&self, table: &str, key: &str, value: &[u8]) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let inserted = {
            let mut t = txn.open_table(keyspace(table))?;
            if t.get(key)?.is_some() {
                false
            } else {
                t.insert(key, value)?;
                true
            }
        };
        txn.commit()?;
        Ok(inserted)
    }

    /// Replaces the value under `key` only if the key currently holds one.
    /// Returns `true` if the write happened.
    pub fn put_if_present(&self, table: &str, key: &str, value: &[u8]) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let replaced = {
            let mut t = txn.open_table(keyspace(table))?;
            if t.get(key)?.is_some() {
                t.insert(key, value)?;
                true
            } else {
                false
            }
        };
        txn.commit()?;
        Ok(replaced)
    }

    /// Stores `value` under `key` regardless of prior state.
    /// Returns `true` if the key was vacant (a create rather than a replace).
    pub fn upsert(&self, table: &str, key: &str, value: &[u8]) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let created = {
            let mut t = txn.open_table(keyspace(table))?;
            // Bind before the block ends so the access guard drops ahead of
            // the table.
            let created = t.insert(key, value)?.is_none();
            created
        };
        txn.commit()?;
        Ok(created)
    }

    /// Reads the value under `key`. A missing table reads as a missing key.
    pub fn get(&self, table: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let t = match txn.open_table(keyspace(table)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(t.get(key)?.map(|guard| guard.value().to_vec()))
    }

    /// Removes `key`. Returns `true` if a value was present.
    pub fn remove(&self, table: &str, key: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut t = txn.open_table(keyspace(table))?;
            let removed = t.remove(key)?.is_some();
            removed
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Ordered range scan over `[lower, upper)` bounds, ascending by key,
    /// truncated at `limit` entries. A missing table scans as empty.
    pub fn scan(
        &self,
        table: &str,
        lower: Bound<&str>,
        upper: Bound<&str>,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let txn = self.db.begin_read()?;
        let t = match txn.open_table(keyspace(table)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for item in t.range::<&str>((lower, upper))? {
            // Truncate before decoding so a zero limit yields zero rows.
            if out.len() >= limit {
                break;
            }
            let (k, v) = item?;
            out.push((k.value().to_string(), v.value().to_vec()));
        }
        debug!(table, count = out.len(), "Range scan complete");
        Ok(out)
    }

    /// Drops the named keyspace and every key in it.
    /// Returns `true` if the keyspace existed.
    pub fn drop_table(&self, table: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let existed = txn.delete_table(keyspace(table))?;
        txn.commit()?;
        Ok(existed)
    }
}
