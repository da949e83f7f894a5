//! Document store.
//!
//! CRUD and ranged listing over a named namespace. Keys are unique within
//! their namespace: `create` fails on an existing key, `update` and `delete`
//! fail on a missing one. Values are arbitrary JSON, stored verbatim and
//! returned deep-equal after the round-trip.
//!
//! Every operation requires the namespace to exist; the one exception is
//! [`Store::upsert_doc`] called with [`WritePolicy::auto_create_namespace`],
//! the explicit opt-in used by the admin surface.

use serde_json::Value;
use tracing::{debug, instrument};

use super::query::ScanOptions;
use super::Store;
use crate::error::{Error, Result};

/// Maximum document key length in bytes.
pub const MAX_KEY_LEN: usize = 1024;

/// Behavior of the write path when the target namespace does not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct WritePolicy {
    /// Create the namespace on first write instead of failing `NotFound`.
    pub auto_create_namespace: bool,
}

/// Validates a document key: 1-1024 bytes, no NUL byte.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(Error::InvalidKey(format!(
            "key cannot be longer than {} bytes",
            MAX_KEY_LEN
        )));
    }
    if key.bytes().any(|b| b == 0) {
        return Err(Error::InvalidKey("key cannot contain NUL bytes".to_string()));
    }
    Ok(())
}

impl Store {
    fn require_namespace(&self, ns: &str) -> Result<()> {
        if self.namespace_exists(ns) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("db '{}'", ns)))
        }
    }

    /// Stores a new document. Fails with `DuplicateKey` if the key already
    /// holds a value in the namespace.
    #[instrument(skip(self, value))]
    pub fn create_doc(&self, ns: &str, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        self.require_namespace(ns)?;

        let encoded = serde_json::to_vec(value)?;
        if !self.engine().put_if_absent(ns, key, &encoded)? {
            return Err(Error::DuplicateKey(key.to_string()));
        }
        debug!(db = %ns, key = %key, "Document created");
        Ok(())
    }

    /// Reads a document by key.
    pub fn get_doc(&self, ns: &str, key: &str) -> Result<Value> {
        self.require_namespace(ns)?;
        match self.engine().get(ns, key)? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Err(Error::NotFound(format!("doc '{}'", key))),
        }
    }

    /// Replaces a document's value wholesale. Fails with `NotFound` if the
    /// key does not currently hold a value.
    #[instrument(skip(self, value))]
    pub fn update_doc(&self, ns: &str, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        self.require_namespace(ns)?;

        let encoded = serde_json::to_vec(value)?;
        if !self.engine().put_if_present(ns, key, &encoded)? {
            return Err(Error::NotFound(format!("doc '{}'", key)));
        }
        debug!(db = %ns, key = %key, "Document updated");
        Ok(())
    }

    /// Deletes a document. Fails with `NotFound` if the key is absent.
    #[instrument(skip(self))]
    pub fn delete_doc(&self, ns: &str, key: &str) -> Result<()> {
        self.require_namespace(ns)?;
        if !self.engine().remove(ns, key)? {
            return Err(Error::NotFound(format!("doc '{}'", key)));
        }
        debug!(db = %ns, key = %key, "Document deleted");
        Ok(())
    }

    /// Creates or replaces a document. Returns `true` when the write created
    /// the key rather than replacing it. With `auto_create_namespace` set,
    /// a missing namespace is created first.
    #[instrument(skip(self, value))]
    pub fn upsert_doc(
        &self,
        ns: &str,
        key: &str,
        value: &Value,
        policy: WritePolicy,
    ) -> Result<bool> {
        validate_key(key)?;
        if !self.namespace_exists(ns) {
            if !policy.auto_create_namespace {
                return Err(Error::NotFound(format!("db '{}'", ns)));
            }
            self.create_namespace(ns)?;
        }

        let encoded = serde_json::to_vec(value)?;
        let created = self.engine().upsert(ns, key, &encoded)?;
        debug!(db = %ns, key = %key, created, "Document upserted");
        Ok(created)
    }

    /// Ordered, bounded listing of documents. Yields `(key, value)` pairs in
    /// ascending key order; an empty result is not an error.
    pub fn list_docs(&self, ns: &str, options: &ScanOptions) -> Result<Vec<(String, Value)>> {
        self.require_namespace(ns)?;

        let plan = options.plan();
        let rows = self
            .engine()
            .scan(ns, plan.lower_ref(), plan.upper_ref(), plan.limit)?;

        let mut docs = Vec::with_capacity(rows.len());
        for (key, raw) in rows {
            docs.push((key, serde_json::from_slice(&raw)?));
        }
        Ok(docs)
    }
}
