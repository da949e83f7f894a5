//! Credential store.
//!
//! API key records live in the reserved `__auth__` keyspace. Only the
//! SHA-256 hash of a secret is ever persisted; the raw secret exists exactly
//! once, in the response to the generate call. Validation compares the
//! candidate's hash against every stored record in constant time, without
//! short-circuiting on the position of a match.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Store, AUTH_TABLE};
use crate::error::{Error, Result};

/// Prefix carried by every generated secret.
const SECRET_PREFIX: &str = "hv_";

/// Persisted credential record. Never leaves the storage layer with the
/// hash attached; see [`CredentialInfo`] for the listable projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    pub key_hash: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Listable credential metadata: no hash, no secret material.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialInfo {
    pub id: String,
    pub name: Option<String>,
    pub created: DateTime<Utc>,
}

/// The one-time result of generating a key. `key` is the raw secret and is
/// never persisted or retrievable again.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedKey {
    pub id: String,
    pub key: String,
    pub name: Option<String>,
}

/// Generates a fresh secret: `hv_` plus 32 random bytes hex-encoded
/// (256 bits of entropy).
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    format!("{}{}", SECRET_PREFIX, hex::encode(bytes))
}

/// Hashes a secret with SHA-256, hex-encoded for storage.
fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl Store {
    /// Creates a new API key. The returned raw secret is shown to the
    /// caller exactly once; only its hash is stored.
    #[instrument(skip(self))]
    pub fn generate_key(&self, name: Option<String>) -> Result<GeneratedKey> {
        let id = Uuid::new_v4().to_string();
        let secret = generate_secret();
        let record = CredentialRecord {
            id: id.clone(),
            key_hash: hash_secret(&secret),
            name: name.clone(),
            created_at: Utc::now(),
        };

        let encoded = serde_json::to_vec(&record)?;
        self.engine().put(AUTH_TABLE, &id, &encoded)?;
        info!(id = %id, "API key generated");

        Ok(GeneratedKey {
            id,
            key: secret,
            name,
        })
    }

    /// Checks a candidate secret against every stored credential.
    ///
    /// The scan visits all records unconditionally and folds per-record
    /// constant-time comparisons into one accumulator, so response time does
    /// not depend on whether or where a match occurs.
    pub fn validate_key(&self, candidate: &str) -> Result<bool> {
        let candidate_hash = hash_secret(candidate);
        let candidate_bytes = candidate_hash.as_bytes();

        let rows = self.engine().scan(
            AUTH_TABLE,
            std::ops::Bound::Unbounded,
            std::ops::Bound::Unbounded,
            usize::MAX,
        )?;

        let mut valid = Choice::from(0u8);
        for (_, raw) in &rows {
            let record: CredentialRecord = serde_json::from_slice(raw)?;
            // Hex SHA-256 digests always have equal length.
            valid |= candidate_bytes.ct_eq(record.key_hash.as_bytes());
        }
        Ok(valid.into())
    }

    /// Lists credential metadata in ascending id order. Hashes are never
    /// included.
    pub fn list_keys(&self) -> Result<Vec<CredentialInfo>> {
        let rows = self.engine().scan(
            AUTH_TABLE,
            std::ops::Bound::Unbounded,
            std::ops::Bound::Unbounded,
            usize::MAX,
        )?;

        let mut keys = Vec::with_capacity(rows.len());
        for (_, raw) in &rows {
            let record: CredentialRecord = serde_json::from_slice(raw)?;
            keys.push(CredentialInfo {
                id: record.id,
                name: record.name,
                created: record.created_at,
            });
        }
        Ok(keys)
    }

    /// Revokes a credential by id.
    #[instrument(skip(self))]
    pub fn revoke_key(&self, id: &str) -> Result<()> {
        if !self.engine().remove(AUTH_TABLE, id)? {
            return Err(Error::NotFound(format!("key '{}'", id)));
        }
        info!(id = %id, "API key revoked");
        Ok(())
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
    fn test_secret_format_and_uniqueness() {
        let s1 = generate_secret();
        let s2 = generate_secret();
        assert!(s1.starts_with("hv_"));
        assert_eq!(s1.len(), 3 + 64);
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_generate_validate_revoke_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let generated = store.generate_key(Some("ci".to_string())).unwrap();
        assert!(store.validate_key(&generated.key).unwrap());
        assert!(!store.validate_key("hv_bogus").unwrap());

        store.revoke_key(&generated.id).unwrap();
        assert!(!store.validate_key(&generated.key).unwrap());

        match store.revoke_key(&generated.id) {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_list_never_exposes_secret_material() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let generated = store.generate_key(Some("web".to_string())).unwrap();
        let listed = store.list_keys().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, generated.id);
        assert_eq!(listed[0].name.as_deref(), Some("web"));

        // Neither the raw secret nor its hash appear in the serialized form.
        let json = serde_json::to_string(&listed).unwrap();
        assert!(!json.contains(&generated.key));
        assert!(!json.contains(&hash_secret(&generated.key)));
    }

    #[test]
    fn test_validate_scans_all_records() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let keys: Vec<_> = (0..5)
            .map(|i| store.generate_key(Some(format!("k{}", i))).unwrap())
            .collect();
        for generated in &keys {
            assert!(store.validate_key(&generated.key).unwrap());
        }
        assert!(!store.validate_key("").unwrap());
    }

    #[test]
    fn test_validate_with_no_credentials() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(!store.validate_key("hv_anything").unwrap());
    }
}
