// HiveDB - a namespaced document and file store over HTTP
//
// A thin REST facade over an embedded ordered key-value engine: route
// handlers parse parameters, delegate to the store, and serialize JSON.

#![warn(rust_2018_idioms)]

pub mod files;
pub mod server;
pub mod storage;

// Re-exports for convenience
pub use files::FileStore;
pub use storage::Store;

/// HiveDB error taxonomy.
///
/// Every fallible operation in the crate returns one of these kinds so
/// callers can branch on the discriminant instead of matching on message
/// text. Validation errors are raised before any engine call is made;
/// engine failures carry the underlying message unmodified.
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        /// A namespace or bucket name fails static validation.
        #[error("invalid name: {0}")]
        InvalidName(String),

        /// A document key fails static validation.
        #[error("invalid key: {0}")]
        InvalidKey(String),

        /// Creating a resource that already exists.
        #[error("already exists: {0}")]
        AlreadyExists(String),

        /// Creating a document over a key that already holds a value.
        #[error("duplicate key: {0}")]
        DuplicateKey(String),

        /// The targeted namespace, document, bucket, or file is absent.
        #[error("not found: {0}")]
        NotFound(String),

        /// The underlying storage engine or filesystem reported a failure.
        /// Fatal for the current operation; never retried.
        #[error("engine failure: {0}")]
        Engine(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;

    impl From<redb::DatabaseError> for Error {
        fn from(e: redb::DatabaseError) -> Self {
            Error::Engine(e.to_string())
        }
    }

    impl From<redb::TransactionError> for Error {
        fn from(e: redb::TransactionError) -> Self {
            Error::Engine(e.to_string())
        }
    }

    impl From<redb::TableError> for Error {
        fn from(e: redb::TableError) -> Self {
            Error::Engine(e.to_string())
        }
    }

    impl From<redb::StorageError> for Error {
        fn from(e: redb::StorageError) -> Self {
            Error::Engine(e.to_string())
        }
    }

    impl From<redb::CommitError> for Error {
        fn from(e: redb::CommitError) -> Self {
            Error::Engine(e.to_string())
        }
    }

    impl From<serde_json::Error> for Error {
        fn from(e: serde_json::Error) -> Self {
            Error::Engine(format!("serialization: {}", e))
        }
    }

    impl From<std::io::Error> for Error {
        fn from(e: std::io::Error) -> Self {
            Error::Engine(e.to_string())
        }
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_stable() {
        let e = error::Error::NotFound("db 'orders'".to_string());
        assert_eq!(e.to_string(), "not found: db 'orders'");

        let e = error::Error::DuplicateKey("user:1".to_string());
        assert_eq!(e.to_string(), "duplicate key: user:1");
    }

    #[test]
    fn test_version_format() {
        let _version: &str = VERSION;
    }
}
