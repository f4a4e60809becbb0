//! Error types shared across the crate.
//!
//! Two layers are distinguished:
//!
//! - network-facing errors ([`LitefabError`]) that request handlers map to
//!   HTTP status codes, and
//! - per-transaction validation codes (`types::ValidationCode`), which are
//!   recorded in block metadata and never abort a commit.

use thiserror::Error;

/// Storage-level error type shared by the ledger and world-state backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying RocksDB error.
    #[error("rocksdb: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// A persisted record could not be decoded.
    #[error("corrupted record: {0}")]
    Corrupted(String),

    /// Encoding a record for persistence failed.
    #[error("codec: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Codec(e.to_string())
    }
}

/// Errors surfaced while talking to the cryptographic layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A PEM-encoded key could not be parsed.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// A base64 signature could not be decoded or had the wrong shape.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Key generation or key I/O failed.
    #[error("key handling: {0}")]
    KeyHandling(String),
}

/// Network-facing error taxonomy.
///
/// Binaries map these onto HTTP statuses: `SignatureInvalid` and
/// `BadRequest` to 400, `NotFound` to 404, `ChaincodeExecution` to 422,
/// `Storage`/`Crypto`/`Encoding` to 500.
#[derive(Debug, Error)]
pub enum LitefabError {
    /// A proposal, envelope, endorsement, or block signature failed
    /// verification.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// A referenced chaincode, block, or route does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed (missing parameter, bad body).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Chaincode raised an error during simulation.
    #[error("chaincode execution failed: {0}")]
    ChaincodeExecution(String),

    /// The underlying KV store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Signing or key handling failed on our side.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Canonical encoding of a value graph failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The consensus module rejected the submission.
    #[error("consensus error: {0}")]
    Consensus(String),

    /// An outbound HTTP call failed after exhausting all addresses.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for LitefabError {
    fn from(e: serde_json::Error) -> Self {
        LitefabError::Encoding(e.to_string())
    }
}
