//! Litefab library crate.
//!
//! This crate provides the core building blocks for a minimal
//! permissioned-blockchain runtime built around the
//! execute-order-validate pipeline:
//!
//! - canonical JSON encoding for everything that is signed (`canonical`),
//! - SHA-256 / RSA-2048 primitives (`crypto`) and the MSP identity
//!   directory (`msp`),
//! - the domain types for proposals, envelopes, and blocks (`types`),
//! - versioned world state with MVCC validation (`state`),
//! - the append-only block ledger (`ledger`),
//! - the chaincode host and execution context (`chaincode`),
//! - endorsement (`endorser`), ordering (`orderer`, `consensus`), and the
//!   commit-time validation pipeline (`committer`),
//! - client-side assembly and submission (`client`),
//! - node/client configuration (`config`) and Prometheus metrics
//!   (`metrics`).
//!
//! The `litefab-node` binary composes these pieces into peer and orderer
//! processes and the CLI client.

pub mod canonical;
pub mod chaincode;
pub mod client;
pub mod committer;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod endorser;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod msp;
pub mod orderer;
pub mod policy;
pub mod state;
pub mod types;

// Re-export the error taxonomy at the crate root.
pub use error::{CryptoError, LitefabError, StorageError};

// Re-export the pieces a node binary wires together.
pub use chaincode::{Chaincode, ChaincodeError, ChaincodeHost, ExecutionContext, TokenChaincode};
pub use client::Client;
pub use committer::{CommitOutcome, Committer};
pub use config::{ClientConfig, ConsensusKind, NodeConfig};
pub use consensus::{Consensus, ConsensusError, RaftConsensus, SoloConsensus, SubmitOutcome};
pub use crypto::SigningIdentity;
pub use endorser::Endorser;
pub use ledger::{InMemoryLedger, LedgerStore, RocksDbLedger, RocksDbLedgerConfig, TxLocation};
pub use metrics::MetricsRegistry;
pub use msp::{Identity, Msp, MspConfig, OrgConfig, Role, VerificationOutcome};
pub use orderer::{OrdererService, SubmitDisposition};
pub use policy::{EndorsementPolicy, PolicyType};
pub use state::{
    ChaincodeMetadata, InMemoryWorldState, RocksDbWorldState, RocksDbWorldStateConfig, WorldState,
};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the ledger backend a persistent node uses.
pub type DefaultLedger = RocksDbLedger;

/// Type alias for the world-state backend a persistent node uses.
pub type DefaultWorldState = RocksDbWorldState;

/// Type alias for the orderer service stack of a persistent node.
pub type DefaultOrdererService = OrdererService<DefaultLedger>;
