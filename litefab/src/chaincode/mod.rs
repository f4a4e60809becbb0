//! Chaincode host: the registry of application modules and the
//! simulation entry point.
//!
//! Modules are compiled in and addressed by chaincode id; there is no
//! dynamic loading. Chaincode must be deterministic (no clock, no
//! randomness, no iteration over unordered containers) so that every
//! honest endorser produces the same [`RwSet`](crate::types::RwSet) and
//! result for the same payload on the same snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::error::StorageError;
use crate::state::WorldState;
use crate::types::tx::{TxPayload, TxType};
use crate::types::RwSet;

pub mod context;
pub mod token;

pub use context::ExecutionContext;
pub use token::TokenChaincode;

/// Errors raised by chaincode or its host during simulation.
#[derive(Debug, Error)]
pub enum ChaincodeError {
    /// No module registered under the requested id.
    #[error("unknown chaincode '{0}'")]
    UnknownChaincode(String),

    /// The module does not implement the requested function.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Arguments were missing or malformed.
    #[error("bad arguments: {0}")]
    BadArgs(String),

    /// Application-level failure (e.g. insufficient balance).
    #[error("{0}")]
    Execution(String),

    /// World-state access failed underneath the simulation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// An application module invokable by transactions.
///
/// Implementations interact with the world only through the
/// [`ExecutionContext`] KV interface.
pub trait Chaincode: Send + Sync {
    /// Called once when the chaincode is deployed.
    fn init(
        &self,
        ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Option<String>, ChaincodeError>;

    /// Dispatches an INVOKE transaction.
    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        function: &str,
        args: &[String],
    ) -> Result<Option<String>, ChaincodeError>;
}

/// Registry of compiled-in chaincode modules.
#[derive(Clone, Default)]
pub struct ChaincodeHost {
    modules: HashMap<String, Arc<dyn Chaincode>>,
}

impl ChaincodeHost {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in modules (`basic`).
    pub fn with_builtins() -> Self {
        let mut host = Self::new();
        host.register("basic", Arc::new(TokenChaincode));
        host
    }

    /// Registers a module under `chaincode_id`, replacing any previous one.
    pub fn register(&mut self, chaincode_id: impl Into<String>, module: Arc<dyn Chaincode>) {
        self.modules.insert(chaincode_id.into(), module);
    }

    /// Whether a module is registered under `chaincode_id`.
    pub fn contains(&self, chaincode_id: &str) -> bool {
        self.modules.contains_key(chaincode_id)
    }

    /// Simulates one transaction against a world-state snapshot.
    ///
    /// Instantiates a fresh execution context, dispatches to `init` for
    /// DEPLOY or `invoke` for INVOKE, and returns the collected read/write
    /// sets plus the chaincode result. On any chaincode error the whole
    /// simulation fails and no partial `RwSet` escapes.
    pub fn execute_transaction(
        &self,
        state: &dyn WorldState,
        payload: &TxPayload,
        creator_id: &str,
        creator_org_id: &str,
    ) -> Result<(RwSet, Option<String>), ChaincodeError> {
        let module = self
            .modules
            .get(&payload.chaincode_id)
            .ok_or_else(|| ChaincodeError::UnknownChaincode(payload.chaincode_id.clone()))?;

        let mut ctx = ExecutionContext::new(state, creator_id, creator_org_id);
        let result = match payload.tx_type {
            TxType::Deploy => module.init(&mut ctx, &payload.args)?,
            TxType::Invoke => {
                let function = payload
                    .function_name
                    .as_deref()
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| {
                        ChaincodeError::BadArgs("INVOKE requires a function name".into())
                    })?;
                module.invoke(&mut ctx, function, &payload.args)?
            }
        };

        Ok((ctx.into_rw_set(), result))
    }
}
