//! Built-in `basic` token chaincode.
//!
//! A minimal fungible-token module used by the scenario suite and demo
//! networks. State layout: `totalSupply` plus one `balance:<account>` key
//! per account, all decimal strings. Deterministic by construction: no
//! clock, no randomness, only context reads.

use super::context::ExecutionContext;
use super::{Chaincode, ChaincodeError};

const TOTAL_SUPPLY_KEY: &str = "totalSupply";

fn balance_key(account: &str) -> String {
    format!("balance:{account}")
}

/// The `basic` token module.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenChaincode;

impl TokenChaincode {
    fn read_amount(ctx: &mut ExecutionContext<'_>, key: &str) -> Result<u64, ChaincodeError> {
        match ctx.get_state(key)? {
            None => Ok(0),
            Some(raw) => raw.parse().map_err(|_| {
                ChaincodeError::Execution(format!("corrupt amount under '{key}': '{raw}'"))
            }),
        }
    }

    fn parse_amount(raw: &str) -> Result<u64, ChaincodeError> {
        raw.parse()
            .map_err(|_| ChaincodeError::BadArgs(format!("amount '{raw}' is not a number")))
    }

    fn mint(
        ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Option<String>, ChaincodeError> {
        let [amount, to] = args else {
            return Err(ChaincodeError::BadArgs(
                "mint expects (amount, account)".into(),
            ));
        };
        let amount = Self::parse_amount(amount)?;

        let balance = Self::read_amount(ctx, &balance_key(to))?;
        let supply = Self::read_amount(ctx, TOTAL_SUPPLY_KEY)?;

        ctx.put_state(&balance_key(to), &(balance + amount).to_string());
        ctx.put_state(TOTAL_SUPPLY_KEY, &(supply + amount).to_string());
        Ok(None)
    }

    fn transfer(
        ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Option<String>, ChaincodeError> {
        let [from, to, amount] = args else {
            return Err(ChaincodeError::BadArgs(
                "transfer expects (from, to, amount)".into(),
            ));
        };
        let amount = Self::parse_amount(amount)?;

        let from_balance = Self::read_amount(ctx, &balance_key(from))?;
        if from_balance < amount {
            return Err(ChaincodeError::Execution(format!(
                "insufficient balance: {from} has {from_balance}, needs {amount}"
            )));
        }
        let to_balance = Self::read_amount(ctx, &balance_key(to))?;

        ctx.put_state(&balance_key(from), &(from_balance - amount).to_string());
        ctx.put_state(&balance_key(to), &(to_balance + amount).to_string());
        Ok(None)
    }

    fn balance(
        ctx: &mut ExecutionContext<'_>,
        args: &[String],
    ) -> Result<Option<String>, ChaincodeError> {
        let [account] = args else {
            return Err(ChaincodeError::BadArgs("balance expects (account)".into()));
        };
        let balance = Self::read_amount(ctx, &balance_key(account))?;
        Ok(Some(balance.to_string()))
    }
}

impl Chaincode for TokenChaincode {
    fn init(
        &self,
        ctx: &mut ExecutionContext<'_>,
        _args: &[String],
    ) -> Result<Option<String>, ChaincodeError> {
        ctx.put_state(TOTAL_SUPPLY_KEY, "0");
        Ok(None)
    }

    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        function: &str,
        args: &[String],
    ) -> Result<Option<String>, ChaincodeError> {
        match function {
            "mint" => Self::mint(ctx, args),
            "transfer" => Self::transfer(ctx, args),
            "balance" => Self::balance(ctx, args),
            other => Err(ChaincodeError::UnknownFunction(other.to_string())),
        }
    }
}
