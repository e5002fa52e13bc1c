use thiserror::Error;

use crate::domain::{AccountStatus, Money};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    #[error("User is deactivated: {0}")]
    UserInactive(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Could not allocate a unique account number after {attempts} attempts")]
    AccountNumberConflict { attempts: u32 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Account {number} is {status}, movement refused")]
    AccountInactive {
        number: String,
        status: AccountStatus,
    },

    #[error(
        "Insufficient balance on {number}: balance {balance}, required {required}, floor {minimum_balance}"
    )]
    InsufficientBalance {
        number: String,
        balance: Money,
        required: Money,
        minimum_balance: Money,
    },

    /// Store failure. Unlike the business errors above, this one means the
    /// atomic-commit primitive itself misbehaved; callers decide on retry.
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// True for the recoverable business-rule refusals, false for storage
    /// failures.
    pub fn is_business_error(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}
