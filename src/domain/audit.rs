use std::collections::HashMap;

use super::{Account, Money, Transaction, TransactionStatus, TransactionType};

/// Replay settled movements from zero into per-account balances.
/// Only `success` records move money; refused ones are audit trail.
pub fn replay_balances(transactions: &[Transaction]) -> HashMap<String, Money> {
    let mut balances: HashMap<String, Money> = HashMap::new();

    for tx in transactions {
        if tx.status != TransactionStatus::Success {
            continue;
        }
        match tx.tx_type {
            TransactionType::Deposit => {
                *balances.entry(tx.source_account.clone()).or_insert(0) += tx.amount;
            }
            TransactionType::Withdrawal | TransactionType::Fee => {
                *balances.entry(tx.source_account.clone()).or_insert(0) -= tx.amount;
            }
            TransactionType::Transfer => {
                *balances.entry(tx.source_account.clone()).or_insert(0) -= tx.amount;
                if let Some(target) = &tx.target_account {
                    *balances.entry(target.clone()).or_insert(0) += tx.amount;
                }
            }
        }
    }

    balances
}

/// A stored balance that disagrees with the replayed ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMismatch {
    pub account_number: String,
    pub stored: Money,
    pub replayed: Money,
}

/// Result of cross-checking stored balances against the transaction log.
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub account_count: i64,
    pub transaction_count: i64,
    pub mismatches: Vec<BalanceMismatch>,
    /// Active accounts sitting below their floor (or below zero)
    pub floor_violations: Vec<String>,
    pub has_sequence_gaps: bool,
    pub orphan_account_refs: i64,
    pub non_positive_amounts: i64,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
            && self.floor_violations.is_empty()
            && !self.has_sequence_gaps
            && self.orphan_account_refs == 0
            && self.non_positive_amounts == 0
    }
}

/// Build the audit report from all accounts (closed ones included) and the
/// full transaction log.
pub fn build_audit_report(
    accounts: &[Account],
    transactions: &[Transaction],
    has_sequence_gaps: bool,
    orphan_account_refs: i64,
    non_positive_amounts: i64,
) -> AuditReport {
    let replayed = replay_balances(transactions);

    let mut mismatches = Vec::new();
    let mut floor_violations = Vec::new();

    for account in accounts {
        let expected = replayed.get(&account.number).copied().unwrap_or(0);
        if expected != account.balance {
            mismatches.push(BalanceMismatch {
                account_number: account.number.clone(),
                stored: account.balance,
                replayed: expected,
            });
        }
        if account.status.allows_movement()
            && (account.balance < account.minimum_balance || account.balance < 0)
        {
            floor_violations.push(account.number.clone());
        }
    }

    AuditReport {
        account_count: accounts.len() as i64,
        transaction_count: transactions.len() as i64,
        mismatches,
        floor_violations,
        has_sequence_gaps,
        orphan_account_refs,
        non_positive_amounts,
    }
}
