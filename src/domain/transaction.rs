use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Money;

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Fee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer",
            TransactionType::Fee => "fee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            "transfer" => Some(TransactionType::Transfer),
            "fee" => Some(TransactionType::Fee),
            _ => None,
        }
    }

    /// Transfers are the only movement touching two accounts.
    pub fn has_target(&self) -> bool {
        matches!(self, TransactionType::Transfer)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TransactionStatus::Pending),
            "success" => Some(TransactionStatus::Success),
            "failed" => Some(TransactionStatus::Failed),
            "cancelled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    /// Settled records are immutable; only pending ones may still move.
    pub fn is_settled(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ledger record. Records are append-only: corrections happen through
/// new compensating movements, never by editing a settled row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Monotonically increasing sequence number, assigned by the repository
    pub sequence: i64,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    /// Amount moved, always positive
    pub amount: Money,
    /// The account debited (or credited, for deposits)
    pub source_account: String,
    /// Credited account, present only for transfers
    pub target_account: Option<String>,
    /// Source account balance after the movement settled
    pub balance_after: Money,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn new(
        tx_type: TransactionType,
        source_account: &str,
        target_account: Option<&str>,
        amount: Money,
        balance_after: Money,
    ) -> Self {
        assert!(amount > 0, "transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by the repository
            tx_type,
            status: TransactionStatus::Success,
            amount,
            source_account: source_account.to_string(),
            target_account: target_account.map(str::to_string),
            balance_after,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn deposit(account: &str, amount: Money, balance_after: Money) -> Self {
        Self::new(TransactionType::Deposit, account, None, amount, balance_after)
    }

    pub fn withdrawal(account: &str, amount: Money, balance_after: Money) -> Self {
        Self::new(
            TransactionType::Withdrawal,
            account,
            None,
            amount,
            balance_after,
        )
    }

    pub fn transfer(source: &str, target: &str, amount: Money, balance_after: Money) -> Self {
        Self::new(
            TransactionType::Transfer,
            source,
            Some(target),
            amount,
            balance_after,
        )
    }

    pub fn fee(account: &str, amount: Money, balance_after: Money) -> Self {
        Self::new(TransactionType::Fee, account, None, amount, balance_after)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the record as refused. Used for the audit trail of movements
    /// that failed the balance check; `balance_after` stays at the untouched
    /// balance.
    pub fn refused(mut self) -> Self {
        self.status = TransactionStatus::Failed;
        self
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_record() {
        let record = Transaction::deposit("1234567890", 5000, 5000);
        assert_eq!(record.tx_type, TransactionType::Deposit);
        assert_eq!(record.status, TransactionStatus::Success);
        assert_eq!(record.target_account, None);
        assert_eq!(record.balance_after, 5000);
        assert!(record.is_settled());
    }

    #[test]
    fn test_transfer_record_carries_both_accounts() {
        let record = Transaction::transfer("1111111111", "2222222222", 10_000_000, 40_000_000)
            .with_description("tuition");
        assert_eq!(record.tx_type, TransactionType::Transfer);
        assert_eq!(record.source_account, "1111111111");
        assert_eq!(record.target_account.as_deref(), Some("2222222222"));
        assert_eq!(record.balance_after, 40_000_000);
        assert_eq!(record.description.as_deref(), Some("tuition"));
    }

    #[test]
    fn test_refused_record() {
        let record = Transaction::withdrawal("1234567890", 60_000_000, 50_000_000).refused();
        assert_eq!(record.status, TransactionStatus::Failed);
        assert_eq!(record.balance_after, 50_000_000);
        assert!(record.is_settled());
    }

    #[test]
    fn test_only_transfers_have_targets() {
        assert!(TransactionType::Transfer.has_target());
        assert!(!TransactionType::Deposit.has_target());
        assert!(!TransactionType::Withdrawal.has_target());
        assert!(!TransactionType::Fee.has_target());
    }

    #[test]
    #[should_panic(expected = "transaction amount must be positive")]
    fn test_amount_must_be_positive() {
        Transaction::deposit("1234567890", 0, 0);
    }
}
