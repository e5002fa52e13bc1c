use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Money, UserId};

pub type AccountId = Uuid;

/// Number of decimal digits in a generated account number.
pub const ACCOUNT_NUMBER_DIGITS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountCategory {
    /// Custodial deposit - the bank safekeeps the funds
    Wadiah,
    /// Profit-sharing deposit - returns split by an agreed ratio
    Mudharabah,
    /// Partnership financing - both parties contribute capital
    Musyarakah,
}

impl AccountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Wadiah => "wadiah",
            AccountCategory::Mudharabah => "mudharabah",
            AccountCategory::Musyarakah => "musyarakah",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "wadiah" => Some(AccountCategory::Wadiah),
            "mudharabah" => Some(AccountCategory::Mudharabah),
            "musyarakah" => Some(AccountCategory::Musyarakah),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Blocked,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Blocked => "blocked",
            AccountStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "blocked" => Some(AccountStatus::Blocked),
            "closed" => Some(AccountStatus::Closed),
            _ => None,
        }
    }

    /// Only active accounts may take part in money movement.
    pub fn allows_movement(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A balance-bearing account owned by exactly one user.
///
/// The balance is mutated only by the deposit/withdraw/fee/transfer
/// operations; nothing else assigns to it. Accounts are soft-closed
/// (`closed_at` stamped) so their transaction history survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Public account number, unique across open and closed accounts
    pub number: String,
    pub owner_id: UserId,
    pub category: AccountCategory,
    /// Current balance in minor units
    pub balance: Money,
    /// Floor the balance may never drop below while the account is active
    pub minimum_balance: Money,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Open a new account with a zero balance.
    pub fn open(
        number: String,
        owner_id: UserId,
        category: AccountCategory,
        minimum_balance: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            owner_id,
            category,
            balance: 0,
            minimum_balance,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some() || self.status == AccountStatus::Closed
    }

    /// True when taking `amount` out would keep the balance at or above the
    /// minimum-balance floor.
    pub fn can_cover(&self, amount: Money) -> bool {
        self.balance - amount >= self.minimum_balance
    }
}

/// Generate a candidate account number from UUID randomness.
///
/// Collisions are possible; callers must check for an existing row and retry
/// with a fresh candidate.
pub fn generate_account_number() -> String {
    let modulus = 10u128.pow(ACCOUNT_NUMBER_DIGITS);
    let n = Uuid::new_v4().as_u128() % modulus;
    format!("{:0width$}", n, width = ACCOUNT_NUMBER_DIGITS as usize)
}
