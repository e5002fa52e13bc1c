//! Eligibility checks shared by every money-movement operation.
//!
//! Deposit, withdrawal, fee and transfer all answer the same questions -
//! "is this amount movable" and "may this account participate" - here, so
//! there is exactly one source of truth for them.

use crate::domain::{Account, Money, User};

use super::LedgerError;

/// Amounts are strictly positive; zero and negative values never move.
pub fn require_positive_amount(amount: Money) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// A transfer needs two distinct accounts.
pub fn require_distinct_accounts(source: &str, target: &str) -> Result<(), LedgerError> {
    if source == target {
        return Err(LedgerError::InvalidTransfer(format!(
            "source and target are the same account: {source}"
        )));
    }
    Ok(())
}

/// Deactivated users may not open accounts.
pub fn require_eligible_owner(user: &User) -> Result<(), LedgerError> {
    if !user.is_active() {
        return Err(LedgerError::UserInactive(user.email.clone()));
    }
    Ok(())
}

/// Soft-closed accounts read as absent; anything not active refuses movement.
pub fn require_open_for_movement(account: &Account) -> Result<(), LedgerError> {
    if account.is_closed() {
        return Err(LedgerError::AccountNotFound(account.number.clone()));
    }
    if !account.status.allows_movement() {
        return Err(LedgerError::AccountInactive {
            number: account.number.clone(),
            status: account.status,
        });
    }
    Ok(())
}

/// Debits may not push the balance below the account's floor.
pub fn require_funds_above_floor(account: &Account, amount: Money) -> Result<(), LedgerError> {
    if !account.can_cover(amount) {
        return Err(LedgerError::InsufficientBalance {
            number: account.number.clone(),
            balance: account.balance,
            required: amount,
            minimum_balance: account.minimum_balance,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::{Account, AccountCategory, AccountStatus, User, generate_account_number};

    fn active_account(balance: Money, minimum: Money) -> Account {
        let mut account = Account::open(
            generate_account_number(),
            Uuid::new_v4(),
            AccountCategory::Wadiah,
            minimum,
        );
        account.balance = balance;
        account
    }

    #[test]
    fn test_amount_must_be_positive() {
        assert!(require_positive_amount(1).is_ok());
        assert!(matches!(
            require_positive_amount(0),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            require_positive_amount(-500),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_same_account_transfer_refused() {
        assert!(require_distinct_accounts("1111111111", "2222222222").is_ok());
        assert!(matches!(
            require_distinct_accounts("1111111111", "1111111111"),
            Err(LedgerError::InvalidTransfer(_))
        ));
    }

    #[test]
    fn test_deactivated_owner_refused() {
        let mut user = User::new("Budi Santoso".into(), "budi@example.com".into());
        assert!(require_eligible_owner(&user).is_ok());

        user.active = false;
        assert!(matches!(
            require_eligible_owner(&user),
            Err(LedgerError::UserInactive(email)) if email == "budi@example.com"
        ));
    }

    #[test]
    fn test_blocked_account_refuses_movement() {
        let mut account = active_account(10_000, 0);
        assert!(require_open_for_movement(&account).is_ok());

        account.status = AccountStatus::Blocked;
        assert!(matches!(
            require_open_for_movement(&account),
            Err(LedgerError::AccountInactive {
                status: AccountStatus::Blocked,
                ..
            })
        ));
    }

    #[test]
    fn test_closed_account_reads_as_absent() {
        let mut account = active_account(0, 0);
        account.status = AccountStatus::Closed;
        account.closed_at = Some(chrono::Utc::now());

        assert!(matches!(
            require_open_for_movement(&account),
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_floor_check() {
        let account = active_account(50_000_000, 0);
        assert!(require_funds_above_floor(&account, 50_000_000).is_ok());

        let err = require_funds_above_floor(&account, 60_000_000).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                balance: 50_000_000,
                required: 60_000_000,
                minimum_balance: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_floor_check_with_minimum() {
        let account = active_account(50_000, 10_000);
        assert!(require_funds_above_floor(&account, 40_000).is_ok());
        assert!(require_funds_above_floor(&account, 40_001).is_err());
    }
}
