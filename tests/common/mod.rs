// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use amanah::application::BankService;
use amanah::domain::{Account, AccountCategory, Money, User};
use anyhow::Result;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = BankService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Test fixture: standard owners and accounts
pub struct StandardBank;

impl StandardBank {
    /// Register the default owner used by most tests.
    pub async fn register_owner(service: &BankService) -> Result<User> {
        let user = service
            .register_user("Siti Rahma".into(), "siti@example.com".into())
            .await?;
        Ok(user)
    }

    /// Register a second owner.
    pub async fn register_second_owner(service: &BankService) -> Result<User> {
        let user = service
            .register_user("Budi Santoso".into(), "budi@example.com".into())
            .await?;
        Ok(user)
    }

    /// Open a custodial account with a zero floor for the given owner.
    pub async fn open_wadiah(service: &BankService, owner_email: &str) -> Result<Account> {
        let account = service
            .open_account(owner_email, AccountCategory::Wadiah, 0)
            .await?;
        Ok(account)
    }

    /// Open an account and fund it with an initial deposit.
    pub async fn open_funded(
        service: &BankService,
        owner_email: &str,
        amount: Money,
    ) -> Result<Account> {
        let account = Self::open_wadiah(service, owner_email).await?;
        service.deposit(&account.number, amount).await?;
        Ok(service.get_account(&account.number).await?)
    }
}
