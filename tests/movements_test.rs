mod common;

use amanah::application::LedgerError;
use amanah::domain::{AccountCategory, TransactionStatus, TransactionType};
use anyhow::Result;
use common::{StandardBank, test_service};

#[tokio::test]
async fn test_deposit_increases_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_wadiah(&service, &owner.email).await?;

    let record = service.deposit(&account.number, 50_000).await?;
    assert_eq!(record.tx_type, TransactionType::Deposit);
    assert_eq!(record.status, TransactionStatus::Success);
    assert_eq!(record.amount, 50_000);
    assert_eq!(record.balance_after, 50_000);

    let record = service.deposit(&account.number, 12_345).await?;
    assert_eq!(record.balance_after, 62_345);

    let account = service.get_account(&account.number).await?;
    assert_eq!(account.balance, 62_345);

    Ok(())
}

#[tokio::test]
async fn test_deposit_requires_positive_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_wadiah(&service, &owner.email).await?;

    for amount in [0, -1, -50_000] {
        let err = service.deposit(&account.number, amount).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    // Nothing was recorded, nothing moved
    let account = service.get_account(&account.number).await?;
    assert_eq!(account.balance, 0);
    assert!(service.list_transactions(None, None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_withdraw_decreases_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_funded(&service, &owner.email, 50_000).await?;

    let record = service.withdraw(&account.number, 20_000).await?;
    assert_eq!(record.tx_type, TransactionType::Withdrawal);
    assert_eq!(record.status, TransactionStatus::Success);
    assert_eq!(record.balance_after, 30_000);

    let account = service.get_account(&account.number).await?;
    assert_eq!(account.balance, 30_000);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_down_to_floor_is_allowed() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = StandardBank::register_owner(&service).await?;
    let account = service
        .open_account(&owner.email, AccountCategory::Wadiah, 10_000)
        .await?;
    service.deposit(&account.number, 50_000).await?;

    // Exactly down to the floor is fine
    let record = service.withdraw(&account.number, 40_000).await?;
    assert_eq!(record.balance_after, 10_000);

    // One unit past the floor is not
    let err = service.withdraw(&account.number, 1).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

    Ok(())
}

#[tokio::test]
async fn test_overdraft_leaves_balance_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_funded(&service, &owner.email, 500_000).await?;

    let err = service.withdraw(&account.number, 600_000).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance {
            balance: 500_000,
            required: 600_000,
            minimum_balance: 0,
            ..
        }
    ));

    let account = service.get_account(&account.number).await?;
    assert_eq!(account.balance, 500_000);

    // The refusal shows up in the audit trail as a failed record
    let history = service
        .list_transactions(Some(&account.number), None)
        .await?;
    let refused: Vec<_> = history
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Failed)
        .collect();
    assert_eq!(refused.len(), 1);
    assert_eq!(refused[0].tx_type, TransactionType::Withdrawal);
    assert_eq!(refused[0].amount, 600_000);
    assert_eq!(refused[0].balance_after, 500_000);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_requires_positive_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_funded(&service, &owner.email, 50_000).await?;

    let err = service.withdraw(&account.number, 0).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let account = service.get_account(&account.number).await?;
    assert_eq!(account.balance, 50_000);

    Ok(())
}

#[tokio::test]
async fn test_fee_follows_floor_rules() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_funded(&service, &owner.email, 10_000).await?;

    let record = service
        .charge_fee(&account.number, 2_500, Some("monthly admin".into()))
        .await?;
    assert_eq!(record.tx_type, TransactionType::Fee);
    assert_eq!(record.balance_after, 7_500);
    assert_eq!(record.description.as_deref(), Some("monthly admin"));

    let err = service
        .charge_fee(&account.number, 10_000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

    let account = service.get_account(&account.number).await?;
    assert_eq!(account.balance, 7_500);

    Ok(())
}

#[tokio::test]
async fn test_sequence_is_dense_and_ordered() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_wadiah(&service, &owner.email).await?;

    service.deposit(&account.number, 10_000).await?;
    service.deposit(&account.number, 10_000).await?;
    service.withdraw(&account.number, 5_000).await?;

    let history = service.list_transactions(None, None).await?;
    let sequences: Vec<i64> = history.iter().map(|tx| tx.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    Ok(())
}
