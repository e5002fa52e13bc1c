mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{StandardBank, test_service};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_transfers_net_to_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);

    let siti = StandardBank::register_owner(&service).await?;
    let a = StandardBank::open_funded(&service, &siti.email, 500_000).await?;
    let b = StandardBank::open_funded(&service, &siti.email, 500_000).await?;

    let ab = {
        let service = Arc::clone(&service);
        let (a, b) = (a.number.clone(), b.number.clone());
        tokio::spawn(async move { service.transfer(&a, &b, 100_000, None).await })
    };
    let ba = {
        let service = Arc::clone(&service);
        let (a, b) = (a.number.clone(), b.number.clone());
        tokio::spawn(async move { service.transfer(&b, &a, 100_000, None).await })
    };

    ab.await??;
    ba.await??;

    let a = service.get_account(&a.number).await?;
    let b = service.get_account(&b.number).await?;
    assert_eq!(a.balance, 500_000, "equal opposite transfers must net out");
    assert_eq!(b.balance, 500_000, "equal opposite transfers must net out");

    let report = service.audit().await?;
    assert!(report.is_clean());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_are_not_lost() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);

    let siti = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_wadiah(&service, &siti.email).await?;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let service = Arc::clone(&service);
        let number = account.number.clone();
        tasks.push(tokio::spawn(async move {
            service.deposit(&number, 10_000).await
        }));
    }
    for task in tasks {
        task.await??;
    }

    let account = service.get_account(&account.number).await?;
    assert_eq!(account.balance, 100_000, "every deposit must land exactly once");

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_breach_floor() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);

    let siti = StandardBank::register_owner(&service).await?;
    let account = StandardBank::open_funded(&service, &siti.email, 50_000).await?;

    // Ten racing withdrawals of 10_000 against a 50_000 balance: exactly
    // five can settle, the rest must be refused.
    let mut tasks = Vec::new();
    for _ in 0..10 {
        let service = Arc::clone(&service);
        let number = account.number.clone();
        tasks.push(tokio::spawn(async move {
            service.withdraw(&number, 10_000).await
        }));
    }

    let mut settled = 0;
    for task in tasks {
        if task.await?.is_ok() {
            settled += 1;
        }
    }
    assert_eq!(settled, 5);

    let account = service.get_account(&account.number).await?;
    assert_eq!(account.balance, 0);

    let report = service.audit().await?;
    assert!(report.is_clean());

    Ok(())
}
