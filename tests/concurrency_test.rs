mod common;

use anyhow::Result;
use common::{seed_user, test_service};
use tradedesk::application::AppError;
use tradedesk::storage::LedgerStore;

const WORKERS: i64 = 10;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_drain_exactly() -> Result<()> {
    let (service, repo, _temp) = test_service().await?;
    let user = seed_user(&repo, WORKERS * 100).await?;

    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .withdraw_from_balance(user.id, 100, &format!("drain-{i}"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await??;
    }

    assert_eq!(repo.get_user_by_id(user.id).await?.balance, 0);

    let history = repo.get_balance_history(user.id).await?;
    assert_eq!(history.len() as i64, WORKERS);
    assert!(history.iter().all(|w| w.is_consistent()));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overdraw_never_goes_negative() -> Result<()> {
    let (service, repo, _temp) = test_service().await?;
    let user = seed_user(&repo, WORKERS * 100).await?;

    // One more request than the balance can cover
    let handles: Vec<_> = (0..=WORKERS)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .withdraw_from_balance(user.id, 100, &format!("overdraw-{i}"))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientFunds) => insufficient += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, WORKERS);
    assert_eq!(insufficient, 1);
    assert_eq!(repo.get_user_by_id(user.id).await?.balance, 0);
    assert_eq!(repo.get_balance_history(user.id).await?.len() as i64, WORKERS);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_key_debits_once() -> Result<()> {
    let (service, repo, _temp) = test_service().await?;
    let user = seed_user(&repo, 1000).await?;

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .withdraw_from_balance(user.id, 250, "one-shot")
                    .await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await??);
    }

    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(results[0].balance_after, 750);
    assert_eq!(repo.get_user_by_id(user.id).await?.balance, 750);
    assert_eq!(repo.get_balance_history(user.id).await?.len(), 1);

    Ok(())
}
