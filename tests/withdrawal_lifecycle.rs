mod common;

use common::{funded_wallet, service, service_with, withdrawal_request};
use courier_wallet::WalletConfig;
use courier_wallet::WalletError;
use courier_wallet::application::ledger::DateRange;
use courier_wallet::domain::money::Balance;
use courier_wallet::domain::withdrawal::WithdrawalStatus;

#[tokio::test]
async fn test_request_reserves_without_debiting() {
    let service = service();
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let withdrawal = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    assert_eq!(withdrawal.status, WithdrawalStatus::Pending);

    let summary = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(summary.balance, Balance::new(1000));
    assert_eq!(summary.available_balance, Balance::new(700));
    assert_eq!(summary.pending_balance, Balance::new(300));
}

#[tokio::test]
async fn test_failed_payout_restores_funds() {
    let service = service();
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let w = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    service.on_processing_started(w.id).await.unwrap();
    let failed = service.on_failed(w.id, "account closed").await.unwrap();

    assert_eq!(failed.status, WithdrawalStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("account closed"));

    let summary = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(summary.balance, Balance::new(1000));
    assert_eq!(summary.available_balance, Balance::new(1000));
    assert_eq!(summary.pending_balance, Balance::ZERO);
}

#[tokio::test]
async fn test_insufficient_funds_has_no_partial_effect() {
    let service = service();
    let wallet_id = funded_wallet(&service, 1, 500).await;

    let err = service
        .request_withdrawal(wallet_id, withdrawal_request(600, "key-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalletError::InsufficientFunds {
            requested: 600,
            available: 500
        }
    ));

    let summary = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(summary.balance, Balance::new(500));
    assert_eq!(summary.available_balance, Balance::new(500));
    // no ledger row, no withdrawal row
    assert_eq!(summary.totals.withdrawals_reserved, 0);
}

#[tokio::test]
async fn test_below_minimum_records_nothing() {
    let service = service_with(WalletConfig {
        minimum_withdrawal: 100,
        ..WalletConfig::default()
    });
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let err = service
        .request_withdrawal(wallet_id, withdrawal_request(50, "key-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalletError::BelowMinimum {
            requested: 50,
            minimum: 100
        }
    ));

    let page = service
        .list_transactions(wallet_id, &Default::default(), 1, 50)
        .await
        .unwrap();
    // only the funding credit exists
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_completed_withdrawal_debits_exactly_once() {
    let service = service();
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let w = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    service.on_processing_started(w.id).await.unwrap();
    service.on_completed(w.id, "prov-1").await.unwrap();

    // at-least-once redelivery of the success callback
    let redelivered = service.on_completed(w.id, "prov-1").await.unwrap();
    assert_eq!(redelivered.status, WithdrawalStatus::Completed);
    assert_eq!(redelivered.provider_reference.as_deref(), Some("prov-1"));

    let summary = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(summary.balance, Balance::new(700));
    assert_eq!(summary.available_balance, Balance::new(700));
    assert_eq!(summary.totals.withdrawals_completed, 300);
}

#[tokio::test]
async fn test_cancel_pending_restores_available() {
    let service = service();
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let w = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    let before = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(before.available_balance, Balance::new(700));

    let cancelled = service.cancel_withdrawal(w.id, "rider asked").await.unwrap();
    assert_eq!(cancelled.status, WithdrawalStatus::Cancelled);

    let after = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(after.available_balance, Balance::new(1000));
}

#[tokio::test]
async fn test_cancel_processing_is_rejected() {
    let service = service();
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let w = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    service.on_processing_started(w.id).await.unwrap();

    let err = service.cancel_withdrawal(w.id, "too late").await.unwrap_err();
    assert!(matches!(
        err,
        WalletError::InvalidStateTransition {
            from: WithdrawalStatus::Processing,
            ..
        }
    ));

    // the hold stays in place
    let summary = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(summary.pending_balance, Balance::new(300));
}

#[tokio::test]
async fn test_idempotent_request_creates_one_withdrawal() {
    let service = service();
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let first = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    let second = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let summary = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(summary.pending_balance, Balance::new(300));
    assert_eq!(summary.totals.withdrawals_reserved, 300);
}

#[tokio::test]
async fn test_stale_processing_is_reconciled() {
    let service = service_with(WalletConfig {
        stale_processing_secs: 0,
        ..WalletConfig::default()
    });
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let w = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    service.on_processing_started(w.id).await.unwrap();

    let reconciled = service.reconcile_stale().await.unwrap();
    assert_eq!(reconciled.len(), 1);
    assert_eq!(reconciled[0].status, WithdrawalStatus::Failed);

    let summary = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(summary.available_balance, Balance::new(1000));

    // a late success callback after forced release is rejected
    let err = service.on_completed(w.id, "prov-late").await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn test_ledger_replay_matches_balance_after_mixed_activity() {
    let service = service();
    let wallet_id = funded_wallet(&service, 1, 1000).await;

    let w1 = service
        .request_withdrawal(wallet_id, withdrawal_request(300, "key-1"))
        .await
        .unwrap();
    service.on_processing_started(w1.id).await.unwrap();
    service.on_completed(w1.id, "prov-1").await.unwrap();

    let w2 = service
        .request_withdrawal(wallet_id, withdrawal_request(200, "key-2"))
        .await
        .unwrap();
    service.cancel_withdrawal(w2.id, "changed mind").await.unwrap();

    assert!(service.store().reconcile(wallet_id).await.unwrap());
    let summary = service.summary(wallet_id, DateRange::all()).await.unwrap();
    assert_eq!(summary.balance, Balance::new(700));
    assert_eq!(summary.balance.value(), summary.totals.net_change);
}
