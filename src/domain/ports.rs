use super::transaction::Transaction;
use super::wallet::{OwnerId, TransactionId, Wallet, WalletId, WithdrawalId};
use super::withdrawal::Withdrawal;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait WalletRepo: Send + Sync {
    /// Fetches the wallet for `owner`, creating an empty active one on first
    /// access. Creation is atomic: concurrent calls for one owner observe the
    /// same wallet.
    async fn get_or_create(&self, owner: OwnerId, currency: &str) -> Result<Wallet>;
    async fn get(&self, id: WalletId) -> Result<Option<Wallet>>;
    async fn store(&self, wallet: Wallet) -> Result<()>;
    async fn get_all(&self) -> Result<Vec<Wallet>>;
}

#[async_trait]
pub trait TransactionRepo: Send + Sync {
    async fn next_id(&self) -> Result<TransactionId>;
    /// Appends a row. The ledger is write-once; implementations must never
    /// overwrite an existing id.
    async fn append(&self, tx: Transaction) -> Result<()>;
    /// All rows of one wallet in append order, read as one consistent snapshot.
    async fn for_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>>;
}

#[async_trait]
pub trait WithdrawalRepo: Send + Sync {
    async fn next_id(&self) -> Result<WithdrawalId>;
    async fn store(&self, withdrawal: Withdrawal) -> Result<()>;
    async fn get(&self, id: WithdrawalId) -> Result<Option<Withdrawal>>;
    async fn find_by_idempotency_key(
        &self,
        wallet_id: WalletId,
        key: &str,
    ) -> Result<Option<Withdrawal>>;
    async fn for_wallet(&self, wallet_id: WalletId) -> Result<Vec<Withdrawal>>;
    /// Withdrawals stuck in `processing` whose last update precedes `cutoff`.
    async fn stale_processing(&self, cutoff: DateTime<Utc>) -> Result<Vec<Withdrawal>>;
}

/// Outbound edge to the external payout processor.
///
/// Delivery is fire-and-forget with at-least-once semantics; the processor
/// answers through the callback entry points on the withdrawal manager, which
/// are idempotent where redelivery requires it.
#[async_trait]
pub trait PayoutQueue: Send + Sync {
    async fn enqueue(&self, withdrawal_id: WithdrawalId) -> Result<()>;
}

pub type WalletRepoRef = Arc<dyn WalletRepo>;
pub type TransactionRepoRef = Arc<dyn TransactionRepo>;
pub type WithdrawalRepoRef = Arc<dyn WithdrawalRepo>;
pub type PayoutQueueRef = Arc<dyn PayoutQueue>;
