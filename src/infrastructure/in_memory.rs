use crate::domain::ports::{PayoutQueue, TransactionRepo, WalletRepo, WithdrawalRepo};
use crate::domain::transaction::Transaction;
use crate::domain::wallet::{OwnerId, TransactionId, Wallet, WalletId, WithdrawalId};
use crate::domain::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct WalletTables {
    wallets: HashMap<WalletId, Wallet>,
    by_owner: HashMap<OwnerId, WalletId>,
    next_id: u64,
}

/// Thread-safe in-memory wallet store.
///
/// `Arc<RwLock<..>>` gives shared concurrent access; lazy creation happens
/// under the write lock so concurrent first accesses by one owner yield one
/// wallet.
#[derive(Default, Clone)]
pub struct InMemoryWalletRepo {
    inner: Arc<RwLock<WalletTables>>,
}

impl InMemoryWalletRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletRepo for InMemoryWalletRepo {
    async fn get_or_create(&self, owner: OwnerId, currency: &str) -> Result<Wallet> {
        let mut tables = self.inner.write().await;
        if let Some(id) = tables.by_owner.get(&owner) {
            return Ok(tables.wallets[id].clone());
        }
        tables.next_id += 1;
        let wallet = Wallet::new(WalletId(tables.next_id), owner, currency);
        tables.by_owner.insert(owner, wallet.id);
        tables.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn get(&self, id: WalletId) -> Result<Option<Wallet>> {
        let tables = self.inner.read().await;
        Ok(tables.wallets.get(&id).cloned())
    }

    async fn store(&self, wallet: Wallet) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables.by_owner.insert(wallet.owner, wallet.id);
        tables.wallets.insert(wallet.id, wallet);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Wallet>> {
        let tables = self.inner.read().await;
        let mut wallets: Vec<Wallet> = tables.wallets.values().cloned().collect();
        wallets.sort_by_key(|w| w.id);
        Ok(wallets)
    }
}

/// Thread-safe in-memory ledger, per-wallet rows in append order.
#[derive(Default, Clone)]
pub struct InMemoryTransactionRepo {
    rows: Arc<RwLock<HashMap<WalletId, Vec<Transaction>>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryTransactionRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepo for InMemoryTransactionRepo {
    async fn next_id(&self) -> Result<TransactionId> {
        Ok(TransactionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn append(&self, tx: Transaction) -> Result<()> {
        let mut rows = self.rows.write().await;
        rows.entry(tx.wallet_id).or_default().push(tx);
        Ok(())
    }

    async fn for_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&wallet_id).cloned().unwrap_or_default())
    }
}

/// Thread-safe in-memory withdrawal store.
#[derive(Default, Clone)]
pub struct InMemoryWithdrawalRepo {
    rows: Arc<RwLock<HashMap<WithdrawalId, Withdrawal>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryWithdrawalRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WithdrawalRepo for InMemoryWithdrawalRepo {
    async fn next_id(&self) -> Result<WithdrawalId> {
        Ok(WithdrawalId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn store(&self, withdrawal: Withdrawal) -> Result<()> {
        let mut rows = self.rows.write().await;
        rows.insert(withdrawal.id, withdrawal);
        Ok(())
    }

    async fn get(&self, id: WithdrawalId) -> Result<Option<Withdrawal>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        wallet_id: WalletId,
        key: &str,
    ) -> Result<Option<Withdrawal>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|w| w.wallet_id == wallet_id && w.idempotency_key == key)
            .max_by_key(|w| w.created_at)
            .cloned())
    }

    async fn for_wallet(&self, wallet_id: WalletId) -> Result<Vec<Withdrawal>> {
        let rows = self.rows.read().await;
        let mut withdrawals: Vec<Withdrawal> = rows
            .values()
            .filter(|w| w.wallet_id == wallet_id)
            .cloned()
            .collect();
        withdrawals.sort_by_key(|w| w.id);
        Ok(withdrawals)
    }

    async fn stale_processing(&self, cutoff: DateTime<Utc>) -> Result<Vec<Withdrawal>> {
        let rows = self.rows.read().await;
        let mut stale: Vec<Withdrawal> = rows
            .values()
            .filter(|w| w.status == WithdrawalStatus::Processing && w.updated_at <= cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|w| w.id);
        Ok(stale)
    }
}

/// Recording payout queue for tests and the replay binary.
///
/// The real deployment hands ids to an external worker; this one just keeps
/// them so callers can observe and drain what was dispatched.
#[derive(Default, Clone)]
pub struct InMemoryPayoutQueue {
    queued: Arc<RwLock<Vec<WithdrawalId>>>,
}

impl InMemoryPayoutQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything queued so far, in dispatch order.
    pub async fn drain(&self) -> Vec<WithdrawalId> {
        let mut queued = self.queued.write().await;
        std::mem::take(&mut *queued)
    }
}

#[async_trait]
impl PayoutQueue for InMemoryPayoutQueue {
    async fn enqueue(&self, withdrawal_id: WithdrawalId) -> Result<()> {
        let mut queued = self.queued.write().await;
        queued.push(withdrawal_id);
        Ok(())
    }
}
