use crate::config::WalletConfig;
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{TransactionRepoRef, WalletRepoRef};
use crate::domain::transaction::{Transaction, TransactionStatus, TransactionType};
use crate::domain::wallet::{OwnerId, Wallet, WalletId, WalletStatus, WithdrawalId};
use crate::domain::withdrawal::Withdrawal;
use crate::error::{Result, WalletError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

/// Registry of per-wallet async mutexes.
///
/// One entry per wallet ever touched; operations on different wallets never
/// contend. The outer std mutex only guards the map itself and is held for a
/// single lookup/insert.
struct WalletLocks {
    inner: StdMutex<HashMap<WalletId, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl WalletLocks {
    fn new(timeout: Duration) -> Self {
        Self {
            inner: StdMutex::new(HashMap::new()),
            timeout,
        }
    }

    async fn acquire(&self, wallet_id: WalletId) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut map = self.inner.lock().expect("wallet lock registry poisoned");
            Arc::clone(map.entry(wallet_id).or_default())
        };
        timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| WalletError::LockTimeout(wallet_id))
    }
}

/// Point-in-time view of one wallet's money, derived from a single ledger
/// snapshot so a half-applied reservation can never be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Settled total; moves only on credit, debit, adjustment and completion.
    pub balance: Balance,
    /// Outstanding reservations for in-flight withdrawals.
    pub pending: Balance,
    /// `balance - pending`; what a new reservation may draw from.
    pub available: Balance,
}

/// Source of truth for wallet money.
///
/// Every mutation of one wallet runs under that wallet's exclusive lock, so
/// two concurrent reservations can never both pass the available-balance
/// check. Ledger rows are append-only; `Wallet::balance` is a running total
/// the ledger must always reproduce.
pub struct WalletStore {
    wallets: WalletRepoRef,
    ledger: TransactionRepoRef,
    locks: WalletLocks,
    config: WalletConfig,
}

impl WalletStore {
    pub fn new(wallets: WalletRepoRef, ledger: TransactionRepoRef, config: WalletConfig) -> Self {
        let locks = WalletLocks::new(Duration::from_millis(config.lock_timeout_ms));
        Self {
            wallets,
            ledger,
            locks,
            config,
        }
    }

    /// Lazily creates the wallet on an owner's first access.
    pub async fn wallet_for_owner(&self, owner: OwnerId) -> Result<Wallet> {
        self.wallets.get_or_create(owner, &self.config.currency).await
    }

    pub async fn get_wallet(&self, wallet_id: WalletId) -> Result<Wallet> {
        self.wallets
            .get(wallet_id)
            .await?
            .ok_or(WalletError::WalletNotFound(wallet_id))
    }

    pub async fn get_all_wallets(&self) -> Result<Vec<Wallet>> {
        self.wallets.get_all().await
    }

    /// Suspends or reactivates a wallet. Suspended wallets keep receiving
    /// credits but refuse new withdrawals.
    pub async fn set_status(&self, wallet_id: WalletId, status: WalletStatus) -> Result<Wallet> {
        let _guard = self.lock(wallet_id).await?;
        let mut wallet = self.get_wallet(wallet_id).await?;
        wallet.status = status;
        wallet.updated_at = Utc::now();
        self.wallets.store(wallet.clone()).await?;
        tracing::info!(wallet = %wallet_id, ?status, "wallet status changed");
        Ok(wallet)
    }

    pub async fn balances(&self, wallet_id: WalletId) -> Result<BalanceSnapshot> {
        self.get_wallet(wallet_id).await?;
        let rows = self.ledger.for_wallet(wallet_id).await?;
        Ok(Self::snapshot_of(&rows))
    }

    fn snapshot_of(rows: &[Transaction]) -> BalanceSnapshot {
        let balance: i64 = rows.iter().map(Transaction::balance_delta).sum();
        let pending: i64 = rows.iter().map(Transaction::hold_delta).sum();
        BalanceSnapshot {
            balance: Balance::new(balance),
            pending: Balance::new(pending),
            available: Balance::new(balance - pending),
        }
    }

    /// Appends a posted credit and raises the balance.
    pub async fn credit(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        metadata: HashMap<String, String>,
    ) -> Result<Transaction> {
        let _guard = self.lock(wallet_id).await?;
        let mut wallet = self.get_wallet(wallet_id).await?;
        let tx = self
            .append_entry(
                wallet_id,
                amount.value(),
                TransactionType::Credit,
                None,
                metadata,
            )
            .await?;
        wallet.balance += Balance::from(amount);
        wallet.updated_at = Utc::now();
        self.wallets.store(wallet).await?;
        tracing::debug!(wallet = %wallet_id, amount = %amount, "credit posted");
        Ok(tx)
    }

    /// Appends a posted debit and lowers the balance. Rejected when it would
    /// draw past the available balance, same as a reservation.
    pub async fn debit(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        metadata: HashMap<String, String>,
    ) -> Result<Transaction> {
        let _guard = self.lock(wallet_id).await?;
        let mut wallet = self.get_wallet(wallet_id).await?;
        let rows = self.ledger.for_wallet(wallet_id).await?;
        let snapshot = Self::snapshot_of(&rows);
        if snapshot.available.value() < amount.value() {
            return Err(WalletError::InsufficientFunds {
                requested: amount.value(),
                available: snapshot.available.value(),
            });
        }
        let tx = self
            .append_entry(
                wallet_id,
                -amount.value(),
                TransactionType::Debit,
                None,
                metadata,
            )
            .await?;
        wallet.balance -= Balance::from(amount);
        wallet.updated_at = Utc::now();
        self.wallets.store(wallet).await?;
        tracing::debug!(wallet = %wallet_id, amount = %amount, "debit posted");
        Ok(tx)
    }

    /// Posts a signed manual correction. A negative adjustment may not draw
    /// past the available balance; outstanding holds stay fully funded.
    pub async fn adjust(
        &self,
        wallet_id: WalletId,
        amount: i64,
        metadata: HashMap<String, String>,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(WalletError::Validation(
                "adjustment amount must be non-zero".to_string(),
            ));
        }
        let _guard = self.lock(wallet_id).await?;
        let mut wallet = self.get_wallet(wallet_id).await?;
        let rows = self.ledger.for_wallet(wallet_id).await?;
        let snapshot = Self::snapshot_of(&rows);
        if snapshot.available.value() + amount < 0 {
            return Err(WalletError::InsufficientFunds {
                requested: -amount,
                available: snapshot.available.value(),
            });
        }
        let tx = self
            .append_entry(wallet_id, amount, TransactionType::Adjustment, None, metadata)
            .await?;
        wallet.balance += Balance::new(amount);
        wallet.updated_at = Utc::now();
        self.wallets.store(wallet).await?;
        tracing::info!(wallet = %wallet_id, amount, "adjustment posted");
        Ok(tx)
    }

    /// Places a hold for an in-flight withdrawal without touching the balance.
    pub async fn reserve(
        &self,
        wallet_id: WalletId,
        withdrawal_id: WithdrawalId,
        amount: Amount,
    ) -> Result<Transaction> {
        let _guard = self.lock(wallet_id).await?;
        self.reserve_locked(wallet_id, withdrawal_id, amount).await
    }

    /// Reservation body; caller must hold the wallet lock.
    pub(crate) async fn reserve_locked(
        &self,
        wallet_id: WalletId,
        withdrawal_id: WithdrawalId,
        amount: Amount,
    ) -> Result<Transaction> {
        self.get_wallet(wallet_id).await?;
        let rows = self.ledger.for_wallet(wallet_id).await?;
        let snapshot = Self::snapshot_of(&rows);
        if snapshot.available.value() < amount.value() {
            return Err(WalletError::InsufficientFunds {
                requested: amount.value(),
                available: snapshot.available.value(),
            });
        }
        let tx = self
            .append_entry(
                wallet_id,
                -amount.value(),
                TransactionType::WithdrawalReserve,
                Some(withdrawal_id),
                HashMap::new(),
            )
            .await?;
        tracing::debug!(
            wallet = %wallet_id,
            withdrawal = %withdrawal_id,
            amount = %amount,
            "funds reserved"
        );
        Ok(tx)
    }

    /// Settles a completed withdrawal: posts the debit and consumes the hold.
    /// Caller must hold the wallet lock.
    pub(crate) async fn complete_locked(&self, withdrawal: &Withdrawal) -> Result<Transaction> {
        let mut wallet = self.get_wallet(withdrawal.wallet_id).await?;
        let tx = self
            .append_entry(
                withdrawal.wallet_id,
                -withdrawal.amount.value(),
                TransactionType::WithdrawalComplete,
                Some(withdrawal.id),
                HashMap::new(),
            )
            .await?;
        wallet.balance -= Balance::from(withdrawal.amount);
        wallet.updated_at = Utc::now();
        self.wallets.store(wallet).await?;
        Ok(tx)
    }

    /// Returns a reserved amount to the available balance. No debit happens,
    /// the funds never left the balance. Caller must hold the wallet lock.
    pub(crate) async fn release_locked(&self, withdrawal: &Withdrawal) -> Result<Transaction> {
        self.append_entry(
            withdrawal.wallet_id,
            withdrawal.amount.value(),
            TransactionType::WithdrawalRelease,
            Some(withdrawal.id),
            HashMap::new(),
        )
        .await
    }

    /// Verifies the reconciliation invariant: the stored balance equals the
    /// sum of posted ledger rows.
    pub async fn reconcile(&self, wallet_id: WalletId) -> Result<bool> {
        let wallet = self.get_wallet(wallet_id).await?;
        let rows = self.ledger.for_wallet(wallet_id).await?;
        let replayed: i64 = rows.iter().map(Transaction::balance_delta).sum();
        Ok(wallet.balance.value() == replayed)
    }

    pub(crate) async fn lock(&self, wallet_id: WalletId) -> Result<OwnedMutexGuard<()>> {
        self.locks.acquire(wallet_id).await
    }

    async fn append_entry(
        &self,
        wallet_id: WalletId,
        amount: i64,
        r#type: TransactionType,
        withdrawal_id: Option<WithdrawalId>,
        metadata: HashMap<String, String>,
    ) -> Result<Transaction> {
        let tx = Transaction {
            id: self.ledger.next_id().await?,
            wallet_id,
            amount,
            r#type,
            status: TransactionStatus::Posted,
            withdrawal_id,
            created_at: Utc::now(),
            metadata,
        };
        self.ledger.append(tx.clone()).await?;
        Ok(tx)
    }
}
