use super::ledger::{DateRange, LedgerReader, Page, PeriodTotals};
use super::store::WalletStore;
use super::withdrawals::{WithdrawalManager, WithdrawalRequest};
use crate::config::WalletConfig;
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{PayoutQueueRef, TransactionRepoRef, WalletRepoRef, WithdrawalRepoRef};
use crate::domain::transaction::{Transaction, TransactionFilter};
use crate::domain::wallet::{OwnerId, Wallet, WalletId, WalletStatus, WithdrawalId};
use crate::domain::withdrawal::Withdrawal;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot handed to the surrounding API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSummary {
    pub balance: Balance,
    pub available_balance: Balance,
    pub pending_balance: Balance,
    pub totals: PeriodTotals,
}

/// Entry point for the surrounding HTTP/CRUD layer and the payout processor.
///
/// Wires the wallet store, withdrawal manager and ledger reader over one set
/// of repositories. The core holds no session state; callers always pass
/// explicit wallet ids.
pub struct WalletService {
    store: Arc<WalletStore>,
    manager: WithdrawalManager,
    reader: LedgerReader,
}

impl WalletService {
    pub fn new(
        wallets: WalletRepoRef,
        ledger: TransactionRepoRef,
        withdrawals: WithdrawalRepoRef,
        queue: PayoutQueueRef,
        config: WalletConfig,
    ) -> Self {
        let store = Arc::new(WalletStore::new(
            Arc::clone(&wallets),
            Arc::clone(&ledger),
            config.clone(),
        ));
        let manager =
            WithdrawalManager::new(Arc::clone(&store), withdrawals, queue, config.clone());
        let reader = LedgerReader::new(wallets, ledger, config);
        Self {
            store,
            manager,
            reader,
        }
    }

    pub fn store(&self) -> &Arc<WalletStore> {
        &self.store
    }

    pub async fn wallet_for_owner(&self, owner: OwnerId) -> Result<Wallet> {
        self.store.wallet_for_owner(owner).await
    }

    pub async fn get_wallet(&self, wallet_id: WalletId) -> Result<Wallet> {
        self.store.get_wallet(wallet_id).await
    }

    pub async fn set_wallet_status(
        &self,
        wallet_id: WalletId,
        status: WalletStatus,
    ) -> Result<Wallet> {
        self.store.set_status(wallet_id, status).await
    }

    pub async fn credit(
        &self,
        wallet_id: WalletId,
        amount: Amount,
        metadata: HashMap<String, String>,
    ) -> Result<Transaction> {
        self.store.credit(wallet_id, amount, metadata).await
    }

    pub async fn list_transactions(
        &self,
        wallet_id: WalletId,
        filter: &TransactionFilter,
        page: usize,
        per_page: usize,
    ) -> Result<Page<Transaction>> {
        self.reader.query(wallet_id, filter, page, per_page).await
    }

    pub async fn request_withdrawal(
        &self,
        wallet_id: WalletId,
        request: WithdrawalRequest,
    ) -> Result<Withdrawal> {
        self.manager.request(wallet_id, request).await
    }

    pub async fn cancel_withdrawal(&self, id: WithdrawalId, reason: &str) -> Result<Withdrawal> {
        self.manager.cancel(id, reason).await
    }

    pub async fn get_withdrawal(&self, id: WithdrawalId) -> Result<Withdrawal> {
        self.manager.get(id).await
    }

    pub async fn summary(&self, wallet_id: WalletId, range: DateRange) -> Result<WalletSummary> {
        let snapshot = self.store.balances(wallet_id).await?;
        let totals = self.reader.summary(wallet_id, range).await?;
        Ok(WalletSummary {
            balance: snapshot.balance,
            available_balance: snapshot.available,
            pending_balance: snapshot.pending,
            totals,
        })
    }

    // Callback entry points for the payout processor; redelivery-tolerant
    // per the manager's transition rules.

    pub async fn on_processing_started(&self, id: WithdrawalId) -> Result<Withdrawal> {
        self.manager.mark_processing(id).await
    }

    pub async fn on_completed(&self, id: WithdrawalId, provider_reference: &str) -> Result<Withdrawal> {
        self.manager.complete(id, provider_reference).await
    }

    pub async fn on_failed(&self, id: WithdrawalId, reason: &str) -> Result<Withdrawal> {
        self.manager.fail(id, reason).await
    }

    pub async fn reconcile_stale(&self) -> Result<Vec<Withdrawal>> {
        self.manager.reconcile_stale().await
    }
}
