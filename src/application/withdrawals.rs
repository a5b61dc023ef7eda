use super::store::WalletStore;
use crate::config::WalletConfig;
use crate::domain::money::Amount;
use crate::domain::ports::{PayoutQueueRef, WithdrawalRepoRef};
use crate::domain::wallet::{WalletId, WithdrawalId};
use crate::domain::withdrawal::{PayoutMethod, Withdrawal, WithdrawalStatus};
use crate::error::{Result, WalletError};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Parameters of a new payout request.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub amount: Amount,
    pub destination: String,
    pub method: PayoutMethod,
    pub idempotency_key: String,
}

/// Coordinates a withdrawal from request through the processor callbacks.
///
/// Every transition runs under the owning wallet's lock: the state check, the
/// ledger entry and the row update commit together, so at-least-once callback
/// delivery cannot double-settle or double-release a withdrawal.
pub struct WithdrawalManager {
    store: Arc<WalletStore>,
    withdrawals: WithdrawalRepoRef,
    queue: PayoutQueueRef,
    config: WalletConfig,
}

impl WithdrawalManager {
    pub fn new(
        store: Arc<WalletStore>,
        withdrawals: WithdrawalRepoRef,
        queue: PayoutQueueRef,
        config: WalletConfig,
    ) -> Self {
        Self {
            store,
            withdrawals,
            queue,
            config,
        }
    }

    pub async fn get(&self, id: WithdrawalId) -> Result<Withdrawal> {
        self.withdrawals
            .get(id)
            .await?
            .ok_or(WalletError::WithdrawalNotFound(id))
    }

    pub async fn for_wallet(&self, wallet_id: WalletId) -> Result<Vec<Withdrawal>> {
        self.withdrawals.for_wallet(wallet_id).await
    }

    /// Validates and reserves a payout, then hands it to the processor queue.
    ///
    /// Retries carrying the same idempotency key get the original withdrawal
    /// back unchanged; the same key with different parameters is rejected as
    /// `DuplicateRequest`. Returns synchronously once the hold exists; the
    /// actual transfer happens asynchronously.
    pub async fn request(
        &self,
        wallet_id: WalletId,
        request: WithdrawalRequest,
    ) -> Result<Withdrawal> {
        if request.destination.trim().is_empty() {
            return Err(WalletError::Validation(
                "withdrawal destination must not be empty".to_string(),
            ));
        }
        if request.idempotency_key.trim().is_empty() {
            return Err(WalletError::Validation(
                "idempotency key must not be empty".to_string(),
            ));
        }
        if request.amount.value() < self.config.minimum_withdrawal {
            return Err(WalletError::BelowMinimum {
                requested: request.amount.value(),
                minimum: self.config.minimum_withdrawal,
            });
        }

        let withdrawal = {
            let _guard = self.store.lock(wallet_id).await?;

            let wallet = self.store.get_wallet(wallet_id).await?;
            if !wallet.is_active() {
                return Err(WalletError::WalletSuspended(wallet_id));
            }

            if let Some(existing) = self
                .withdrawals
                .find_by_idempotency_key(wallet_id, &request.idempotency_key)
                .await?
            {
                let ttl = Duration::seconds(self.config.idempotency_ttl_secs as i64);
                if Utc::now() - existing.created_at < ttl {
                    if existing.amount == request.amount
                        && existing.destination == request.destination
                    {
                        tracing::debug!(
                            wallet = %wallet_id,
                            withdrawal = %existing.id,
                            key = %request.idempotency_key,
                            "request deduplicated by idempotency key"
                        );
                        return Ok(existing);
                    }
                    return Err(WalletError::DuplicateRequest(request.idempotency_key));
                }
            }

            let id = self.withdrawals.next_id().await?;
            self.store
                .reserve_locked(wallet_id, id, request.amount)
                .await?;
            let withdrawal = Withdrawal::new(
                id,
                wallet_id,
                request.amount,
                request.destination,
                request.method,
                request.idempotency_key,
            );
            self.withdrawals.store(withdrawal.clone()).await?;
            tracing::info!(
                wallet = %wallet_id,
                withdrawal = %id,
                amount = %request.amount,
                "withdrawal requested"
            );
            withdrawal
        };

        // Fire-and-forget dispatch; a dead queue leaves the row pending with
        // its hold intact for the operator to re-enqueue.
        if let Err(e) = self.queue.enqueue(withdrawal.id).await {
            tracing::warn!(withdrawal = %withdrawal.id, error = %e, "payout enqueue failed");
        }

        Ok(withdrawal)
    }

    /// Processor callback: the payout has been picked up.
    pub async fn mark_processing(&self, id: WithdrawalId) -> Result<Withdrawal> {
        let found = self.get(id).await?;
        let _guard = self.store.lock(found.wallet_id).await?;

        let mut withdrawal = self.get(id).await?;
        withdrawal.begin_processing()?;
        self.withdrawals.store(withdrawal.clone()).await?;
        tracing::info!(withdrawal = %id, "withdrawal processing");
        Ok(withdrawal)
    }

    /// Processor callback: the transfer succeeded.
    ///
    /// Idempotent for redelivery: completing an already-completed withdrawal
    /// is a no-op returning the settled row.
    pub async fn complete(
        &self,
        id: WithdrawalId,
        provider_reference: &str,
    ) -> Result<Withdrawal> {
        let found = self.get(id).await?;
        let _guard = self.store.lock(found.wallet_id).await?;

        let mut withdrawal = self.get(id).await?;
        if withdrawal.status == WithdrawalStatus::Completed {
            return Ok(withdrawal);
        }
        withdrawal.complete(provider_reference)?;
        self.store.complete_locked(&withdrawal).await?;
        self.withdrawals.store(withdrawal.clone()).await?;
        tracing::info!(
            withdrawal = %id,
            provider_reference,
            "withdrawal completed"
        );
        Ok(withdrawal)
    }

    /// Processor callback: the transfer failed; the hold returns to the
    /// available balance.
    pub async fn fail(&self, id: WithdrawalId, reason: &str) -> Result<Withdrawal> {
        let found = self.get(id).await?;
        let _guard = self.store.lock(found.wallet_id).await?;

        let mut withdrawal = self.get(id).await?;
        withdrawal.fail(reason)?;
        self.store.release_locked(&withdrawal).await?;
        self.withdrawals.store(withdrawal.clone()).await?;
        tracing::warn!(withdrawal = %id, reason, "withdrawal failed");
        Ok(withdrawal)
    }

    /// Client cancellation, only before the processor picks the payout up.
    pub async fn cancel(&self, id: WithdrawalId, reason: &str) -> Result<Withdrawal> {
        let found = self.get(id).await?;
        let _guard = self.store.lock(found.wallet_id).await?;

        let mut withdrawal = self.get(id).await?;
        withdrawal.cancel(reason)?;
        self.store.release_locked(&withdrawal).await?;
        self.withdrawals.store(withdrawal.clone()).await?;
        tracing::info!(withdrawal = %id, reason, "withdrawal cancelled");
        Ok(withdrawal)
    }

    /// Forces a definitive failure on every withdrawal stuck in `processing`
    /// past the configured threshold, releasing its hold. Prevents funds from
    /// staying reserved forever when the processor never calls back.
    pub async fn reconcile_stale(&self) -> Result<Vec<Withdrawal>> {
        let cutoff = Utc::now() - Duration::seconds(self.config.stale_processing_secs as i64);
        let stale = self.withdrawals.stale_processing(cutoff).await?;

        let mut reconciled = Vec::with_capacity(stale.len());
        for withdrawal in stale {
            match self
                .fail(withdrawal.id, "processing timed out without a processor callback")
                .await
            {
                Ok(w) => reconciled.push(w),
                // A callback may land between the scan and the lock; that
                // withdrawal is no longer stale.
                Err(WalletError::InvalidStateTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if !reconciled.is_empty() {
            tracing::warn!(count = reconciled.len(), "stale withdrawals reconciled");
        }
        Ok(reconciled)
    }
}
