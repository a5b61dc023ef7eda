use crate::config::WalletConfig;
use crate::domain::ports::{TransactionRepoRef, WalletRepoRef};
use crate::domain::transaction::{Transaction, TransactionFilter, TransactionType};
use crate::domain::wallet::WalletId;
use crate::error::{Result, WalletError};
use chrono::{DateTime, Utc};

/// One page of a newest-first listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Inclusive time window for summaries; open ends mean "since forever" /
/// "until now".
#[derive(Debug, Default, Clone, Copy)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// Per-type totals over a period, all positive magnitudes except `net_change`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PeriodTotals {
    pub credits: i64,
    pub debits: i64,
    pub withdrawals_reserved: i64,
    pub withdrawals_released: i64,
    pub withdrawals_completed: i64,
    pub adjustments: i64,
    /// Signed effect on the balance; over a wallet's whole life this equals
    /// its balance.
    pub net_change: i64,
}

/// Read-only ledger queries: listings and per-period aggregation.
///
/// Unknown wallet ids are rejected with `WalletNotFound`, matching the store.
pub struct LedgerReader {
    wallets: WalletRepoRef,
    ledger: TransactionRepoRef,
    config: WalletConfig,
}

impl LedgerReader {
    pub fn new(wallets: WalletRepoRef, ledger: TransactionRepoRef, config: WalletConfig) -> Self {
        Self {
            wallets,
            ledger,
            config,
        }
    }

    async fn ensure_exists(&self, wallet_id: WalletId) -> Result<()> {
        self.wallets
            .get(wallet_id)
            .await?
            .map(|_| ())
            .ok_or(WalletError::WalletNotFound(wallet_id))
    }

    /// Latest `limit` rows, newest first.
    pub async fn recent(&self, wallet_id: WalletId, limit: usize) -> Result<Vec<Transaction>> {
        self.ensure_exists(wallet_id).await?;
        let mut rows = self.ledger.for_wallet(wallet_id).await?;
        rows.reverse();
        rows.truncate(limit);
        Ok(rows)
    }

    /// Filtered, paginated, newest-first listing. `page` is 1-based and
    /// `per_page` is clamped to the configured maximum.
    pub async fn query(
        &self,
        wallet_id: WalletId,
        filter: &TransactionFilter,
        page: usize,
        per_page: usize,
    ) -> Result<Page<Transaction>> {
        self.ensure_exists(wallet_id).await?;
        let page = page.max(1);
        let per_page = per_page.clamp(1, self.config.max_page_size);

        let mut rows = self.ledger.for_wallet(wallet_id).await?;
        rows.reverse();
        let matching: Vec<Transaction> = rows.into_iter().filter(|tx| filter.matches(tx)).collect();

        let total = matching.len();
        let total_pages = total.div_ceil(per_page);
        let items = matching
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        Ok(Page {
            items,
            page,
            per_page,
            total,
            total_pages,
        })
    }

    /// Per-type totals over `range`.
    pub async fn summary(&self, wallet_id: WalletId, range: DateRange) -> Result<PeriodTotals> {
        self.ensure_exists(wallet_id).await?;
        let rows = self.ledger.for_wallet(wallet_id).await?;
        let mut totals = PeriodTotals::default();
        for tx in rows.iter().filter(|tx| range.contains(tx.created_at)) {
            match tx.r#type {
                TransactionType::Credit => totals.credits += tx.amount,
                TransactionType::Debit => totals.debits += -tx.amount,
                TransactionType::WithdrawalReserve => totals.withdrawals_reserved += -tx.amount,
                TransactionType::WithdrawalRelease => totals.withdrawals_released += tx.amount,
                TransactionType::WithdrawalComplete => totals.withdrawals_completed += -tx.amount,
                TransactionType::Adjustment => totals.adjustments += tx.amount,
            }
            totals.net_change += tx.balance_delta();
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::store::WalletStore;
    use crate::domain::money::Amount;
    use crate::domain::transaction::TransactionStatus;
    use crate::domain::wallet::{OwnerId, WithdrawalId};
    use crate::infrastructure::in_memory::{InMemoryTransactionRepo, InMemoryWalletRepo};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn seeded() -> (WalletStore, LedgerReader, WalletId) {
        let wallets: WalletRepoRef = Arc::new(InMemoryWalletRepo::new());
        let ledger: TransactionRepoRef = Arc::new(InMemoryTransactionRepo::new());
        let store = WalletStore::new(
            Arc::clone(&wallets),
            Arc::clone(&ledger),
            WalletConfig::default(),
        );
        let reader = LedgerReader::new(wallets, ledger, WalletConfig::default());
        let wallet = store.wallet_for_owner(OwnerId(1)).await.unwrap();
        (store, reader, wallet.id)
    }

    #[tokio::test]
    async fn test_unknown_wallet_is_rejected() {
        let (_, reader, _) = seeded().await;
        let missing = WalletId(99);

        assert!(matches!(
            reader.recent(missing, 5).await,
            Err(WalletError::WalletNotFound(WalletId(99)))
        ));
        assert!(matches!(
            reader
                .query(missing, &TransactionFilter::default(), 1, 10)
                .await,
            Err(WalletError::WalletNotFound(_))
        ));
        assert!(matches!(
            reader.summary(missing, DateRange::all()).await,
            Err(WalletError::WalletNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let (store, reader, wallet_id) = seeded().await;
        for amount in [100, 200, 300] {
            store
                .credit(wallet_id, Amount::new(amount).unwrap(), HashMap::new())
                .await
                .unwrap();
        }

        let recent = reader.recent(wallet_id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].amount, 300);
        assert_eq!(recent[1].amount, 200);
    }

    #[tokio::test]
    async fn test_query_pagination_metadata() {
        let (store, reader, wallet_id) = seeded().await;
        for _ in 0..7 {
            store
                .credit(wallet_id, Amount::new(10).unwrap(), HashMap::new())
                .await
                .unwrap();
        }

        let page = reader
            .query(wallet_id, &TransactionFilter::default(), 2, 3)
            .await
            .unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.page, 2);

        let last = reader
            .query(wallet_id, &TransactionFilter::default(), 3, 3)
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
    }

    #[tokio::test]
    async fn test_per_page_is_clamped() {
        let (_, reader, wallet_id) = seeded().await;
        let page = reader
            .query(wallet_id, &TransactionFilter::default(), 1, 500)
            .await
            .unwrap();
        assert_eq!(page.per_page, 50);
    }

    #[tokio::test]
    async fn test_query_filters_by_type() {
        let (store, reader, wallet_id) = seeded().await;
        store
            .credit(wallet_id, Amount::new(1000).unwrap(), HashMap::new())
            .await
            .unwrap();
        store
            .reserve(wallet_id, WithdrawalId(1), Amount::new(300).unwrap())
            .await
            .unwrap();

        let filter = TransactionFilter {
            r#type: Some(TransactionType::WithdrawalReserve),
            status: Some(TransactionStatus::Posted),
            ..Default::default()
        };
        let page = reader.query(wallet_id, &filter, 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].amount, -300);
    }

    #[tokio::test]
    async fn test_summary_reconciles_with_balance() {
        let (store, reader, wallet_id) = seeded().await;
        store
            .credit(wallet_id, Amount::new(1000).unwrap(), HashMap::new())
            .await
            .unwrap();
        store
            .reserve(wallet_id, WithdrawalId(1), Amount::new(300).unwrap())
            .await
            .unwrap();
        store.adjust(wallet_id, -50, HashMap::new()).await.unwrap();

        let totals = reader.summary(wallet_id, DateRange::all()).await.unwrap();
        assert_eq!(totals.credits, 1000);
        assert_eq!(totals.withdrawals_reserved, 300);
        assert_eq!(totals.adjustments, -50);
        assert_eq!(totals.net_change, 950);

        let wallet = store.get_wallet(wallet_id).await.unwrap();
        assert_eq!(wallet.balance.value(), totals.net_change);
    }

    #[tokio::test]
    async fn test_summary_respects_range() {
        let (store, reader, wallet_id) = seeded().await;
        store
            .credit(wallet_id, Amount::new(1000).unwrap(), HashMap::new())
            .await
            .unwrap();

        let future_only = DateRange {
            from: Some(Utc::now() + chrono::Duration::hours(1)),
            to: None,
        };
        let totals = reader.summary(wallet_id, future_only).await.unwrap();
        assert_eq!(totals, PeriodTotals::default());
    }
}
