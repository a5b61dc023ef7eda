use serde::Deserialize;

/// Tunables for the wallet core.
///
/// All monetary fields are minor currency units.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Currency assigned to lazily created wallets.
    pub currency: String,
    /// Smallest withdrawal the platform pays out.
    pub minimum_withdrawal: i64,
    /// How long a withdrawal deduplicates retries carrying its idempotency key.
    pub idempotency_ttl_secs: u64,
    /// A withdrawal stuck in `processing` longer than this without a callback
    /// is reconciled by force-releasing its hold.
    pub stale_processing_secs: u64,
    /// Upper bound on waiting for a per-wallet lock before reporting the
    /// transient `LockTimeout` error.
    pub lock_timeout_ms: u64,
    /// Hard cap on `per_page` for ledger queries.
    pub max_page_size: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            minimum_withdrawal: 100,
            idempotency_ttl_secs: 24 * 60 * 60,
            stale_processing_secs: 30 * 60,
            lock_timeout_ms: 5_000,
            max_page_size: 50,
        }
    }
}
