use crate::domain::wallet::{WalletId, WithdrawalId};
use crate::domain::withdrawal::WithdrawalStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalletError>;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    #[error("amount {requested} is below the minimum withdrawal of {minimum}")]
    BelowMinimum { requested: i64, minimum: i64 },

    #[error("wallet {0} is suspended")]
    WalletSuspended(WalletId),

    #[error("idempotency key {0:?} was already used with different parameters")]
    DuplicateRequest(String),

    #[error("withdrawal {id} cannot {action} from state {from}")]
    InvalidStateTransition {
        id: WithdrawalId,
        from: WithdrawalStatus,
        action: &'static str,
    },

    #[error("wallet {0} not found")]
    WalletNotFound(WalletId),

    #[error("withdrawal {0} not found")]
    WithdrawalNotFound(WithdrawalId),

    /// Transient: no partial mutation is visible, the whole operation is safe
    /// to retry.
    #[error("timed out waiting for the lock on wallet {0}")]
    LockTimeout(WalletId),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl WalletError {
    /// Transient errors carry no partial state; callers may retry verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout(_))
    }
}
