use super::money::Amount;
use super::wallet::{WalletId, WithdrawalId};
use crate::error::WalletError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMethod {
    BankTransfer,
    MobileMoney,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A payout request from a wallet to an external destination.
///
/// The amount is fixed at creation and never changes; rows are never deleted
/// so the full payout history stays auditable. State moves only through the
/// mutators below: `pending -> processing -> {completed | failed}` and
/// `pending -> cancelled`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub wallet_id: WalletId,
    pub amount: Amount,
    pub destination: String,
    pub method: PayoutMethod,
    pub status: WithdrawalStatus,
    pub failure_reason: Option<String>,
    pub provider_reference: Option<String>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn new(
        id: WithdrawalId,
        wallet_id: WalletId,
        amount: Amount,
        destination: impl Into<String>,
        method: PayoutMethod,
        idempotency_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            wallet_id,
            amount,
            destination: destination.into(),
            method,
            status: WithdrawalStatus::Pending,
            failure_reason: None,
            provider_reference: None,
            idempotency_key: idempotency_key.into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn transition_error(&self, action: &'static str) -> WalletError {
        WalletError::InvalidStateTransition {
            id: self.id,
            from: self.status,
            action,
        }
    }

    /// The payout processor picked the request up.
    pub fn begin_processing(&mut self) -> Result<(), WalletError> {
        if self.status != WithdrawalStatus::Pending {
            return Err(self.transition_error("begin processing"));
        }
        self.status = WithdrawalStatus::Processing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Definitive success callback from the processor.
    pub fn complete(&mut self, provider_reference: impl Into<String>) -> Result<(), WalletError> {
        if self.status != WithdrawalStatus::Processing {
            return Err(self.transition_error("complete"));
        }
        self.status = WithdrawalStatus::Completed;
        self.provider_reference = Some(provider_reference.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Definitive failure callback from the processor.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), WalletError> {
        if self.status != WithdrawalStatus::Processing {
            return Err(self.transition_error("fail"));
        }
        self.status = WithdrawalStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Client-side cancellation, allowed only before the processor picks the
    /// request up.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), WalletError> {
        if self.status != WithdrawalStatus::Pending {
            return Err(self.transition_error("cancel"));
        }
        self.status = WithdrawalStatus::Cancelled;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn withdrawal() -> Withdrawal {
        Withdrawal::new(
            WithdrawalId(1),
            WalletId(1),
            Amount::new(300).unwrap(),
            "bank:acct-77",
            PayoutMethod::BankTransfer,
            "key-1",
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut w = withdrawal();
        assert_eq!(w.status, WithdrawalStatus::Pending);

        w.begin_processing().unwrap();
        assert_eq!(w.status, WithdrawalStatus::Processing);

        w.complete("prov-123").unwrap();
        assert_eq!(w.status, WithdrawalStatus::Completed);
        assert_eq!(w.provider_reference.as_deref(), Some("prov-123"));
    }

    #[test]
    fn test_fail_records_reason_and_is_terminal() {
        let mut w = withdrawal();
        w.begin_processing().unwrap();
        w.fail("destination account closed").unwrap();

        assert_eq!(w.status, WithdrawalStatus::Failed);
        assert!(w.status.is_terminal());
        assert!(w.fail("again").is_err());
        assert!(w.complete("prov").is_err());
    }

    #[test]
    fn test_cancel_only_while_pending() {
        let mut w = withdrawal();
        w.begin_processing().unwrap();

        let err = w.cancel("changed my mind").unwrap_err();
        assert!(matches!(
            err,
            WalletError::InvalidStateTransition {
                from: WithdrawalStatus::Processing,
                ..
            }
        ));

        let mut fresh = withdrawal();
        fresh.cancel("changed my mind").unwrap();
        assert_eq!(fresh.status, WithdrawalStatus::Cancelled);
    }

    #[test]
    fn test_complete_requires_processing() {
        let mut w = withdrawal();
        assert!(w.complete("prov").is_err());
        assert_eq!(w.status, WithdrawalStatus::Pending);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut w = withdrawal();
        w.begin_processing().unwrap();
        w.complete("prov").unwrap();

        assert!(w.begin_processing().is_err());
        assert!(w.fail("late failure").is_err());
        assert!(w.cancel("too late").is_err());
        assert_eq!(w.status, WithdrawalStatus::Completed);
    }
}
