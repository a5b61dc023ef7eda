use super::wallet::{TransactionId, WalletId, WithdrawalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of ledger event kinds.
///
/// Keeping the set closed (instead of free-form type strings) makes ledger
/// reconciliation exhaustive: every variant has a defined effect on the
/// settled balance and on the outstanding reservation total.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Delivery fee or other earning; stored amount is positive.
    Credit,
    /// Direct debit; stored amount is negative.
    Debit,
    /// Hold placed for an in-flight withdrawal; stored negative, no balance effect.
    WithdrawalReserve,
    /// Hold returned after a failed/cancelled withdrawal; stored positive.
    WithdrawalRelease,
    /// Debit settling a completed withdrawal; stored negative, consumes the hold.
    WithdrawalComplete,
    /// Manual correction posted by the platform; either sign.
    Adjustment,
}

impl TransactionType {
    /// Contribution of a row with this type to the settled balance.
    ///
    /// Reservations and releases only move the derived pending total, never
    /// the balance itself.
    pub fn balance_delta(&self, amount: i64) -> i64 {
        match self {
            Self::Credit | Self::Debit | Self::Adjustment | Self::WithdrawalComplete => amount,
            Self::WithdrawalReserve | Self::WithdrawalRelease => 0,
        }
    }

    /// Contribution of a row with this type to the outstanding-hold total.
    ///
    /// A reserve (stored `-X`) grows the hold by `X`; a release (stored `+X`)
    /// or a completion (stored `-X`) consumes it.
    pub fn hold_delta(&self, amount: i64) -> i64 {
        match self {
            Self::WithdrawalReserve => -amount,
            Self::WithdrawalRelease => -amount,
            Self::WithdrawalComplete => amount,
            Self::Credit | Self::Debit | Self::Adjustment => 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Posted,
    Reversed,
}

/// One immutable row of the wallet ledger.
///
/// Rows are written exactly once by the wallet store and never mutated or
/// deleted; replaying the posted rows of a wallet from zero reproduces its
/// balance.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    /// Signed amount in minor units; sign convention per [`TransactionType`].
    pub amount: i64,
    pub r#type: TransactionType,
    pub status: TransactionStatus,
    pub withdrawal_id: Option<WithdrawalId>,
    pub created_at: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

impl Transaction {
    pub fn balance_delta(&self) -> i64 {
        match self.status {
            TransactionStatus::Posted => self.r#type.balance_delta(self.amount),
            TransactionStatus::Reversed => 0,
        }
    }

    pub fn hold_delta(&self) -> i64 {
        match self.status {
            TransactionStatus::Posted => self.r#type.hold_delta(self.amount),
            TransactionStatus::Reversed => 0,
        }
    }
}

/// Filter applied by paginated ledger queries.
#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    pub r#type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(t) = self.r#type
            && tx.r#type != t
        {
            return false;
        }
        if let Some(s) = self.status
            && tx.status != s
        {
            return false;
        }
        if let Some(from) = self.from
            && tx.created_at < from
        {
            return false;
        }
        if let Some(to) = self.to
            && tx.created_at > to
        {
            return false;
        }
        true
    }
}
