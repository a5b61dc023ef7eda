use super::money::Balance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a wallet.
    WalletId
);
id_newtype!(
    /// Identifier of a wallet owner (courier or agent) in the surrounding platform.
    OwnerId
);
id_newtype!(
    /// Identifier of a ledger transaction.
    TransactionId
);
id_newtype!(
    /// Identifier of a withdrawal.
    WithdrawalId
);

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Suspended,
}

/// A courier/agent wallet holding delivery earnings.
///
/// `balance` is the settled total in minor units; the available balance is
/// derived from the ledger (balance minus outstanding reservations) and is
/// never stored here.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub id: WalletId,
    pub owner: OwnerId,
    pub balance: Balance,
    pub currency: String,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(id: WalletId, owner: OwnerId, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner,
            balance: Balance::ZERO,
            currency: currency.into(),
            status: WalletStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == WalletStatus::Active
    }
}
