use crate::application::store::BalanceSnapshot;
use crate::domain::wallet::{Wallet, WalletStatus};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct SummaryRow {
    owner: u64,
    balance: i64,
    available: i64,
    pending: i64,
    status: &'static str,
}

/// Writes final per-wallet summaries as CSV:
/// `owner,balance,available,pending,status`.
pub struct SummaryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SummaryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_wallets(
        &mut self,
        wallets: impl IntoIterator<Item = (Wallet, BalanceSnapshot)>,
    ) -> Result<()> {
        for (wallet, snapshot) in wallets {
            self.writer.serialize(SummaryRow {
                owner: wallet.owner.0,
                balance: snapshot.balance.value(),
                available: snapshot.available.value(),
                pending: snapshot.pending.value(),
                status: match wallet.status {
                    WalletStatus::Active => "active",
                    WalletStatus::Suspended => "suspended",
                },
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
