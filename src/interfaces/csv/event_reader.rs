use crate::error::{Result, WalletError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventOp {
    /// Credit earnings to the owner's wallet.
    Credit,
    /// Request a withdrawal; `reference` carries the idempotency key.
    Request,
    /// Processor callback: payout picked up.
    Processing,
    /// Processor callback: payout succeeded.
    Complete,
    /// Processor callback: payout failed.
    Fail,
    /// Client cancellation of a pending withdrawal.
    Cancel,
}

/// One replay row: `op, owner, amount, reference, destination`.
///
/// Callback rows identify their withdrawal through the idempotency key the
/// `request` row carried in `reference`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct WalletEvent {
    pub op: EventOp,
    pub owner: u64,
    pub amount: Option<i64>,
    pub reference: Option<String>,
    pub destination: Option<String>,
}

/// Reads wallet events from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding an iterator of `Result<WalletEvent>` for streaming large files.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn events(self) -> impl Iterator<Item = Result<WalletEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WalletError::from))
    }
}
