use crate::domain::ports::{TransactionRepo, WalletRepo, WithdrawalRepo};
use crate::domain::transaction::Transaction;
use crate::domain::wallet::{OwnerId, TransactionId, Wallet, WalletId, WithdrawalId};
use crate::domain::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Column family for wallet rows, keyed by wallet id.
pub const CF_WALLETS: &str = "wallets";
/// Column family mapping owner id to wallet id (lazy-creation index).
pub const CF_OWNERS: &str = "owners";
/// Column family for ledger rows, keyed by wallet id ++ transaction id so one
/// wallet's ledger is a contiguous, ordered key range.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column family for withdrawal rows, keyed by withdrawal id.
pub const CF_WITHDRAWALS: &str = "withdrawals";

/// Persistent store backed by RocksDB.
///
/// Implements all three repositories over separate column families; values
/// are serde_json. Id counters are recovered from the highest stored key on
/// open. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    next_wallet_id: Arc<AtomicU64>,
    next_tx_id: Arc<AtomicU64>,
    next_withdrawal_id: Arc<AtomicU64>,
    /// Serializes lazy wallet creation so one owner never gets two wallets.
    create_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_WALLETS, CF_OWNERS, CF_TRANSACTIONS, CF_WITHDRAWALS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        let next_wallet_id = max_key_suffix(&db, CF_WALLETS)?;
        let next_tx_id = max_key_suffix(&db, CF_TRANSACTIONS)?;
        let next_withdrawal_id = max_key_suffix(&db, CF_WITHDRAWALS)?;

        Ok(Self {
            db: Arc::new(db),
            next_wallet_id: Arc::new(AtomicU64::new(next_wallet_id)),
            next_tx_id: Arc::new(AtomicU64::new(next_tx_id)),
            next_withdrawal_id: Arc::new(AtomicU64::new(next_withdrawal_id)),
            create_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            crate::error::WalletError::Validation(format!("column family {name} not found"))
        })
    }

    fn put_json<T: serde::Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf)?;
        self.db.put_cf(&cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf)?;
        match self.db.get_cf(&cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// Highest trailing-u64 key in a column family; ids continue from there.
fn max_key_suffix(db: &DB, cf_name: &str) -> Result<u64> {
    let cf = db.cf_handle(cf_name).ok_or_else(|| {
        crate::error::WalletError::Validation(format!("column family {cf_name} not found"))
    })?;
    let mut max = 0u64;
    for item in db.iterator_cf(&cf, IteratorMode::Start) {
        let (key, _) = item?;
        if key.len() >= 8 {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&key[key.len() - 8..]);
            max = max.max(u64::from_be_bytes(buf));
        }
    }
    Ok(max)
}

fn tx_key(wallet_id: WalletId, tx_id: TransactionId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&wallet_id.0.to_be_bytes());
    key[8..].copy_from_slice(&tx_id.0.to_be_bytes());
    key
}

#[async_trait]
impl WalletRepo for RocksDbStore {
    async fn get_or_create(&self, owner: OwnerId, currency: &str) -> Result<Wallet> {
        let _guard = self.create_lock.lock().await;
        if let Some(id) = self.get_json::<WalletId>(CF_OWNERS, &owner.0.to_be_bytes())?
            && let Some(wallet) = self.get_json::<Wallet>(CF_WALLETS, &id.0.to_be_bytes())?
        {
            return Ok(wallet);
        }
        let id = WalletId(self.next_wallet_id.fetch_add(1, Ordering::SeqCst) + 1);
        let wallet = Wallet::new(id, owner, currency);
        self.put_json(CF_WALLETS, &id.0.to_be_bytes(), &wallet)?;
        self.put_json(CF_OWNERS, &owner.0.to_be_bytes(), &id)?;
        Ok(wallet)
    }

    async fn get(&self, id: WalletId) -> Result<Option<Wallet>> {
        self.get_json(CF_WALLETS, &id.0.to_be_bytes())
    }

    async fn store(&self, wallet: Wallet) -> Result<()> {
        self.put_json(CF_OWNERS, &wallet.owner.0.to_be_bytes(), &wallet.id)?;
        self.put_json(CF_WALLETS, &wallet.id.0.to_be_bytes(), &wallet)
    }

    async fn get_all(&self) -> Result<Vec<Wallet>> {
        let cf = self.cf(CF_WALLETS)?;
        let mut wallets = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            wallets.push(serde_json::from_slice(&value)?);
        }
        Ok(wallets)
    }
}

#[async_trait]
impl TransactionRepo for RocksDbStore {
    async fn next_id(&self) -> Result<TransactionId> {
        Ok(TransactionId(self.next_tx_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn append(&self, tx: Transaction) -> Result<()> {
        self.put_json(CF_TRANSACTIONS, &tx_key(tx.wallet_id, tx.id), &tx)
    }

    async fn for_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let prefix = wallet_id.0.to_be_bytes();
        let mut rows = Vec::new();
        for item in self.db.prefix_iterator_cf(&cf, prefix) {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl WithdrawalRepo for RocksDbStore {
    async fn next_id(&self) -> Result<WithdrawalId> {
        Ok(WithdrawalId(
            self.next_withdrawal_id.fetch_add(1, Ordering::SeqCst) + 1,
        ))
    }

    async fn store(&self, withdrawal: Withdrawal) -> Result<()> {
        self.put_json(CF_WITHDRAWALS, &withdrawal.id.0.to_be_bytes(), &withdrawal)
    }

    async fn get(&self, id: WithdrawalId) -> Result<Option<Withdrawal>> {
        self.get_json(CF_WITHDRAWALS, &id.0.to_be_bytes())
    }

    async fn find_by_idempotency_key(
        &self,
        wallet_id: WalletId,
        key: &str,
    ) -> Result<Option<Withdrawal>> {
        let all = self.scan_withdrawals()?;
        Ok(all
            .into_iter()
            .filter(|w| w.wallet_id == wallet_id && w.idempotency_key == key)
            .max_by_key(|w| w.created_at))
    }

    async fn for_wallet(&self, wallet_id: WalletId) -> Result<Vec<Withdrawal>> {
        let all = self.scan_withdrawals()?;
        Ok(all.into_iter().filter(|w| w.wallet_id == wallet_id).collect())
    }

    async fn stale_processing(&self, cutoff: DateTime<Utc>) -> Result<Vec<Withdrawal>> {
        let all = self.scan_withdrawals()?;
        Ok(all
            .into_iter()
            .filter(|w| w.status == WithdrawalStatus::Processing && w.updated_at <= cutoff)
            .collect())
    }
}

impl RocksDbStore {
    fn scan_withdrawals(&self) -> Result<Vec<Withdrawal>> {
        let cf = self.cf(CF_WITHDRAWALS)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }
}
