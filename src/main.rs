use clap::Parser;
use courier_wallet::WalletConfig;
use courier_wallet::application::service::WalletService;
use courier_wallet::application::withdrawals::WithdrawalRequest;
use courier_wallet::domain::money::Amount;
use courier_wallet::domain::wallet::{OwnerId, WithdrawalId};
use courier_wallet::domain::withdrawal::PayoutMethod;
use courier_wallet::infrastructure::in_memory::{
    InMemoryPayoutQueue, InMemoryTransactionRepo, InMemoryWalletRepo, InMemoryWithdrawalRepo,
};
use courier_wallet::interfaces::csv::event_reader::{EventOp, EventReader, WalletEvent};
use courier_wallet::interfaces::csv::summary_writer::SummaryWriter;
use miette::{IntoDiagnostic, Result, miette};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input wallet-events CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Minimum withdrawal amount in minor units
    #[arg(long)]
    minimum: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = WalletConfig::default();
    if let Some(minimum) = cli.minimum {
        config.minimum_withdrawal = minimum;
    }

    let service = build_service(&cli, config)?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);

    // request rows register their idempotency key here; callback rows use it
    // to find their withdrawal.
    let mut requests: HashMap<(u64, String), WithdrawalId> = HashMap::new();

    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = apply_event(&service, &mut requests, event).await {
                    eprintln!("Error processing event: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {e}");
            }
        }
    }

    let mut rows = Vec::new();
    for wallet in service.store().get_all_wallets().await.into_diagnostic()? {
        let snapshot = service.store().balances(wallet.id).await.into_diagnostic()?;
        rows.push((wallet, snapshot));
    }
    rows.sort_by_key(|(wallet, _)| wallet.owner);

    let stdout = io::stdout();
    SummaryWriter::new(stdout.lock())
        .write_wallets(rows)
        .into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_service(cli: &Cli, config: WalletConfig) -> Result<WalletService> {
    use courier_wallet::infrastructure::rocksdb::RocksDbStore;

    if let Some(db_path) = &cli.db_path {
        let store = RocksDbStore::open(db_path).into_diagnostic()?;
        return Ok(WalletService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::new(InMemoryPayoutQueue::new()),
            config,
        ));
    }
    Ok(in_memory_service(config))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_service(_cli: &Cli, config: WalletConfig) -> Result<WalletService> {
    Ok(in_memory_service(config))
}

fn in_memory_service(config: WalletConfig) -> WalletService {
    WalletService::new(
        Arc::new(InMemoryWalletRepo::new()),
        Arc::new(InMemoryTransactionRepo::new()),
        Arc::new(InMemoryWithdrawalRepo::new()),
        Arc::new(InMemoryPayoutQueue::new()),
        config,
    )
}

async fn apply_event(
    service: &WalletService,
    requests: &mut HashMap<(u64, String), WithdrawalId>,
    event: WalletEvent,
) -> Result<()> {
    let wallet = service
        .wallet_for_owner(OwnerId(event.owner))
        .await
        .into_diagnostic()?;

    match event.op {
        EventOp::Credit => {
            let amount = required_amount(&event)?;
            service
                .credit(wallet.id, amount, HashMap::new())
                .await
                .into_diagnostic()?;
        }
        EventOp::Request => {
            let amount = required_amount(&event)?;
            let key = required_reference(&event)?;
            let destination = event
                .destination
                .clone()
                .unwrap_or_else(|| "bank:on-file".to_string());
            let withdrawal = service
                .request_withdrawal(
                    wallet.id,
                    WithdrawalRequest {
                        amount,
                        destination,
                        method: PayoutMethod::BankTransfer,
                        idempotency_key: key.clone(),
                    },
                )
                .await
                .into_diagnostic()?;
            requests.insert((event.owner, key), withdrawal.id);
        }
        EventOp::Processing => {
            let id = known_withdrawal(requests, &event)?;
            service.on_processing_started(id).await.into_diagnostic()?;
        }
        EventOp::Complete => {
            let id = known_withdrawal(requests, &event)?;
            service.on_completed(id, "replay").await.into_diagnostic()?;
        }
        EventOp::Fail => {
            let id = known_withdrawal(requests, &event)?;
            service
                .on_failed(id, "replay failure")
                .await
                .into_diagnostic()?;
        }
        EventOp::Cancel => {
            let id = known_withdrawal(requests, &event)?;
            service
                .cancel_withdrawal(id, "cancelled in replay")
                .await
                .into_diagnostic()?;
        }
    }
    Ok(())
}

fn required_amount(event: &WalletEvent) -> Result<Amount> {
    let value = event
        .amount
        .ok_or_else(|| miette!("event is missing an amount"))?;
    Amount::new(value).into_diagnostic()
}

fn required_reference(event: &WalletEvent) -> Result<String> {
    event
        .reference
        .clone()
        .ok_or_else(|| miette!("event is missing a reference"))
}

fn known_withdrawal(
    requests: &HashMap<(u64, String), WithdrawalId>,
    event: &WalletEvent,
) -> Result<WithdrawalId> {
    let key = required_reference(event)?;
    requests
        .get(&(event.owner, key.clone()))
        .copied()
        .ok_or_else(|| miette!("no prior request with reference {key:?}"))
}
