use courier_wallet::WalletConfig;
use courier_wallet::application::service::WalletService;
use courier_wallet::application::withdrawals::WithdrawalRequest;
use courier_wallet::domain::money::Amount;
use courier_wallet::domain::wallet::{OwnerId, WalletId};
use courier_wallet::domain::withdrawal::PayoutMethod;
use courier_wallet::infrastructure::in_memory::{
    InMemoryPayoutQueue, InMemoryTransactionRepo, InMemoryWalletRepo, InMemoryWithdrawalRepo,
};
use std::collections::HashMap;
use std::sync::Arc;

pub fn service_with(config: WalletConfig) -> WalletService {
    WalletService::new(
        Arc::new(InMemoryWalletRepo::new()),
        Arc::new(InMemoryTransactionRepo::new()),
        Arc::new(InMemoryWithdrawalRepo::new()),
        Arc::new(InMemoryPayoutQueue::new()),
        config,
    )
}

pub fn service() -> WalletService {
    service_with(WalletConfig::default())
}

pub fn withdrawal_request(amount: i64, key: &str) -> WithdrawalRequest {
    WithdrawalRequest {
        amount: Amount::new(amount).unwrap(),
        destination: "bank:acct-77".to_string(),
        method: PayoutMethod::BankTransfer,
        idempotency_key: key.to_string(),
    }
}

pub async fn funded_wallet(service: &WalletService, owner: u64, amount: i64) -> WalletId {
    let wallet = service.wallet_for_owner(OwnerId(owner)).await.unwrap();
    service
        .credit(wallet.id, Amount::new(amount).unwrap(), HashMap::new())
        .await
        .unwrap();
    wallet.id
}
