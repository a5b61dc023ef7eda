pub mod ledger;
pub mod service;
pub mod store;
pub mod withdrawals;
