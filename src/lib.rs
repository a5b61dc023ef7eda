pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;

pub use config::WalletConfig;
pub use error::{Result, WalletError};
