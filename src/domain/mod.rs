pub mod money;
pub mod ports;
pub mod transaction;
pub mod wallet;
pub mod withdrawal;
