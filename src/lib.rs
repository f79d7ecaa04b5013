//! Transactional Funds Transfer
//!
//! A higher-order wrapper that runs request handlers inside a PostgreSQL
//! transaction, and a funds-transfer handler that can run with or without it.

pub mod account;
pub mod config;
pub mod executor;
pub mod logging;
pub mod outcome;
pub mod routes;
pub mod transaction_aware;
pub mod transactional;
pub mod transfer;
pub mod unit_of_work;

pub use account::{Account, AccountRepository};
pub use executor::Executor;
pub use outcome::Outcome;
pub use transaction_aware::{TransactionAware, TransactionError, TransactionResult};
pub use transactional::Transactional;
pub use transfer::{transfer, TransferOutcome, TransferRequest};
pub use unit_of_work::{PostgresUnitOfWork, PostgresUnitOfWorkSession, SessionState, UnitOfWork, UnitOfWorkSession};
