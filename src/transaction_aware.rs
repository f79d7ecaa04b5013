use async_trait::async_trait;

use crate::unit_of_work::SessionState;

/// Error type for transaction-aware operations
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),

    #[error("Transaction rollback failed: {0}")]
    RollbackFailed(String),

    #[error("Cannot {operation} a session in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(i64),

    #[error("No active transaction on this session")]
    NoActiveTransaction,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Result type for transaction-aware operations
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Trait for components that need to be notified of transaction lifecycle events.
///
/// Observers registered with a session (directly, or through
/// [`Transactional::observe`](crate::Transactional::observe)) are called
/// after the transaction has been committed or rolled back.
#[async_trait]
pub trait TransactionAware: Send + Sync {
    /// Called after a successful transaction commit.
    async fn on_commit(&self) -> TransactionResult<()>;

    /// Called after a transaction rollback.
    async fn on_rollback(&self) -> TransactionResult<()>;
}
