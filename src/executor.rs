use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{TransactionError, TransactionResult};

/// Executor is the handle a handler uses to scope its reads and writes to a
/// session's transaction.
///
/// The slot stays empty until the session starts its transaction and is
/// emptied again when the transaction is committed or rolled back, so a
/// handle that outlives its session can no longer reach the database.
#[derive(Clone, Debug, Default)]
pub struct Executor {
    pub tx: Arc<Mutex<Option<Transaction<'static, Postgres>>>>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn install(&self, tx: Transaction<'static, Postgres>) {
        *self.tx.lock().await = Some(tx);
    }

    /// Takes ownership of the transaction, leaving None in its place.
    /// This should only be called when committing or rolling back.
    pub(crate) async fn take_transaction(&self) -> TransactionResult<Transaction<'static, Postgres>> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or(TransactionError::NoActiveTransaction)
    }

    pub async fn is_active(&self) -> bool {
        self.tx.lock().await.is_some()
    }
}
