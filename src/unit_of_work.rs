use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sqlx::PgPool;
use std::sync::Arc;

use crate::{Executor, TransactionAware, TransactionError, TransactionResult};

/// Lifecycle of a [`UnitOfWorkSession`].
///
/// `Started -> Active -> Committed | Aborted`. A session is released by
/// [`UnitOfWorkSession::end`], which consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Started,
    Active,
    Committed,
    Aborted,
}

/// Unit of Work pattern for managing database transactions.
///
/// The UnitOfWork is the factory for transactional sessions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: UnitOfWorkSession;

    /// Open a new session. No transaction is running yet.
    async fn start_session(&self) -> TransactionResult<Self::Session>;

    /// Open a new session and begin its transaction.
    async fn begin(&self) -> TransactionResult<Self::Session> {
        let session = self.start_session().await?;
        session.start_transaction().await?;
        Ok(session)
    }
}

/// Represents a single database session and the transaction running on it.
#[async_trait]
pub trait UnitOfWorkSession: Send + Sync + Sized {
    /// Handle passed to handlers so their operations join the transaction.
    type Executor: Clone + Send + Sync + 'static;

    /// Get the executor for this session.
    fn executor(&self) -> &Self::Executor;

    fn state(&self) -> SessionState;

    /// Register a component that needs to be notified of transaction events.
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>);

    /// Begin the transaction. Only valid on a `Started` session.
    async fn start_transaction(&self) -> TransactionResult<()>;

    /// Commit the transaction and notify all registered observers.
    async fn commit(&self) -> TransactionResult<()>;

    /// Rollback the transaction and notify all registered observers.
    async fn rollback(&self) -> TransactionResult<()>;

    /// Release the session. A transaction still open at this point is
    /// rolled back.
    async fn end(self) -> TransactionResult<()>;
}

/// Default implementation of UnitOfWork for PostgreSQL.
pub struct PostgresUnitOfWork {
    pool: Arc<PgPool>,
}

impl PostgresUnitOfWork {
    /// Create a new PostgresUnitOfWork with the given connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    type Session = PostgresUnitOfWorkSession;

    async fn start_session(&self) -> TransactionResult<Self::Session> {
        Ok(PostgresUnitOfWorkSession::new(self.pool.clone()))
    }
}

/// Default implementation of UnitOfWorkSession for PostgreSQL.
pub struct PostgresUnitOfWorkSession {
    pool: Arc<PgPool>,
    executor: Executor,
    state: Mutex<SessionState>,
    observers: Arc<RwLock<Vec<Arc<dyn TransactionAware>>>>,
}

impl PostgresUnitOfWorkSession {
    /// Create a new session on the given pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            executor: Executor::new(),
            state: Mutex::new(SessionState::Started),
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn expect_state(&self, operation: &'static str, expected: SessionState) -> TransactionResult<()> {
        let state = *self.state.lock();
        if state != expected {
            return Err(TransactionError::InvalidState { operation, state });
        }
        Ok(())
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    async fn notify(&self, committed: bool) -> TransactionResult<()> {
        let observers = self.observers.read().clone();
        for observer in observers.iter() {
            if committed {
                observer.on_commit().await?;
            } else {
                observer.on_rollback().await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkSession for PostgresUnitOfWorkSession {
    type Executor = Executor;

    fn executor(&self) -> &Executor {
        &self.executor
    }

    fn state(&self) -> SessionState {
        *self.state.lock()
    }

    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    async fn start_transaction(&self) -> TransactionResult<()> {
        self.expect_state("start a transaction on", SessionState::Started)?;
        let tx = self.pool.begin().await?;
        self.executor.install(tx).await;
        self.set_state(SessionState::Active);
        Ok(())
    }

    async fn commit(&self) -> TransactionResult<()> {
        self.expect_state("commit", SessionState::Active)?;
        let tx = self.executor.take_transaction().await?;

        if let Err(e) = tx.commit().await {
            // A failed COMMIT leaves nothing applied.
            self.set_state(SessionState::Aborted);
            return Err(TransactionError::CommitFailed(e.to_string()));
        }
        self.set_state(SessionState::Committed);

        self.notify(true).await
    }

    async fn rollback(&self) -> TransactionResult<()> {
        self.expect_state("roll back", SessionState::Active)?;
        let tx = self.executor.take_transaction().await?;
        self.set_state(SessionState::Aborted);

        tx.rollback()
            .await
            .map_err(|e| TransactionError::RollbackFailed(e.to_string()))?;

        self.notify(false).await
    }

    async fn end(self) -> TransactionResult<()> {
        let state = self.state();
        if state == SessionState::Active {
            tracing::warn!("ending session with an open transaction, rolling back");
            let tx = self.executor.take_transaction().await?;
            self.set_state(SessionState::Aborted);
            tx.rollback()
                .await
                .map_err(|e| TransactionError::RollbackFailed(e.to_string()))?;
        }
        Ok(())
    }
}
