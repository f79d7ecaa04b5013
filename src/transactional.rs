//! Higher-order transactional wrapper.
//!
//! [`Transactional`] wraps a handler `H(ctx, executor)` into a callable
//! `call(ctx)` that owns the whole session lifecycle: start the session,
//! begin the transaction, run the handler, commit or roll back depending on
//! the outcome, and end the session exactly once.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::outcome::Outcome;
use crate::{TransactionAware, TransactionResult, UnitOfWork, UnitOfWorkSession};

type ExecutorOf<U> = <<U as UnitOfWork>::Session as UnitOfWorkSession>::Executor;

pub struct Transactional<U, H> {
    uow: Arc<U>,
    operation: &'static str,
    handler: H,
    observers: Vec<Arc<dyn TransactionAware>>,
}

impl<U, H> Transactional<U, H>
where
    U: UnitOfWork,
{
    /// Wrap `handler`. `operation` names the handler in logs.
    pub fn new(uow: Arc<U>, operation: &'static str, handler: H) -> Self {
        Self {
            uow,
            operation,
            handler,
            observers: Vec::new(),
        }
    }

    /// Register `observer` on every session this wrapper opens. For callers
    /// that need to react to commits or rollbacks; the built-in routes do not.
    pub fn observe(mut self, observer: Arc<dyn TransactionAware>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Run the wrapped handler inside a fresh transaction.
    ///
    /// Only [`Outcome::Success`] is committed; every other outcome rolls back.
    /// A business rejection is returned as the handler produced it. A handler
    /// error is logged and reported as [`Outcome::InfrastructureError`].
    /// Failures of the lifecycle itself (begin, commit, rollback, end) are returned as `Err`.
    pub async fn call<C, Fut, O, E>(&self, ctx: C) -> TransactionResult<Outcome>
    where
        H: Fn(C, ExecutorOf<U>) -> Fut,
        Fut: Future<Output = Result<O, E>>,
        O: Into<Outcome>,
        E: Display,
    {
        let operation = self.operation;
        let session = self.uow.start_session().await?;

        if let Err(e) = session.start_transaction().await {
            tracing::error!(operation, error = %e, "failed to begin transaction");
            session.end().await?;
            return Err(e);
        }
        for observer in &self.observers {
            session.register_transaction_aware(observer.clone());
        }

        let resolved = match (self.handler)(ctx, session.executor().clone()).await {
            Ok(outcome) => {
                let outcome = outcome.into();
                if outcome.is_success() {
                    tracing::debug!(operation, "handler succeeded, committing");
                    session.commit().await.map(|_| outcome)
                } else {
                    tracing::debug!(operation, status = %outcome.status(), "handler rejected request, rolling back");
                    session.rollback().await.map(|_| outcome)
                }
            }
            Err(e) => {
                tracing::error!(operation, error = %e, "handler failed, rolling back");
                session.rollback().await.map(|_| Outcome::InfrastructureError)
            }
        };

        let ended = session.end().await;
        let outcome = resolved?;
        ended?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SessionState, TransactionError};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use parking_lot::Mutex;

    /// Records every lifecycle call made against the sessions it hands out.
    #[derive(Default)]
    struct MockUnitOfWork {
        events: Arc<Mutex<Vec<&'static str>>>,
        fail_start: bool,
        fail_begin: bool,
        fail_commit: bool,
    }

    impl MockUnitOfWork {
        fn events(&self) -> Vec<&'static str> {
            self.events.lock().clone()
        }
    }

    struct MockSession {
        events: Arc<Mutex<Vec<&'static str>>>,
        state: Mutex<SessionState>,
        fail_begin: bool,
        fail_commit: bool,
        observers: Mutex<Vec<Arc<dyn TransactionAware>>>,
    }

    #[async_trait]
    impl UnitOfWork for MockUnitOfWork {
        type Session = MockSession;

        async fn start_session(&self) -> TransactionResult<MockSession> {
            if self.fail_start {
                return Err(TransactionError::DatabaseError(sqlx::Error::PoolTimedOut));
            }
            self.events.lock().push("start_session");
            Ok(MockSession {
                events: self.events.clone(),
                state: Mutex::new(SessionState::Started),
                fail_begin: self.fail_begin,
                fail_commit: self.fail_commit,
                observers: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl UnitOfWorkSession for MockSession {
        type Executor = ();

        fn executor(&self) -> &() {
            &()
        }

        fn state(&self) -> SessionState {
            *self.state.lock()
        }

        fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
            self.observers.lock().push(observer);
        }

        async fn start_transaction(&self) -> TransactionResult<()> {
            if self.fail_begin {
                return Err(TransactionError::DatabaseError(sqlx::Error::PoolClosed));
            }
            self.events.lock().push("start_transaction");
            *self.state.lock() = SessionState::Active;
            Ok(())
        }

        async fn commit(&self) -> TransactionResult<()> {
            self.events.lock().push("commit");
            if self.fail_commit {
                *self.state.lock() = SessionState::Aborted;
                return Err(TransactionError::CommitFailed("serialization failure".into()));
            }
            *self.state.lock() = SessionState::Committed;
            let observers = self.observers.lock().clone();
            for observer in observers {
                observer.on_commit().await?;
            }
            Ok(())
        }

        async fn rollback(&self) -> TransactionResult<()> {
            self.events.lock().push("rollback");
            *self.state.lock() = SessionState::Aborted;
            let observers = self.observers.lock().clone();
            for observer in observers {
                observer.on_rollback().await?;
            }
            Ok(())
        }

        async fn end(self) -> TransactionResult<()> {
            self.events.lock().push("end");
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingObserver {
        commits: Mutex<u32>,
        rollbacks: Mutex<u32>,
    }

    #[async_trait]
    impl TransactionAware for CountingObserver {
        async fn on_commit(&self) -> TransactionResult<()> {
            *self.commits.lock() += 1;
            Ok(())
        }

        async fn on_rollback(&self) -> TransactionResult<()> {
            *self.rollbacks.lock() += 1;
            Ok(())
        }
    }

    const REALIZED: Outcome = Outcome::Success {
        status: StatusCode::OK,
        message: "Transfer realized!",
    };

    const BLOCKED: Outcome = Outcome::BusinessError {
        status: StatusCode::BAD_REQUEST,
        message: "Destination account is blocked!",
    };

    #[tokio::test]
    async fn success_commits_then_ends() {
        let uow = Arc::new(MockUnitOfWork::default());
        let wrapped = Transactional::new(uow.clone(), "test", |amount: i64, _: ()| async move {
            assert_eq!(amount, 100);
            Ok::<_, TransactionError>(REALIZED)
        });

        let outcome = wrapped.call(100).await.unwrap();

        assert_eq!(outcome, REALIZED);
        assert_eq!(uow.events(), vec!["start_session", "start_transaction", "commit", "end"]);
    }

    #[tokio::test]
    async fn business_rejection_rolls_back_and_keeps_handler_response() {
        let uow = Arc::new(MockUnitOfWork::default());
        let wrapped = Transactional::new(uow.clone(), "test", |_: (), _: ()| async {
            Ok::<_, TransactionError>(BLOCKED)
        });

        let outcome = wrapped.call(()).await.unwrap();

        assert_eq!(outcome, BLOCKED);
        assert_eq!(uow.events(), vec!["start_session", "start_transaction", "rollback", "end"]);
    }

    #[tokio::test]
    async fn handler_error_rolls_back_with_generic_failure() {
        let uow = Arc::new(MockUnitOfWork::default());
        let wrapped = Transactional::new(uow.clone(), "test", |_: (), _: ()| async {
            Err::<Outcome, _>(TransactionError::DatabaseError(sqlx::Error::RowNotFound))
        });

        let outcome = wrapped.call(()).await.unwrap();

        assert_eq!(outcome, Outcome::InfrastructureError);
        assert_eq!(outcome.message(), "An error occurred!");
        assert_eq!(uow.events(), vec!["start_session", "start_transaction", "rollback", "end"]);
    }

    #[tokio::test]
    async fn commit_failure_still_ends_session_once() {
        let uow = Arc::new(MockUnitOfWork {
            fail_commit: true,
            ..Default::default()
        });
        let wrapped = Transactional::new(uow.clone(), "test", |_: (), _: ()| async {
            Ok::<_, TransactionError>(REALIZED)
        });

        let result = wrapped.call(()).await;

        assert!(matches!(result, Err(TransactionError::CommitFailed(_))));
        assert_eq!(uow.events(), vec!["start_session", "start_transaction", "commit", "end"]);
    }

    #[tokio::test]
    async fn session_start_failure_skips_handler() {
        let uow = Arc::new(MockUnitOfWork {
            fail_start: true,
            ..Default::default()
        });
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let wrapped = Transactional::new(uow.clone(), "test", move |_: (), _: ()| {
            *flag.lock() = true;
            async { Ok::<_, TransactionError>(REALIZED) }
        });

        assert!(wrapped.call(()).await.is_err());
        assert!(!*called.lock());
        assert!(uow.events().is_empty());
    }

    #[tokio::test]
    async fn begin_failure_ends_session_without_commit_or_rollback() {
        let uow = Arc::new(MockUnitOfWork {
            fail_begin: true,
            ..Default::default()
        });
        let wrapped = Transactional::new(uow.clone(), "test", |_: (), _: ()| async {
            Ok::<_, TransactionError>(REALIZED)
        });

        assert!(wrapped.call(()).await.is_err());
        assert_eq!(uow.events(), vec!["start_session", "end"]);
    }

    #[tokio::test]
    async fn observers_follow_the_resolution() {
        let uow = Arc::new(MockUnitOfWork::default());
        let observer = Arc::new(CountingObserver::default());
        let wrapped = Transactional::new(uow.clone(), "test", |ok: bool, _: ()| async move {
            Ok::<_, TransactionError>(if ok { REALIZED } else { BLOCKED })
        })
        .observe(observer.clone());

        wrapped.call(true).await.unwrap();
        wrapped.call(false).await.unwrap();
        wrapped.call(false).await.unwrap();

        assert_eq!(*observer.commits.lock(), 1);
        assert_eq!(*observer.rollbacks.lock(), 2);
    }
}
