//! HTTP route table.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::account::{Account, AccountRepository};
use crate::outcome::{Outcome, UNEXPECTED_FAILURE_MESSAGE};
use crate::transfer::{transfer, TransferRequest};
use crate::{Executor, PostgresUnitOfWork, TransactionError, Transactional};

pub struct AppState {
    pub accounts: AccountRepository,
    pub uow: Arc<PostgresUnitOfWork>,
}

/// Errors that escaped both the handler and the transactional wrapper.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_FAILURE_MESSAGE).into_response()
    }
}

pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/account/transactional_transfer", post(transactional_transfer))
        .route("/account/not_transactional_transfer", post(not_transactional_transfer))
        .route("/account/{account_number}", get(find_account))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// POST /account/transactional_transfer
async fn transactional_transfer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransferRequest>,
) -> Result<Outcome, AppError> {
    let accounts = state.accounts.clone();
    let wrapped = Transactional::new(
        state.uow.clone(),
        "transactional_transfer",
        move |request: TransferRequest, executor: Executor| {
            let accounts = accounts.clone();
            async move { transfer(&accounts, &request, Some(&executor)).await }
        },
    );
    Ok(wrapped.call(request).await?)
}

/// POST /account/not_transactional_transfer
async fn not_transactional_transfer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransferRequest>,
) -> Result<Outcome, AppError> {
    let outcome = transfer(&state.accounts, &request, None).await?;
    Ok(outcome.into())
}

/// GET /account/{account_number}
async fn find_account(
    State(state): State<Arc<AppState>>,
    Path(account_number): Path<i64>,
) -> Result<Json<Vec<Account>>, AppError> {
    Ok(Json(state.accounts.find_by_number(account_number, None).await?))
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_FAILURE_MESSAGE).into_response()
}
