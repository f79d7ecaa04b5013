//! Funds transfer between two accounts.
//!
//! The same [`transfer`] runs standalone or inside
//! [`Transactional`](crate::Transactional): every read and write goes through
//! the executor when one is supplied. Run standalone, the origin debit is
//! persisted even when the destination is later rejected; run inside a
//! transaction, that debit is rolled back with everything else.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountRepository};
use crate::outcome::Outcome;
use crate::{Executor, TransactionError, TransactionResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub origin_account_number: i64,
    pub destination_account_number: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    OriginNotFound,
    OriginBlocked,
    InsufficientBalance,
    DestinationNotFound,
    DestinationBlocked,
    /// The amount is zero or negative.
    InvalidAmount,
    /// More than one account carries the requested number.
    DuplicateAccount,
}

impl TransferOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            TransferOutcome::Success => StatusCode::OK,
            TransferOutcome::OriginBlocked
            | TransferOutcome::InsufficientBalance
            | TransferOutcome::DestinationBlocked
            | TransferOutcome::InvalidAmount => StatusCode::BAD_REQUEST,
            TransferOutcome::OriginNotFound | TransferOutcome::DestinationNotFound => StatusCode::NOT_FOUND,
            TransferOutcome::DuplicateAccount => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            TransferOutcome::Success => "Transfer realized!",
            TransferOutcome::OriginNotFound => "Origin account not found!",
            TransferOutcome::OriginBlocked => "Origin account is blocked!",
            TransferOutcome::InsufficientBalance => "Not enough origin account balance!",
            TransferOutcome::DestinationNotFound => "Destination account not found!",
            TransferOutcome::DestinationBlocked => "Destination account is blocked!",
            TransferOutcome::InvalidAmount => "Transfer amount must be positive!",
            TransferOutcome::DuplicateAccount => "Internal error!",
        }
    }
}

impl From<TransferOutcome> for Outcome {
    fn from(outcome: TransferOutcome) -> Self {
        let (status, message) = (outcome.status(), outcome.message());
        match outcome {
            TransferOutcome::Success => Outcome::Success { status, message },
            _ => Outcome::BusinessError { status, message },
        }
    }
}

/// Move `request.amount` from the origin to the destination account.
///
/// Business rejections are returned as `Ok`; storage failures and balance
/// overflow are `Err`.
pub async fn transfer(
    accounts: &AccountRepository,
    request: &TransferRequest,
    executor: Option<&Executor>,
) -> TransactionResult<TransferOutcome> {
    if request.amount <= 0 {
        return Ok(reject(request, TransferOutcome::InvalidAmount));
    }

    let matches = accounts
        .find_by_number(request.origin_account_number, executor)
        .await?;
    let origin = match check_origin(matches, request.amount) {
        Ok(origin) => origin,
        Err(rejected) => return Ok(reject(request, rejected)),
    };

    let origin = adjust(origin, -request.amount)?;
    accounts.save(&origin, executor).await?;

    let matches = accounts
        .find_by_number(request.destination_account_number, executor)
        .await?;
    let destination = match check_destination(matches) {
        Ok(destination) => destination,
        Err(rejected) => return Ok(reject(request, rejected)),
    };

    let destination = adjust(destination, request.amount)?;
    accounts.save(&destination, executor).await?;

    tracing::info!(
        origin = request.origin_account_number,
        destination = request.destination_account_number,
        amount = request.amount,
        transactional = executor.is_some(),
        "transfer realized"
    );
    Ok(TransferOutcome::Success)
}

fn reject(request: &TransferRequest, outcome: TransferOutcome) -> TransferOutcome {
    if outcome == TransferOutcome::DuplicateAccount {
        tracing::error!(
            origin = request.origin_account_number,
            destination = request.destination_account_number,
            "duplicate account number"
        );
    } else {
        tracing::debug!(
            origin = request.origin_account_number,
            destination = request.destination_account_number,
            reason = outcome.message(),
            "transfer rejected"
        );
    }
    outcome
}

fn adjust(mut account: Account, delta: i64) -> TransactionResult<Account> {
    account.account_balance = account
        .account_balance
        .checked_add(delta)
        .ok_or(TransactionError::BalanceOverflow(account.account_number))?;
    Ok(account)
}

fn single(mut matches: Vec<Account>, not_found: TransferOutcome) -> Result<Account, TransferOutcome> {
    match matches.len() {
        0 => Err(not_found),
        1 => Ok(matches.remove(0)),
        _ => Err(TransferOutcome::DuplicateAccount),
    }
}

fn check_origin(matches: Vec<Account>, amount: i64) -> Result<Account, TransferOutcome> {
    let origin = single(matches, TransferOutcome::OriginNotFound)?;
    if origin.is_blocked {
        return Err(TransferOutcome::OriginBlocked);
    }
    // The full balance cannot be transferred.
    if origin.account_balance <= amount {
        return Err(TransferOutcome::InsufficientBalance);
    }
    Ok(origin)
}

fn check_destination(matches: Vec<Account>) -> Result<Account, TransferOutcome> {
    let destination = single(matches, TransferOutcome::DestinationNotFound)?;
    if destination.is_blocked {
        return Err(TransferOutcome::DestinationBlocked);
    }
    Ok(destination)
}
