//! Account entity and its repository.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{Executor, TransactionError, TransactionResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub account_number: i64,
    pub account_balance: i64,
    pub is_blocked: bool,
}

impl Account {
    pub fn new(account_number: i64, account_balance: i64, is_blocked: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_number,
            account_balance,
            is_blocked,
        }
    }

    fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            account_number: row.get("account_number"),
            account_balance: row.get("account_balance"),
            is_blocked: row.get("is_blocked"),
        }
    }
}

/// Account repository.
///
/// Operations taking an `Option<&Executor>` join the session's transaction
/// when one is given and run directly on the pool otherwise.
#[derive(Clone, Debug)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `accounts` table if it does not exist.
    ///
    /// `account_number` is deliberately left without a unique constraint;
    /// duplicates are reported by the transfer instead.
    pub async fn ensure_schema(&self) -> TransactionResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                account_number BIGINT NOT NULL,
                account_balance BIGINT NOT NULL,
                is_blocked BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn create(&self, account: &Account) -> TransactionResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, account_number, account_balance, is_blocked) VALUES ($1, $2, $3, $4)",
        )
        .bind(account.id)
        .bind(account.account_number)
        .bind(account.account_balance)
        .bind(account.is_blocked)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert `account` unless its number is already taken.
    pub async fn seed(&self, account: &Account) -> TransactionResult<bool> {
        if !self.find_by_number(account.account_number, None).await?.is_empty() {
            return Ok(false);
        }
        self.create(account).await?;
        Ok(true)
    }

    /// All accounts carrying `account_number`.
    pub async fn find_by_number(
        &self,
        account_number: i64,
        executor: Option<&Executor>,
    ) -> TransactionResult<Vec<Account>> {
        let query = sqlx::query(
            "SELECT id, account_number, account_balance, is_blocked FROM accounts WHERE account_number = $1",
        )
        .bind(account_number);

        let rows = match executor {
            Some(executor) => {
                let mut tx_guard = executor.tx.lock().await;
                let tx = tx_guard.as_mut().ok_or(TransactionError::NoActiveTransaction)?;
                query.fetch_all(&mut **tx).await?
            }
            None => query.fetch_all(&self.pool).await?,
        };

        Ok(rows.iter().map(Account::from_row).collect())
    }

    /// Persist the balance and blocked flag of `account`.
    pub async fn save(&self, account: &Account, executor: Option<&Executor>) -> TransactionResult<()> {
        let query = sqlx::query("UPDATE accounts SET account_balance = $2, is_blocked = $3 WHERE id = $1")
            .bind(account.id)
            .bind(account.account_balance)
            .bind(account.is_blocked);

        match executor {
            Some(executor) => {
                let mut tx_guard = executor.tx.lock().await;
                let tx = tx_guard.as_mut().ok_or(TransactionError::NoActiveTransaction)?;
                query.execute(&mut **tx).await?;
            }
            None => {
                query.execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    /// Set the blocked flag of every account carrying `account_number`.
    /// Returns the number of rows touched.
    pub async fn set_blocked(&self, account_number: i64, is_blocked: bool) -> TransactionResult<u64> {
        let result = sqlx::query("UPDATE accounts SET is_blocked = $2 WHERE account_number = $1")
            .bind(account_number)
            .bind(is_blocked)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every account. Test harnesses only.
    pub async fn purge(&self) -> TransactionResult<u64> {
        let result = sqlx::query("DELETE FROM accounts").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
