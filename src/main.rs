use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use transactional_transfer::config::AppConfig;
use transactional_transfer::logging::init_logging;
use transactional_transfer::routes::{build_routes, AppState};
use transactional_transfer::{Account, AccountRepository, PostgresUnitOfWork};

/// (account_number, balance, blocked)
const DEMO_ACCOUNTS: [(i64, i64, bool); 2] = [(54545488, 1000, false), (2845645, 1000, true)];

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let config = AppConfig::load(&config_path)?;
    init_logging(&config);

    let pool = PgPoolOptions::new()
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;

    let accounts = AccountRepository::new(pool.clone());
    accounts.ensure_schema().await?;

    if config.seed_demo_accounts {
        for (number, balance, blocked) in DEMO_ACCOUNTS {
            if accounts.seed(&Account::new(number, balance, blocked)).await? {
                tracing::info!(account_number = number, "seeded demo account");
            }
        }
    }

    let state = Arc::new(AppState {
        accounts,
        uow: Arc::new(PostgresUnitOfWork::new(Arc::new(pool.clone()))),
    });
    let app = build_routes(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    tracing::info!(%address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    pool.close().await;
    Ok(())
}
