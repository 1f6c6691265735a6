//! Connectivity probe: opens a pool, runs `SELECT 1` and closes it again.

use tracing_subscriber::EnvFilter;

use mariadb_pool::DatabaseHandler;
use mariadb_pool::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mariadb_pool=debug,sqlx=warn")),
        )
        .init();

    tracing::info!("Starting MariaDB pool probe...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let properties = config.properties()?;

    let handler = DatabaseHandler::new(&config.pool_name, &properties).await?;

    {
        let mut conn = handler.get_connection().await?;
        let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(&mut conn).await?;
        tracing::info!(result = one, "Probe query succeeded");
    }

    tracing::info!(
        pool = handler.pool_name(),
        size = handler.size(),
        idle = handler.num_idle(),
        "Pool statistics"
    );

    handler.close().await;
    Ok(())
}
