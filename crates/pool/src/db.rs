use sqlx::mysql::MySqlPool;

use crate::config::Properties;
use crate::connection::HardenedConnection;
use crate::error::{PoolError, PoolResult};
use crate::settings::PoolSettings;
use crate::types::PoolName;

/// Owns one fixed-size MariaDB connection pool.
///
/// The pool is opened eagerly on construction and never reconfigured. Release
/// it with [`DatabaseHandler::close`]. The pool itself is never handed out, so
/// every query goes through a [`HardenedConnection`].
#[derive(Debug)]
pub struct DatabaseHandler {
    pool: MySqlPool,
    settings: PoolSettings,
}

impl DatabaseHandler {
    /// Create a pool named `pool_name` seeded with `properties`.
    ///
    /// Fails with `InvalidArgument` for an empty or overlong name, before any
    /// network activity, and with `ConnectionInitialization` if the pool
    /// cannot validate its connections within the initialization timeout.
    pub async fn new(pool_name: &str, properties: &Properties) -> PoolResult<Self> {
        let name = PoolName::new(pool_name)?;
        let settings = PoolSettings::resolve(&name, properties)?;
        Self::connect(settings).await
    }

    /// Open a pool from already resolved settings.
    pub async fn connect(settings: PoolSettings) -> PoolResult<Self> {
        let timeout = settings.initialization_fail_timeout();
        let connect = settings
            .pool_options()
            .connect_with(settings.connect_options().clone());

        let pool = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(pool)) => pool,
            Ok(Err(e)) => {
                return Err(PoolError::ConnectionInitialization {
                    message: format!("{} could not establish a connection", settings.pool_name()),
                    source: Some(e),
                });
            }
            Err(_) => {
                return Err(PoolError::ConnectionInitialization {
                    message: format!(
                        "{} could not establish a connection within {}ms",
                        settings.pool_name(),
                        timeout.as_millis()
                    ),
                    source: None,
                });
            }
        };

        tracing::info!(
            pool = settings.pool_name(),
            min_idle = settings.min_idle(),
            max_pool_size = settings.max_pool_size(),
            "Connected to MariaDB"
        );
        tracing::debug!(settings = ?settings, "Effective pool settings");

        Ok(Self { pool, settings })
    }

    /// Lease a connection, waiting up to the acquisition timeout.
    ///
    /// Dropping the returned connection gives it back to the pool.
    pub async fn get_connection(&self) -> PoolResult<HardenedConnection> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(PoolError::ConnectionAcquisition)?;
        Ok(HardenedConnection::new(conn))
    }

    /// Close the pool, waiting for leased connections to come back.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!(pool = self.settings.pool_name(), "Closed MariaDB pool");
    }

    pub fn pool_name(&self) -> &str {
        self.settings.pool_name()
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Connections currently managed by the pool, leased or idle.
    pub fn size(&self) -> u32 {
        self.pool.size()
    }

    pub fn num_idle(&self) -> usize {
        self.pool.num_idle()
    }
}
