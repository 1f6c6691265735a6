//! Fixed-size MariaDB connection pool with hardened, non-overridable driver options.

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod settings;
pub mod types;

pub use config::Properties;
pub use connection::{HardenedConnection, HardenedTransaction};
pub use db::DatabaseHandler;
pub use error::{PoolError, PoolResult};
