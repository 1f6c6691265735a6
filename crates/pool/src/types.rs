use std::fmt;
use std::str::FromStr;

use crate::error::{PoolError, PoolResult};

/// Maximum length of a pool name, counted in characters.
pub const MAX_POOL_NAME_LENGTH: usize = 32;

/// Namespace tag prepended to a pool name to form the pool label.
pub const POOL_LABEL_PREFIX: &str = "mariadb-";

/// A validated pool identity: non-empty and at most 32 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolName(String);

impl PoolName {
    pub fn new(name: impl Into<String>) -> PoolResult<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(PoolError::InvalidArgument(
                "The supplied pool name was empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_POOL_NAME_LENGTH {
            return Err(PoolError::InvalidArgument(format!(
                "The supplied pool name exceeded the maximum length of {MAX_POOL_NAME_LENGTH} chars"
            )));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Observability label handed to the pool, e.g. `mariadb-orders`.
    pub fn label(&self) -> String {
        format!("{POOL_LABEL_PREFIX}{}", self.0)
    }
}

impl fmt::Display for PoolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PoolName {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
