use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Separator whitespace in `.properties` text.
const PROPERTY_WHITESPACE: [char; 3] = [' ', '\t', '\u{000C}'];

/// Keys whose values are masked in `Debug` output.
const SECRET_KEYS: &[&str] = &["password", "dataSource.password"];

/// Flat key/value property bag that seeds a pool configuration.
///
/// Keys follow HikariCP naming: `jdbcUrl` (or `url`), `username`, `password`,
/// `connectionTimeout` and `dataSource.<name>` for driver properties.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property, returning the previous value if any.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: Properties) {
        self.0.extend(other.0);
    }

    /// Parse `.properties` text, following `java.util.Properties::load`.
    ///
    /// Lines whose first non-blank character is `#` or `!` are comments. A
    /// line ending in an odd number of backslashes continues on the next one,
    /// whose leading whitespace is dropped. The key ends at the first
    /// unescaped `=`, `:` or whitespace; `\t`, `\n`, `\r`, `\f` and
    /// `\uXXXX` are unescaped and any other escaped character stands for
    /// itself. Later entries override earlier ones.
    pub fn parse(text: &str) -> PoolResult<Self> {
        let mut properties = Self::new();
        let mut lines = text.lines();

        while let Some(line) = lines.next() {
            let line = line.trim_start_matches(PROPERTY_WHITESPACE);
            if line.is_empty() || line.starts_with(['#', '!']) {
                continue;
            }

            let mut logical = line.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start_matches(PROPERTY_WHITESPACE)),
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical);
            properties.set(unescape(key)?, unescape(value)?);
        }

        Ok(properties)
    }

    /// Read and parse a `.properties` file.
    pub fn from_file(path: impl AsRef<Path>) -> PoolResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PoolError::Config(format!("Failed to read properties file {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Parse a flat JSON object of string values.
    pub fn from_json(json: &str) -> PoolResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| PoolError::Config(format!("Invalid properties JSON: {e}")))
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| {
                let value = if SECRET_KEYS.contains(&k.as_str()) {
                    "***"
                } else {
                    v.as_str()
                };
                (k.as_str(), value)
            }))
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, String>> for Properties {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;

    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                let value = line[idx + 1..].trim_start_matches(PROPERTY_WHITESPACE);
                return (&line[..idx], value);
            }
            c if PROPERTY_WHITESPACE.contains(&c) => {
                let rest = line[idx..].trim_start_matches(PROPERTY_WHITESPACE);
                let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
                return (&line[..idx], rest.trim_start_matches(PROPERTY_WHITESPACE));
            }
            _ => {}
        }
    }

    (line, "")
}

fn unescape(raw: &str) -> PoolResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = (hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit()))
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        PoolError::Config(format!("Malformed \\uxxxx escape in properties: \\u{hex}"))
                    })?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            // a dangling backslash at end of input
            None => {}
        }
    }

    Ok(out)
}

/// Probe configuration loaded from environment variables.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Pool identity (default: `probe`)
    pub pool_name: String,

    /// Optional `.properties` file seeding the base configuration
    pub properties_file: Option<PathBuf>,

    /// Connection URL, overlaid as `jdbcUrl`
    pub database_url: Option<String>,

    /// Overlaid as `username`
    pub database_username: Option<String>,

    /// Overlaid as `password`
    pub database_password: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            pool_name: std::env::var("DATABASE_POOL_NAME").unwrap_or_else(|_| "probe".to_string()),
            properties_file: std::env::var("DATABASE_PROPERTIES_FILE").ok().map(PathBuf::from),
            database_url: std::env::var("DATABASE_URL").ok(),
            database_username: std::env::var("DATABASE_USERNAME").ok(),
            database_password: std::env::var("DATABASE_PASSWORD").ok(),
        };

        if config.properties_file.is_none() && config.database_url.is_none() {
            return Err(anyhow::anyhow!(
                "Either DATABASE_URL or DATABASE_PROPERTIES_FILE environment variable is required"
            ));
        }

        Ok(config)
    }

    /// Base properties: the properties file first, environment values on top.
    pub fn properties(&self) -> anyhow::Result<Properties> {
        let mut properties = match &self.properties_file {
            Some(path) => Properties::from_file(path)?,
            None => Properties::new(),
        };

        if let Some(url) = &self.database_url {
            properties.set("jdbcUrl", url.as_str());
        }
        if let Some(username) = &self.database_username {
            properties.set("username", username.as_str());
        }
        if let Some(password) = &self.database_password {
            properties.set("password", password.as_str());
        }

        Ok(properties)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("pool_name", &self.pool_name)
            .field("properties_file", &self.properties_file)
            .field("database_url", &self.database_url.as_ref().map(|_| "***"))
            .field("database_username", &self.database_username)
            .field("database_password", &self.database_password.as_ref().map(|_| "***"))
            .finish()
    }
}
