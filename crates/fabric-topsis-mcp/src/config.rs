use std::path::PathBuf;

use fabric_topsis_core::{TopsisError, WeightingMode};

pub const DEFAULT_DB_PATH: &str = "./data/topsis-db.json";
pub const DEFAULT_LOG_FILTER: &str = "fabric_topsis=info";

pub const DB_ENV: &str = "FABRIC_TOPSIS_DB";
pub const WEIGHTING_ENV: &str = "FABRIC_TOPSIS_WEIGHTING";
pub const LOG_ENV: &str = "FABRIC_TOPSIS_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    /// Weighting mode used when a call does not name one.
    pub weighting: WeightingMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            weighting: WeightingMode::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, TopsisError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. An unknown weighting mode
    /// is an error, never a silent fallback.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TopsisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = non_empty(lookup(DB_ENV))
            .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from);
        let weighting = match non_empty(lookup(WEIGHTING_ENV)) {
            Some(raw) => raw.parse::<WeightingMode>()?,
            None => WeightingMode::default(),
        };
        Ok(Self { db_path, weighting })
    }
}

/// Log filter directive: `FABRIC_TOPSIS_LOG`, then `RUST_LOG`, then the default.
pub fn log_filter_from_env() -> String {
    non_empty(std::env::var(LOG_ENV).ok())
        .or_else(|| non_empty(std::env::var("RUST_LOG").ok()))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
