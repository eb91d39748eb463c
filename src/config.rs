//! Runtime configuration
//!
//! Defaults are overridden by `HEALER_*` environment variables. The binary
//! loads a `.env` file first, so the same keys may live there.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DECLINE_RATE: f64 = 0.1;
pub const DEFAULT_LOG_FILTER: &str = "healer_portal=info,tower_http=info";
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 24 * 7;

/// Backing store for the tab-scoped session record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "sqlite" => Ok(StorageKind::Sqlite),
            other => Err(AppError::Custom(format!("Unknown storage kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub port: u16,
    pub storage: StorageKind,
    pub db_path: PathBuf,
    /// Multiplier applied to every simulated service delay
    pub latency_scale: f64,
    pub payment_decline_rate: f64,
    pub log_filter: String,
    /// Tabs idle longer than this lose their session and wizards
    pub session_ttl: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            storage: StorageKind::Sqlite,
            db_path: default_db_path(),
            latency_scale: 1.0,
            payment_decline_rate: DEFAULT_DECLINE_RATE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 3600),
        }
    }
}

impl PortalConfig {
    /// Configuration for tests: no delays, no random declines, in-memory storage.
    pub fn for_tests() -> Self {
        Self {
            storage: StorageKind::Memory,
            latency_scale: 0.0,
            payment_decline_rate: 0.0,
            ..Self::default()
        }
    }

    /// Read the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = parse_var(&lookup, "HEALER_PORT") {
            config.port = port;
        }
        if let Some(storage) = parse_var(&lookup, "HEALER_STORAGE") {
            config.storage = storage;
        }
        if let Some(path) = lookup("HEALER_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(scale) = parse_finite(&lookup, "HEALER_LATENCY_SCALE") {
            config.latency_scale = scale.max(0.0);
        }
        if let Some(rate) = parse_finite(&lookup, "HEALER_PAYMENT_DECLINE_RATE") {
            config.payment_decline_rate = rate.clamp(0.0, 1.0);
        }
        if let Some(hours) = parse_var::<u64, _>(&lookup, "HEALER_SESSION_TTL_HOURS") {
            match hours.checked_mul(3600).filter(|secs| *secs > 0) {
                Some(secs) => config.session_ttl = Duration::from_secs(secs),
                None => log::warn!("Ignoring invalid value for HEALER_SESSION_TTL_HOURS: {}", hours),
            }
        }
        if let Some(filter) = lookup("HEALER_LOG").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }

        config
    }

    /// Make sure the directory holding the session database exists
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

/// NaN and infinities would poison the delay and decline arithmetic
fn parse_finite<F>(lookup: &F, key: &str) -> Option<f64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_var::<f64, _>(lookup, key)?;
    if value.is_finite() {
        Some(value)
    } else {
        log::warn!("Ignoring non-finite value for {}: {}", key, value);
        None
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("healer-portal")
        .join("sessions.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PortalConfig::from_lookup(|_| None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.storage, StorageKind::Sqlite);
        assert_eq!(config.payment_decline_rate, DEFAULT_DECLINE_RATE);
        assert!(config.db_path.ends_with("healer-portal/sessions.db"));
    }

    #[test]
    fn test_overrides() {
        let config = PortalConfig::from_lookup(lookup_from(&[
            ("HEALER_PORT", "8080"),
            ("HEALER_STORAGE", "Memory"),
            ("HEALER_LATENCY_SCALE", "0"),
            ("HEALER_PAYMENT_DECLINE_RATE", "3.5"),
            ("HEALER_DB_PATH", "/tmp/x.db"),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.latency_scale, 0.0);
        assert_eq!(config.payment_decline_rate, 1.0);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn test_invalid_values_keep_default() {
        let config = PortalConfig::from_lookup(lookup_from(&[
            ("HEALER_PORT", "not-a-port"),
            ("HEALER_STORAGE", "redis"),
        ]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.storage, StorageKind::Sqlite);
    }

    #[test]
    fn test_non_finite_numbers_keep_default() {
        for raw in ["NaN", "inf", "-inf"] {
            let config = PortalConfig::from_lookup(lookup_from(&[
                ("HEALER_LATENCY_SCALE", raw),
                ("HEALER_PAYMENT_DECLINE_RATE", raw),
            ]));
            assert_eq!(config.latency_scale, 1.0, "{}", raw);
            assert_eq!(config.payment_decline_rate, DEFAULT_DECLINE_RATE, "{}", raw);
        }
    }

    #[test]
    fn test_session_ttl() {
        let config = PortalConfig::from_lookup(lookup_from(&[("HEALER_SESSION_TTL_HOURS", "2")]));
        assert_eq!(config.session_ttl, Duration::from_secs(7200));

        let config = PortalConfig::from_lookup(lookup_from(&[("HEALER_SESSION_TTL_HOURS", "0")]));
        assert_eq!(config.session_ttl.as_secs(), DEFAULT_SESSION_TTL_HOURS * 3600);
    }
}
