//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use colonia_core::TradeRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Upper bound for percentage tunables in [`TradeRules`].
pub const MAX_PERCENT: u32 = 10_000;

/// Server configuration, loaded from YAML. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server
    pub bind_address: SocketAddr,
    /// Maximum simultaneous connections
    pub max_clients: usize,
    /// Messages allowed per client per rate window
    pub rate_limit_messages: u32,
    /// Rate window length in milliseconds
    pub rate_limit_window_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Scenario file; the embedded scenario when absent
    pub scenario: Option<PathBuf>,
    /// Native trade economics
    pub trade: TradeRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 7777)),
            max_clients: 8,
            rate_limit_messages: 60,
            rate_limit_window_ms: 1000,
            log_filter: "colonia_server=info".to_owned(),
            scenario: None,
            trade: TradeRules::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid("max_clients must be at least 1".into()));
        }
        if self.rate_limit_messages == 0 || self.rate_limit_window_ms == 0 {
            return Err(ConfigError::Invalid(
                "rate limit needs a non-zero message count and window".into(),
            ));
        }
        let trade = &self.trade;
        if trade.buy_markup_percent == 0 || trade.buy_markup_percent > MAX_PERCENT {
            return Err(ConfigError::Invalid(format!(
                "trade.buy_markup_percent must be within 1..={MAX_PERCENT}"
            )));
        }
        if trade.want_bonus_percent.iter().any(|&b| b == 0 || b > MAX_PERCENT) {
            return Err(ConfigError::Invalid(format!(
                "trade.want_bonus_percent entries must be within 1..={MAX_PERCENT}"
            )));
        }
        if trade.gift_alarm_divisor == 0 {
            return Err(ConfigError::Invalid(
                "trade.gift_alarm_divisor must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ServerConfig::from_yaml(
            "bind_address: 127.0.0.1:9000\ntrade:\n  max_haggles: 5\n",
        )
        .unwrap();
        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.trade.max_haggles, 5);
        assert_eq!(config.trade.buy_markup_percent, 150);
        assert_eq!(config.max_clients, 8);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(1));
    }

    #[test]
    fn shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/colonia.yaml");
        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.trade, TradeRules::default());
        assert_eq!(config.scenario, None);
    }

    #[test]
    fn zero_clients_is_invalid() {
        assert!(matches!(
            ServerConfig::from_yaml("max_clients: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn trade_tunables_are_bounded() {
        for yaml in [
            "trade:\n  buy_markup_percent: 4294967295\n",
            "trade:\n  buy_markup_percent: 0\n",
            "trade:\n  want_bonus_percent: [300, 20000]\n",
            "trade:\n  gift_alarm_divisor: 0\n",
        ] {
            assert!(
                matches!(ServerConfig::from_yaml(yaml), Err(ConfigError::Invalid(_))),
                "{yaml}"
            );
        }
        let config = ServerConfig::from_yaml("trade:\n  buy_markup_percent: 10000\n").unwrap();
        assert_eq!(config.trade.buy_markup_percent, MAX_PERCENT);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ServerConfig::load(Path::new("/nonexistent/colonia.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/colonia.yaml"));
    }
}
