//! Configuration management for the Fusion swap relayer
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on `monitor.max_wait_secs` (one week)
const MAX_WAIT_SECS_LIMIT: u64 = 7 * 24 * 60 * 60;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub fusion: FusionConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub chains: HashMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FusionConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
    #[serde(default = "default_true")]
    pub continue_on_transient_query_error: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// How long finished swap jobs stay queryable
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    pub private_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub network_id: u64,
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default)]
    pub fallback_rpc_urls: Vec<String>,
    #[serde(default = "default_true")]
    pub evm: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_job_retention_secs() -> u64 {
    3600
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            max_wait_secs: 300,
            continue_on_transient_query_error: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            job_retention_secs: default_job_retention_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl ApiConfig {
    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }
}

impl Settings {
    /// Load settings from the configured file path
    pub fn load() -> Result<Self> {
        let config_path = env::var("FUSION_SWAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text, substituting environment variables first
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config_str = substitute_env_vars(raw);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (name, chain) in &self.chains {
            if chain.enabled && chain.evm && chain.rpc_url.is_empty() {
                anyhow::bail!("Chain {} has no RPC URL configured", name);
            }
        }

        if self.monitor.poll_interval_ms == 0 {
            anyhow::bail!("monitor.poll_interval_ms must be greater than zero");
        }
        if self.monitor.max_wait_secs == 0 {
            anyhow::bail!("monitor.max_wait_secs must be greater than zero");
        }
        if self.monitor.max_wait_secs > MAX_WAIT_SECS_LIMIT {
            anyhow::bail!(
                "monitor.max_wait_secs must be at most {} ({} given)",
                MAX_WAIT_SECS_LIMIT,
                self.monitor.max_wait_secs
            );
        }

        if self.fusion.api_key.is_empty() {
            tracing::warn!("fusion.api_key is empty - authenticated endpoints will reject requests");
        }

        Ok(())
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled).collect()
    }
}

/// Substitute environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env substitution pattern is valid");

    re.replace_all(input, |cap: &regex::Captures| {
        let fallback = cap.get(2).map(|m| m.as_str()).unwrap_or_default();
        match env::var(&cap[1]) {
            Ok(value) if !value.is_empty() => value,
            _ => fallback.to_string(),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [fusion]
        base_url = "https://api.1inch.dev/fusion-plus"
        api_key = "test-key"

        [chains.ethereum]
        network_id = 1
        rpc_url = "https://eth.llamarpc.com"

        [chains.solana]
        network_id = 501
        evm = false
    "#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("FUSION_TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${FUSION_TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_env_var_default() {
        env::remove_var("FUSION_TEST_UNSET_VAR");
        let input = "rpc_url = \"${FUSION_TEST_UNSET_VAR:-https://base.llamarpc.com}\"";
        assert_eq!(
            substitute_env_vars(input),
            "rpc_url = \"https://base.llamarpc.com\""
        );
    }

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_toml(MINIMAL).unwrap();
        assert_eq!(settings.monitor.poll_interval(), Duration::from_secs(10));
        assert_eq!(settings.monitor.max_wait(), Duration::from_secs(300));
        assert!(settings.monitor.continue_on_transient_query_error);
        assert_eq!(settings.fusion.request_timeout_secs, 30);
        assert_eq!(settings.api.job_retention(), Duration::from_secs(3600));
        assert!(!settings.chains["solana"].evm);
        assert_eq!(settings.enabled_chains().len(), 2);
    }

    #[test]
    fn test_rejects_evm_chain_without_rpc() {
        let raw = r#"
            [fusion]
            base_url = "https://api.1inch.dev/fusion-plus"

            [chains.arbitrum]
            network_id = 42161
        "#;
        tokio_test::assert_err!(Settings::from_toml(raw));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let raw = format!("{MINIMAL}\n[monitor]\npoll_interval_ms = 0\nmax_wait_secs = 10\n");
        tokio_test::assert_err!(Settings::from_toml(&raw));
    }

    #[test]
    fn test_rejects_unbounded_max_wait() {
        let raw = format!(
            "{MINIMAL}\n[monitor]\npoll_interval_ms = 1000\nmax_wait_secs = {}\n",
            MAX_WAIT_SECS_LIMIT + 1
        );
        tokio_test::assert_err!(Settings::from_toml(&raw));

        let raw = format!(
            "{MINIMAL}\n[monitor]\npoll_interval_ms = 1000\nmax_wait_secs = {}\n",
            MAX_WAIT_SECS_LIMIT
        );
        let settings = Settings::from_toml(&raw).unwrap();
        assert_eq!(settings.monitor.max_wait_secs, MAX_WAIT_SECS_LIMIT);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.chains["ethereum"].network_id, 1);
        assert_eq!(settings.fusion.api_key, "test-key");
    }
}
