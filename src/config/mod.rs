use std::env;
use std::time::Duration;

use crate::strategy::{DeploySettings, StrategyKind};
use crate::transport::Credentials;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub inventory_path: String,
    pub configs_dir: String,
    pub backup_dir: String,
    /// Rollout order; empty means every device in inventory order
    pub devices: Vec<String>,
    /// None means pick from the first device's vendor
    pub strategy: Option<StrategyKind>,
    pub ssh_user: String,
    pub ssh_pass: String,
    pub ssh_port: u16,
    pub ssh_timeout_secs: u64,
    pub line_delay_ms: u64,
    pub settle_secs: u64,
    pub dry_run: bool,
    pub rollback_device: Option<String>,
    pub rollback_file: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> anyhow::Result<Self> {
        let strategy = match get_env("DEPLOY_STRATEGY", "").trim() {
            "" => None,
            s => Some(s.parse::<StrategyKind>().map_err(anyhow::Error::msg)?),
        };

        Ok(Self {
            inventory_path: get_env("INVENTORY_PATH", "infrastructure.json"),
            configs_dir: get_env("CONFIGS_DIR", "configs"),
            backup_dir: get_env("BACKUP_DIR", "backups"),
            devices: parse_list(&get_env("DEVICES", "")),
            strategy,
            ssh_user: get_env("SSH_USER", "admin"),
            ssh_pass: get_env("SSH_PASS", ""),
            ssh_port: get_env("SSH_PORT", "22").parse().unwrap_or(22),
            ssh_timeout_secs: get_env("SSH_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            line_delay_ms: get_env("LINE_DELAY_MS", "500").parse().unwrap_or(500),
            settle_secs: get_env("SETTLE_SECS", "2").parse().unwrap_or(2),
            dry_run: parse_bool(&get_env("DRY_RUN", "false")),
            rollback_device: non_empty(get_env("ROLLBACK_DEVICE", "")),
            rollback_file: non_empty(get_env("ROLLBACK_FILE", "")),
        })
    }

    pub fn deploy_settings(&self) -> DeploySettings {
        DeploySettings {
            credentials: Credentials::new(&self.ssh_user, &self.ssh_pass),
            timeout: Duration::from_secs(self.ssh_timeout_secs),
            line_delay: Duration::from_millis(self.line_delay_ms),
            settle_time: Duration::from_secs(self.settle_secs),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
