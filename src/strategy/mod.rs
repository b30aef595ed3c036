//! Deployment strategies.
//!
//! A strategy drives backup → apply → verify → rollback-on-failure for one
//! device. The vendor decides which strategy applies, and that decision is made
//! once, when the strategy is built; each strategy re-checks the vendor tag and
//! refuses mismatches before touching the device.

mod classifier;
mod elements;
mod full_replace;
mod per_element;

pub use classifier::{KeywordClassifier, ResponseClassifier};
pub use elements::{build_command_script, derive_elements, element_command, interface_update_elements, mask_to_prefix_len, InterfaceUpdate};
pub use full_replace::FullReplaceStrategy;
pub use per_element::{PerElementDeployer, PerElementStrategy, SnapshotHandle};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{DeployError, DeployResult, DeployStep};
use crate::models::{vendor, ConfigBackup, Device};
use crate::transport::{Connector, Credentials, RemoteSession};

/// Uniform apply/rollback contract over vendor-specific mechanics
#[async_trait::async_trait]
pub trait DeploymentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Push `config` to the device and verify it took effect, rolling back on
    /// any failure. Returns the pre-change backup when the strategy keeps one
    /// as config text.
    async fn deploy(&self, device: &Device, config: &str) -> DeployResult<Option<ConfigBackup>>;

    /// Return the device to a previously captured state
    async fn rollback(&self, device: &Device, backup: &ConfigBackup) -> DeployResult<()>;
}

/// Timing and login parameters shared by the strategies
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub credentials: Credentials,
    /// Bounds every connection attempt and the I/O on it
    pub timeout: Duration,
    /// Pause after each streamed line; slow CLI parsers drop input without it
    pub line_delay: Duration,
    /// Wait between apply and verification
    pub settle_time: Duration,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            timeout: Duration::from_secs(30),
            line_delay: Duration::from_millis(500),
            settle_time: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    FullReplace,
    PerElement,
}

impl StrategyKind {
    /// Default strategy for a vendor tag
    pub fn for_vendor(vendor_tag: &str) -> Option<Self> {
        match vendor_tag {
            vendor::CISCO => Some(StrategyKind::FullReplace),
            vendor::JUNIPER => Some(StrategyKind::PerElement),
            _ => None,
        }
    }

    pub fn build(self, connector: Arc<dyn Connector>, settings: DeploySettings) -> Arc<dyn DeploymentStrategy> {
        match self {
            StrategyKind::FullReplace => Arc::new(FullReplaceStrategy::new(connector, settings)),
            StrategyKind::PerElement => Arc::new(PerElementStrategy::new(connector, settings)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::FullReplace => write!(f, "full-replace"),
            StrategyKind::PerElement => write!(f, "per-element"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full-replace" | "full" => Ok(StrategyKind::FullReplace),
            "per-element" | "partial" => Ok(StrategyKind::PerElement),
            other => Err(format!("Unknown deploy strategy: {}", other)),
        }
    }
}

fn require_vendor(strategy: &str, device: &Device, expected: &str) -> DeployResult<()> {
    if device.vendor != expected {
        return Err(DeployError::UnsupportedVendor {
            strategy: strategy.to_string(),
            vendor: device.vendor.clone(),
        });
    }
    Ok(())
}

async fn open_session(
    connector: &dyn Connector,
    settings: &DeploySettings,
    device: &Device,
    step: DeployStep,
) -> DeployResult<Box<dyn RemoteSession>> {
    connector
        .connect(&device.management_ip, &settings.credentials, settings.timeout)
        .await
        .map_err(|e| DeployError::transport(&device.id, step, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_for_vendor() {
        assert_eq!(StrategyKind::for_vendor("cisco"), Some(StrategyKind::FullReplace));
        assert_eq!(StrategyKind::for_vendor("juniper"), Some(StrategyKind::PerElement));
        assert_eq!(StrategyKind::for_vendor("arista"), None);
    }

    #[test]
    fn test_strategy_kind_from_str() {
        assert_eq!("full-replace".parse::<StrategyKind>(), Ok(StrategyKind::FullReplace));
        assert_eq!(" Per-Element ".parse::<StrategyKind>(), Ok(StrategyKind::PerElement));
        assert!("merge".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::PerElement.to_string(), "per-element");
    }

    #[test]
    fn test_build_names() {
        let connector: Arc<dyn Connector> = Arc::new(crate::transport::mock::MockConnector::default());
        let full = StrategyKind::FullReplace.build(connector.clone(), DeploySettings::default());
        let partial = StrategyKind::PerElement.build(connector, DeploySettings::default());
        assert_eq!(full.name(), "full-replace");
        assert_eq!(partial.name(), "per-element");
    }
}
