use std::sync::Arc;

use super::{open_session, require_vendor, DeploySettings, DeploymentStrategy};
use crate::error::{DeployError, DeployResult, DeployStep};
use crate::models::{vendor, ConfigBackup, Device};
use crate::transport::Connector;
use crate::verify::ConfigComparator;

const STRATEGY_NAME: &str = "full-replace";

/// Command that prints the running configuration for a vendor
fn show_config_command(vendor_tag: &str) -> Option<&'static str> {
    match vendor_tag {
        vendor::CISCO => Some("show running-config"),
        vendor::JUNIPER => Some("show configuration"),
        _ => None,
    }
}

/// Lines fed to the device shell to replace its whole configuration and save it
fn replace_script(config: &str) -> Vec<String> {
    let mut lines = vec!["configure replace terminal".to_string()];
    lines.extend(config.lines().map(str::to_string));
    lines.extend(["end", "write memory", "exit"].map(String::from));
    lines
}

/// Swaps the entire running configuration in one go, then verifies it.
/// Only for devices that accept `configure replace`.
pub struct FullReplaceStrategy {
    connector: Arc<dyn Connector>,
    settings: DeploySettings,
    comparator: ConfigComparator,
}

impl FullReplaceStrategy {
    pub fn new(connector: Arc<dyn Connector>, settings: DeploySettings) -> Self {
        Self {
            connector,
            settings,
            comparator: ConfigComparator::for_vendor(vendor::CISCO),
        }
    }

    /// Capture the device's running configuration
    pub async fn backup_current_config(&self, device: &Device) -> DeployResult<ConfigBackup> {
        let command = show_config_command(&device.vendor).ok_or_else(|| DeployError::UnsupportedVendor {
            strategy: STRATEGY_NAME.to_string(),
            vendor: device.vendor.clone(),
        })?;

        let config = self.fetch(device, command, DeployStep::Backup).await?;
        Ok(ConfigBackup::new(&device.id, config))
    }

    async fn fetch(&self, device: &Device, command: &str, step: DeployStep) -> DeployResult<String> {
        let mut session = open_session(self.connector.as_ref(), &self.settings, device, step).await?;
        let output = session.run(command).await;
        session.close().await;

        output.map_err(|e| DeployError::transport(&device.id, step, e))
    }

    async fn push(&self, device: &Device, config: &str, step: DeployStep) -> DeployResult<()> {
        let mut session = open_session(self.connector.as_ref(), &self.settings, device, step).await?;
        let output = session.stream(&replace_script(config), self.settings.line_delay).await;
        session.close().await;

        match output {
            Ok(output) => {
                tracing::debug!("Replace output from {}: {}", device.hostname, output.trim());
                Ok(())
            }
            Err(e) => Err(DeployError::transport(&device.id, step, e)),
        }
    }

    async fn verify(&self, device: &Device, expected: &str) -> DeployResult<()> {
        tokio::time::sleep(self.settings.settle_time).await;

        let command = show_config_command(&device.vendor).unwrap_or("show running-config");
        let current = self.fetch(device, command, DeployStep::Verify).await?;

        let report = self.comparator.compare(&current, expected);
        if !report.is_match() {
            return Err(DeployError::VerificationMismatch {
                device_id: device.id.clone(),
                expected: report.critical,
                found: report.found,
                missing: report.missing,
            });
        }

        tracing::debug!(
            "Verified {}: {}/{} critical lines present",
            device.hostname,
            report.found,
            report.critical
        );
        Ok(())
    }

    async fn fail_with_rollback(&self, device: &Device, backup: &ConfigBackup, err: DeployError) -> DeployError {
        tracing::warn!("Deployment to {} failed ({}), attempting rollback...", device.hostname, err);
        let rollback = self.rollback(device, backup).await;
        if let Err(ref e) = rollback {
            tracing::error!("Rollback failed on {}: {} - manual intervention required", device.hostname, e);
        }
        err.after_rollback(rollback).with_backup(backup)
    }
}

#[async_trait::async_trait]
impl DeploymentStrategy for FullReplaceStrategy {
    fn name(&self) -> &'static str {
        STRATEGY_NAME
    }

    async fn deploy(&self, device: &Device, config: &str) -> DeployResult<Option<ConfigBackup>> {
        require_vendor(STRATEGY_NAME, device, vendor::CISCO)?;

        let backup = self.backup_current_config(device).await?;
        tracing::info!(
            "Created backup for device {} at {}",
            device.id,
            backup.timestamp.to_rfc3339()
        );

        tracing::info!(
            "Deploying full configuration to {} ({})",
            device.hostname,
            device.management_ip
        );

        if let Err(e) = self.push(device, config, DeployStep::Apply).await {
            return Err(self.fail_with_rollback(device, &backup, e).await);
        }

        if let Err(e) = self.verify(device, config).await {
            return Err(self.fail_with_rollback(device, &backup, e).await);
        }

        tracing::info!("Configuration successfully deployed to {}", device.hostname);
        Ok(Some(backup))
    }

    async fn rollback(&self, device: &Device, backup: &ConfigBackup) -> DeployResult<()> {
        require_vendor(STRATEGY_NAME, device, vendor::CISCO)?;

        tracing::info!("Rolling back configuration on {}", device.hostname);
        self.push(device, &backup.config, DeployStep::Rollback).await?;
        tracing::info!("Configuration successfully rolled back on {}", device.hostname);
        Ok(())
    }
}
