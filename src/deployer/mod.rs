use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::models::{DeploymentResult, Device};
use crate::strategy::DeploymentStrategy;

/// ConfigDeployer rolls a configuration out across devices, one at a time,
/// using a single strategy chosen up front.
pub struct ConfigDeployer {
    strategy: Arc<dyn DeploymentStrategy>,
}

impl ConfigDeployer {
    pub fn new(strategy: Arc<dyn DeploymentStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Deploy to one device. Failures are reported in the result, never returned.
    pub async fn deploy_to_device(&self, device: &Device, config: &str) -> DeploymentResult {
        let timestamp = Utc::now();
        let started = Instant::now();

        tracing::info!(
            "Deploying to {} ({}) with {} strategy",
            device.id,
            device.hostname,
            self.strategy.name()
        );

        let outcome = self.strategy.deploy(device, config).await;
        let duration = started.elapsed();

        match outcome {
            Ok(backup) => {
                tracing::info!("Deployment to {} succeeded in {:?}", device.id, duration);
                DeploymentResult {
                    device_id: device.id.clone(),
                    success: true,
                    error: None,
                    duration,
                    timestamp,
                    backup,
                }
            }
            Err(e) => {
                let backup = e.recovery_backup().cloned();
                if e.is_fatal() {
                    tracing::error!("Deployment to {} failed: {}", device.id, e);
                } else {
                    tracing::warn!("Deployment to {} failed: {}", device.id, e);
                }
                DeploymentResult {
                    device_id: device.id.clone(),
                    success: false,
                    error: Some(e),
                    duration,
                    timestamp,
                    backup,
                }
            }
        }
    }

    /// Deploy to devices in the given order, stopping at the first failure.
    /// Devices without an entry in `configs` are skipped and get no result.
    pub async fn deploy_to_multiple_devices(
        &self,
        devices: &[Device],
        configs: &HashMap<String, String>,
    ) -> Vec<DeploymentResult> {
        let mut results = Vec::new();

        for (i, device) in devices.iter().enumerate() {
            let Some(config) = configs.get(&device.id) else {
                tracing::warn!("No configuration found for device {}, skipping", device.id);
                continue;
            };

            let result = self.deploy_to_device(device, config).await;
            let failed = !result.success;
            results.push(result);

            if failed {
                let remaining = devices.len() - i - 1;
                tracing::error!(
                    "Stopping deployment due to failure on {} ({} device(s) not attempted)",
                    device.id,
                    remaining
                );
                break;
            }
        }

        results
    }
}
