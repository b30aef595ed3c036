use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use super::classifier::{KeywordClassifier, ResponseClassifier};
use super::elements::{derive_elements, element_command, interface_update_elements, InterfaceUpdate};
use super::{open_session, require_vendor, DeploySettings, DeploymentStrategy};
use crate::error::{DeployError, DeployResult, DeployStep};
use crate::models::{vendor, ConfigBackup, ConfigElement, Device, ElementUpdateResult};
use crate::transport::{Connector, RemoteSession};

const STRATEGY_NAME: &str = "per-element";

const SNAPSHOT_COMMAND: &str = "request system snapshot slice alternate media internal";
const COMMIT_COMMAND: &str = "configure; commit and-quit";
const ROLLBACK_COMMAND: &str = "configure; rollback; commit and-quit";

/// Device-side restore point taken before the first element is applied
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotHandle {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Applies a device's desired state as a sequence of small checked changes,
/// committing only after every element passed. Only for devices with
/// candidate-configuration semantics.
pub struct PerElementStrategy {
    connector: Arc<dyn Connector>,
    settings: DeploySettings,
    classifier: Arc<dyn ResponseClassifier>,
}

impl PerElementStrategy {
    pub fn new(connector: Arc<dyn Connector>, settings: DeploySettings) -> Self {
        Self {
            connector,
            settings,
            classifier: Arc::new(KeywordClassifier::default()),
        }
    }

    /// Replace the default keyword check on device output
    pub fn with_classifier(mut self, classifier: Arc<dyn ResponseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    async fn run_checked(
        &self,
        session: &mut dyn RemoteSession,
        device: &Device,
        command: &str,
        step: DeployStep,
    ) -> DeployResult<String> {
        let output = session
            .run(command)
            .await
            .map_err(|e| DeployError::transport(&device.id, step, e))?;

        self.classifier
            .check(&output)
            .map_err(|reason| DeployError::Rejected {
                device_id: device.id.clone(),
                step,
                output: reason,
            })?;

        Ok(output)
    }

    /// Best effort: some platforms have no snapshot support
    async fn create_snapshot(&self, session: &mut dyn RemoteSession, device: &Device) -> Option<SnapshotHandle> {
        match self
            .run_checked(session, device, SNAPSHOT_COMMAND, DeployStep::Snapshot)
            .await
        {
            Ok(output) => {
                let created_at = Utc::now();
                let handle = SnapshotHandle {
                    id: format!("snapshot-{}", created_at.timestamp()),
                    created_at,
                };
                tracing::info!("Created configuration snapshot: {}", handle.id);
                tracing::debug!("Snapshot output: {}", output.trim());
                Some(handle)
            }
            Err(e) => {
                tracing::warn!("Failed to create snapshot on {}: {}", device.hostname, e);
                None
            }
        }
    }

    async fn rollback_to_snapshot(
        &self,
        session: &mut dyn RemoteSession,
        device: &Device,
        snapshot: Option<&SnapshotHandle>,
    ) -> DeployResult<()> {
        let snapshot = snapshot.ok_or_else(|| DeployError::NoSnapshot {
            device_id: device.id.clone(),
        })?;

        tracing::info!("Rolling back {} to {}", device.hostname, snapshot.id);
        let output = self
            .run_checked(session, device, ROLLBACK_COMMAND, DeployStep::Rollback)
            .await?;
        tracing::info!("Rolled back configuration: {}", output.trim());
        Ok(())
    }

    async fn fail_with_rollback(
        &self,
        session: &mut dyn RemoteSession,
        device: &Device,
        snapshot: Option<&SnapshotHandle>,
        err: DeployError,
    ) -> DeployError {
        let rollback = self.rollback_to_snapshot(session, device, snapshot).await;
        if let Err(ref e) = rollback {
            tracing::error!("Rollback failed on {}: {} - manual intervention required", device.hostname, e);
        }
        err.after_rollback(rollback)
    }

    async fn apply_element(
        &self,
        session: &mut dyn RemoteSession,
        device: &Device,
        element: &ConfigElement,
    ) -> DeployResult<()> {
        let failed = |reason: String| DeployError::ElementFailed {
            device_id: device.id.clone(),
            path: element.path.clone(),
            reason,
        };

        // Exit status alone is not trusted; the output is always inspected
        let output = session
            .run(&element_command(element))
            .await
            .map_err(|e| failed(e.to_string()))?;
        self.classifier.check(&output).map_err(failed)
    }

    /// Apply elements in order on one connection, stopping at the first failure.
    /// Every attempted element gets a result, including the one that failed.
    pub(crate) async fn apply_elements(
        &self,
        device: &Device,
        elements: &[ConfigElement],
    ) -> (Vec<ElementUpdateResult>, DeployResult<()>) {
        if let Err(e) = require_vendor(STRATEGY_NAME, device, vendor::JUNIPER) {
            return (Vec::new(), Err(e));
        }
        if elements.is_empty() {
            return (
                Vec::new(),
                Err(DeployError::NothingToDeploy {
                    device_id: device.id.clone(),
                }),
            );
        }

        let mut session = match open_session(self.connector.as_ref(), &self.settings, device, DeployStep::Connect).await {
            Ok(session) => session,
            Err(e) => return (Vec::new(), Err(e)),
        };

        tracing::info!(
            "Deploying {} configuration elements to {} ({})",
            elements.len(),
            device.hostname,
            device.management_ip
        );

        let snapshot = self.create_snapshot(session.as_mut(), device).await;
        let mut results = Vec::with_capacity(elements.len());

        for (i, element) in elements.iter().enumerate() {
            tracing::info!(
                "Applying element {}/{}: {} {}",
                i + 1,
                elements.len(),
                element.operation,
                element.path
            );

            let started = Instant::now();
            let timestamp = Utc::now();
            let outcome = self.apply_element(session.as_mut(), device, element).await;

            let mut result = ElementUpdateResult {
                element: element.clone(),
                success: outcome.is_ok(),
                error: None,
                duration: started.elapsed(),
                timestamp,
            };

            if let Err(e) = outcome {
                tracing::warn!("Failed to apply element {}, attempting rollback...", element.path);
                result.error = Some(e.clone());
                results.push(result);

                let err = self
                    .fail_with_rollback(session.as_mut(), device, snapshot.as_ref(), e)
                    .await;
                session.close().await;
                return (results, Err(err));
            }

            tracing::debug!("Successfully applied element {}", element.path);
            results.push(result);
        }

        if let Err(e) = self
            .run_checked(session.as_mut(), device, COMMIT_COMMAND, DeployStep::Commit)
            .await
        {
            tracing::warn!("Commit failed on {}, rolling back...", device.hostname);
            let err = self
                .fail_with_rollback(session.as_mut(), device, snapshot.as_ref(), e)
                .await;
            session.close().await;
            return (results, Err(err));
        }

        tracing::info!("Configuration committed on {}", device.hostname);
        session.close().await;
        (results, Ok(()))
    }
}

#[async_trait::async_trait]
impl DeploymentStrategy for PerElementStrategy {
    fn name(&self) -> &'static str {
        STRATEGY_NAME
    }

    /// Elements come from the device record; the rendered `config` text is not parsed.
    async fn deploy(&self, device: &Device, _config: &str) -> DeployResult<Option<ConfigBackup>> {
        require_vendor(STRATEGY_NAME, device, vendor::JUNIPER)?;

        let elements = derive_elements(device);
        if elements.is_empty() {
            return Err(DeployError::NothingToDeploy {
                device_id: device.id.clone(),
            });
        }

        let (_, outcome) = self.apply_elements(device, &elements).await;
        outcome?;

        tracing::info!("Successfully deployed configuration to {}", device.hostname);
        Ok(None)
    }

    /// Reverts to the last committed configuration on the device; the text of
    /// `backup` is not re-sent.
    async fn rollback(&self, device: &Device, backup: &ConfigBackup) -> DeployResult<()> {
        require_vendor(STRATEGY_NAME, device, vendor::JUNIPER)?;

        tracing::info!(
            "Rolling back configuration on {} (backup taken {})",
            device.hostname,
            backup.timestamp.to_rfc3339()
        );

        let mut session = open_session(self.connector.as_ref(), &self.settings, device, DeployStep::Rollback).await?;
        let result = self
            .run_checked(session.as_mut(), device, ROLLBACK_COMMAND, DeployStep::Rollback)
            .await;
        session.close().await;

        result.map(|_| ())
    }
}

/// Fine-grained entry points that report per-element progress
pub struct PerElementDeployer {
    strategy: Arc<PerElementStrategy>,
}

impl PerElementDeployer {
    pub fn new(strategy: Arc<PerElementStrategy>) -> Self {
        Self { strategy }
    }

    /// Apply `elements` in order. The returned results cover every element
    /// attempted, so a caller can see exactly how far the deployment got.
    pub async fn deploy_elements(
        &self,
        device: &Device,
        elements: &[ConfigElement],
    ) -> (Vec<ElementUpdateResult>, DeployResult<()>) {
        self.strategy.apply_elements(device, elements).await
    }

    pub async fn update_interface(
        &self,
        device: &Device,
        interface_name: &str,
        update: &InterfaceUpdate,
    ) -> DeployResult<()> {
        let elements = interface_update_elements(interface_name, update);
        if elements.is_empty() {
            return Err(DeployError::NothingToDeploy {
                device_id: device.id.clone(),
            });
        }

        let (results, outcome) = self.deploy_elements(device, &elements).await;
        tracing::info!(
            "Interface {} on {}: {}/{} elements applied",
            interface_name,
            device.hostname,
            results.iter().filter(|r| r.success).count(),
            elements.len()
        );
        outcome
    }
}
