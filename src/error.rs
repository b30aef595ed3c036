//! Error types for configuration deployment.
//!
//! Transport causes are carried as rendered strings so every error is `Clone`
//! and a `DeploymentResult` can hold exactly the value a strategy returned.

use std::fmt;
use thiserror::Error;

use crate::models::ConfigBackup;

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// The stage of a deployment an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    Connect,
    Backup,
    Snapshot,
    Apply,
    Verify,
    Commit,
    Rollback,
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeployStep::Connect => "connect",
            DeployStep::Backup => "backup",
            DeployStep::Snapshot => "snapshot",
            DeployStep::Apply => "apply",
            DeployStep::Verify => "verify",
            DeployStep::Commit => "commit",
            DeployStep::Rollback => "rollback",
        };
        f.write_str(s)
    }
}

/// Failures of the remote command-execution channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to connect to {address}: {message}")]
    Connect { address: String, message: String },

    #[error("authentication failed for {user}@{address}")]
    Auth { address: String, user: String },

    #[error("session error: {0}")]
    Session(String),

    #[error("command exited with status {status}: {output}")]
    ExitStatus { status: i32, output: String },
}

/// Errors returned by deployment strategies and the orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeployError {
    /// Strategy does not handle this vendor. Nothing was sent to the device.
    #[error("{strategy} deployment does not support vendor '{vendor}'")]
    UnsupportedVendor { strategy: String, vendor: String },

    /// No configuration elements could be derived. Nothing was sent to the device.
    #[error("no configuration elements to deploy for {device_id}")]
    NothingToDeploy { device_id: String },

    #[error("{step} failed on {device_id}: {source}")]
    Transport {
        device_id: String,
        step: DeployStep,
        #[source]
        source: TransportError,
    },

    /// Device accepted the session but its output reported a failure.
    #[error("{step} rejected by {device_id}: {output}")]
    Rejected {
        device_id: String,
        step: DeployStep,
        output: String,
    },

    #[error("failed to apply element {path} on {device_id}: {reason}")]
    ElementFailed {
        device_id: String,
        path: String,
        reason: String,
    },

    #[error("configuration verification failed on {device_id}: {found}/{expected} critical lines present (missing: {missing:?})")]
    VerificationMismatch {
        device_id: String,
        expected: usize,
        found: usize,
        missing: Vec<String>,
    },

    #[error("no snapshot available to roll back {device_id}")]
    NoSnapshot { device_id: String },

    #[error("deployment failed, successfully rolled back: {source}")]
    RolledBack {
        #[source]
        source: Box<DeployError>,
    },

    /// Deployment and rollback both failed. The device needs manual attention.
    #[error("deployment failed and rollback failed: deploy error: {source}, rollback error: {rollback}")]
    RollbackFailed {
        #[source]
        source: Box<DeployError>,
        rollback: Box<DeployError>,
        /// Pre-change config, kept so the device can be restored by hand
        backup: Option<Box<ConfigBackup>>,
    },
}

impl DeployError {
    pub fn transport(device_id: &str, step: DeployStep, source: TransportError) -> Self {
        DeployError::Transport {
            device_id: device_id.to_string(),
            step,
            source,
        }
    }

    /// Fold the outcome of an automatic rollback into the original failure.
    pub fn after_rollback(self, rollback: DeployResult<()>) -> Self {
        match rollback {
            Ok(()) => DeployError::RolledBack {
                source: Box::new(self),
            },
            Err(rollback) => DeployError::RollbackFailed {
                source: Box::new(self),
                rollback: Box::new(rollback),
                backup: None,
            },
        }
    }

    /// Attach the pre-change backup to a failed rollback. Other errors are returned unchanged.
    pub fn with_backup(self, backup: &ConfigBackup) -> Self {
        match self {
            DeployError::RollbackFailed { source, rollback, .. } => DeployError::RollbackFailed {
                source,
                rollback,
                backup: Some(Box::new(backup.clone())),
            },
            other => other,
        }
    }

    /// The backup to restore by hand, when a rollback failed and one was taken
    pub fn recovery_backup(&self) -> Option<&ConfigBackup> {
        match self {
            DeployError::RollbackFailed { backup, .. } => backup.as_deref(),
            _ => None,
        }
    }

    /// Precondition errors are returned before any remote interaction.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DeployError::UnsupportedVendor { .. } | DeployError::NothingToDeploy { .. }
        )
    }

    /// Only a failed rollback leaves the device in an unknown state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeployError::RollbackFailed { .. })
    }
}
