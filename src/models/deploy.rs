use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::DeployError;

/// ConfigBackup is a point-in-time copy of a device's running configuration,
/// captured before anything on the device is changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigBackup {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub config: String,
}

impl ConfigBackup {
    pub fn new(device_id: &str, config: String) -> Self {
        Self {
            device_id: device_id.to_string(),
            timestamp: Utc::now(),
            config,
        }
    }
}

/// Which part of the device an element touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Interface,
    Service,
    Vlan,
    Routing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementOperation {
    Set,
    Delete,
    Edit,
}

impl fmt::Display for ElementOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementOperation::Set => write!(f, "set"),
            ElementOperation::Delete => write!(f, "delete"),
            ElementOperation::Edit => write!(f, "edit"),
        }
    }
}

/// ConfigElement is one atomic, independently appliable configuration change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigElement {
    pub element_type: ElementType,
    pub path: String,
    pub operation: ElementOperation,
    pub value: String,
    pub description: String,
}

/// Outcome of applying a single element
#[derive(Debug, Clone)]
pub struct ElementUpdateResult {
    pub element: ConfigElement,
    pub success: bool,
    pub error: Option<DeployError>,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
}

/// DeploymentResult records the outcome of one device's deployment attempt
#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub device_id: String,
    pub success: bool,
    pub error: Option<DeployError>,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    /// Pre-change backup, when the strategy captured one as a config text
    pub backup: Option<ConfigBackup>,
}
