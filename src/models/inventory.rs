use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::Device;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub environment: String,
}

/// InfrastructureModel is the device inventory the deployment runs against
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfrastructureModel {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl InfrastructureModel {
    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Pick devices in the given rollout order. An empty list keeps inventory order.
    pub fn select_devices(&self, ids: &[String]) -> Result<Vec<Device>> {
        if ids.is_empty() {
            return Ok(self.devices.clone());
        }

        ids.iter()
            .map(|id| {
                self.device(id)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("Device not found in inventory: {}", id))
            })
            .collect()
    }
}

/// Load the infrastructure model from a JSON file
pub fn load_model(path: impl AsRef<Path>) -> Result<InfrastructureModel> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read inventory {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse inventory {}", path.display()))
}

/// Read rendered configs, one `<device-id>.cfg` per device.
/// Devices without a file are left out of the map.
pub async fn load_configs(dir: impl AsRef<Path>, devices: &[Device]) -> Result<HashMap<String, String>> {
    let dir = dir.as_ref();
    let mut configs = HashMap::new();

    for device in devices {
        let path = dir.join(format!("{}.cfg", device.id));
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                configs.insert(device.id.clone(), content);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No rendered config at {}", path.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        }
    }

    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = r#"{
        "metadata": {"version": "1.0", "environment": "lab"},
        "devices": [
            {
                "id": "core-01",
                "hostname": "core-router-01",
                "device_type": "router",
                "vendor": "cisco",
                "management_ip": "10.0.1.10",
                "interfaces": [
                    {"name": "Gi0/0/0", "description": "Uplink", "ip_address": "192.168.1.1",
                     "subnet_mask": "255.255.255.252", "enabled": true, "mtu": 1500}
                ],
                "routing": {"static_routes": [{"destination": "0.0.0.0/0", "next_hop": "192.168.1.2"}]}
            },
            {
                "id": "edge-01",
                "hostname": "edge-switch-01",
                "vendor": "juniper",
                "management_ip": "10.0.1.20"
            }
        ]
    }"#;

    #[test]
    fn test_load_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infrastructure.json");
        std::fs::write(&path, INVENTORY).unwrap();

        let model = load_model(&path).unwrap();
        assert_eq!(model.metadata.environment, "lab");
        assert_eq!(model.devices.len(), 2);

        let core = model.device("core-01").unwrap();
        assert_eq!(core.interfaces[0].mtu, 1500);
        assert!(core.routing.is_some());

        let edge = model.device("edge-01").unwrap();
        assert!(edge.routing.is_none());
        assert!(edge.interfaces.is_empty());
    }

    #[test]
    fn test_load_model_missing_file() {
        let err = load_model("/nonexistent/infrastructure.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read inventory"));
    }

    #[test]
    fn test_select_devices_in_given_order() {
        let model: InfrastructureModel = serde_json::from_str(INVENTORY).unwrap();

        let all = model.select_devices(&[]).unwrap();
        assert_eq!(all[0].id, "core-01");

        let ordered = model
            .select_devices(&["edge-01".to_string(), "core-01".to_string()])
            .unwrap();
        assert_eq!(ordered[0].id, "edge-01");
        assert_eq!(ordered[1].id, "core-01");

        assert!(model.select_devices(&["missing".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_load_configs_skips_missing_files() {
        let model: InfrastructureModel = serde_json::from_str(INVENTORY).unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("core-01.cfg"), "hostname core-router-01\n").unwrap();

        let configs = load_configs(dir.path(), &model.devices).await.unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs["core-01"], "hostname core-router-01\n");
        assert!(!configs.contains_key("edge-01"));
    }
}
