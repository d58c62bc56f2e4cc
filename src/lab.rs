//! Lab scenarios: the goal source of a session.

use std::fs;
use std::path::Path;

use log::warn;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cliconfig::DEFAULT_DEVICE;
use crate::error::LabError;
use crate::lab_check::{ConfigCheck, DeviceRequirements, SuccessCriteria};

const DEFAULT_DEVICE_TYPE: &str = "router";

fn default_device_type() -> String {
    DEFAULT_DEVICE_TYPE.to_string()
}

/// A device drawn on the lab topology.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TopologyNode {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Topology {
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
}

/// Accepts the topology as an object or as a JSON-encoded string. Text that
/// does not decode is an empty topology.
fn topology_from_value<'de, D>(deserializer: D) -> Result<Topology, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Topology::default()),
        Value::String(text) => Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("ignoring undecodable topology: {}", e);
            Topology::default()
        })),
        other => serde_json::from_value(other).map_err(de::Error::custom),
    }
}

/// One lab exercise.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LabScenario {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "topology_from_value")]
    pub topology_data: Topology,
    #[serde(default)]
    pub success_criteria: SuccessCriteria,
    #[serde(default)]
    pub allowed_devices: Vec<String>,
}

impl LabScenario {
    pub fn from_json(text: &str) -> Result<Self, LabError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LabError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Devices the learner may open. An empty list allows only the default
    /// device.
    pub fn allowed_devices(&self) -> Vec<String> {
        if self.allowed_devices.is_empty() {
            vec![DEFAULT_DEVICE.to_string()]
        } else {
            self.allowed_devices.clone()
        }
    }

    pub fn is_allowed(&self, device_id: &str) -> bool {
        self.allowed_devices().iter().any(|d| d == device_id)
    }

    /// Node type from the topology, `router` when the device is not drawn.
    pub fn device_type(&self, device_id: &str) -> &str {
        self.topology_data
            .nodes
            .iter()
            .find(|node| node.id == device_id)
            .map(|node| node.device_type.as_str())
            .unwrap_or(DEFAULT_DEVICE_TYPE)
    }

    /// Built-in exercise used when no lab file is given: rename R1 to EDGE
    /// and bring up its WAN interface with 10.0.0.1/24.
    pub fn demo() -> Self {
        let check = |path: &[&str], value: &str| ConfigCheck {
            path: path.iter().map(|s| s.to_string()).collect(),
            value: Value::String(value.to_string()),
        };
        let mut success_criteria = SuccessCriteria::new();
        success_criteria.insert(
            "R1".to_string(),
            DeviceRequirements {
                hostname: Some("EDGE".to_string()),
                config_checks: vec![
                    check(&["interfaces", "FastEthernet0/0", "ip_address"], "10.0.0.1"),
                    check(&["interfaces", "FastEthernet0/0", "mask"], "255.255.255.0"),
                    check(&["interfaces", "FastEthernet0/0", "status"], "up"),
                ],
            },
        );

        LabScenario {
            title: "Basic router setup".to_string(),
            description: "Set the hostname of R1 to EDGE and bring up FastEthernet0/0 \
                          with address 10.0.0.1/24."
                .to_string(),
            topology_data: Topology {
                nodes: vec![
                    TopologyNode {
                        id: "R1".to_string(),
                        device_type: "router".to_string(),
                    },
                    TopologyNode {
                        id: "SW1".to_string(),
                        device_type: "switch".to_string(),
                    },
                ],
            },
            success_criteria,
            allowed_devices: vec!["R1".to_string(), "SW1".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default() {
        let lab = LabScenario::from_json("{}").unwrap();
        assert!(lab.success_criteria.is_empty());
        assert_eq!(lab.allowed_devices(), vec!["R1"]);
        assert!(lab.is_allowed("R1"));
        assert!(!lab.is_allowed("R2"));
        assert_eq!(lab.device_type("R1"), "router");
    }

    #[test]
    fn topology_may_be_an_encoded_string() {
        let lab = LabScenario::from_json(
            r#"{"topology_data": "{\"nodes\": [{\"id\": \"SW1\", \"type\": \"switch\"}]}",
                "allowed_devices": ["R1", "SW1"]}"#,
        )
        .unwrap();
        assert_eq!(lab.device_type("SW1"), "switch");
        assert!(lab.is_allowed("SW1"));
    }

    #[test]
    fn garbage_topology_text_is_empty() {
        let lab = LabScenario::from_json(r#"{"topology_data": "not json"}"#).unwrap();
        assert!(lab.topology_data.nodes.is_empty());
    }

    #[test]
    fn parses_success_criteria() {
        let lab = LabScenario::from_json(
            r#"{"success_criteria": {"R1": {"hostname": "CORE",
                "config_checks": [{"path": ["interfaces", "FastEthernet0/0", "status"], "value": "up"}]}}}"#,
        )
        .unwrap();
        let r1 = &lab.success_criteria["R1"];
        assert_eq!(r1.hostname.as_deref(), Some("CORE"));
        assert_eq!(r1.config_checks[0].path.len(), 3);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(LabScenario::from_json("{"), Err(LabError::Json(_))));
        assert!(matches!(
            LabScenario::from_file("/nonexistent/lab.json"),
            Err(LabError::Io(_))
        ));
    }
}
