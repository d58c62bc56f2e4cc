//! Goal evaluation: decides whether the devices of a session satisfy a lab's
//! success criteria.
//!
//! Each check names a path of keys into the serialized device configuration
//! (`["interfaces", "FastEthernet0/0", "status"]`) and an expected value.
//! Evaluation never mutates device state; the only write is the session's
//! completion flag, which is set once and never cleared here.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cliconfig::{DeviceState, Session};
use crate::network_config::canonical_interface_name;

/// Requirements per device identifier.
pub type SuccessCriteria = BTreeMap<String, DeviceRequirements>;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DeviceRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub config_checks: Vec<ConfigCheck>,
}

/// One path/value assertion against a device configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigCheck {
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub value: Value,
}

/// Renders a leaf for comparison. Missing values and `null` are empty.
fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Looks a key up in a JSON object: exact key, then ignoring case, then as
/// an abbreviated interface name (`Fa0/0`).
fn lookup<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    let object = node.as_object()?;
    if let Some(found) = object.get(key) {
        return Some(found);
    }
    if let Some((_, found)) = object.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
        return Some(found);
    }
    let expanded = canonical_interface_name(key);
    object
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(&expanded))
        .map(|(_, found)| found)
}

/// Walks `path` from `root` and stringifies what it finds; a missing key at
/// any step resolves to the empty string.
pub fn resolve_path(root: &Value, path: &[String]) -> String {
    let mut current = Some(root);
    for key in path {
        current = current.and_then(|node| lookup(node, key));
    }
    stringify(current)
}

fn config_value(device: Option<&DeviceState>) -> Value {
    device
        .and_then(|d| serde_json::to_value(&d.config).ok())
        .unwrap_or(Value::Null)
}

fn device_meets(device_id: &str, requirements: &DeviceRequirements, device: Option<&DeviceState>) -> bool {
    let expected_hostname = requirements
        .hostname
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty());
    if let Some(expected) = expected_hostname {
        let actual = device.map(|d| d.config.hostname.as_str()).unwrap_or("");
        if !actual.eq_ignore_ascii_case(expected) {
            debug!("[check] {} hostname: got '{}', expected '{}'", device_id, actual, expected);
            return false;
        }
    }

    let config = config_value(device);
    for check in &requirements.config_checks {
        let actual = resolve_path(&config, &check.path);
        let expected = stringify(Some(&check.value));
        if actual.to_lowercase() != expected.to_lowercase() {
            debug!(
                "[check] {} path {:?}: got '{}', expected '{}'",
                device_id, check.path, actual, expected
            );
            return false;
        }
    }
    true
}

/// True when every device satisfies its requirements. An empty criteria set
/// never passes.
pub fn criteria_met(criteria: &SuccessCriteria, devices: &BTreeMap<String, DeviceState>) -> bool {
    if criteria.is_empty() {
        return false;
    }
    criteria
        .iter()
        .all(|(device_id, requirements)| device_meets(device_id, requirements, devices.get(device_id)))
}

/// Evaluates the criteria against the session and latches its completion
/// flag on success. Returns the flag.
pub fn check_completion(criteria: &SuccessCriteria, session: &mut Session) -> bool {
    if session.is_completed {
        return true;
    }
    if criteria_met(criteria, &session.devices) {
        info!("[check] session '{}' completed the lab", session.id);
        session.is_completed = true;
    }
    session.is_completed
}
