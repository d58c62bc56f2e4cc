/// External crates for the lab engine
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::execute::Mode;

/// Device the learner lands on when a session is created.
pub const DEFAULT_DEVICE: &str = "R1";

fn enabled() -> bool {
    true
}

/// Global `service ...` flags.
///
/// The field names on the wire match the keys lab authors use in
/// success-criteria paths (`["services", "password-encryption"]`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Services {
    #[serde(rename = "password-encryption", default)]
    pub password_encryption: bool,
    #[serde(default = "enabled")]
    pub timestamps_log: bool,
    #[serde(default = "enabled")]
    pub timestamps_debug: bool,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            password_encryption: false,
            timestamps_log: true,
            timestamps_debug: true,
        }
    }
}

/// The fixed set of terminal lines a device exposes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineId {
    #[serde(rename = "con 0")]
    Console0,
    #[serde(rename = "vty 0 4")]
    Vty0To4,
    #[serde(rename = "vty 5 15")]
    Vty5To15,
}

impl LineId {
    /// Render order in the running configuration.
    pub const ALL: [LineId; 3] = [LineId::Console0, LineId::Vty0To4, LineId::Vty5To15];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineId::Console0 => "con 0",
            LineId::Vty0To4 => "vty 0 4",
            LineId::Vty5To15 => "vty 5 15",
        }
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings of one terminal line.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LineConfig {
    #[serde(default)]
    pub login: bool,
    #[serde(default)]
    pub logging_sync: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Administrative state of an interface.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceStatus {
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "administratively down")]
    AdminDown,
}

impl InterfaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceStatus::Up => "up",
            InterfaceStatus::AdminDown => "administratively down",
        }
    }
}

/// Line protocol state of an interface.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineProtocol {
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "down")]
    Down,
}

/// Per-interface settings. Every field stays unset until a command touches it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InterfaceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<LineProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InterfaceConfig {
    pub fn is_up(&self) -> bool {
        self.status == Some(InterfaceStatus::Up)
    }

    /// Status as the device prints it; unset means shut down.
    pub fn status_text(&self) -> &'static str {
        self.status.unwrap_or(InterfaceStatus::AdminDown).as_str()
    }

    pub fn protocol_text(&self) -> &'static str {
        if self.is_up() {
            "up"
        } else {
            "down"
        }
    }
}

/// Phase 1 (ISAKMP) protection suite.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct IsakmpPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// The configuration tree of one simulated device.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    pub hostname: String,
    #[serde(default)]
    pub services: Services,
    #[serde(default)]
    pub lines: BTreeMap<LineId, LineConfig>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceConfig>,
    #[serde(default)]
    pub isakmp_policies: BTreeMap<u32, IsakmpPolicy>,
    #[serde(default)]
    pub acls: Vec<String>,
}

impl DeviceConfig {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            services: Services::default(),
            lines: LineId::ALL
                .iter()
                .map(|id| (*id, LineConfig::default()))
                .collect(),
            interfaces: BTreeMap::new(),
            isakmp_policies: BTreeMap::new(),
            acls: Vec::new(),
        }
    }
}

/// Kind of a transcript record.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranscriptKind {
    #[serde(rename = "cmd")]
    Command,
    #[serde(rename = "out")]
    Output,
}

/// One line of the console replay shown to the learner.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub kind: TranscriptKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl TranscriptEntry {
    pub fn command(text: &str, prompt: &str) -> Self {
        Self {
            kind: TranscriptKind::Command,
            text: text.to_string(),
            prompt: Some(prompt.to_string()),
        }
    }

    pub fn output(text: &str) -> Self {
        Self {
            kind: TranscriptKind::Output,
            text: text.to_string(),
            prompt: None,
        }
    }
}

/// Configuration plus interpreter bookkeeping for one device.
///
/// `pending_*` name the object a sub-mode is editing and are only set while
/// the matching mode is active.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeviceState {
    pub config: DeviceConfig,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_line: Option<LineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_policy_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_config: Option<String>,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
}

impl DeviceState {
    pub fn new(device_id: &str) -> Self {
        Self {
            config: DeviceConfig::new(device_id),
            mode: Mode::Privileged,
            pending_line: None,
            pending_interface: None,
            pending_policy_id: None,
            startup_config: None,
            history: Vec::new(),
            transcript: Vec::new(),
        }
    }

    /// `<hostname><mode suffix>`, e.g. `R1(config-if)#`.
    pub fn prompt(&self) -> String {
        format!("{}{}", self.config.hostname, self.mode.prompt_suffix())
    }

    /// Appends one invocation to the transcript: always a `cmd` record, and an
    /// `out` record only when there is output.
    pub fn record(&mut self, raw: &str, prompt_before: &str, output: &str) {
        self.transcript.push(TranscriptEntry::command(raw, prompt_before));
        if !output.is_empty() {
            self.transcript.push(TranscriptEntry::output(output));
        }
    }
}

/// One learner's attempt at a lab: every device they touched plus the
/// completion flag.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Session {
    pub id: String,
    pub current_device: String,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceState>,
    #[serde(default)]
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            current_device: DEFAULT_DEVICE.to_string(),
            devices: BTreeMap::new(),
            is_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn device(&self, device_id: &str) -> Option<&DeviceState> {
        self.devices.get(device_id)
    }

    /// Returns the device state, creating it with defaults on first access.
    pub fn device_mut(&mut self, device_id: &str) -> &mut DeviceState {
        self.devices.entry(device_id.to_string()).or_insert_with(|| {
            info!("initialising device '{}'", device_id);
            DeviceState::new(device_id)
        })
    }

    /// Drops every device and the completion flag.
    pub fn reset(&mut self) {
        self.devices.clear();
        self.is_completed = false;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_device_uses_documented_defaults() {
        let device = DeviceState::new("R2");
        assert_eq!(device.config.hostname, "R2");
        assert_eq!(device.mode, Mode::Privileged);
        assert!(device.history.is_empty());
        assert!(device.transcript.is_empty());
        assert!(!device.config.services.password_encryption);
        assert!(device.config.services.timestamps_log);
        assert_eq!(device.config.lines.len(), 3);
        assert_eq!(device.prompt(), "R2#");
    }

    #[test]
    fn device_is_created_lazily_once() {
        let mut session = Session::new("s1");
        assert!(session.device("R1").is_none());
        session.device_mut("R1").config.hostname = "EDGE".into();
        assert_eq!(session.device_mut("R1").config.hostname, "EDGE");
        assert_eq!(session.devices.len(), 1);
    }

    #[test]
    fn record_skips_empty_output() {
        let mut device = DeviceState::new("R1");
        device.record("conf t", "R1#", "");
        device.record("bogus", "R1#", "% Invalid input detected.");
        assert_eq!(device.transcript.len(), 3);
        assert_eq!(device.transcript[0].kind, TranscriptKind::Command);
        assert_eq!(device.transcript[0].prompt.as_deref(), Some("R1#"));
        assert_eq!(device.transcript[2].kind, TranscriptKind::Output);
    }

    #[test]
    fn config_serializes_with_lab_path_keys() {
        let mut config = DeviceConfig::new("R1");
        config.interfaces.insert(
            "FastEthernet0/0".into(),
            InterfaceConfig {
                status: Some(InterfaceStatus::AdminDown),
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["services"]["password-encryption"], false);
        assert_eq!(value["lines"]["vty 0 4"]["login"], false);
        assert_eq!(
            value["interfaces"]["FastEthernet0/0"]["status"],
            "administratively down"
        );
        assert!(value["interfaces"]["FastEthernet0/0"].get("ip_address").is_none());
    }

    #[test]
    fn session_round_trips_through_json() {
        let mut session = Session::new("s1");
        session.device_mut("R1").config.isakmp_policies.insert(10, IsakmpPolicy::default());
        let text = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&text).unwrap();
        assert_eq!(back.devices, session.devices);
    }
}
