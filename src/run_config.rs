/// External crates for the lab engine
use log::info;

use crate::cliconfig::{DeviceState, LineId};
use crate::network_config::all_interface_names;

/// Fixed key of the Cisco type-7 password obfuscation.
const TYPE7_KEY: &[u8] = b"dsfd;kfoA,.iyewrkldJKDHSUBsgvca69834ncxv9873254k;fg87";

/// Shown when a mask was never recorded next to an address.
const DEFAULT_MASK: &str = "255.255.255.0";

/// Encodes `plain` as a type-7 string with the given salt (`0..16`): the salt
/// as two decimal digits followed by each byte XOR-ed with the key, in
/// upper-case hex.
pub fn encode_type7_with_salt(plain: &str, salt: usize) -> String {
    let salt = salt % 16;
    let mut encoded = format!("{:02}", salt);
    for (i, byte) in plain.bytes().enumerate() {
        let key = TYPE7_KEY[(salt + i) % TYPE7_KEY.len()];
        encoded.push_str(&format!("{:02X}", byte ^ key));
    }
    encoded
}

/// Type-7 encoding with a salt derived from the password itself, so the
/// same password always renders the same way.
pub fn encode_type7(plain: &str) -> String {
    let salt = plain.bytes().map(usize::from).sum::<usize>() % 16;
    encode_type7_with_salt(plain, salt)
}

fn service_line(enabled: bool, service: &str) -> String {
    if enabled {
        format!("service {}", service)
    } else {
        format!("no service {}", service)
    }
}

/// The configuration listing from the first `!` to `end`.
fn render_config_body(device: &DeviceState) -> String {
    let config = &device.config;
    let services = &config.services;
    let mut lines: Vec<String> = vec!["!".into(), "version 15.1".into()];

    lines.push(service_line(services.timestamps_log, "timestamps log datetime msec"));
    lines.push(service_line(services.timestamps_debug, "timestamps debug datetime msec"));
    lines.push(service_line(services.password_encryption, "password-encryption"));
    lines.push("!".into());
    lines.push(format!("hostname {}", config.hostname));
    lines.push("!".into());
    lines.push("boot-start-marker".into());
    lines.push("boot-end-marker".into());
    lines.push("!".into());

    for (id, policy) in &config.isakmp_policies {
        lines.push(format!("crypto isakmp policy {}", id));
        if let Some(encryption) = &policy.encryption {
            lines.push(format!(" encr {}", encryption));
        }
        if let Some(hash) = &policy.hash {
            lines.push(format!(" hash {}", hash));
        }
        if let Some(authentication) = &policy.authentication {
            lines.push(format!(" authentication {}", authentication));
        }
        if let Some(group) = &policy.group {
            lines.push(format!(" group {}", group));
        }
        lines.push("!".into());
    }

    for name in all_interface_names(config) {
        let iface = config.interfaces.get(&name).cloned().unwrap_or_default();
        lines.push(format!("interface {}", name));
        if let Some(description) = &iface.description {
            lines.push(format!(" description {}", description));
        }
        match (iface.ip_address.as_deref(), iface.mask.as_deref()) {
            (Some("dhcp"), _) => lines.push(" ip address dhcp".into()),
            (Some(ip), mask) => {
                lines.push(format!(" ip address {} {}", ip, mask.unwrap_or(DEFAULT_MASK)))
            }
            (None, _) => lines.push(" no ip address".into()),
        }
        lines.push(" duplex auto".into());
        lines.push(" speed auto".into());
        if !iface.is_up() {
            lines.push(" shutdown".into());
        }
        lines.push("!".into());
    }

    if !config.acls.is_empty() {
        lines.extend(config.acls.iter().cloned());
        lines.push("!".into());
    }

    for id in LineId::ALL {
        let line = config.lines.get(&id).cloned().unwrap_or_default();
        lines.push(format!("line {}", id));
        if line.logging_sync {
            lines.push(" logging synchronous".into());
        }
        lines.push(if line.login { " login" } else { " no login" }.into());
        if let Some(password) = &line.password {
            if services.password_encryption {
                lines.push(format!(" password 7 {}", encode_type7(password)));
            } else {
                lines.push(format!(" password {}", password));
            }
        }
    }

    lines.push("!".into());
    lines.push("end".into());
    lines.join("\n")
}

/// Renders `show running-config` for the device.
///
/// The listing is a pure function of the device configuration: rendering
/// twice without a mutation in between yields identical text.
pub fn get_running_config(device: &DeviceState) -> String {
    let body = render_config_body(device);
    format!(
        "Building configuration...\n\nCurrent configuration : {} bytes\n{}",
        body.len(),
        body
    )
}

/// Copies the running configuration into the startup configuration.
pub fn save_running_to_startup(device: &mut DeviceState) -> String {
    let snapshot = render_config_body(device);
    info!(
        "{}: saved {} bytes to startup-config",
        device.config.hostname,
        snapshot.len()
    );
    device.startup_config = Some(snapshot);
    "Building configuration...\n[OK]".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cliconfig::{InterfaceConfig, InterfaceStatus, IsakmpPolicy};

    #[test]
    fn type7_matches_known_vectors() {
        assert_eq!(encode_type7_with_salt("cisco", 2), "02050D480809");
        assert_eq!(encode_type7("cisco"), "01100F175804");
        assert_eq!(encode_type7(""), "00");
    }

    #[test]
    fn default_config_layout() {
        let device = DeviceState::new("R1");
        let text = get_running_config(&device);
        let expected_body = "\
!
version 15.1
service timestamps log datetime msec
service timestamps debug datetime msec
no service password-encryption
!
hostname R1
!
boot-start-marker
boot-end-marker
!
interface FastEthernet0/0
 no ip address
 duplex auto
 speed auto
 shutdown
!
interface FastEthernet0/1
 no ip address
 duplex auto
 speed auto
 shutdown
!
line con 0
 no login
line vty 0 4
 no login
line vty 5 15
 no login
!
end";
        assert_eq!(
            text,
            format!(
                "Building configuration...\n\nCurrent configuration : {} bytes\n{}",
                expected_body.len(),
                expected_body
            )
        );
    }

    #[test]
    fn rendering_is_stable() {
        let mut device = DeviceState::new("R1");
        device.config.acls.push("access-list 1 permit any".into());
        assert_eq!(get_running_config(&device), get_running_config(&device));
    }

    #[test]
    fn configured_sections_appear_in_order() {
        let mut device = DeviceState::new("EDGE");
        device.config.interfaces.insert(
            "FastEthernet0/0".into(),
            InterfaceConfig {
                status: Some(InterfaceStatus::Up),
                ip_address: Some("10.0.0.1".into()),
                mask: Some("255.255.255.0".into()),
                description: Some("WAN".into()),
                ..Default::default()
            },
        );
        device.config.isakmp_policies.insert(
            20,
            IsakmpPolicy {
                encryption: Some("aes".into()),
                ..Default::default()
            },
        );
        device.config.isakmp_policies.insert(5, IsakmpPolicy::default());
        device.config.acls.push("access-list 10 permit any".into());

        let text = get_running_config(&device);
        let pos = |needle: &str| text.find(needle).unwrap();
        assert!(pos("boot-end-marker") < pos("crypto isakmp policy 5"));
        assert!(pos("crypto isakmp policy 5") < pos("crypto isakmp policy 20"));
        assert!(text.contains("crypto isakmp policy 20\n encr aes\n!"));
        assert!(text.contains(
            "interface FastEthernet0/0\n description WAN\n ip address 10.0.0.1 255.255.255.0\n duplex auto\n speed auto\n!"
        ));
        assert!(pos("interface FastEthernet0/1") < pos("access-list 10 permit any"));
        assert!(pos("access-list 10 permit any") < pos("line con 0"));
    }

    #[test]
    fn line_passwords_follow_password_encryption() {
        let mut device = DeviceState::new("R1");
        let con = device.config.lines.get_mut(&LineId::Console0).unwrap();
        con.password = Some("cisco".into());
        con.login = true;
        con.logging_sync = true;
        assert!(get_running_config(&device)
            .contains("line con 0\n logging synchronous\n login\n password cisco\n"));

        device.config.services.password_encryption = true;
        let text = get_running_config(&device);
        assert!(text.contains("service password-encryption"));
        assert!(text.contains(" password 7 01100F175804"));
        assert!(!text.contains("password cisco"));
    }

    #[test]
    fn dhcp_interfaces_have_no_mask() {
        let mut device = DeviceState::new("R1");
        device.config.interfaces.insert(
            "FastEthernet0/1".into(),
            InterfaceConfig {
                ip_address: Some("dhcp".into()),
                ..Default::default()
            },
        );
        assert!(get_running_config(&device).contains("interface FastEthernet0/1\n ip address dhcp\n"));
    }

    #[test]
    fn write_stores_a_startup_snapshot() {
        let mut device = DeviceState::new("R1");
        assert_eq!(save_running_to_startup(&mut device), "Building configuration...\n[OK]");
        let saved = device.startup_config.clone().unwrap();
        assert!(saved.starts_with("!\nversion 15.1"));
        device.config.hostname = "CHANGED".into();
        assert!(device.startup_config.as_deref().unwrap().contains("hostname R1"));
    }
}
