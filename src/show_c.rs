use crate::clicommands::ShowTarget;
use crate::cliconfig::{DeviceState, IsakmpPolicy};
use crate::error::CliError;
use crate::network_config::{all_interface_names, canonical_interface_name, ip_with_cidr};
use crate::run_config::get_running_config;

/// Runs one `show` command against the device.
pub fn show_command(target: &ShowTarget, device: &DeviceState) -> Result<String, CliError> {
    match target {
        ShowTarget::RunningConfig => Ok(get_running_config(device)),
        ShowTarget::StartupConfig => Ok(show_start_conf(device)),
        ShowTarget::IpInterfaceBrief => Ok(show_ip_int_br(device)),
        ShowTarget::Interfaces => Ok(show_interfaces(device)),
        ShowTarget::Interface(name) => show_interface(device, name),
        ShowTarget::InterfaceDescription => Ok(show_interface_description(device)),
        ShowTarget::CryptoIsakmpPolicy => Ok(show_isakmp_policy(device)),
        ShowTarget::History => Ok(show_history(device)),
    }
}

pub fn show_start_conf(device: &DeviceState) -> String {
    device
        .startup_config
        .clone()
        .unwrap_or_else(|| "startup-config is not present".to_string())
}

/// `show ip interface brief`
pub fn show_ip_int_br(device: &DeviceState) -> String {
    let mut lines = vec![format!(
        "{:<20} {:<15} {:<4} {:<20} {:<10}",
        "Interface", "IP-Address", "OK?", "Status", "Protocol"
    )];
    for name in all_interface_names(&device.config) {
        let iface = device.config.interfaces.get(&name).cloned().unwrap_or_default();
        lines.push(format!(
            "{:<20} {:<15} {:<4} {:<20} {:<10}",
            name,
            iface.ip_address.as_deref().unwrap_or("unassigned"),
            "YES",
            iface.status_text(),
            iface.protocol_text()
        ));
    }
    lines.join("\n")
}

/// `show interface description`
pub fn show_interface_description(device: &DeviceState) -> String {
    let mut lines = vec![format!(
        "{:<25} {:<12} {:<10} {}",
        "Interface", "Status", "Protocol", "Description"
    )];
    for name in all_interface_names(&device.config) {
        let iface = device.config.interfaces.get(&name).cloned().unwrap_or_default();
        let status = if iface.is_up() { "up" } else { "admin down" };
        lines.push(
            format!(
                "{:<25} {:<12} {:<10} {}",
                name,
                status,
                iface.protocol_text(),
                iface.description.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string(),
        );
    }
    lines.join("\n")
}

/// Detail block of one interface. The MAC address is derived from the
/// interface's position in the sorted interface list.
pub fn render_interface_detail(device: &DeviceState, name: &str) -> String {
    let names = all_interface_names(&device.config);
    let ordinal = names.iter().position(|n| n == name).unwrap_or(names.len()) + 1;
    let mac = format!("0000.0000.00{:02x}", ordinal);
    let iface = device.config.interfaces.get(name).cloned().unwrap_or_default();

    let mut lines = vec![
        format!(
            "{} is {}, line protocol is {}",
            name,
            iface.status_text(),
            iface.protocol_text()
        ),
        format!("  Hardware is AmdFE, address is {} (bia {})", mac, mac),
    ];
    if let Some(description) = &iface.description {
        lines.push(format!("  Description: {}", description));
    }
    match (iface.ip_address.as_deref(), iface.mask.as_deref()) {
        (Some("dhcp"), _) => lines.push("  Internet address will be negotiated using DHCP".into()),
        (Some(ip), Some(mask)) => lines.push(format!("  Internet address is {}", ip_with_cidr(ip, mask))),
        (Some(ip), None) => lines.push(format!("  Internet address is {}", ip)),
        (None, _) => {}
    }
    lines.extend(
        [
            "  MTU 1500 bytes, BW 100000 Kbit, DLY 100 usec,",
            "     reliability 255/255, txload 1/255, rxload 1/255",
            "  Encapsulation ARPA, loopback not set",
            "  Keepalive set (10 sec)",
            "  Full-duplex, 100Mb/s, 100BaseTX/FX",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    lines.join("\n")
}

/// `show interfaces` without a name: every interface, one block each.
pub fn show_interfaces(device: &DeviceState) -> String {
    all_interface_names(&device.config)
        .iter()
        .map(|name| render_interface_detail(device, name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn show_interface(device: &DeviceState, raw_name: &str) -> Result<String, CliError> {
    let expanded = canonical_interface_name(raw_name);
    all_interface_names(&device.config)
        .into_iter()
        .find(|name| name.eq_ignore_ascii_case(&expanded))
        .map(|name| render_interface_detail(device, &name))
        .ok_or(CliError::InvalidInterface)
}

fn render_policy(id: u32, policy: &IsakmpPolicy) -> String {
    format!(
        "Protection suite of priority {}\n\
         \tencryption algorithm:   {}\n\
         \thash algorithm:         {}\n\
         \tauthentication method:  {}\n\
         \tDiffie-Hellman group:   #{}\n\
         \tlifetime:               86400 seconds, no volume limit",
        id,
        policy.encryption.as_deref().unwrap_or("des"),
        policy.hash.as_deref().unwrap_or("sha"),
        policy.authentication.as_deref().unwrap_or("rsa-sig"),
        policy.group.as_deref().unwrap_or("1"),
    )
}

/// `show crypto isakmp policy`
pub fn show_isakmp_policy(device: &DeviceState) -> String {
    if device.config.isakmp_policies.is_empty() {
        return "% No ISAKMP policies configured".to_string();
    }
    device
        .config
        .isakmp_policies
        .iter()
        .map(|(id, policy)| render_policy(*id, policy))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn show_history(device: &DeviceState) -> String {
    device
        .history
        .iter()
        .map(|cmd| format!("  {}", cmd))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cliconfig::{InterfaceConfig, InterfaceStatus, LineProtocol};

    fn device_with_uplink() -> DeviceState {
        let mut device = DeviceState::new("R1");
        device.config.interfaces.insert(
            "FastEthernet0/0".into(),
            InterfaceConfig {
                status: Some(InterfaceStatus::Up),
                protocol: Some(LineProtocol::Up),
                ip_address: Some("10.0.0.1".into()),
                mask: Some("255.255.255.0".into()),
                description: Some("Uplink".into()),
            },
        );
        device
    }

    #[test]
    fn brief_table_lists_every_interface() {
        let table = show_ip_int_br(&device_with_uplink());
        let rows: Vec<&str> = table.lines().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            format!(
                "{:<20} {:<15} {:<4} {:<20} {:<10}",
                "FastEthernet0/0", "10.0.0.1", "YES", "up", "up"
            )
        );
        assert!(rows[2].starts_with("FastEthernet0/1      unassigned"));
        assert!(rows[2].contains("administratively down"));
    }

    #[test]
    fn description_table() {
        let table = show_interface_description(&device_with_uplink());
        let rows: Vec<&str> = table.lines().collect();
        assert!(rows[0].starts_with("Interface"));
        assert_eq!(
            rows[1],
            format!("{:<25} {:<12} {:<10} {}", "FastEthernet0/0", "up", "up", "Uplink")
        );
        assert!(rows[2].contains("admin down"));
    }

    #[test]
    fn interface_detail_uses_cidr_and_ordinal_mac() {
        let device = device_with_uplink();
        let detail = show_command(&ShowTarget::Interface("fa0/0".into()), &device).unwrap();
        assert!(detail.starts_with("FastEthernet0/0 is up, line protocol is up\n"));
        assert!(detail.contains("address is 0000.0000.0001 (bia 0000.0000.0001)"));
        assert!(detail.contains("  Description: Uplink"));
        assert!(detail.contains("  Internet address is 10.0.0.1/24"));

        let other = render_interface_detail(&device, "FastEthernet0/1");
        assert!(other.starts_with(
            "FastEthernet0/1 is administratively down, line protocol is down"
        ));
        assert!(other.contains("0000.0000.0002"));
    }

    #[test]
    fn unknown_interface_is_rejected() {
        let device = DeviceState::new("R1");
        assert_eq!(
            show_command(&ShowTarget::Interface("fa9/9".into()), &device),
            Err(CliError::InvalidInterface)
        );
    }

    #[test]
    fn isakmp_policy_view_fills_defaults() {
        let mut device = DeviceState::new("R1");
        assert_eq!(show_isakmp_policy(&device), "% No ISAKMP policies configured");
        device.config.isakmp_policies.insert(
            10,
            IsakmpPolicy {
                encryption: Some("aes".into()),
                ..Default::default()
            },
        );
        let view = show_isakmp_policy(&device);
        assert!(view.starts_with("Protection suite of priority 10"));
        assert!(view.contains("encryption algorithm:   aes"));
        assert!(view.contains("hash algorithm:         sha"));
        assert!(view.contains("authentication method:  rsa-sig"));
        assert!(view.contains("Diffie-Hellman group:   #1"));
    }

    #[test]
    fn startup_and_history() {
        let mut device = DeviceState::new("R1");
        assert_eq!(show_start_conf(&device), "startup-config is not present");
        device.history = vec!["conf t".into(), "hostname X".into()];
        assert_eq!(show_history(&device), "  conf t\n  hostname X");
    }
}
