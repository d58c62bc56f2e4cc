/// External crates for the lab engine
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::ipv4_mask_to_prefix;
use lazy_static::lazy_static;
use regex::Regex;

use crate::cliconfig::{DeviceConfig, LineId};

/// Hardware interfaces every simulated router has. Only these can be
/// selected with `interface <name>`.
pub const KNOWN_INTERFACES: [&str; 2] = ["FastEthernet0/0", "FastEthernet0/1"];

/// Interface families the canonicalizer understands, lower-case full name
/// first.
const INTERFACE_FAMILIES: [(&str, &str); 2] = [
    ("fastethernet", "FastEthernet"),
    ("gigabitethernet", "GigabitEthernet"),
];

lazy_static! {
    static ref SHORT_INTERFACE: Regex = Regex::new(r"^([A-Za-z]+)(\d.*)$").unwrap();
}

/// Expands short interface names: `f0/0`, `fa0/0`, `fast0/0` and
/// `FastEthernet0/0` all become `FastEthernet0/0`; `g0/1` becomes
/// `GigabitEthernet0/1`. Anything else is returned unchanged.
pub fn canonical_interface_name(short_name: &str) -> String {
    let Some(caps) = SHORT_INTERFACE.captures(short_name) else {
        return short_name.to_string();
    };
    let letters = caps[1].to_lowercase();
    let number = &caps[2];

    INTERFACE_FAMILIES
        .iter()
        .find(|(full, _)| full.starts_with(&letters))
        .map(|(_, canonical)| format!("{}{}", canonical, number))
        .unwrap_or_else(|| short_name.to_string())
}

/// Canonicalizes `name` and snaps it onto the matching built-in interface.
pub fn resolve_known_interface(name: &str) -> Option<&'static str> {
    let expanded = canonical_interface_name(name);
    KNOWN_INTERFACES
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(&expanded))
}

/// Sorted union of the built-in interfaces and the ones present in `config`.
pub fn all_interface_names(config: &DeviceConfig) -> Vec<String> {
    let mut names: BTreeSet<String> = KNOWN_INTERFACES.iter().map(|s| s.to_string()).collect();
    names.extend(config.interfaces.keys().cloned());
    names.into_iter().collect()
}

/// Maps the arguments of `line ...` onto one of the fixed lines.
///
/// `console 0` is the console; `vty 0 4` and `vty 5 15` are the two virtual
/// terminal ranges, and a bare `vty 0` falls back to the first range.
pub fn resolve_line(args: &[String]) -> Option<LineId> {
    let has = |n: &str| args.iter().skip(1).any(|a| a == n);
    match args.first().map(String::as_str) {
        Some("console") if has("0") => Some(LineId::Console0),
        Some("vty") if has("0") && has("4") => Some(LineId::Vty0To4),
        Some("vty") if has("5") && has("15") => Some(LineId::Vty5To15),
        Some("vty") if has("0") => Some(LineId::Vty0To4),
        _ => None,
    }
}

/// Validates a dotted address and a contiguous netmask, returning the prefix
/// length of the mask.
pub fn parse_address_and_mask(address: &str, mask: &str) -> Result<(Ipv4Addr, u8), String> {
    let address =
        Ipv4Addr::from_str(address).map_err(|_| format!("Invalid IP address: {}", address))?;
    let mask_addr = Ipv4Addr::from_str(mask).map_err(|_| format!("Invalid subnet mask: {}", mask))?;
    let prefix = ipv4_mask_to_prefix(mask_addr).map_err(|e| format!("Bad mask {}: {}", mask, e))?;
    Ok((address, prefix))
}

/// `10.0.0.1` + `255.255.255.0` -> `10.0.0.1/24`. Falls back to `ip/mask`
/// when the mask is not a valid netmask.
pub fn ip_with_cidr(ip: &str, subnet_mask: &str) -> String {
    match parse_address_and_mask(ip, subnet_mask) {
        Ok((address, prefix)) => format!("{}/{}", address, prefix),
        Err(_) => format!("{}/{}", ip, subnet_mask),
    }
}
