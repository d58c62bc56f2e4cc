use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::clicommands::{parse_command, Command, ServiceFlag};
use crate::cliconfig::{
    DeviceState, InterfaceConfig, InterfaceStatus, IsakmpPolicy, LineConfig, LineProtocol,
};
use crate::commandcompleter::normalize_command;
use crate::error::CliError;
use crate::network_config::{parse_address_and_mask, resolve_known_interface, resolve_line};
use crate::run_config::save_running_to_startup;
use crate::show_c::show_command;

pub const CONFIG_BANNER: &str = "Enter configuration commands, one per line.  End with CNTL/Z.";

/// Interpreter state of one device.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Privileged,
    GlobalConfig,
    InterfaceConfig,
    LineConfig,
    IsakmpConfig,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Privileged,
        Mode::GlobalConfig,
        Mode::InterfaceConfig,
        Mode::LineConfig,
        Mode::IsakmpConfig,
    ];

    pub fn prompt_suffix(&self) -> &'static str {
        match self {
            Mode::Privileged => "#",
            Mode::GlobalConfig => "(config)#",
            Mode::InterfaceConfig => "(config-if)#",
            Mode::LineConfig => "(config-line)#",
            Mode::IsakmpConfig => "(config-isakmp)#",
        }
    }
}

/// Runs one raw command line against `device` and returns the text the
/// device prints.
///
/// Rejections come back as their device message. Internal faults, whether a
/// `CliError::System` or a panic inside a handler, restore the device to its
/// state before the call.
pub fn execute_command(raw: &str, device: &mut DeviceState) -> String {
    let line = normalize_command(raw, device.mode);
    if line.is_empty() {
        return String::new();
    }

    let command = parse_command(device.mode, &line);
    debug!("[{:?}] '{}' -> {:?}", device.mode, line, command);

    run_contained(&line, device, |device| dispatch(command, device))
}

/// Runs `handler` on `device`, turning panics and internal errors into a
/// `% System Error` reply with the device rolled back.
fn run_contained<F>(line: &str, device: &mut DeviceState, handler: F) -> String
where
    F: FnOnce(&mut DeviceState) -> Result<String, CliError>,
{
    let snapshot = device.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut *device)));

    match outcome {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            if err.is_internal() {
                error!("command '{}' failed: {}", line, err);
                *device = snapshot;
            }
            err.to_string()
        }
        Err(payload) => {
            let detail = panic_detail(payload.as_ref());
            error!("command '{}' panicked: {}", line, detail);
            *device = snapshot;
            CliError::System(detail).to_string()
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected failure".to_string()
    }
}

fn dispatch(command: Command, device: &mut DeviceState) -> Result<String, CliError> {
    match command {
        Command::Empty => Ok(String::new()),
        Command::End => {
            enter_mode(device, Mode::Privileged);
            Ok(String::new())
        }
        Command::Exit => {
            exit_mode(device);
            Ok(String::new())
        }
        other => match device.mode {
            Mode::Privileged => handle_privileged(other, device),
            Mode::GlobalConfig => handle_global_config(other, device),
            Mode::InterfaceConfig => handle_interface_config(other, device),
            Mode::LineConfig => handle_line_config(other, device),
            Mode::IsakmpConfig => handle_isakmp_config(other, device),
        },
    }
}

/// Switches mode and forgets whatever sub-mode object was being edited.
fn enter_mode(device: &mut DeviceState, mode: Mode) {
    device.mode = mode;
    device.pending_line = None;
    device.pending_interface = None;
    device.pending_policy_id = None;
}

/// `exit` walks one level up: sub-modes return to global configuration,
/// global configuration returns to privileged EXEC.
fn exit_mode(device: &mut DeviceState) {
    let parent = match device.mode {
        Mode::Privileged | Mode::GlobalConfig => Mode::Privileged,
        Mode::InterfaceConfig | Mode::LineConfig | Mode::IsakmpConfig => Mode::GlobalConfig,
    };
    enter_mode(device, parent);
}

fn context_lost(device: &mut DeviceState, err: CliError) -> CliError {
    warn!("{:?} lost its pending object, returning to global config", device.mode);
    enter_mode(device, Mode::GlobalConfig);
    err
}

fn handle_privileged(command: Command, device: &mut DeviceState) -> Result<String, CliError> {
    match command {
        Command::ConfigureTerminal => {
            enter_mode(device, Mode::GlobalConfig);
            Ok(CONFIG_BANNER.to_string())
        }
        Command::Enable => Ok(String::new()),
        other => handle_exec(other, device),
    }
}

/// Exec commands shared by privileged mode and `do`.
fn handle_exec(command: Command, device: &mut DeviceState) -> Result<String, CliError> {
    match command {
        Command::Show(Some(target)) => show_command(&target, device),
        Command::Show(None) => Err(CliError::InvalidAtMarker),
        Command::Write => Ok(save_running_to_startup(device)),
        Command::Incomplete => Err(CliError::Incomplete),
        _ => Err(CliError::InvalidInput),
    }
}

fn handle_do(command: Command, device: &mut DeviceState) -> Result<String, CliError> {
    match command {
        Command::Show(_) | Command::Write | Command::Incomplete => handle_exec(command, device),
        _ => Err(CliError::InvalidInput),
    }
}

fn handle_global_config(command: Command, device: &mut DeviceState) -> Result<String, CliError> {
    match command {
        Command::Do(inner) => handle_do(*inner, device),
        Command::Hostname(name) => {
            device.config.hostname = name;
            Ok(String::new())
        }
        Command::Service { flag, enable } => {
            let services = &mut device.config.services;
            match flag {
                ServiceFlag::PasswordEncryption => services.password_encryption = enable,
                ServiceFlag::TimestampsLog => services.timestamps_log = enable,
                ServiceFlag::TimestampsDebug => services.timestamps_debug = enable,
            }
            Ok(String::new())
        }
        Command::Line(args) => {
            let line = resolve_line(&args).ok_or(CliError::InvalidLine)?;
            device.config.lines.entry(line).or_insert_with(LineConfig::default);
            enter_mode(device, Mode::LineConfig);
            device.pending_line = Some(line);
            Ok(String::new())
        }
        Command::Interface(name) => {
            let name = resolve_known_interface(&name).ok_or(CliError::InvalidInterface)?;
            device
                .config
                .interfaces
                .entry(name.to_string())
                .or_insert_with(InterfaceConfig::default);
            enter_mode(device, Mode::InterfaceConfig);
            device.pending_interface = Some(name.to_string());
            Ok(String::new())
        }
        Command::CryptoIsakmpPolicy(id) => {
            let id = id
                .parse::<u32>()
                .ok()
                .filter(|id| (1..=10000).contains(id))
                .ok_or(CliError::InvalidInput)?;
            device
                .config
                .isakmp_policies
                .entry(id)
                .or_insert_with(IsakmpPolicy::default);
            enter_mode(device, Mode::IsakmpConfig);
            device.pending_policy_id = Some(id);
            Ok(String::new())
        }
        Command::AccessList(entry) => {
            device.config.acls.push(entry);
            Ok(String::new())
        }
        Command::NoAccessList(number) => {
            device
                .config
                .acls
                .retain(|entry| entry.split_whitespace().nth(1) != Some(number.as_str()));
            Ok(String::new())
        }
        Command::Incomplete => Err(CliError::Incomplete),
        _ => Err(CliError::InvalidInput),
    }
}

fn pending_interface(device: &mut DeviceState) -> Result<&mut InterfaceConfig, CliError> {
    let present = device
        .pending_interface
        .as_ref()
        .is_some_and(|name| device.config.interfaces.contains_key(name));
    if !present {
        return Err(context_lost(device, CliError::InterfaceContextLost));
    }
    let DeviceState {
        config,
        pending_interface,
        ..
    } = device;
    pending_interface
        .as_ref()
        .and_then(|name| config.interfaces.get_mut(name))
        .ok_or(CliError::InterfaceContextLost)
}

fn handle_interface_config(command: Command, device: &mut DeviceState) -> Result<String, CliError> {
    match command {
        // Selecting another interface goes straight through the global handler.
        Command::Interface(_) => return handle_global_config(command, device),
        Command::Do(inner) => return handle_do(*inner, device),
        _ => {}
    }

    let iface = pending_interface(device)?;
    match command {
        Command::Description(text) => {
            iface.description = Some(text);
            Ok(String::new())
        }
        Command::NoDescription => {
            iface.description = None;
            Ok(String::new())
        }
        Command::IpAddress { address, mask } => {
            if let Err(reason) = parse_address_and_mask(&address, &mask) {
                debug!("rejecting ip address: {}", reason);
                return Err(CliError::InvalidInput);
            }
            iface.ip_address = Some(address);
            iface.mask = Some(mask);
            Ok(String::new())
        }
        Command::IpAddressDhcp => {
            iface.ip_address = Some("dhcp".to_string());
            iface.mask = None;
            Ok(String::new())
        }
        Command::NoIpAddress => {
            iface.ip_address = None;
            iface.mask = None;
            Ok(String::new())
        }
        Command::NoShutdown => {
            iface.status = Some(InterfaceStatus::Up);
            iface.protocol = Some(LineProtocol::Up);
            Ok("% Link changed, interface is up".to_string())
        }
        Command::Shutdown => {
            iface.status = Some(InterfaceStatus::AdminDown);
            iface.protocol = Some(LineProtocol::Down);
            Ok("% Link changed, interface is administratively down".to_string())
        }
        Command::Incomplete => Err(CliError::Incomplete),
        _ => Err(CliError::InvalidInput),
    }
}

fn pending_line(device: &mut DeviceState) -> Result<&mut LineConfig, CliError> {
    let line = match device.pending_line {
        Some(line) if device.config.lines.contains_key(&line) => line,
        _ => return Err(context_lost(device, CliError::LineContextLost)),
    };
    device
        .config
        .lines
        .get_mut(&line)
        .ok_or(CliError::LineContextLost)
}

fn handle_line_config(command: Command, device: &mut DeviceState) -> Result<String, CliError> {
    if let Command::Do(inner) = command {
        return handle_do(*inner, device);
    }

    let line = pending_line(device)?;
    match command {
        Command::Password(password) => line.password = Some(password),
        Command::NoPassword => line.password = None,
        Command::Login => line.login = true,
        Command::NoLogin => line.login = false,
        Command::LoggingSynchronous(enabled) => line.logging_sync = enabled,
        Command::Incomplete => return Err(CliError::Incomplete),
        _ => return Err(CliError::InvalidInput),
    }
    Ok(String::new())
}

fn pending_policy(device: &mut DeviceState) -> Result<&mut IsakmpPolicy, CliError> {
    let id = match device.pending_policy_id {
        Some(id) if device.config.isakmp_policies.contains_key(&id) => id,
        _ => return Err(context_lost(device, CliError::PolicyContextLost)),
    };
    device
        .config
        .isakmp_policies
        .get_mut(&id)
        .ok_or(CliError::PolicyContextLost)
}

fn handle_isakmp_config(command: Command, device: &mut DeviceState) -> Result<String, CliError> {
    if let Command::Do(inner) = command {
        return handle_do(*inner, device);
    }

    let policy = pending_policy(device)?;
    match command {
        Command::PolicyAttribute { attribute, value } => {
            let value = attribute
                .allowed_values()
                .iter()
                .find(|allowed| allowed.eq_ignore_ascii_case(&value))
                .ok_or(CliError::InvalidInput)?;
            *attribute.slot(policy) = Some(value.to_string());
            Ok(String::new())
        }
        Command::Incomplete => Err(CliError::Incomplete),
        _ => Err(CliError::InvalidInput),
    }
}
