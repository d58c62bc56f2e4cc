//! The processor: one command line in, one response out.
//!
//! [`process_input`] is the pure core: it works on a loaded [`Session`] and
//! never touches storage. [`LabEngine`] wraps it with the load/save cycle of
//! a [`SessionStore`].

use log::{debug, info, warn};
use serde::Serialize;

use crate::cliconfig::{Session, TranscriptEntry};
use crate::commandcompleter::{context_help, is_help_request};
use crate::error::EngineError;
use crate::execute::{execute_command, Mode};
use crate::lab::LabScenario;
use crate::lab_check::check_completion;
use crate::session_store::SessionStore;

/// What the caller gets back for one command line.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub output: String,
    pub prompt: String,
    pub completed: bool,
    pub hostname: String,
    pub mode: Mode,
}

/// State of a device as shown after switching to it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceView {
    pub device_id: String,
    pub device_type: String,
    pub prompt: String,
    pub mode: Mode,
    pub transcript: Vec<TranscriptEntry>,
}

/// Runs `raw` on the session's current device.
///
/// A line ending in `?` is answered by the help responder and does not reach
/// the handlers or the history. Every call appends one `cmd` transcript entry
/// (plus an `out` entry when there is output) and re-evaluates the lab goal.
pub fn process_input(session: &mut Session, lab: &LabScenario, raw: &str) -> CommandResponse {
    let device_id = session.current_device.clone();
    let device = session.device_mut(&device_id);
    let prompt_before = device.prompt();

    let help = is_help_request(raw);
    let output = if help {
        context_help(raw, device.mode)
    } else {
        execute_command(raw, device)
    };

    device.record(raw, &prompt_before, &output);
    if !help && !raw.trim().is_empty() {
        device.history.push(raw.to_string());
    }

    let prompt = device.prompt();
    let hostname = device.config.hostname.clone();
    let mode = device.mode;

    let completed = check_completion(&lab.success_criteria, session);
    session.touch();

    CommandResponse {
        output,
        prompt,
        completed,
        hostname,
        mode,
    }
}

/// Makes `device_id` the session's current device.
///
/// The device must be on the lab's allow-list. Its state is created on first
/// access; a device with an empty transcript gets a one-line greeting in the
/// returned view.
pub fn switch_device(
    session: &mut Session,
    lab: &LabScenario,
    device_id: &str,
) -> Result<DeviceView, EngineError> {
    if !lab.is_allowed(device_id) {
        warn!("session '{}': access to '{}' denied", session.id, device_id);
        return Err(EngineError::AccessDenied(device_id.to_string()));
    }

    session.current_device = device_id.to_string();
    let device_type = lab.device_type(device_id).to_string();
    let device = session.device_mut(device_id);

    let transcript = if device.transcript.is_empty() {
        vec![TranscriptEntry::output(&format!(
            "Switched to {} ({}).",
            device_id, device_type
        ))]
    } else {
        device.transcript.clone()
    };
    let view = DeviceView {
        device_id: device_id.to_string(),
        device_type,
        prompt: device.prompt(),
        mode: device.mode,
        transcript,
    };

    info!("session '{}' switched to {}", session.id, device_id);
    session.touch();
    Ok(view)
}

/// Binds a lab to a session store and runs every operation as
/// load, mutate, save.
pub struct LabEngine<S> {
    store: S,
    lab: LabScenario,
}

impl<S: SessionStore> LabEngine<S> {
    pub fn new(store: S, lab: LabScenario) -> Self {
        Self { store, lab }
    }

    pub fn lab(&self) -> &LabScenario {
        &self.lab
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn start_session(&mut self, session_id: &str) -> Result<Session, EngineError> {
        Ok(self.store.load_or_create(session_id)?)
    }

    pub fn process(&mut self, session_id: &str, raw: &str) -> Result<CommandResponse, EngineError> {
        let mut session = self.store.load(session_id)?;
        let response = process_input(&mut session, &self.lab, raw);
        debug!("[{}] '{}' -> {:?}", session_id, raw, response.prompt);
        self.store.save(&session)?;
        Ok(response)
    }

    pub fn switch_device(&mut self, session_id: &str, device_id: &str) -> Result<DeviceView, EngineError> {
        let mut session = self.store.load(session_id)?;
        let view = switch_device(&mut session, &self.lab, device_id)?;
        self.store.save(&session)?;
        Ok(view)
    }

    /// Hard reset: forgets every device and the completion flag, then opens
    /// the session's current device again.
    pub fn reset(&mut self, session_id: &str) -> Result<DeviceView, EngineError> {
        let mut session = self.store.load(session_id)?;
        session.reset();
        info!("session '{}' reset", session_id);
        let current = session.current_device.clone();
        let view = switch_device(&mut session, &self.lab, &current)?;
        self.store.save(&session)?;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cliconfig::TranscriptKind;

    #[test]
    fn records_transcript_and_history() {
        let mut session = Session::new("s");
        let lab = LabScenario::default();
        let response = process_input(&mut session, &lab, "conf t");
        assert_eq!(response.prompt, "R1(config)#");
        assert_eq!(response.mode, Mode::GlobalConfig);
        let device = &session.devices["R1"];
        assert_eq!(device.history, vec!["conf t"]);
        assert_eq!(device.transcript.len(), 2);
        assert_eq!(device.transcript[0].prompt.as_deref(), Some("R1#"));
    }

    #[test]
    fn help_is_transcribed_but_not_remembered() {
        let mut session = Session::new("s");
        let lab = LabScenario::default();
        let response = process_input(&mut session, &lab, "sh?");
        assert!(response.output.contains("show"));
        let device = &session.devices["R1"];
        assert!(device.history.is_empty());
        assert_eq!(device.transcript.len(), 2);
        assert_eq!(device.transcript[1].kind, TranscriptKind::Output);
    }

    #[test]
    fn empty_line_records_a_bare_command() {
        let mut session = Session::new("s");
        let response = process_input(&mut session, &LabScenario::default(), "   ");
        assert_eq!(response.output, "");
        let device = &session.devices["R1"];
        assert_eq!(device.transcript.len(), 1);
        assert!(device.history.is_empty());
    }

    #[test]
    fn switching_respects_the_allow_list() {
        let mut session = Session::new("s");
        let lab = LabScenario::demo();
        assert!(matches!(
            switch_device(&mut session, &lab, "R9"),
            Err(EngineError::AccessDenied(_))
        ));
        let view = switch_device(&mut session, &lab, "SW1").unwrap();
        assert_eq!(view.device_type, "switch");
        assert_eq!(view.prompt, "SW1#");
        assert_eq!(view.transcript[0].text, "Switched to SW1 (switch).");
        assert_eq!(session.current_device, "SW1");
        assert!(session.devices["SW1"].transcript.is_empty());
    }
}
