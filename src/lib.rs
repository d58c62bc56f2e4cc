//! # IOS lab simulator
//!
//! A training simulator for router command lines. A learner types IOS-style
//! commands; the engine expands abbreviations against a per-mode command
//! tree, runs them against a structured device configuration, answers `?`
//! help, renders `show` output, and checks the configuration against a
//! lab's success criteria.
//!
//! The interpreter is a pure function of (session, input): storage sits
//! behind [`session_store::SessionStore`] and is only touched by
//! [`processor::LabEngine`].

pub mod clicommands;
pub mod cliconfig;
pub mod commandcompleter;
pub mod error;
pub mod execute;
pub mod lab;
pub mod lab_check;
pub mod network_config;
pub mod processor;
pub mod run_config;
pub mod session_store;
pub mod show_c;

pub use cliconfig::{DeviceState, Session};
pub use error::{CliError, EngineError, LabError, StoreError};
pub use execute::Mode;
pub use lab::LabScenario;
pub use processor::{process_input, switch_device, CommandResponse, DeviceView, LabEngine};
pub use session_store::{JsonFileStore, MemoryStore, SessionStore};
