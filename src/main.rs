//! # IOS lab console
//!
//! Interactive front end for the lab engine. Every line typed goes through
//! [`LabEngine`], so the session file under `--sessions` always holds the
//! state shown on screen and a later run resumes where this one stopped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, warn};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use signal_hook::{consts::SIGTSTP, iterator::Signals};

use ios_lab_sim::cliconfig::{TranscriptEntry, TranscriptKind};
use ios_lab_sim::commandcompleter::CommandCompleter;
use ios_lab_sim::{DeviceView, JsonFileStore, LabEngine, LabScenario, Mode};

#[derive(Parser, Debug)]
#[command(name = "ios_lab_sim", version, about = "Router CLI lab simulator")]
struct Args {
    /// Lab scenario (JSON). Defaults to the built-in demo lab.
    #[arg(long)]
    lab: Option<PathBuf>,

    /// Directory holding the session files.
    #[arg(long, default_value = ".lab_sessions")]
    sessions: PathBuf,

    /// Session to open or create.
    #[arg(long, default_value = "default")]
    session: String,

    /// Device to connect to first.
    #[arg(long)]
    device: Option<String>,
}

fn print_transcript(entries: &[TranscriptEntry]) {
    for entry in entries {
        match entry.kind {
            TranscriptKind::Command => {
                println!("{}{}", entry.prompt.as_deref().unwrap_or(""), entry.text)
            }
            TranscriptKind::Output => println!("{}", entry.text),
        }
    }
}

fn show_device(view: &DeviceView, editor: &mut Editor<CommandCompleter, DefaultHistory>) {
    print_transcript(&view.transcript);
    if let Some(helper) = editor.helper_mut() {
        helper.current_mode = view.mode;
    }
}

/// Main function of the lab console.
///
/// `Ctrl+C` and `Ctrl+Z` leave any configuration mode the way `end` does.
/// Besides device commands the console understands:
/// - `connect <device>`: switch to another device of the lab
/// - `reset lab`: wipe every device of the session
/// - `exit cli`: quit
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let lab = match &args.lab {
        Some(path) => LabScenario::from_file(path)
            .with_context(|| format!("loading lab {}", path.display()))?,
        None => LabScenario::demo(),
    };
    let title = lab.title.clone();
    let description = lab.description.clone();

    let mut engine = LabEngine::new(JsonFileStore::new(&args.sessions), lab);
    let session = engine
        .start_session(&args.session)
        .with_context(|| format!("opening session '{}'", args.session))?;
    let mut announced = session.is_completed;
    let first_device = args.device.clone().unwrap_or(session.current_device);

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();
    let mut rl = Editor::<CommandCompleter, DefaultHistory>::with_config(config)
        .context("initialising line editor")?;
    rl.set_helper(Some(CommandCompleter::new(Mode::Privileged)));

    if !title.is_empty() {
        println!("{}\n{}\n", title, description);
    }
    let view = engine
        .switch_device(&args.session, &first_device)
        .with_context(|| format!("connecting to {}", first_device))?;
    let mut prompt = view.prompt.clone();
    show_device(&view, &mut rl);

    // Set by Ctrl+C / Ctrl+Z while a configuration mode is active.
    let leave_config = Arc::new(AtomicBool::new(false));
    let in_config = Arc::new(AtomicBool::new(view.mode != Mode::Privileged));

    {
        let leave_config = Arc::clone(&leave_config);
        let in_config = Arc::clone(&in_config);
        ctrlc::set_handler(move || {
            if in_config.load(Ordering::SeqCst) {
                leave_config.store(true, Ordering::SeqCst);
            }
        })
        .context("installing Ctrl+C handler")?;
    }
    {
        let leave_config = Arc::clone(&leave_config);
        let in_config = Arc::clone(&in_config);
        let mut signals = Signals::new([SIGTSTP]).context("installing Ctrl+Z handler")?;
        thread::spawn(move || {
            for _ in signals.forever() {
                if in_config.load(Ordering::SeqCst) {
                    leave_config.store(true, Ordering::SeqCst);
                }
            }
        });
    }

    loop {
        let line = if leave_config.swap(false, Ordering::SeqCst) {
            "end".to_string()
        } else {
            match rl.readline(&prompt) {
                Ok(buffer) => buffer,
                Err(ReadlineError::Interrupted) => "end".to_string(),
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    warn!("readline failed: {}", err);
                    break;
                }
            }
        };
        let input = line.trim();
        if !input.is_empty() {
            let _ = rl.add_history_entry(input);
        }

        let meta: Vec<&str> = input.split_whitespace().collect();
        match meta.as_slice() {
            ["exit", "cli"] => {
                println!("Exiting CLI...");
                break;
            }
            ["reset", "lab"] => {
                let view = engine.reset(&args.session)?;
                announced = false;
                prompt = view.prompt.clone();
                in_config.store(false, Ordering::SeqCst);
                show_device(&view, &mut rl);
            }
            ["connect", device] => match engine.switch_device(&args.session, device) {
                Ok(view) => {
                    prompt = view.prompt.clone();
                    in_config.store(view.mode != Mode::Privileged, Ordering::SeqCst);
                    show_device(&view, &mut rl);
                }
                Err(e) => println!("% {}", e),
            },
            _ => {
                let response = engine.process(&args.session, &line)?;
                debug!("{:?}", response);
                if !response.output.is_empty() {
                    println!("{}", response.output);
                }
                prompt = response.prompt;
                in_config.store(response.mode != Mode::Privileged, Ordering::SeqCst);
                if let Some(helper) = rl.helper_mut() {
                    helper.current_mode = response.mode;
                }
                if response.completed && !announced {
                    announced = true;
                    println!("\n*** Lab completed! ***\n");
                }
            }
        }
    }

    Ok(())
}
