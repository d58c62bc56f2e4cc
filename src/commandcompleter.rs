/// External crates for the lab engine
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Helper;

use crate::clicommands::{CommandNode, COMMAND_TREE};
use crate::execute::Mode;

/// Character that turns an input line into a help request.
pub const HELP_MARKER: char = '?';

const UNRECOGNIZED_COMMAND: &str = "% Unrecognized command";

/// Expands abbreviated command tokens to their canonical spelling.
///
/// Tokens are matched against the command tree of `mode`, ignoring case. A
/// unique match is replaced by the tree token; several matches keep the
/// token only when one of them is an exact hit. Once a token matches nothing,
/// or matches ambiguously without an exact hit, it and everything after it
/// are arguments and pass through verbatim.
///
/// # Example
/// ```rust
/// use ios_lab_sim::commandcompleter::normalize_command;
/// use ios_lab_sim::execute::Mode;
///
/// assert_eq!(normalize_command("sh ru", Mode::Privileged), "show running-config");
/// assert_eq!(normalize_command("co", Mode::Privileged), "co");
/// ```
pub fn normalize_command(raw: &str, mode: Mode) -> String {
    let mut scope: Option<&[CommandNode]> = Some(COMMAND_TREE.root(mode));
    let mut expanded = Vec::new();

    for token in raw.split_whitespace() {
        let Some(options) = scope else {
            expanded.push(token.to_string());
            continue;
        };

        let matches = CommandNode::matching(options, token);
        let resolved = match matches.as_slice() {
            [] => None,
            [only] => Some(*only),
            many => many
                .iter()
                .copied()
                .find(|n| n.token.eq_ignore_ascii_case(token)),
        };

        match resolved {
            Some(node) => {
                expanded.push(node.token.to_string());
                scope = Some(&node.children);
            }
            None => {
                expanded.push(token.to_string());
                scope = None;
            }
        }
    }

    expanded.join(" ")
}

/// True when the trimmed line ends with the help marker.
pub fn is_help_request(raw: &str) -> bool {
    raw.trim().ends_with(HELP_MARKER)
}

/// Splits a line into the words already typed in full and the partial word
/// under the cursor (empty after trailing whitespace).
fn split_completed(body: &str) -> (Vec<&str>, &str) {
    let mut words: Vec<&str> = body.split_whitespace().collect();
    let ends_with_space = body.is_empty() || body.ends_with(char::is_whitespace);
    let prefix = if ends_with_space {
        ""
    } else {
        words.pop().unwrap_or("")
    };
    (words, prefix)
}

/// Tree options reachable after the completed words, or `None` once the
/// words have left the grammar.
fn options_after<'a>(words: &[&str], mode: Mode) -> Option<&'a [CommandNode]> {
    let normalized = normalize_command(&words.join(" "), mode);
    let path: Vec<&str> = normalized.split_whitespace().collect();
    COMMAND_TREE.walk(mode, &path)
}

/// Answers a `?` request with the tokens that may come next.
///
/// `show ?` lists everything after `show`; `show r?` lists only the tokens
/// under `show` starting with `r`. Each option is printed as the token padded
/// to 20 columns followed by its description.
pub fn context_help(raw: &str, mode: Mode) -> String {
    let trimmed = raw.trim();
    let body = trimmed.strip_suffix(HELP_MARKER).unwrap_or(trimmed);
    let (words, prefix) = split_completed(body.trim_start());
    let prefix = prefix.to_lowercase();

    let lines: Vec<String> = options_after(&words, mode)
        .unwrap_or_default()
        .iter()
        .filter(|n| n.token.to_lowercase().starts_with(&prefix))
        .map(|n| format!("  {:<20} {}", n.token, n.description))
        .collect();

    if lines.is_empty() {
        UNRECOGNIZED_COMMAND.to_string()
    } else {
        lines.join("\n")
    }
}

/// Tab-completion candidates for `line`: the byte offset the candidates
/// replace from, and the matching tree tokens.
pub fn completion_candidates(line: &str, mode: Mode) -> (usize, Vec<&'static str>) {
    let (words, prefix) = split_completed(line);
    let start = line.len() - prefix.len();
    let candidates = options_after(&words, mode)
        .map(|options| {
            CommandNode::matching(options, prefix)
                .into_iter()
                .map(|n| n.token)
                .collect()
        })
        .unwrap_or_default();
    (start, candidates)
}

/// Rustyline helper completing commands for the active device mode.
///
/// The console updates `current_mode` after every command so that the
/// completions follow the device through its configuration modes.
#[derive(Clone)]
pub struct CommandCompleter {
    pub current_mode: Mode,
}

impl CommandCompleter {
    pub fn new(current_mode: Mode) -> Self {
        CommandCompleter { current_mode }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        let query = line.get(..pos).unwrap_or(line);
        let (start, tokens) = completion_candidates(query, self.current_mode);
        let candidates = tokens
            .into_iter()
            .map(|token| Pair {
                display: token.to_string(),
                replacement: token.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Helper for CommandCompleter {}

impl Hinter for CommandCompleter {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {
    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> Result<ValidationResult, ReadlineError> {
        Ok(ValidationResult::Valid(None))
    }
}
