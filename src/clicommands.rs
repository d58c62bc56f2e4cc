//! Command tree and command parser.
//!
//! The tree is the grammar the learner types against: one list of root
//! tokens per [`Mode`], each token carrying its help text and the tokens that
//! may follow it. The abbreviation normalizer and the help responder walk it;
//! [`parse_command`] then turns a canonical line into a [`Command`].

use lazy_static::lazy_static;

use crate::cliconfig::IsakmpPolicy;
use crate::execute::Mode;
use crate::network_config::KNOWN_INTERFACES;

pub const ENCRYPTION_ALGORITHMS: [&str; 3] = ["aes", "3des", "des"];
pub const HASH_ALGORITHMS: [&str; 2] = ["md5", "sha"];
pub const AUTHENTICATION_METHODS: [&str; 1] = ["pre-share"];
pub const DH_GROUPS: [&str; 3] = ["1", "2", "5"];

/// One token of the grammar.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub token: &'static str,
    pub description: &'static str,
    pub children: Vec<CommandNode>,
}

impl CommandNode {
    /// Argument markers such as `<WORD>` or `<cr>` are shown by help but never
    /// matched by the normalizer.
    pub fn is_placeholder(&self) -> bool {
        self.token.starts_with('<')
    }

    /// Non-placeholder children whose token starts with `prefix`, ignoring case.
    pub fn matching<'a>(nodes: &'a [CommandNode], prefix: &str) -> Vec<&'a CommandNode> {
        let prefix = prefix.to_lowercase();
        nodes
            .iter()
            .filter(|n| !n.is_placeholder() && n.token.to_lowercase().starts_with(&prefix))
            .collect()
    }
}

/// Per-mode roots of the grammar.
#[derive(Debug, Clone)]
pub struct CommandTree {
    privileged: Vec<CommandNode>,
    global: Vec<CommandNode>,
    interface: Vec<CommandNode>,
    line: Vec<CommandNode>,
    isakmp: Vec<CommandNode>,
}

impl CommandTree {
    pub fn root(&self, mode: Mode) -> &[CommandNode] {
        match mode {
            Mode::Privileged => &self.privileged,
            Mode::GlobalConfig => &self.global,
            Mode::InterfaceConfig => &self.interface,
            Mode::LineConfig => &self.line,
            Mode::IsakmpConfig => &self.isakmp,
        }
    }

    /// Follows already-canonical tokens from the root of `mode`. Returns the
    /// options after the last token, or `None` when a token is not in the tree.
    pub fn walk<'a, S: AsRef<str>>(&'a self, mode: Mode, tokens: &[S]) -> Option<&'a [CommandNode]> {
        let mut options = self.root(mode);
        for token in tokens {
            let token = token.as_ref();
            let next = options
                .iter()
                .find(|n| !n.is_placeholder() && n.token.eq_ignore_ascii_case(token))?;
            options = &next.children;
        }
        Some(options)
    }
}

lazy_static! {
    /// The grammar shared by every session.
    pub static ref COMMAND_TREE: CommandTree = build_command_tree();
}

fn node(token: &'static str, description: &'static str, children: Vec<CommandNode>) -> CommandNode {
    CommandNode {
        token,
        description,
        children,
    }
}

fn leaf(token: &'static str, description: &'static str) -> CommandNode {
    node(token, description, Vec::new())
}

fn interface_names() -> Vec<CommandNode> {
    KNOWN_INTERFACES.iter().map(|name| leaf(*name, "")).collect()
}

fn show_node() -> CommandNode {
    let mut interface_options = interface_names();
    interface_options.push(leaf("description", "Show interface descriptions"));
    interface_options.push(leaf("<cr>", ""));

    node(
        "show",
        "Show running system information",
        vec![
            leaf("running-config", "Current operating configuration"),
            leaf("startup-config", "Contents of startup configuration"),
            node(
                "ip",
                "IP information",
                vec![node(
                    "interface",
                    "IP interface status and configuration",
                    vec![leaf("brief", "Brief summary of IP status and configuration")],
                )],
            ),
            node("interface", "Interface status and configuration", interface_options),
            node(
                "crypto",
                "Encryption module",
                vec![node(
                    "isakmp",
                    "Show ISAKMP",
                    vec![leaf("policy", "Show ISAKMP protection suite policy")],
                )],
            ),
            leaf("history", "Display the session command history"),
        ],
    )
}

fn write_node() -> CommandNode {
    node(
        "write",
        "Write running configuration to memory",
        vec![leaf("memory", "Write to NV memory")],
    )
}

fn copy_node() -> CommandNode {
    node(
        "copy",
        "Copy from one file to another",
        vec![node(
            "running-config",
            "Copy from current system configuration",
            vec![leaf("startup-config", "Copy to startup configuration")],
        )],
    )
}

fn do_node() -> CommandNode {
    node(
        "do",
        "To run exec commands in config mode",
        vec![show_node(), write_node(), copy_node()],
    )
}

fn end_node() -> CommandNode {
    leaf("end", "Exit from configure mode")
}

fn service_node() -> CommandNode {
    node(
        "service",
        "Modify use of network based services",
        vec![
            leaf("password-encryption", "Encrypt system passwords"),
            node(
                "timestamps",
                "Timestamp debug/log messages",
                vec![
                    leaf("log", "Timestamp log messages"),
                    leaf("debug", "Timestamp debug messages"),
                ],
            ),
        ],
    )
}

fn access_list_node() -> CommandNode {
    node(
        "access-list",
        "Add an access list entry",
        vec![leaf("<1-199>", "IP access list")],
    )
}

fn interface_node() -> CommandNode {
    node("interface", "Select an interface to configure", interface_names())
}

fn options(tokens: &[&'static str]) -> Vec<CommandNode> {
    tokens.iter().map(|t| leaf(*t, "")).collect()
}

/// Builds the grammar for every mode.
pub fn build_command_tree() -> CommandTree {
    let privileged = vec![
        show_node(),
        node(
            "configure",
            "Enter configuration mode",
            vec![leaf("terminal", "Configure from the terminal"), leaf("<cr>", "")],
        ),
        leaf("enable", "Turn on privileged commands"),
        leaf("exit", "Exit from the EXEC"),
        copy_node(),
        write_node(),
    ];

    let global = vec![
        node(
            "hostname",
            "Set system's network name",
            vec![leaf("<WORD>", "This system's network name")],
        ),
        interface_node(),
        node(
            "line",
            "Configure a terminal line",
            vec![
                node("console", "Primary terminal line", vec![leaf("<0-0>", "First Line number")]),
                node("vty", "Virtual terminal", vec![leaf("<0-15>", "First Line number")]),
            ],
        ),
        service_node(),
        node(
            "crypto",
            "Encryption module",
            vec![node(
                "isakmp",
                "Configure ISAKMP policy",
                vec![node(
                    "policy",
                    "Set policy for an ISAKMP protection suite",
                    vec![leaf("<1-10000>", "Priority of protection suite")],
                )],
            )],
        ),
        access_list_node(),
        leaf("exit", "Exit from configure mode"),
        end_node(),
        node(
            "no",
            "Negate a command or set its defaults",
            vec![service_node(), access_list_node()],
        ),
        do_node(),
    ];

    let ip_address = || {
        node(
            "address",
            "Set the IP address of an interface",
            vec![
                leaf("<A.B.C.D>", "IP address"),
                leaf("dhcp", "IP Address negotiated via DHCP"),
            ],
        )
    };
    let interface = vec![
        node(
            "ip",
            "Interface Internet Protocol config commands",
            vec![ip_address()],
        ),
        node(
            "description",
            "Interface specific description",
            vec![leaf("<LINE>", "Up to 240 characters describing this interface")],
        ),
        leaf("shutdown", "Shutdown the selected interface"),
        node(
            "no",
            "Negate a command or set its defaults",
            vec![
                leaf("shutdown", "Shutdown the selected interface"),
                node(
                    "ip",
                    "Interface Internet Protocol config commands",
                    vec![leaf("address", "Set the IP address of an interface")],
                ),
                leaf("description", "Interface specific description"),
            ],
        ),
        interface_node(),
        leaf("exit", "Exit from interface configuration mode"),
        end_node(),
        do_node(),
    ];

    let logging = || {
        node(
            "logging",
            "Modify message logging facilities",
            vec![leaf("synchronous", "Synchronized message output")],
        )
    };
    let line = vec![
        node(
            "password",
            "Set a password",
            vec![leaf("<LINE>", "The UNENCRYPTED (cleartext) line password")],
        ),
        leaf("login", "Enable password checking"),
        logging(),
        node(
            "no",
            "Negate a command or set its defaults",
            vec![
                leaf("login", "Enable password checking"),
                logging(),
                leaf("password", "Set a password"),
            ],
        ),
        leaf("exit", "Exit from line configuration mode"),
        end_node(),
        do_node(),
    ];

    let isakmp = vec![
        node(
            "encryption",
            "Set encryption algorithm for protection suite",
            vec![
                leaf("aes", "AES - Advanced Encryption Standard."),
                leaf("3des", "Three key triple DES"),
                leaf("des", "DES - Data Encryption Standard (56 bit keys)."),
            ],
        ),
        node(
            "hash",
            "Set hash function for protection suite",
            vec![leaf("md5", "Message Digest 5"), leaf("sha", "Secure Hash Standard")],
        ),
        node(
            "authentication",
            "Set authentication method for protection suite",
            options(&AUTHENTICATION_METHODS),
        ),
        node(
            "group",
            "Set the Diffie-Hellman group",
            vec![
                leaf("1", "Diffie-Hellman group 1 (768 bit)"),
                leaf("2", "Diffie-Hellman group 2 (1024 bit)"),
                leaf("5", "Diffie-Hellman group 5 (1536 bit)"),
            ],
        ),
        leaf("exit", "Exit from ISAKMP protection suite configuration mode"),
        end_node(),
        do_node(),
    ];

    CommandTree {
        privileged,
        global,
        interface,
        line,
        isakmp,
    }
}

/// `service` flags that can be toggled from global configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFlag {
    PasswordEncryption,
    TimestampsLog,
    TimestampsDebug,
}

/// Attributes of an ISAKMP protection suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAttribute {
    Encryption,
    Hash,
    Authentication,
    Group,
}

impl PolicyAttribute {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "encryption" => Some(PolicyAttribute::Encryption),
            "hash" => Some(PolicyAttribute::Hash),
            "authentication" => Some(PolicyAttribute::Authentication),
            "group" => Some(PolicyAttribute::Group),
            _ => None,
        }
    }

    pub fn allowed_values(&self) -> &'static [&'static str] {
        match self {
            PolicyAttribute::Encryption => &ENCRYPTION_ALGORITHMS,
            PolicyAttribute::Hash => &HASH_ALGORITHMS,
            PolicyAttribute::Authentication => &AUTHENTICATION_METHODS,
            PolicyAttribute::Group => &DH_GROUPS,
        }
    }

    pub fn slot<'a>(&self, policy: &'a mut IsakmpPolicy) -> &'a mut Option<String> {
        match self {
            PolicyAttribute::Encryption => &mut policy.encryption,
            PolicyAttribute::Hash => &mut policy.hash,
            PolicyAttribute::Authentication => &mut policy.authentication,
            PolicyAttribute::Group => &mut policy.group,
        }
    }
}

/// What a `show` command asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowTarget {
    RunningConfig,
    StartupConfig,
    IpInterfaceBrief,
    Interfaces,
    Interface(String),
    InterfaceDescription,
    CryptoIsakmpPolicy,
    History,
}

/// A command line after normalization, in the shape the handlers consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Exit,
    End,
    // exec
    ConfigureTerminal,
    Enable,
    Write,
    /// `None` when the show target is not recognized.
    Show(Option<ShowTarget>),
    /// An exec command run from a configuration mode.
    Do(Box<Command>),
    // global configuration
    Hostname(String),
    Service { flag: ServiceFlag, enable: bool },
    Interface(String),
    Line(Vec<String>),
    CryptoIsakmpPolicy(String),
    AccessList(String),
    NoAccessList(String),
    // interface configuration
    Description(String),
    NoDescription,
    IpAddress { address: String, mask: String },
    IpAddressDhcp,
    NoIpAddress,
    Shutdown,
    NoShutdown,
    // line configuration
    Password(String),
    NoPassword,
    Login,
    NoLogin,
    LoggingSynchronous(bool),
    // isakmp configuration
    PolicyAttribute { attribute: PolicyAttribute, value: String },
    /// A known command missing its arguments.
    Incomplete,
    Unrecognized,
}

/// Parses a canonical (normalized) command line for the given mode.
pub fn parse_command(mode: Mode, line: &str) -> Command {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.as_slice() {
        [] => return Command::Empty,
        ["exit"] => return Command::Exit,
        ["end"] => return Command::End,
        ["do"] if mode != Mode::Privileged => return Command::Incomplete,
        ["do", rest @ ..] if mode != Mode::Privileged => {
            return Command::Do(Box::new(parse_exec(rest)))
        }
        _ => {}
    }

    match mode {
        Mode::Privileged => parse_exec(&tokens),
        Mode::GlobalConfig => parse_global(&tokens),
        Mode::InterfaceConfig => parse_interface(&tokens),
        Mode::LineConfig => parse_line(&tokens),
        Mode::IsakmpConfig => parse_isakmp(&tokens),
    }
}

fn parse_exec(tokens: &[&str]) -> Command {
    match tokens {
        [] => Command::Incomplete,
        ["configure"] | ["configure", "terminal"] => Command::ConfigureTerminal,
        ["enable"] => Command::Enable,
        ["write"] | ["write", "memory"] | ["copy", "running-config", "startup-config"] => {
            Command::Write
        }
        ["copy"] | ["copy", "running-config"] => Command::Incomplete,
        ["show"] => Command::Incomplete,
        ["show", rest @ ..] => Command::Show(parse_show(rest)),
        _ => Command::Unrecognized,
    }
}

fn parse_show(args: &[&str]) -> Option<ShowTarget> {
    match args {
        ["running-config"] => Some(ShowTarget::RunningConfig),
        ["startup-config"] => Some(ShowTarget::StartupConfig),
        ["ip", "interface"] | ["ip", "interface", "brief"] => Some(ShowTarget::IpInterfaceBrief),
        ["interface"] | ["interfaces"] => Some(ShowTarget::Interfaces),
        ["interface" | "interfaces", arg] if "description".starts_with(&arg.to_lowercase()) => {
            Some(ShowTarget::InterfaceDescription)
        }
        ["interface" | "interfaces", name @ ..] => Some(ShowTarget::Interface(name.concat())),
        ["crypto", "isakmp", "policy"] => Some(ShowTarget::CryptoIsakmpPolicy),
        ["history"] => Some(ShowTarget::History),
        _ => None,
    }
}

fn parse_service(args: &[&str], enable: bool) -> Command {
    match args {
        ["password-encryption"] => Command::Service {
            flag: ServiceFlag::PasswordEncryption,
            enable,
        },
        ["timestamps", "log", ..] => Command::Service {
            flag: ServiceFlag::TimestampsLog,
            enable,
        },
        ["timestamps", "debug", ..] => Command::Service {
            flag: ServiceFlag::TimestampsDebug,
            enable,
        },
        [] | ["timestamps"] => Command::Incomplete,
        _ => Command::Unrecognized,
    }
}

fn parse_global(tokens: &[&str]) -> Command {
    match tokens {
        ["hostname"] => Command::Incomplete,
        ["hostname", name, ..] => Command::Hostname(name.to_string()),
        ["service", rest @ ..] => parse_service(rest, true),
        ["no", "service", rest @ ..] => parse_service(rest, false),
        ["line"] => Command::Incomplete,
        ["line", rest @ ..] => Command::Line(rest.iter().map(|t| t.to_string()).collect()),
        ["interface"] => Command::Incomplete,
        ["interface", name @ ..] => Command::Interface(name.concat()),
        ["crypto", "isakmp", "policy"] => Command::Incomplete,
        ["crypto", "isakmp", "policy", id] => Command::CryptoIsakmpPolicy(id.to_string()),
        ["access-list", number, action, rest @ ..]
            if !rest.is_empty()
                && number.parse::<u32>().is_ok()
                && matches!(
                    action.to_ascii_lowercase().as_str(),
                    "permit" | "deny" | "remark"
                ) =>
        {
            Command::AccessList(format!(
                "access-list {} {} {}",
                number,
                action.to_ascii_lowercase(),
                rest.join(" ")
            ))
        }
        ["access-list", ..] if tokens.len() < 4 => Command::Incomplete,
        ["no", "access-list", number] => Command::NoAccessList(number.to_string()),
        _ => Command::Unrecognized,
    }
}

fn parse_interface(tokens: &[&str]) -> Command {
    match tokens {
        ["interface"] => Command::Incomplete,
        ["interface", name @ ..] => Command::Interface(name.concat()),
        ["description"] => Command::Incomplete,
        ["description", text @ ..] => Command::Description(text.join(" ")),
        ["no", "description", ..] => Command::NoDescription,
        ["ip", "address", "dhcp"] => Command::IpAddressDhcp,
        ["ip", "address", address, mask, ..] => Command::IpAddress {
            address: address.to_string(),
            mask: mask.to_string(),
        },
        ["ip"] | ["ip", "address"] | ["ip", "address", _] => Command::Incomplete,
        ["no", "ip", "address", ..] => Command::NoIpAddress,
        ["shutdown"] => Command::Shutdown,
        ["no", "shutdown"] => Command::NoShutdown,
        _ => Command::Unrecognized,
    }
}

fn parse_line(tokens: &[&str]) -> Command {
    match tokens {
        ["password"] => Command::Incomplete,
        ["password", secret @ ..] => Command::Password(secret.join(" ")),
        ["no", "password", ..] => Command::NoPassword,
        ["login"] => Command::Login,
        ["no", "login"] => Command::NoLogin,
        ["logging"] => Command::Incomplete,
        ["logging", "synchronous"] => Command::LoggingSynchronous(true),
        ["no", "logging", "synchronous"] => Command::LoggingSynchronous(false),
        _ => Command::Unrecognized,
    }
}

fn parse_isakmp(tokens: &[&str]) -> Command {
    match tokens {
        [keyword] if PolicyAttribute::from_keyword(keyword).is_some() => Command::Incomplete,
        [keyword, value] => match PolicyAttribute::from_keyword(keyword) {
            Some(attribute) => Command::PolicyAttribute {
                attribute,
                value: value.to_string(),
            },
            None => Command::Unrecognized,
        },
        _ => Command::Unrecognized,
    }
}
