//! Line protocol: input parsing and the fixed server notices.
//!
//! Every inbound line is either a command (first non-whitespace character
//! is `/`) or a chat message. Command arguments are split with shell-style
//! quoting, so `/private "bob smith" "hi there"` carries two arguments.

use chrono::NaiveTime;

/// One parsed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A recognised or unrecognised `/command`.
    Command(Command),
    /// Plain text to broadcast.
    Chat(String),
    /// A `/` line with no tokens, or with unbalanced quoting.
    Invalid,
}

/// A tokenized command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/name <newName>`; `None` when the name is missing or empty.
    Name(Option<String>),
    /// `/time`
    Time,
    /// `/private <target> <words...>` with at least one word.
    Private { target: String, message: String },
    /// `/private` with fewer than two arguments.
    PrivateUsage,
    /// `/commands`
    Commands,
    /// Any other command name, lowercased.
    Unknown(String),
}

impl Input {
    /// Parse one line of client input.
    pub fn parse(line: &str) -> Self {
        let Some(rest) = line.trim().strip_prefix('/') else {
            return Input::Chat(line.to_string());
        };

        match shlex::split(&escape_hashes(rest)) {
            Some(tokens) if !tokens.is_empty() => Input::Command(Command::from_tokens(tokens)),
            _ => Input::Invalid,
        }
    }
}

/// Backslash-escape every unquoted `#`.
///
/// `shlex` treats a word starting with `#` as a comment and drops the rest
/// of the line; arguments like `#general` must survive tokenizing.
fn escape_hashes(rest: &str) -> String {
    let mut out = String::with_capacity(rest.len());
    let (mut single, mut double, mut escaped) = (false, false, false);

    for ch in rest.chars() {
        if escaped {
            escaped = false;
        } else {
            match ch {
                '\\' if !single => escaped = true,
                '\'' if !double => single = !single,
                '"' if !single => double = !double,
                '#' if !single && !double => out.push('\\'),
                _ => {}
            }
        }
        out.push(ch);
    }
    out
}

impl Command {
    /// Build a command from its tokens. The first token is the
    /// case-insensitive command name.
    fn from_tokens(tokens: Vec<String>) -> Self {
        let mut tokens = tokens.into_iter();
        let name = tokens.next().unwrap_or_default().to_lowercase();
        let args: Vec<String> = tokens.collect();

        match name.as_str() {
            "name" => Command::Name(args.into_iter().next().filter(|n| !n.is_empty())),
            "time" => Command::Time,
            "private" if args.len() >= 2 => {
                let mut args = args.into_iter();
                let target = args.next().unwrap_or_default();
                let message = args.collect::<Vec<_>>().join(" ");
                Command::Private { target, message }
            }
            "private" => Command::PrivateUsage,
            "commands" => Command::Commands,
            _ => Command::Unknown(name),
        }
    }
}

/// Lines sent to every client on connect.
pub const GREETING: [&str; 2] = [
    "Identify yourself with /name YourName",
    "/commands to show all comands",
];

/// Reply to `/commands`.
pub const HELP: [&str; 3] = [
    "/name YourName to change your name",
    "/time to show current time",
    "/private Destination Message to send a private message",
];

pub const NAME_IN_USE: &str = "Username in use. Please try again.";
pub const INVALID_COMMAND: &str = "Invalid command";
pub const UNKNOWN_COMMAND: &str = "Unknown command";
pub const PRIVATE_USAGE: &str = "Invalid command. Use /private nickname message";
pub const IDENTIFY_FIRST: &str = "Identify yourself before sending a message. Use /name YourName";

pub fn nickname_changed(name: &str) -> String {
    format!("Successfully changed nickname to {name}")
}

pub fn joined(name: &str) -> String {
    format!("{name} just joined this chat.")
}

pub fn current_time(time: NaiveTime) -> String {
    format!("Current time: {}", time.format("%H:%M:%S"))
}

pub fn destination_not_found(target: &str) -> String {
    format!("Destination {target} not found. Message not sent")
}

/// Broadcast delivery line.
pub fn broadcast(sender: &str, text: &str) -> String {
    format!("[ALL] {sender} >> {text}")
}

/// Private delivery line.
pub fn private(sender: &str, text: &str) -> String {
    format!("[PRIVATE] {sender} >> {text}")
}
