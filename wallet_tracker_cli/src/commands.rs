// Line commands standing in for the demo page's buttons
use crate::error::AppError;

pub const DEFAULT_MESSAGE: &str = "Hello from Wallet Tracker!";
pub const DEFAULT_EVENT_NAME: &str = "Custom Test Event";

pub const HELP: &str = "\
Commands:
  connect <address> [chain_id]   report a connected wallet
  disconnect                     report the wallet as disconnected
  chain <chain_id>               report a chain switch for the current wallet
  sign [message]                 sign a message with the wallet
  send-tx                        send 0 to self
  custom [name --] <json>        send a custom event
  page <url>                     track a page view
  test                           send a connection test event
  tracking on|off|toggle         change analytics consent
  status                         show tracker status
  events                         show recent events
  clear                          clear recent events
  help                           show this help
  quit                           exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect { address: String, chain_id: Option<u64> },
    Disconnect,
    Chain(u64),
    Sign(String),
    SendTransaction,
    Custom { name: String, payload: String },
    Page(String),
    TestConnection,
    Tracking(TrackingChange),
    Status,
    Events,
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingChange {
    On,
    Off,
    Toggle,
}

fn parse_chain(raw: &str) -> Result<u64, AppError> {
    raw.parse::<u64>()
        .map_err(|_| AppError::Usage("chain id must be a positive integer"))
}

/// Split `[name --] <json>`. Only a `--` ahead of the JSON text separates
/// the name, so dashes inside the payload are left alone.
fn split_custom(rest: &str) -> (&str, &str) {
    let json_start = rest.find(['{', '[']).unwrap_or(rest.len());
    match rest[..json_start].find("--") {
        Some(at) => (rest[..at].trim(), rest[at + 2..].trim()),
        None => (DEFAULT_EVENT_NAME, rest),
    }
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, AppError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "connect" => {
            let mut parts = rest.split_whitespace();
            let address = parts
                .next()
                .ok_or(AppError::Usage("connect <address> [chain_id]"))?
                .to_string();
            let chain_id = parts.next().map(parse_chain).transpose()?;
            Command::Connect { address, chain_id }
        }
        "disconnect" => Command::Disconnect,
        "chain" => Command::Chain(parse_chain(rest)?),
        "sign" => Command::Sign(if rest.is_empty() {
            DEFAULT_MESSAGE.to_string()
        } else {
            rest.to_string()
        }),
        "send-tx" => Command::SendTransaction,
        "custom" => {
            let (name, payload) = split_custom(rest);
            Command::Custom {
                name: name.to_string(),
                payload: payload.to_string(),
            }
        }
        "page" => {
            if rest.is_empty() {
                return Err(AppError::Usage("page <url>"));
            }
            Command::Page(rest.to_string())
        }
        "test" => Command::TestConnection,
        "tracking" => Command::Tracking(match rest.to_ascii_lowercase().as_str() {
            "on" => TrackingChange::On,
            "off" => TrackingChange::Off,
            "toggle" | "" => TrackingChange::Toggle,
            _ => return Err(AppError::Usage("tracking on|off|toggle")),
        }),
        "status" => Command::Status,
        "events" => Command::Events,
        "clear" => Command::Clear,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(AppError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}
