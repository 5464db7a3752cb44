mod commands;
mod error;
mod event_logger;
mod wallet;

use commands::{Command, TrackingChange, HELP};
use error::AppError;
use event_logger::JsonLinesSink;
use log::{info, warn};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use wallet::SimulatedWallet;
use wallet_tracker_core::native::FileStore;
use wallet_tracker_core::{AnalyticsSink, ConsentUpdate, Coordinator, Settings, TrackedCall};

const CONFIG_PATH_VAR: &str = "WALLET_TRACKER_CONFIG_PATH";
const EVENTS_FILE: &str = "events.jsonl";
/// How many recent events `events` prints, like the status panel.
const EVENTS_SHOWN: usize = 5;

enum Flow {
    Continue(String),
    Quit,
}

fn build_coordinator(settings: Settings, reject_wallet: bool) -> Coordinator {
    let storage_dir = PathBuf::from(&settings.storage_dir);
    let sink: Option<Box<dyn AnalyticsSink>> = settings
        .write_key()
        .map(|_| Box::new(JsonLinesSink::new(storage_dir.join(EVENTS_FILE))) as Box<dyn AnalyticsSink>);
    let store = FileStore::new(storage_dir);

    let mut coordinator = Coordinator::new(settings, sink, Box::new(store));
    let wallet = if reject_wallet {
        SimulatedWallet::rejecting()
    } else {
        SimulatedWallet::new()
    };
    coordinator.attach_wallet(Box::new(wallet));
    coordinator
}

fn describe_consent(update: ConsentUpdate, enabled: bool) -> String {
    if let Some(e) = update.persist_error {
        warn!("Tracking preference not saved: {}", e);
    }
    let state = if enabled { "enabled" } else { "disabled" };
    if update.changed {
        format!("Tracking {}", state)
    } else {
        format!("Tracking already {}", state)
    }
}

fn describe_call(call: &TrackedCall) -> String {
    format!("{}  {}", call.received_at().format("%H:%M:%S%.3f"), call.label())
}

async fn execute(coordinator: &mut Coordinator, command: Command) -> Result<Flow, AppError> {
    let output = match command {
        Command::Connect { address, chain_id } => {
            match coordinator.on_wallet_change(Some(&address), chain_id)? {
                Some(t) => format!("{:?}", t),
                None => "No connection change".to_string(),
            }
        }
        Command::Disconnect => match coordinator.on_wallet_change(None, None)? {
            Some(t) => format!("{:?}", t),
            None => "No wallet connected".to_string(),
        },
        Command::Chain(chain_id) => {
            let address = coordinator.status().identified_user;
            coordinator.on_wallet_change(address.as_deref(), Some(chain_id))?;
            format!("Chain set to {}", chain_id)
        }
        Command::Sign(message) => {
            let signature = coordinator.sign_message(&message).await?;
            format!("Message signed successfully! Signature: {}", signature)
        }
        Command::SendTransaction => {
            let hash = coordinator.send_test_transaction().await?;
            format!("Transaction sent! Hash: {}", hash)
        }
        Command::Custom { name, payload } => {
            let outcome = coordinator.send_custom_event(&name, &payload)?;
            format!("Custom event {}", outcome)
        }
        Command::Page(url) => {
            let outcome = coordinator.track_page(&url)?;
            format!("Page view {}", outcome)
        }
        Command::TestConnection => {
            let outcome = coordinator.test_connection(
                concat!("wallet_tracker/", env!("CARGO_PKG_VERSION")),
                "cli://wallet_tracker",
            )?;
            format!("Test event {}", outcome)
        }
        Command::Tracking(change) => {
            let update = match change {
                TrackingChange::On => coordinator.set_tracking(true),
                TrackingChange::Off => coordinator.set_tracking(false),
                TrackingChange::Toggle => coordinator.toggle_tracking(),
            };
            describe_consent(update, coordinator.is_tracking())
        }
        Command::Status => serde_json::to_string_pretty(&coordinator.status())?,
        Command::Events => {
            let events = coordinator.recent_events();
            if events.is_empty() {
                "No events tracked yet. Try connecting your wallet or sending a custom event."
                    .to_string()
            } else {
                let skip = events.len().saturating_sub(EVENTS_SHOWN);
                events[skip..]
                    .iter()
                    .map(describe_call)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Clear => {
            coordinator.clear_events();
            "Events cleared".to_string()
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Flow::Quit),
    };
    Ok(Flow::Continue(output))
}

/// Process commands line by line until EOF or `quit`. Command failures are
/// printed and do not end the session.
async fn run<R: AsyncBufRead + Unpin>(coordinator: &mut Coordinator, reader: R) -> Result<(), AppError> {
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        match execute(coordinator, command).await {
            Ok(Flow::Continue(output)) => println!("{}", output),
            Ok(Flow::Quit) => break,
            Err(e) => println!("{}", e),
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    let config_path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--init-config") {
        Settings::default().save_to_file(&config_path)?;
        println!("Wrote default settings to {}", config_path);
        return Ok(());
    }

    let settings = Settings::load(&config_path)?;
    settings.validate()?;

    let default_level = settings
        .max_log_level()
        .unwrap_or(log::LevelFilter::Off)
        .to_string()
        .to_lowercase();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    // Print an unconditional startup line so users see the binary started
    // even when RUST_LOG is not set.
    println!(
        "wallet_tracker starting (pid {}), RUST_LOG={:?}",
        std::process::id(),
        std::env::var("RUST_LOG").ok()
    );
    info!("Loaded settings from {}", config_path);

    let reject_wallet = args.iter().any(|a| a == "--reject-wallet");
    let mut coordinator = build_coordinator(settings, reject_wallet);
    println!("{}", HELP);

    run(&mut coordinator, BufReader::new(tokio::io::stdin())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_tracker_core::{MemorySink, MemoryStore, EVENT_MESSAGE_SIGNED, EVENT_TRACKING_PAUSED};

    fn coordinator(sink: &MemorySink) -> Coordinator {
        let settings = Settings {
            write_key: Some("wk".to_string()),
            client_id: Some("cid".to_string()),
            ..Settings::default()
        };
        let mut c = Coordinator::new(settings, Some(Box::new(sink.clone())), Box::new(MemoryStore::new()));
        c.attach_wallet(Box::new(SimulatedWallet::new()));
        c
    }

    async fn exec(c: &mut Coordinator, line: &str) -> Result<String, AppError> {
        let command = commands::parse(line)?.expect("command");
        match execute(c, command).await? {
            Flow::Continue(out) => Ok(out),
            Flow::Quit => Ok("quit".to_string()),
        }
    }

    #[tokio::test]
    async fn test_session_flow() {
        let sink = MemorySink::new();
        let mut c = coordinator(&sink);

        assert!(exec(&mut c, "sign").await.is_err());
        exec(&mut c, "connect 0xAB 137").await.unwrap();
        let out = exec(&mut c, "sign hello").await.unwrap();
        assert!(out.starts_with("Message signed successfully!"));
        assert_eq!(sink.count(EVENT_MESSAGE_SIGNED), 1);

        assert_eq!(exec(&mut c, "tracking off").await.unwrap(), "Tracking disabled");
        assert_eq!(exec(&mut c, "tracking off").await.unwrap(), "Tracking already disabled");
        assert_eq!(sink.count(EVENT_TRACKING_PAUSED), 1);

        assert_eq!(
            exec(&mut c, r#"custom {"key": "value"}"#).await.unwrap(),
            "Custom event suppressed"
        );
        assert!(exec(&mut c, "custom {oops").await.is_err());
        assert_eq!(exec(&mut c, "quit").await.unwrap(), "quit");
    }

    #[tokio::test]
    async fn test_events_listing_is_capped() {
        let sink = MemorySink::new();
        let mut c = coordinator(&sink);
        for i in 0..8 {
            exec(&mut c, &format!("custom Event {} -- {{}}", i)).await.unwrap();
        }
        let out = exec(&mut c, "events").await.unwrap();
        assert_eq!(out.lines().count(), EVENTS_SHOWN);
        assert!(out.ends_with("Event 7"));

        exec(&mut c, "clear").await.unwrap();
        assert!(exec(&mut c, "events").await.unwrap().starts_with("No events"));
    }

    #[tokio::test]
    async fn test_chain_switch_keeps_connection() {
        let sink = MemorySink::new();
        let mut c = coordinator(&sink);
        exec(&mut c, "connect 0xAB").await.unwrap();
        exec(&mut c, "chain 137").await.unwrap();

        let status = c.status();
        assert!(status.connected);
        assert_eq!(status.chain_id, Some(137));
        assert_eq!(sink.count(wallet_tracker_core::EVENT_WALLET_CONNECTED), 1);
    }

    #[test]
    fn test_build_without_write_key_has_no_sink() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            storage_dir: dir.path().to_string_lossy().to_string(),
            ..Settings::default()
        };
        let c = build_coordinator(settings, false);
        let status = c.status();
        assert!(!status.sdk_initialized);
        assert!(!status.wallet_attached);
    }
}
