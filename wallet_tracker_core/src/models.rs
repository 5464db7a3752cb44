use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event properties, kept in insertion order.
pub type Properties = Map<String, Value>;

pub const EVENT_WALLET_CONNECTED: &str = "Wallet Connected";
pub const EVENT_WALLET_DISCONNECTED: &str = "Wallet Disconnected";
pub const EVENT_TRACKING_PAUSED: &str = "tracking_paused";
pub const EVENT_TRACKING_RESUMED: &str = "tracking_resumed";
pub const EVENT_MESSAGE_SIGNED: &str = "Message Signed";
pub const EVENT_MESSAGE_SIGN_FAILED: &str = "Message Sign Failed";
pub const EVENT_TRANSACTION_SENT: &str = "Transaction Sent";
pub const EVENT_TRANSACTION_FAILED: &str = "Transaction Failed";
pub const EVENT_PAGE_VIEWED: &str = "Page Viewed";
pub const EVENT_CONNECTION_TEST: &str = "Connection Test";

/// A wallet address as reported by the wallet collaborator.
///
/// Comparison ignores ASCII case so that checksummed and lowercased forms of
/// the same EVM address are the same wallet. The original spelling is kept
/// for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...5678` style display form. Short addresses are returned as-is.
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 12 {
            return self.0.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl PartialEq for WalletAddress {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for WalletAddress {}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection lifecycle change detected by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Connected { address: WalletAddress },
    Disconnected { address: WalletAddress },
    /// Present address replaced by a different one without a disconnect in
    /// between. Only produced under [`AccountSwitchPolicy::Reconnect`].
    Switched {
        previous: WalletAddress,
        current: WalletAddress,
    },
}

/// How the watcher treats a direct change between two connected addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSwitchPolicy {
    /// Record the new address silently.
    #[default]
    Ignore,
    /// Report the change so it can be tracked as disconnect + connect.
    Reconnect,
}

/// An immutable analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    name: String,
    properties: Properties,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>, properties: Properties) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Properties::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn into_parts(self) -> (String, Properties) {
        (self.name, self.properties)
    }
}

/// A call that reached the analytics sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrackedCall {
    Track {
        name: String,
        properties: Properties,
        received_at: DateTime<Utc>,
    },
    Identify {
        user_id: String,
        traits: Properties,
        received_at: DateTime<Utc>,
    },
}

impl TrackedCall {
    /// Event name for track calls, `"identify"` otherwise.
    pub fn label(&self) -> &str {
        match self {
            TrackedCall::Track { name, .. } => name,
            TrackedCall::Identify { .. } => "identify",
        }
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        match self {
            TrackedCall::Track { received_at, .. } | TrackedCall::Identify { received_at, .. } => {
                *received_at
            }
        }
    }
}

/// ISO-8601 timestamp with millisecond precision, the format the browser
/// SDKs emit.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
