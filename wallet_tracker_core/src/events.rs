// Analytics event construction for wallet and user actions
use crate::error::CoreError;
use crate::models::*;
use serde_json::{json, Value};
use url::Url;

fn wallet_value(address: Option<&WalletAddress>) -> Value {
    match address {
        Some(addr) => json!(addr.as_str()),
        None => Value::Null,
    }
}

pub fn wallet_connected(address: &WalletAddress, chain_id: u64) -> AnalyticsEvent {
    let mut props = Properties::new();
    props.insert("address".to_string(), json!(address.as_str()));
    props.insert("chain_id".to_string(), json!(chain_id));
    props.insert("timestamp".to_string(), json!(timestamp_now()));
    AnalyticsEvent::new(EVENT_WALLET_CONNECTED, props)
}

pub fn wallet_disconnected(address: &WalletAddress) -> AnalyticsEvent {
    let mut props = Properties::new();
    props.insert("address".to_string(), json!(address.as_str()));
    props.insert("timestamp".to_string(), json!(timestamp_now()));
    AnalyticsEvent::new(EVENT_WALLET_DISCONNECTED, props)
}

/// Traits sent with `identify` when a wallet connects.
pub fn identify_traits(address: &WalletAddress) -> Properties {
    let mut traits = Properties::new();
    traits.insert("address".to_string(), json!(address.as_str()));
    traits.insert("userId".to_string(), json!(address.as_str()));
    traits
}

pub fn message_signed(address: &WalletAddress, message: &str, signature: &str) -> AnalyticsEvent {
    let mut props = Properties::new();
    props.insert("wallet_address".to_string(), json!(address.as_str()));
    props.insert("message".to_string(), json!(message));
    props.insert("signature".to_string(), json!(signature));
    props.insert("timestamp".to_string(), json!(timestamp_now()));
    AnalyticsEvent::new(EVENT_MESSAGE_SIGNED, props)
}

pub fn action_failed(name: &str, address: &WalletAddress, error: &CoreError) -> AnalyticsEvent {
    let mut props = Properties::new();
    props.insert("wallet_address".to_string(), json!(address.as_str()));
    props.insert("error".to_string(), json!(error.to_string()));
    props.insert("timestamp".to_string(), json!(timestamp_now()));
    AnalyticsEvent::new(name, props)
}

pub fn transaction_sent(
    address: &WalletAddress,
    chain_id: u64,
    to: &str,
    value: &str,
    hash: &str,
) -> AnalyticsEvent {
    let mut props = Properties::new();
    props.insert("wallet_address".to_string(), json!(address.as_str()));
    props.insert("chain_id".to_string(), json!(chain_id));
    props.insert("to".to_string(), json!(to));
    props.insert("value".to_string(), json!(value));
    props.insert("hash".to_string(), json!(hash));
    props.insert("timestamp".to_string(), json!(timestamp_now()));
    AnalyticsEvent::new(EVENT_TRANSACTION_SENT, props)
}

/// Build a user-defined event from a name and a JSON object literal.
///
/// The payload must parse as a JSON object. `wallet_address`,
/// `triggered_manually` and `timestamp` are added on top, overriding any
/// user-supplied keys of the same name.
pub fn custom_event(
    name: &str,
    payload: &str,
    address: Option<&WalletAddress>,
) -> Result<AnalyticsEvent, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("Event name must not be empty".to_string()));
    }

    let parsed: Value = serde_json::from_str(payload)
        .map_err(|_| CoreError::Validation("Invalid JSON in custom event data".to_string()))?;
    let Value::Object(mut props) = parsed else {
        return Err(CoreError::Validation(
            "Custom event data must be a JSON object".to_string(),
        ));
    };

    props.insert("wallet_address".to_string(), wallet_value(address));
    props.insert("triggered_manually".to_string(), json!(true));
    props.insert("timestamp".to_string(), json!(timestamp_now()));
    Ok(AnalyticsEvent::new(name, props))
}

pub fn page_viewed(page_url: &str) -> Result<AnalyticsEvent, CoreError> {
    let url = Url::parse(page_url)?;
    let mut props = Properties::new();
    props.insert("page_url".to_string(), json!(url.as_str()));
    props.insert("path".to_string(), json!(url.path()));
    props.insert("timestamp".to_string(), json!(timestamp_now()));
    Ok(AnalyticsEvent::new(EVENT_PAGE_VIEWED, props))
}

pub fn connection_test(
    address: Option<&WalletAddress>,
    user_agent: &str,
    page_url: &str,
) -> AnalyticsEvent {
    let mut props = Properties::new();
    props.insert("test_timestamp".to_string(), json!(timestamp_now()));
    props.insert("wallet_address".to_string(), wallet_value(address));
    props.insert("user_agent".to_string(), json!(user_agent));
    props.insert("page_url".to_string(), json!(page_url));
    AnalyticsEvent::new(EVENT_CONNECTION_TEST, props)
}
