// Top-level composition: wallet notifications and user actions -> gated analytics
use crate::dispatcher::{ConsentGatedDispatcher, ConsentUpdate, DispatchOutcome};
use crate::error::CoreError;
use crate::events;
use crate::models::*;
use crate::settings::Settings;
use crate::sink::AnalyticsSink;
use crate::storage_trait::KeyValueStore;
use crate::wallet::{TransactionRequest, WalletSigner};
use crate::watcher::ConnectionWatcher;
use log::{info, warn};
use serde::Serialize;

/// Snapshot for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub sdk_initialized: bool,
    pub tracking_enabled: bool,
    pub write_key_set: bool,
    pub client_id_set: bool,
    pub wallet_attached: bool,
    pub connected: bool,
    pub identified_user: Option<String>,
    pub identified_user_short: Option<String>,
    pub chain_id: Option<u64>,
    pub account_switch: AccountSwitchPolicy,
}

/// Owns the connection watcher and the consent-gated dispatcher and turns
/// wallet notifications and user actions into analytics events.
///
/// Every operation takes `&mut self`, so notifications are handled one at a
/// time and never interleave.
pub struct Coordinator {
    settings: Settings,
    watcher: ConnectionWatcher,
    dispatcher: ConsentGatedDispatcher,
    wallet: Option<Box<dyn WalletSigner>>,
    chain_id: u64,
}

impl Coordinator {
    /// The sink is only used when `settings` carries a write key.
    pub fn new(
        settings: Settings,
        sink: Option<Box<dyn AnalyticsSink>>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let sink = match (settings.write_key(), sink) {
            (Some(_), sink) => sink,
            (None, Some(_)) => {
                warn!("Analytics write key is not set, analytics disabled");
                None
            }
            (None, None) => {
                warn!("Analytics write key is not set");
                None
            }
        };

        let dispatcher = ConsentGatedDispatcher::new(sink, store, settings.tracking)
            .with_history_capacity(settings.recent_events_capacity);

        Self {
            watcher: ConnectionWatcher::new(settings.account_switch),
            chain_id: settings.default_chain_id,
            dispatcher,
            wallet: None,
            settings,
        }
    }

    /// Attach the wallet used for signing. Refused (returns `false`) when no
    /// wallet client id is configured.
    pub fn attach_wallet(&mut self, wallet: Box<dyn WalletSigner>) -> bool {
        if self.settings.client_id().is_none() {
            warn!("Wallet client id is not set, wallet actions disabled");
            return false;
        }
        self.wallet = Some(wallet);
        true
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle a wallet change notification.
    pub fn on_wallet_change(
        &mut self,
        address: Option<&str>,
        chain_id: Option<u64>,
    ) -> Result<Option<Transition>, CoreError> {
        let chain_id = chain_id.unwrap_or(self.settings.default_chain_id);
        if chain_id != self.chain_id {
            info!("Active chain changed: {} -> {}", self.chain_id, chain_id);
        }
        if !self.settings.is_supported_chain(chain_id) {
            warn!("Chain {} is not in the supported chain list", chain_id);
        }
        self.chain_id = chain_id;

        // The watcher has already moved on, so every event of the transition
        // is attempted and the first sink error is returned afterwards.
        let transition = self.watcher.observe(address);
        let mut first_err = None;
        match &transition {
            Some(Transition::Connected { address }) => self.track_connected(address, &mut first_err),
            Some(Transition::Disconnected { address }) => {
                let result = self.dispatcher.dispatch(events::wallet_disconnected(address));
                keep_first_error(result, &mut first_err);
            }
            Some(Transition::Switched { previous, current }) => {
                let result = self.dispatcher.dispatch(events::wallet_disconnected(previous));
                keep_first_error(result, &mut first_err);
                self.track_connected(current, &mut first_err);
            }
            None => {}
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(transition),
        }
    }

    fn track_connected(&mut self, address: &WalletAddress, first_err: &mut Option<CoreError>) {
        let identified = self
            .dispatcher
            .identify(address.as_str(), events::identify_traits(address));
        keep_first_error(identified, first_err);
        let tracked = self
            .dispatcher
            .dispatch(events::wallet_connected(address, self.chain_id));
        keep_first_error(tracked, first_err);
    }

    fn connected_address(&self) -> Result<WalletAddress, CoreError> {
        self.watcher
            .address()
            .cloned()
            .ok_or(CoreError::WalletNotConnected)
    }

    fn wallet(&self) -> Result<&dyn WalletSigner, CoreError> {
        self.wallet
            .as_deref()
            .ok_or_else(|| CoreError::Init("No wallet attached".to_string()))
    }

    /// Sign `message` with the connected wallet and track the outcome.
    pub async fn sign_message(&mut self, message: &str) -> Result<String, CoreError> {
        let address = self.connected_address()?;
        let result = self.wallet()?.sign_message(message).await;

        match result {
            Ok(signature) => {
                info!("Message signed by {}", address.short());
                self.dispatcher
                    .dispatch(events::message_signed(&address, message, &signature))?;
                Ok(signature)
            }
            Err(e) => {
                warn!("Failed to sign message: {}", e);
                self.dispatch_quietly(events::action_failed(
                    EVENT_MESSAGE_SIGN_FAILED,
                    &address,
                    &e,
                ));
                Err(e)
            }
        }
    }

    /// Send a zero-value transaction to the connected address and track the
    /// outcome. Returns the transaction hash.
    pub async fn send_test_transaction(&mut self) -> Result<String, CoreError> {
        let address = self.connected_address()?;
        let tx = TransactionRequest::zero_to_self(address.as_str());
        let result = self.wallet()?.send_transaction(tx.clone()).await;

        match result {
            Ok(hash) => {
                info!("Transaction sent: {}", hash);
                self.dispatcher.dispatch(events::transaction_sent(
                    &address,
                    self.chain_id,
                    &tx.to,
                    &tx.value,
                    &hash,
                ))?;
                Ok(hash)
            }
            Err(e) => {
                warn!("Failed to send transaction: {}", e);
                self.dispatch_quietly(events::action_failed(
                    EVENT_TRANSACTION_FAILED,
                    &address,
                    &e,
                ));
                Err(e)
            }
        }
    }

    /// Validate and send a user-defined event. Nothing is dispatched when
    /// validation fails.
    pub fn send_custom_event(
        &mut self,
        name: &str,
        payload: &str,
    ) -> Result<DispatchOutcome, CoreError> {
        let event = events::custom_event(name, payload, self.watcher.address())?;
        self.dispatcher.dispatch(event)
    }

    pub fn track_page(&mut self, page_url: &str) -> Result<DispatchOutcome, CoreError> {
        let event = events::page_viewed(page_url)?;
        self.dispatcher.dispatch(event)
    }

    /// Send a probe event; fails when the analytics SDK is not initialised.
    pub fn test_connection(
        &mut self,
        user_agent: &str,
        page_url: &str,
    ) -> Result<DispatchOutcome, CoreError> {
        if !self.dispatcher.is_sink_available() {
            return Err(CoreError::Init(
                "Analytics not initialized. Check your write key.".to_string(),
            ));
        }
        let event = events::connection_test(self.watcher.address(), user_agent, page_url);
        self.dispatcher.dispatch(event)
    }

    /// Forward an already-built event through the consent gate.
    pub fn dispatch(&mut self, event: AnalyticsEvent) -> Result<DispatchOutcome, CoreError> {
        self.dispatcher.dispatch(event)
    }

    pub fn set_tracking(&mut self, enabled: bool) -> ConsentUpdate {
        self.dispatcher.set_consent(enabled)
    }

    pub fn toggle_tracking(&mut self) -> ConsentUpdate {
        let enabled = !self.dispatcher.current_consent();
        self.dispatcher.set_consent(enabled)
    }

    pub fn is_tracking(&self) -> bool {
        self.dispatcher.current_consent()
    }

    pub fn recent_events(&self) -> Vec<TrackedCall> {
        self.dispatcher.history().cloned().collect()
    }

    pub fn clear_events(&mut self) {
        self.dispatcher.clear_history();
    }

    pub fn status(&self) -> Status {
        let address = self.watcher.address();
        Status {
            sdk_initialized: self.dispatcher.is_sink_available(),
            tracking_enabled: self.dispatcher.current_consent(),
            write_key_set: self.settings.write_key().is_some(),
            client_id_set: self.settings.client_id().is_some(),
            wallet_attached: self.wallet.is_some(),
            connected: address.is_some(),
            identified_user: address.map(|a| a.to_string()),
            identified_user_short: address.map(|a| a.short()),
            chain_id: address.map(|_| self.chain_id),
            account_switch: self.watcher.policy(),
        }
    }

    fn dispatch_quietly(&mut self, event: AnalyticsEvent) {
        if let Err(e) = self.dispatcher.dispatch(event) {
            warn!("Failed to track failure event: {}", e);
        }
    }
}

fn keep_first_error(result: Result<DispatchOutcome, CoreError>, first_err: &mut Option<CoreError>) {
    if let Err(e) = result {
        warn!("Failed to track wallet transition: {}", e);
        if first_err.is_none() {
            *first_err = Some(e);
        }
    }
}
