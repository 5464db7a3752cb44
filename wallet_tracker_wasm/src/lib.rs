// Wallet Tracker WASM Bindings
// Browser-side connection tracking with consent-gated analytics

use log::{info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use wallet_tracker_core::wasm::LocalStorageStore;
use wallet_tracker_core::{AnalyticsSink, Coordinator, CoreError, Settings, Transition};
use wasm_bindgen::prelude::*;

mod js;
use js::{to_js, JsAnalyticsSink, JsWallet};

// Initialize panic hook and logger for WASM
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

fn js_err(e: CoreError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn is_missing(value: &JsValue) -> bool {
    value.is_null() || value.is_undefined()
}

fn transition_name(t: &Transition) -> &'static str {
    match t {
        Transition::Connected { .. } => "connected",
        Transition::Disconnected { .. } => "disconnected",
        Transition::Switched { .. } => "switched",
    }
}

/// Page-facing handle. Wraps one coordinator for the lifetime of the page.
#[wasm_bindgen]
pub struct WalletTracker {
    state: Rc<RefCell<Coordinator>>,
}

impl WalletTracker {
    fn coordinator(&self) -> Result<std::cell::RefMut<'_, Coordinator>, JsValue> {
        self.state
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Another wallet action is in progress"))
    }
}

#[wasm_bindgen]
impl WalletTracker {
    /// `settings_json` is a JSON `Settings` object. `analytics` is the
    /// analytics SDK instance and `wallet` the wallet signer; either may be
    /// `null`.
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: &str, analytics: JsValue, wallet: JsValue) -> Result<WalletTracker, JsValue> {
        let settings = Settings::from_json(settings_json).map_err(js_err)?;
        settings.validate().map_err(js_err)?;
        log::set_max_level(settings.max_log_level().unwrap_or(log::LevelFilter::Off));

        let sink: Option<Box<dyn AnalyticsSink>> = if is_missing(&analytics) {
            None
        } else {
            Some(Box::new(JsAnalyticsSink::new(analytics)))
        };
        let store = LocalStorageStore::new(settings.storage_prefix.clone());

        let mut coordinator = Coordinator::new(settings, sink, Box::new(store));
        if !is_missing(&wallet) {
            coordinator.attach_wallet(Box::new(JsWallet::new(wallet)));
        }

        info!("Wallet tracker initialised");
        Ok(Self {
            state: Rc::new(RefCell::new(coordinator)),
        })
    }

    /// Report the wallet's current address (or `null`) and chain. Returns
    /// `"connected"`, `"disconnected"`, `"switched"` or `undefined`.
    #[wasm_bindgen]
    pub fn on_wallet_change(&self, address: Option<String>, chain_id: Option<u32>) -> Result<Option<String>, JsValue> {
        let transition = self
            .coordinator()?
            .on_wallet_change(address.as_deref(), chain_id.map(u64::from))
            .map_err(js_err)?;
        Ok(transition.as_ref().map(|t| transition_name(t).to_string()))
    }

    /// Returns whether the flag changed.
    #[wasm_bindgen]
    pub fn set_tracking(&self, enabled: bool) -> Result<bool, JsValue> {
        let update = self.coordinator()?.set_tracking(enabled);
        if let Some(e) = update.persist_error {
            warn!("Tracking preference not saved: {}", e);
        }
        Ok(update.changed)
    }

    /// Flip tracking and return the new value.
    #[wasm_bindgen]
    pub fn toggle_tracking(&self) -> Result<bool, JsValue> {
        let mut coordinator = self.coordinator()?;
        coordinator.toggle_tracking();
        Ok(coordinator.is_tracking())
    }

    #[wasm_bindgen]
    pub fn is_tracking(&self) -> Result<bool, JsValue> {
        Ok(self.coordinator()?.is_tracking())
    }

    /// Send a custom event; `data` must be a JSON object literal.
    #[wasm_bindgen]
    pub fn send_custom_event(&self, name: &str, data: &str) -> Result<String, JsValue> {
        let outcome = self
            .coordinator()?
            .send_custom_event(name, data)
            .map_err(js_err)?;
        Ok(outcome.to_string())
    }

    #[wasm_bindgen]
    pub fn track_page(&self, page_url: &str) -> Result<String, JsValue> {
        let outcome = self.coordinator()?.track_page(page_url).map_err(js_err)?;
        Ok(outcome.to_string())
    }

    #[wasm_bindgen]
    pub fn test_connection(&self, user_agent: &str, page_url: &str) -> Result<String, JsValue> {
        let outcome = self
            .coordinator()?
            .test_connection(user_agent, page_url)
            .map_err(js_err)?;
        Ok(outcome.to_string())
    }

    /// Sign `message` with the connected wallet. Rejects while another
    /// wallet action is pending.
    #[wasm_bindgen]
    pub async fn sign_message(&self, message: String) -> Result<String, JsValue> {
        let state = self.state.clone();
        let mut coordinator = state
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Another wallet action is in progress"))?;
        let result = coordinator.sign_message(&message).await.map_err(js_err);
        result
    }

    /// Send 0 to the connected address and return the transaction hash.
    #[wasm_bindgen]
    pub async fn send_test_transaction(&self) -> Result<String, JsValue> {
        let state = self.state.clone();
        let mut coordinator = state
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Another wallet action is in progress"))?;
        let result = coordinator.send_test_transaction().await.map_err(js_err);
        result
    }

    #[wasm_bindgen]
    pub fn status(&self) -> Result<JsValue, JsValue> {
        to_js(&self.coordinator()?.status())
    }

    #[wasm_bindgen]
    pub fn recent_events(&self) -> Result<JsValue, JsValue> {
        to_js(&self.coordinator()?.recent_events())
    }

    #[wasm_bindgen]
    pub fn clear_events(&self) -> Result<(), JsValue> {
        self.coordinator()?.clear_events();
        Ok(())
    }

    /// Options object for the analytics SDK provider.
    #[wasm_bindgen]
    pub fn sdk_options(&self) -> Result<JsValue, JsValue> {
        let coordinator = self.coordinator()?;
        let settings = coordinator.settings();
        let options = serde_json::json!({
            "tracking": settings.tracking,
            "flushInterval": settings.flush_interval_ms,
            "logger": {
                "enabled": settings.logger_enabled,
                "levels": settings.logger_levels,
            },
        });
        to_js(&options)
    }
}
