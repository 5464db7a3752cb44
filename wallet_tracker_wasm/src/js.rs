// Bridges to JavaScript objects handed in by the page
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use wallet_tracker_core::{
    AnalyticsSink, CoreError, Properties, SinkResult, TransactionRequest, WalletResult,
    WalletSigner,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Look up `name` on `target` and make sure it is callable.
fn method(target: &JsValue, name: &str) -> Result<js_sys::Function, String> {
    js_sys::Reflect::get(target, &JsValue::from_str(name))
        .map_err(|e| format!("Failed to read {}: {:?}", name, e))?
        .dyn_into::<js_sys::Function>()
        .map_err(|_| format!("{} is not a function", name))
}

/// Plain JS object (not a `Map`) for any serializable value.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Analytics SDK instance exposing `track(name, properties)` and
/// `identify(traits)`.
pub struct JsAnalyticsSink {
    sdk: JsValue,
}

impl JsAnalyticsSink {
    pub fn new(sdk: JsValue) -> Self {
        Self { sdk }
    }
}

impl AnalyticsSink for JsAnalyticsSink {
    fn track(&self, name: &str, properties: &Properties) -> SinkResult<()> {
        debug!("Forwarding track call to JS SDK: {}", name);
        let track = method(&self.sdk, "track").map_err(CoreError::Sink)?;
        let props = to_js(properties).map_err(|e| CoreError::Sink(format!("{:?}", e)))?;
        track
            .call2(&self.sdk, &JsValue::from_str(name), &props)
            .map_err(|e| CoreError::Sink(format!("track failed: {:?}", e)))?;
        Ok(())
    }

    fn identify(&self, user_id: &str, traits: &Properties) -> SinkResult<()> {
        debug!("Forwarding identify call to JS SDK: {}", user_id);
        let identify = method(&self.sdk, "identify").map_err(CoreError::Sink)?;
        let traits = to_js(traits).map_err(|e| CoreError::Sink(format!("{:?}", e)))?;
        identify
            .call1(&self.sdk, &traits)
            .map_err(|e| CoreError::Sink(format!("identify failed: {:?}", e)))?;
        Ok(())
    }
}

/// Browser wallet signer exposing promise-returning `signMessage(message)`
/// and `sendTransaction({ to, value, data })`.
pub struct JsWallet {
    signer: JsValue,
}

impl JsWallet {
    pub fn new(signer: JsValue) -> Self {
        Self { signer }
    }

    async fn call(&self, name: &str, arg: &JsValue) -> WalletResult<JsValue> {
        let f = method(&self.signer, name).map_err(CoreError::Wallet)?;
        let returned = f
            .call1(&self.signer, arg)
            .map_err(|e| CoreError::Wallet(format!("{} failed: {:?}", name, e)))?;
        JsFuture::from(js_sys::Promise::resolve(&returned))
            .await
            .map_err(|e| CoreError::Wallet(format!("{} rejected: {:?}", name, e)))
    }
}

#[async_trait(?Send)]
impl WalletSigner for JsWallet {
    async fn sign_message(&self, message: &str) -> WalletResult<String> {
        self.call("signMessage", &JsValue::from_str(message))
            .await?
            .as_string()
            .ok_or_else(|| CoreError::Wallet("signMessage did not return a string".to_string()))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> WalletResult<String> {
        let arg = to_js(&tx).map_err(|e| CoreError::Wallet(format!("{:?}", e)))?;
        let receipt = self.call("sendTransaction", &arg).await?;

        if let Some(hash) = receipt.as_string() {
            return Ok(hash);
        }
        js_sys::Reflect::get(&receipt, &JsValue::from_str("hash"))
            .ok()
            .and_then(|h| h.as_string())
            .ok_or_else(|| CoreError::Wallet("sendTransaction returned no hash".to_string()))
    }
}
