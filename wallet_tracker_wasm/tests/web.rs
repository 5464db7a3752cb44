#![cfg(target_arch = "wasm32")]

use wallet_tracker_wasm::WalletTracker;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn tracker(prefix: &str) -> WalletTracker {
    let settings = format!(r#"{{"storage_prefix": "{}"}}"#, prefix);
    WalletTracker::new(&settings, JsValue::NULL, JsValue::NULL).unwrap()
}

#[wasm_bindgen_test]
fn missing_sdk_degrades_to_noop() {
    let t = tracker("web_test_noop_");
    assert_eq!(t.send_custom_event("Custom", "{}").unwrap(), "sink_unavailable");
    assert!(t.send_custom_event("Custom", "{broken").is_err());
    assert_eq!(
        t.on_wallet_change(Some("0xAB".to_string()), Some(1)).unwrap().as_deref(),
        Some("connected")
    );
    assert!(t.test_connection("agent", "https://example.com/").is_err());
}

#[wasm_bindgen_test]
fn tracking_preference_survives_reload() {
    let prefix = "web_test_consent_";
    let first = tracker(prefix);
    first.set_tracking(true).unwrap();
    assert!(first.set_tracking(false).unwrap());
    assert!(!first.set_tracking(false).unwrap());

    let second = tracker(prefix);
    assert!(!second.is_tracking().unwrap());
    assert!(second.toggle_tracking().unwrap());
}
