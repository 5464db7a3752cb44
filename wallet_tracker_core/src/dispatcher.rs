// Consent-gated analytics dispatch
use crate::error::CoreError;
use crate::models::{
    timestamp_now, AnalyticsEvent, Properties, TrackedCall, EVENT_TRACKING_PAUSED,
    EVENT_TRACKING_RESUMED,
};
use crate::sink::AnalyticsSink;
use crate::storage_trait::{keys, KeyValueStore};
use chrono::Utc;
use log::{debug, info, warn};
use serde_json::json;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// Consent is withdrawn; the event was dropped.
    Suppressed,
    /// No sink is configured (missing write key); the event was dropped.
    SinkUnavailable,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Delivered => "delivered",
            DispatchOutcome::Suppressed => "suppressed",
            DispatchOutcome::SinkUnavailable => "sink_unavailable",
        }
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`ConsentGatedDispatcher::set_consent`].
#[derive(Debug)]
pub struct ConsentUpdate {
    /// The flag actually changed value
    pub changed: bool,
    /// Set when the new value could not be persisted. The in-memory flag
    /// has been updated regardless.
    pub persist_error: Option<CoreError>,
}

/// Forwards events to the analytics sink only while consent is given.
///
/// The consent flag is loaded once from the store and written back on every
/// change, before `set_consent` returns.
pub struct ConsentGatedDispatcher {
    sink: Option<Box<dyn AnalyticsSink>>,
    store: Box<dyn KeyValueStore>,
    consent: bool,
    history: VecDeque<TrackedCall>,
    history_capacity: usize,
}

impl ConsentGatedDispatcher {
    /// `default_consent` applies only when nothing usable is persisted.
    pub fn new(
        sink: Option<Box<dyn AnalyticsSink>>,
        store: Box<dyn KeyValueStore>,
        default_consent: bool,
    ) -> Self {
        let consent = load_consent(store.as_ref(), default_consent);
        if sink.is_none() {
            warn!("No analytics sink configured, events will be dropped");
        }
        info!("Analytics tracking {}", if consent { "enabled" } else { "disabled" });

        Self {
            sink,
            store,
            consent,
            history: VecDeque::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Limit how many delivered calls are kept for [`Self::history`].
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self.trim_history();
        self
    }

    pub fn current_consent(&self) -> bool {
        self.consent
    }

    pub fn is_sink_available(&self) -> bool {
        self.sink.is_some()
    }

    /// Overwrite the consent flag. A real change is persisted and bracketed
    /// by a `tracking_paused` / `tracking_resumed` event that bypasses the
    /// gate; setting the current value again does nothing.
    pub fn set_consent(&mut self, enabled: bool) -> ConsentUpdate {
        if self.consent == enabled {
            debug!("Consent already {}, nothing to do", enabled);
            return ConsentUpdate {
                changed: false,
                persist_error: None,
            };
        }

        self.consent = enabled;
        info!("Analytics tracking {}", if enabled { "resumed" } else { "paused" });

        let persist_error = match self.store.set(keys::TRACKING_ENABLED, &enabled.to_string()) {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to persist tracking preference: {}", e);
                Some(e)
            }
        };

        let name = if enabled {
            EVENT_TRACKING_RESUMED
        } else {
            EVENT_TRACKING_PAUSED
        };
        let mut properties = Properties::new();
        properties.insert("enabled".to_string(), json!(enabled));
        properties.insert("timestamp".to_string(), json!(timestamp_now()));

        if let Err(e) = self.deliver(AnalyticsEvent::new(name, properties)) {
            warn!("Failed to send {} event: {}", name, e);
        }

        ConsentUpdate {
            changed: true,
            persist_error,
        }
    }

    /// Forward `event` to the sink if consent is currently given.
    pub fn dispatch(&mut self, event: AnalyticsEvent) -> Result<DispatchOutcome, CoreError> {
        if !self.consent {
            debug!("Tracking disabled, dropping event: {}", event.name());
            return Ok(DispatchOutcome::Suppressed);
        }
        self.deliver(event)
    }

    /// Associate subsequent events with `user_id`, subject to consent.
    pub fn identify(
        &mut self,
        user_id: &str,
        traits: Properties,
    ) -> Result<DispatchOutcome, CoreError> {
        if !self.consent {
            debug!("Tracking disabled, dropping identify for {}", user_id);
            return Ok(DispatchOutcome::Suppressed);
        }
        let Some(sink) = &self.sink else {
            return Ok(DispatchOutcome::SinkUnavailable);
        };

        sink.identify(user_id, &traits)?;
        self.record(TrackedCall::Identify {
            user_id: user_id.to_string(),
            traits,
            received_at: Utc::now(),
        });
        Ok(DispatchOutcome::Delivered)
    }

    /// Calls that reached the sink, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TrackedCall> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn deliver(&mut self, event: AnalyticsEvent) -> Result<DispatchOutcome, CoreError> {
        let Some(sink) = &self.sink else {
            debug!("No analytics sink, dropping event: {}", event.name());
            return Ok(DispatchOutcome::SinkUnavailable);
        };

        sink.track(event.name(), event.properties())?;
        debug!("Event delivered: {}", event.name());

        let (name, properties) = event.into_parts();
        self.record(TrackedCall::Track {
            name,
            properties,
            received_at: Utc::now(),
        });
        Ok(DispatchOutcome::Delivered)
    }

    fn record(&mut self, call: TrackedCall) {
        self.history.push_back(call);
        self.trim_history();
    }

    fn trim_history(&mut self) {
        if self.history.len() > self.history_capacity {
            let excess = self.history.len() - self.history_capacity;
            self.history.drain(0..excess);
        }
    }
}

fn load_consent(store: &dyn KeyValueStore, default_consent: bool) -> bool {
    match store.get(keys::TRACKING_ENABLED) {
        Ok(Some(raw)) => match serde_json::from_str::<bool>(raw.trim()) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring unreadable tracking preference {:?}: {}", raw, e);
                default_consent
            }
        },
        Ok(None) => default_consent,
        Err(e) => {
            warn!("Failed to load tracking preference: {}", e);
            default_consent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, SinkResult};
    use crate::storage_trait::{MemoryStore, StorageResult};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(CoreError::Storage("disk gone".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(CoreError::Storage("disk gone".to_string()))
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(CoreError::Storage("disk gone".to_string()))
        }
    }

    struct RejectingSink;

    impl AnalyticsSink for RejectingSink {
        fn track(&self, _name: &str, _properties: &Properties) -> SinkResult<()> {
            Err(CoreError::Sink("offline".to_string()))
        }

        fn identify(&self, _user_id: &str, _traits: &Properties) -> SinkResult<()> {
            Err(CoreError::Sink("offline".to_string()))
        }
    }

    fn dispatcher(sink: &MemorySink, store: &MemoryStore) -> ConsentGatedDispatcher {
        ConsentGatedDispatcher::new(Some(Box::new(sink.clone())), Box::new(store.clone()), true)
    }

    fn custom() -> AnalyticsEvent {
        AnalyticsEvent::named("Custom")
    }

    #[test]
    fn test_defaults_to_enabled() {
        let sink = MemorySink::new();
        let store = MemoryStore::new();
        let d = dispatcher(&sink, &store);
        assert!(d.current_consent());
        assert!(d.is_sink_available());
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_pause_is_debounced_on_value() {
        let sink = MemorySink::new();
        let store = MemoryStore::new();
        let mut d = dispatcher(&sink, &store);

        assert!(d.set_consent(false).changed);
        assert!(!d.set_consent(false).changed);

        assert_eq!(sink.count(EVENT_TRACKING_PAUSED), 1);
        assert_eq!(sink.calls().len(), 1);
    }

    #[test]
    fn test_enabling_when_enabled_writes_nothing() {
        let sink = MemorySink::new();
        let store = MemoryStore::new();
        let mut d = dispatcher(&sink, &store);

        let update = d.set_consent(true);
        assert!(!update.changed);
        assert!(store.is_empty());
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_pause_drop_resume_scenario() {
        let sink = MemorySink::new();
        let store = MemoryStore::new();
        let mut d = dispatcher(&sink, &store);

        d.set_consent(false);
        assert_eq!(sink.track_names(), vec![EVENT_TRACKING_PAUSED]);

        assert_eq!(d.dispatch(custom()).unwrap(), DispatchOutcome::Suppressed);
        assert_eq!(sink.calls().len(), 1);

        d.set_consent(true);
        assert_eq!(
            sink.track_names(),
            vec![EVENT_TRACKING_PAUSED, EVENT_TRACKING_RESUMED]
        );

        assert_eq!(d.dispatch(custom()).unwrap(), DispatchOutcome::Delivered);
        assert_eq!(
            sink.track_names(),
            vec![EVENT_TRACKING_PAUSED, EVENT_TRACKING_RESUMED, "Custom"]
        );
        match sink.calls().last() {
            Some(TrackedCall::Track { properties, .. }) => assert!(properties.is_empty()),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_bracketing_event_properties() {
        let sink = MemorySink::new();
        let store = MemoryStore::new();
        let mut d = dispatcher(&sink, &store);
        d.set_consent(false);

        match &sink.calls()[0] {
            TrackedCall::Track { properties, .. } => {
                assert_eq!(properties.get("enabled"), Some(&json!(false)));
                assert!(properties.get("timestamp").is_some());
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_preserves_payload() {
        let sink = MemorySink::new();
        let store = MemoryStore::new();
        let mut d = dispatcher(&sink, &store);

        let mut props = Properties::new();
        props.insert("zeta".to_string(), json!(1));
        props.insert("alpha".to_string(), json!({"nested": [1, 2, 3]}));
        props.insert("flag".to_string(), json!(null));
        let event = AnalyticsEvent::new("Ordered", props.clone());

        d.dispatch(event).unwrap();
        match &sink.calls()[0] {
            TrackedCall::Track { name, properties, .. } => {
                assert_eq!(name, "Ordered");
                assert_eq!(properties, &props);
                let keys: Vec<&String> = properties.keys().collect();
                assert_eq!(keys, vec!["zeta", "alpha", "flag"]);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_consent_survives_restart() {
        let store = MemoryStore::new();
        {
            let sink = MemorySink::new();
            let mut d = dispatcher(&sink, &store);
            d.set_consent(false);
        }

        let sink = MemorySink::new();
        let d = dispatcher(&sink, &store);
        assert!(!d.current_consent());
    }

    #[test]
    fn test_unreadable_preference_falls_back_to_default() {
        let store = MemoryStore::new();
        store.set(keys::TRACKING_ENABLED, "maybe").unwrap();
        let sink = MemorySink::new();
        assert!(dispatcher(&sink, &store).current_consent());

        let d = ConsentGatedDispatcher::new(None, Box::new(BrokenStore), false);
        assert!(!d.current_consent());
    }

    #[test]
    fn test_persist_failure_still_updates_flag() {
        let sink = MemorySink::new();
        let mut d = ConsentGatedDispatcher::new(Some(Box::new(sink.clone())), Box::new(BrokenStore), true);

        let update = d.set_consent(false);
        assert!(update.changed);
        assert!(matches!(update.persist_error, Some(CoreError::Storage(_))));
        assert!(!d.current_consent());
        assert_eq!(sink.count(EVENT_TRACKING_PAUSED), 1);
        assert_eq!(d.dispatch(custom()).unwrap(), DispatchOutcome::Suppressed);
    }

    #[test]
    fn test_missing_sink_is_degraded_not_fatal() {
        let store = MemoryStore::new();
        let mut d = ConsentGatedDispatcher::new(None, Box::new(store.clone()), true);

        assert!(!d.is_sink_available());
        assert_eq!(d.dispatch(custom()).unwrap(), DispatchOutcome::SinkUnavailable);
        assert_eq!(
            d.identify("0xAB", Properties::new()).unwrap(),
            DispatchOutcome::SinkUnavailable
        );

        // Consent still works and persists without a sink
        assert!(d.set_consent(false).changed);
        assert_eq!(store.get(keys::TRACKING_ENABLED).unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let store = MemoryStore::new();
        let mut d = ConsentGatedDispatcher::new(Some(Box::new(RejectingSink)), Box::new(store), true);

        assert!(matches!(d.dispatch(custom()), Err(CoreError::Sink(_))));
        assert_eq!(d.history().count(), 0);

        // The flag change still happens when the bracketing event fails
        assert!(d.set_consent(false).changed);
        assert!(!d.current_consent());
    }

    #[test]
    fn test_identify_is_gated() {
        let sink = MemorySink::new();
        let store = MemoryStore::new();
        let mut d = dispatcher(&sink, &store);

        assert_eq!(
            d.identify("0xAB", Properties::new()).unwrap(),
            DispatchOutcome::Delivered
        );
        d.set_consent(false);
        assert_eq!(
            d.identify("0xAB", Properties::new()).unwrap(),
            DispatchOutcome::Suppressed
        );

        let identifies = sink
            .calls()
            .into_iter()
            .filter(|c| matches!(c, TrackedCall::Identify { .. }))
            .count();
        assert_eq!(identifies, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let sink = MemorySink::new();
        let store = MemoryStore::new();
        let mut d = dispatcher(&sink, &store).with_history_capacity(3);

        for i in 0..5 {
            d.dispatch(AnalyticsEvent::named(format!("Event {}", i))).unwrap();
        }
        let labels: Vec<&str> = d.history().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["Event 2", "Event 3", "Event 4"]);

        d.clear_history();
        assert_eq!(d.history().count(), 0);
        assert_eq!(sink.calls().len(), 5);
    }
}
