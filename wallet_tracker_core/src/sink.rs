// Analytics sink abstraction
// Native writes JSON lines, WASM forwards to the browser analytics SDK

use crate::error::CoreError;
use crate::models::{Properties, TrackedCall};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

pub type SinkResult<T> = Result<T, CoreError>;

/// External analytics endpoint. Batching, delivery and retries are the
/// implementation's business.
pub trait AnalyticsSink {
    fn track(&self, name: &str, properties: &Properties) -> SinkResult<()>;

    fn identify(&self, user_id: &str, traits: &Properties) -> SinkResult<()>;
}

impl<T: AnalyticsSink + ?Sized> AnalyticsSink for Box<T> {
    fn track(&self, name: &str, properties: &Properties) -> SinkResult<()> {
        (**self).track(name, properties)
    }

    fn identify(&self, user_id: &str, traits: &Properties) -> SinkResult<()> {
        (**self).identify(user_id, traits)
    }
}

/// Records every call in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    calls: Arc<Mutex<Vec<TrackedCall>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<TrackedCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<TrackedCall> {
        self.guard().clone()
    }

    /// Names of tracked events in arrival order (identify calls excluded)
    pub fn track_names(&self) -> Vec<String> {
        self.guard()
            .iter()
            .filter_map(|call| match call {
                TrackedCall::Track { name, .. } => Some(name.clone()),
                TrackedCall::Identify { .. } => None,
            })
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.track_names().iter().filter(|n| n.as_str() == name).count()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }
}

impl AnalyticsSink for MemorySink {
    fn track(&self, name: &str, properties: &Properties) -> SinkResult<()> {
        self.guard().push(TrackedCall::Track {
            name: name.to_string(),
            properties: properties.clone(),
            received_at: Utc::now(),
        });
        Ok(())
    }

    fn identify(&self, user_id: &str, traits: &Properties) -> SinkResult<()> {
        self.guard().push(TrackedCall::Identify {
            user_id: user_id.to_string(),
            traits: traits.clone(),
            received_at: Utc::now(),
        });
        Ok(())
    }
}
