// Wallet Tracker Core Library
// Platform-agnostic connection tracking and consent-gated analytics

pub mod models;
pub mod error;
pub mod storage_trait;
pub mod settings;
pub mod sink;
pub mod wallet;
pub mod watcher;
pub mod dispatcher;
pub mod events;
pub mod coordinator;

#[cfg(feature = "native")]
pub mod native;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports
pub use error::CoreError;
pub use models::*;
pub use settings::Settings;
pub use storage_trait::*;
pub use sink::*;
pub use wallet::*;
pub use watcher::ConnectionWatcher;
pub use dispatcher::{ConsentGatedDispatcher, ConsentUpdate, DispatchOutcome};
pub use coordinator::{Coordinator, Status};
