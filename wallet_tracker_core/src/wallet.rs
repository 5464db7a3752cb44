// Platform-agnostic wallet abstraction
// Native uses a simulated wallet, WASM defers to the browser wallet SDK

use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type WalletResult<T> = Result<T, CoreError>;

/// Transaction as handed to the wallet. Values are decimal strings in wei.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub to: String,
    pub value: String,
    pub data: String,
}

impl TransactionRequest {
    /// Zero-value transfer to `address` with empty calldata.
    pub fn zero_to_self(address: &str) -> Self {
        Self {
            to: address.to_string(),
            value: "0".to_string(),
            data: "0x".to_string(),
        }
    }
}

/// Signing capabilities of the connected wallet.
/// Implementations exist for:
/// - Native: in-process simulated wallet (CLI)
/// - WASM: JS wallet object exposing `signMessage` / `sendTransaction`
#[async_trait(?Send)]
pub trait WalletSigner {
    /// Sign an arbitrary message and return the signature
    async fn sign_message(&self, message: &str) -> WalletResult<String>;

    /// Submit a transaction and return its hash
    async fn send_transaction(&self, tx: TransactionRequest) -> WalletResult<String>;
}
