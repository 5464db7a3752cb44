use async_trait::async_trait;
use log::debug;
use rand::Rng;
use wallet_tracker_core::{CoreError, TransactionRequest, WalletResult, WalletSigner};

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("0x{}", hex)
}

/// Stand-in wallet for the command line. Produces random signatures and
/// transaction hashes; nothing touches a chain.
#[derive(Debug, Default)]
pub struct SimulatedWallet {
    reject: bool,
}

impl SimulatedWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wallet whose user rejects every request
    pub fn rejecting() -> Self {
        Self { reject: true }
    }
}

#[async_trait(?Send)]
impl WalletSigner for SimulatedWallet {
    async fn sign_message(&self, message: &str) -> WalletResult<String> {
        if self.reject {
            return Err(CoreError::Wallet("User rejected the request".to_string()));
        }
        debug!("Simulated signing of {} bytes", message.len());
        Ok(random_hex(65))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> WalletResult<String> {
        if self.reject {
            return Err(CoreError::Wallet("User rejected the request".to_string()));
        }
        debug!("Simulated transaction to {} value {}", tx.to, tx.value);
        Ok(random_hex(32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signature_shape() {
        let wallet = SimulatedWallet::new();
        let sig = wallet.sign_message("hi").await.unwrap();
        assert!(sig.starts_with("0x"));
        assert_eq!(sig.len(), 2 + 130);

        let hash = wallet
            .send_transaction(TransactionRequest::zero_to_self("0xAB"))
            .await
            .unwrap();
        assert_eq!(hash.len(), 2 + 64);
    }

    #[tokio::test]
    async fn test_rejecting_wallet() {
        let wallet = SimulatedWallet::rejecting();
        assert!(matches!(wallet.sign_message("hi").await, Err(CoreError::Wallet(_))));
    }
}
