// Wallet connection transition detection
use crate::models::{AccountSwitchPolicy, Transition, WalletAddress};
use log::{debug, info};

/// Detects connect/disconnect by diffing each observed address against the
/// previous one. Call [`ConnectionWatcher::observe`] once per wallet change
/// notification.
#[derive(Debug, Default)]
pub struct ConnectionWatcher {
    previous: Option<WalletAddress>,
    policy: AccountSwitchPolicy,
}

impl ConnectionWatcher {
    pub fn new(policy: AccountSwitchPolicy) -> Self {
        Self {
            previous: None,
            policy,
        }
    }

    /// Compare `current` with the last observed address and report at most
    /// one transition. The stored address is replaced unless `current` is
    /// the same wallet, so it keeps the spelling it was first seen with.
    pub fn observe(&mut self, current: Option<&str>) -> Option<Transition> {
        let current = current.and_then(WalletAddress::parse);

        let transition = match (&self.previous, &current) {
            (None, Some(addr)) => Some(Transition::Connected {
                address: addr.clone(),
            }),
            (Some(prev), None) => Some(Transition::Disconnected {
                address: prev.clone(),
            }),
            (Some(prev), Some(addr)) if prev != addr => match self.policy {
                AccountSwitchPolicy::Ignore => {
                    debug!("Wallet switched {} -> {}, ignored by policy", prev, addr);
                    None
                }
                AccountSwitchPolicy::Reconnect => Some(Transition::Switched {
                    previous: prev.clone(),
                    current: addr.clone(),
                }),
            },
            _ => None,
        };

        if let Some(t) = &transition {
            info!("Wallet transition: {:?}", t);
        }

        if self.previous != current {
            self.previous = current;
        }
        transition
    }

    pub fn is_connected(&self) -> bool {
        self.previous.is_some()
    }

    pub fn address(&self) -> Option<&WalletAddress> {
        self.previous.as_ref()
    }

    pub fn policy(&self) -> AccountSwitchPolicy {
        self.policy
    }
}
