use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Phantom,
    Solflare,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Phantom => "Phantom",
            ProviderKind::Solflare => "Solflare",
        }
    }

    pub fn install_url(&self) -> &'static str {
        match self {
            ProviderKind::Phantom => "https://phantom.app/",
            ProviderKind::Solflare => "https://solflare.com/",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Native events a provider may push after connecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderEvent {
    AccountChanged,
    Disconnect,
}

impl ProviderEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEvent::AccountChanged => "accountChanged",
            ProviderEvent::Disconnect => "disconnect",
        }
    }
}

/// Receives the new address, or `None` when the account went away.
pub type ProviderCallback = Rc<dyn Fn(Option<String>)>;

/// Capability interface over an injected wallet object.
///
/// Phantom-like providers push account changes; Solflare-like ones do not,
/// and say so through `supports_account_change_events`.
#[async_trait(?Send)]
pub trait WalletProvider {
    fn kind(&self) -> ProviderKind;

    fn supports_account_change_events(&self) -> bool {
        false
    }

    /// Native connect handshake. Returns the base58 public key.
    async fn connect(&self) -> Result<String, String>;

    async fn disconnect(&self) -> Result<(), String>;

    /// Raw signature bytes over `message`.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String>;

    /// Only called when `supports_account_change_events` is true.
    fn on(&self, _event: ProviderEvent, _callback: ProviderCallback) {}
}

/// Injected globals of the hosting page.
pub trait ProviderEnvironment {
    fn phantom(&self) -> Option<Rc<dyn WalletProvider>>;

    fn solflare(&self) -> Option<Rc<dyn WalletProvider>>;

    fn provider(&self, kind: ProviderKind) -> Option<Rc<dyn WalletProvider>> {
        match kind {
            ProviderKind::Phantom => self.phantom(),
            ProviderKind::Solflare => self.solflare(),
        }
    }
}
