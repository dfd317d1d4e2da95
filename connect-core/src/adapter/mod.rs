// Wallet provider adapter
// One interface over Phantom-like and Solflare-like injected providers

mod provider;

pub use provider::{
    ProviderCallback, ProviderEnvironment, ProviderEvent, ProviderKind, WalletProvider,
};

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::{Result, WalletError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderDetection {
    pub phantom_present: bool,
    pub solflare_present: bool,
}

impl ProviderDetection {
    pub fn any(&self) -> bool {
        self.phantom_present || self.solflare_present
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletResult {
    pub address: String,
    pub connected: bool,
    pub provider: ProviderKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedMessage {
    /// Hex-encoded signature bytes
    pub signature: String,
    pub address: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdapterEvent {
    Connect,
    Disconnect,
    AccountChanged,
}

pub type AdapterCallback = Rc<dyn Fn(Option<String>)>;

struct ActiveConnection {
    provider: Rc<dyn WalletProvider>,
    address: String,
}

#[derive(Default)]
struct AdapterState {
    active: RefCell<Option<ActiveConnection>>,
    callbacks: RefCell<HashMap<AdapterEvent, AdapterCallback>>,
    listening: RefCell<HashSet<ProviderKind>>,
}

impl AdapterState {
    fn emit(&self, event: AdapterEvent, address: Option<String>) {
        let callback = self.callbacks.borrow().get(&event).cloned();
        if let Some(callback) = callback {
            callback(address);
        }
    }

    fn handle_disconnect(&self) {
        let was_active = self.active.borrow_mut().take().is_some();
        if was_active {
            log::info!("Wallet disconnected");
            self.emit(AdapterEvent::Disconnect, None);
        }
    }

    fn handle_account_change(&self, address: Option<String>) {
        match address {
            Some(address) => {
                if let Some(active) = self.active.borrow_mut().as_mut() {
                    active.address = address.clone();
                }
                log::info!("Wallet account changed: {}", address);
                self.emit(AdapterEvent::AccountChanged, Some(address));
            }
            // Provider reports no account: treat as disconnect
            None => self.handle_disconnect(),
        }
    }
}

/// Drives whichever wallet the page has injected.
///
/// Phantom is preferred over Solflare when both are present.
pub struct WalletAdapter<E> {
    env: E,
    state: Rc<AdapterState>,
}

impl<E: ProviderEnvironment> WalletAdapter<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            state: Rc::new(AdapterState::default()),
        }
    }

    /// Pure inspection of the injected globals.
    pub fn detect_providers(&self) -> ProviderDetection {
        ProviderDetection {
            phantom_present: self.env.phantom().is_some(),
            solflare_present: self.env.solflare().is_some(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.active.borrow().is_some()
    }

    pub fn address(&self) -> Option<String> {
        self.state
            .active
            .borrow()
            .as_ref()
            .map(|active| active.address.clone())
    }

    pub async fn connect(&self) -> Result<WalletResult> {
        self.connect_with(None).await
    }

    /// Connect through `preferred`, or by precedence when `None`.
    pub async fn connect_with(&self, preferred: Option<ProviderKind>) -> Result<WalletResult> {
        let provider = self.select(preferred).ok_or(WalletError::ProviderNotFound)?;
        let kind = provider.kind();
        log::info!("Connecting to {} wallet", kind);

        let address = provider
            .connect()
            .await
            .map_err(WalletError::ConnectRejected)?;
        let address = address.trim().to_string();
        if address.is_empty() {
            return Err(WalletError::ConnectRejected(format!(
                "{} returned an empty public key",
                kind
            )));
        }

        self.attach_listeners(&provider);
        *self.state.active.borrow_mut() = Some(ActiveConnection {
            provider,
            address: address.clone(),
        });
        log::info!("Connected to {} wallet: {}", kind, address);
        self.state.emit(AdapterEvent::Connect, Some(address.clone()));

        Ok(WalletResult {
            address,
            connected: true,
            provider: kind,
        })
    }

    /// No-op when nothing is connected.
    pub async fn disconnect(&self) -> Result<()> {
        let provider = match self.state.active.borrow().as_ref() {
            Some(active) => active.provider.clone(),
            None => return Ok(()),
        };

        provider.disconnect().await.map_err(WalletError::Provider)?;
        self.state.handle_disconnect();
        Ok(())
    }

    pub async fn sign_message(&self, text: &str) -> Result<SignedMessage> {
        let (provider, address) = match self.state.active.borrow().as_ref() {
            Some(active) => (active.provider.clone(), active.address.clone()),
            None => return Err(WalletError::NotConnected),
        };

        let signature = provider
            .sign_message(text.as_bytes())
            .await
            .map_err(WalletError::Provider)?;

        Ok(SignedMessage {
            signature: hex::encode(signature),
            address,
        })
    }

    /// Register `callback` for `event`.
    ///
    /// Returns whether the current provider will actually deliver it:
    /// account-change and disconnect pushes only come from providers that
    /// support them. `Connect` is raised by the adapter itself.
    pub fn subscribe(&self, event: AdapterEvent, callback: AdapterCallback) -> bool {
        self.state.callbacks.borrow_mut().insert(event, callback);
        match event {
            AdapterEvent::Connect => true,
            AdapterEvent::Disconnect | AdapterEvent::AccountChanged => self
                .current_provider()
                .map(|p| p.supports_account_change_events())
                .unwrap_or(false),
        }
    }

    fn current_provider(&self) -> Option<Rc<dyn WalletProvider>> {
        let active = self
            .state
            .active
            .borrow()
            .as_ref()
            .map(|a| a.provider.clone());
        active.or_else(|| self.select(None))
    }

    fn select(&self, preferred: Option<ProviderKind>) -> Option<Rc<dyn WalletProvider>> {
        match preferred {
            Some(kind) => self.env.provider(kind),
            None => self.env.phantom().or_else(|| self.env.solflare()),
        }
    }

    fn attach_listeners(&self, provider: &Rc<dyn WalletProvider>) {
        if !provider.supports_account_change_events() {
            return;
        }
        if !self.state.listening.borrow_mut().insert(provider.kind()) {
            return;
        }

        let state = Rc::downgrade(&self.state);
        provider.on(
            ProviderEvent::AccountChanged,
            Rc::new(move |address| {
                if let Some(state) = state.upgrade() {
                    state.handle_account_change(address);
                }
            }),
        );

        let state = Rc::downgrade(&self.state);
        provider.on(
            ProviderEvent::Disconnect,
            Rc::new(move |_| {
                if let Some(state) = state.upgrade() {
                    state.handle_disconnect();
                }
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEnvironment, ScriptedProvider};

    const PHANTOM_KEY: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const SOLFLARE_KEY: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    #[test]
    fn test_detection_tolerates_absence() {
        let adapter = WalletAdapter::new(FakeEnvironment::empty());
        assert_eq!(adapter.detect_providers(), ProviderDetection::default());
        assert!(!adapter.detect_providers().any());

        let adapter = WalletAdapter::new(FakeEnvironment::solflare_only(SOLFLARE_KEY));
        let detected = adapter.detect_providers();
        assert!(!detected.phantom_present);
        assert!(detected.solflare_present);
    }

    #[tokio::test]
    async fn test_phantom_preferred() {
        let env = FakeEnvironment::both(PHANTOM_KEY, SOLFLARE_KEY);
        let adapter = WalletAdapter::new(env);

        let result = adapter.connect().await.unwrap();
        assert_eq!(result.provider, ProviderKind::Phantom);
        assert_eq!(result.address, PHANTOM_KEY);
        assert!(result.connected);
        assert_eq!(adapter.address().as_deref(), Some(PHANTOM_KEY));
    }

    #[tokio::test]
    async fn test_explicit_solflare_choice() {
        let adapter = WalletAdapter::new(FakeEnvironment::both(PHANTOM_KEY, SOLFLARE_KEY));
        let result = adapter.connect_with(Some(ProviderKind::Solflare)).await.unwrap();
        assert_eq!(result.provider, ProviderKind::Solflare);
        assert_eq!(result.address, SOLFLARE_KEY);
    }

    #[tokio::test]
    async fn test_no_provider() {
        let adapter = WalletAdapter::new(FakeEnvironment::empty());
        let err = adapter.connect().await.unwrap_err();
        assert!(matches!(err, WalletError::ProviderNotFound));

        let adapter = WalletAdapter::new(FakeEnvironment::solflare_only(SOLFLARE_KEY));
        let err = adapter
            .connect_with(Some(ProviderKind::Phantom))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::ProviderNotFound));
    }

    #[tokio::test]
    async fn test_rejection_leaves_adapter_disconnected() {
        let phantom = ScriptedProvider::rejecting(ProviderKind::Phantom, "User rejected the request.");
        let adapter = WalletAdapter::new(FakeEnvironment::with(Some(phantom), None));

        let err = adapter.connect().await.unwrap_err();
        match err {
            WalletError::ConnectRejected(msg) => assert!(msg.contains("User rejected")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_is_noop() {
        let phantom = ScriptedProvider::phantom(PHANTOM_KEY);
        let adapter = WalletAdapter::new(FakeEnvironment::with(Some(phantom.clone()), None));

        adapter.disconnect().await.unwrap();
        assert!(phantom.calls().is_empty());

        adapter.connect().await.unwrap();
        adapter.disconnect().await.unwrap();
        assert_eq!(phantom.calls(), vec!["connect", "disconnect"]);
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn test_sign_requires_connection() {
        let adapter = WalletAdapter::new(FakeEnvironment::both(PHANTOM_KEY, SOLFLARE_KEY));
        let err = adapter.sign_message("hello").await.unwrap_err();
        assert!(matches!(err, WalletError::NotConnected));
    }

    #[tokio::test]
    async fn test_sign_hex_encodes_signature() {
        let phantom = ScriptedProvider::phantom(PHANTOM_KEY);
        phantom.set_signature(vec![0xde, 0xad, 0xbe, 0xef]);
        let adapter = WalletAdapter::new(FakeEnvironment::with(Some(phantom.clone()), None));
        adapter.connect().await.unwrap();

        let signed = adapter.sign_message("Hello").await.unwrap();
        assert_eq!(signed.signature, "deadbeef");
        assert_eq!(signed.address, PHANTOM_KEY);
        assert_eq!(phantom.last_signed(), Some(b"Hello".to_vec()));
    }

    #[tokio::test]
    async fn test_phantom_account_change_reaches_subscriber() {
        let phantom = ScriptedProvider::phantom(PHANTOM_KEY);
        let adapter = WalletAdapter::new(FakeEnvironment::with(Some(phantom.clone()), None));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let delivered = adapter.subscribe(
            AdapterEvent::AccountChanged,
            Rc::new(move |addr| sink.borrow_mut().push(addr)),
        );
        assert!(delivered);

        adapter.connect().await.unwrap();
        phantom.emit(ProviderEvent::AccountChanged, Some("NewAccount1111".into()));

        assert_eq!(*seen.borrow(), vec![Some("NewAccount1111".to_string())]);
        assert_eq!(adapter.address().as_deref(), Some("NewAccount1111"));
    }

    #[tokio::test]
    async fn test_account_change_to_none_disconnects() {
        let phantom = ScriptedProvider::phantom(PHANTOM_KEY);
        let adapter = WalletAdapter::new(FakeEnvironment::with(Some(phantom.clone()), None));
        let disconnected = Rc::new(RefCell::new(0));
        let count = disconnected.clone();
        adapter.subscribe(
            AdapterEvent::Disconnect,
            Rc::new(move |_| *count.borrow_mut() += 1),
        );

        adapter.connect().await.unwrap();
        phantom.emit(ProviderEvent::AccountChanged, None);

        assert!(!adapter.is_connected());
        assert_eq!(*disconnected.borrow(), 1);
    }

    #[tokio::test]
    async fn test_solflare_gets_no_account_events() {
        let solflare = ScriptedProvider::solflare(SOLFLARE_KEY);
        let adapter = WalletAdapter::new(FakeEnvironment::with(None, Some(solflare.clone())));

        let delivered = adapter.subscribe(AdapterEvent::AccountChanged, Rc::new(|_| {}));
        assert!(!delivered);

        adapter.connect().await.unwrap();
        assert_eq!(solflare.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_listeners_attached_once() {
        let phantom = ScriptedProvider::phantom(PHANTOM_KEY);
        let adapter = WalletAdapter::new(FakeEnvironment::with(Some(phantom.clone()), None));

        adapter.connect().await.unwrap();
        adapter.connect().await.unwrap();
        assert_eq!(phantom.listener_count(), 2);
    }
}
