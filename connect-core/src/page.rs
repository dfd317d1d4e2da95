// Connection page controller
// Runs in the detached wallet-connect tab, either inside the extension or on
// a separately hosted site, and gets the connected address back to the
// background worker through whichever channel is reachable.

use async_trait::async_trait;

use crate::adapter::{ProviderDetection, ProviderEnvironment, ProviderKind, SignedMessage, WalletAdapter};
use crate::error::{Result, WalletError};
use crate::format::short_address;
use crate::protocol::{Request, Response, WindowMessage};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    Extension { runtime_id: String },
    ExternalPage,
}

/// What the page shows in its status region.
#[derive(Clone, Debug, PartialEq)]
pub enum PageStatus {
    Info(String),
    Warning(String),
    Error {
        message: String,
        suggestion: Option<String>,
    },
    Connected {
        short: String,
        full: String,
        provider: ProviderKind,
    },
    Signed {
        signature: String,
    },
    Disconnected,
    Availability(ProviderDetection),
}

#[async_trait(?Send)]
pub trait PageHost {
    /// Extension runtime id, when extension messaging is reachable.
    fn runtime_id(&self) -> Option<String>;

    fn is_secure_context(&self) -> bool;

    fn hostname(&self) -> String;

    /// Fails with `TransportUnavailable` when nothing is listening.
    async fn send_to_extension(&self, request: &Request) -> Result<Response>;

    async fn write_pending_address(&self, address: &str) -> Result<()>;

    fn post_window_message(&self, message: &WindowMessage) -> Result<()>;

    fn render(&self, status: PageStatus);
}

#[async_trait(?Send)]
impl<H: PageHost + ?Sized> PageHost for std::rc::Rc<H> {
    fn runtime_id(&self) -> Option<String> {
        (**self).runtime_id()
    }

    fn is_secure_context(&self) -> bool {
        (**self).is_secure_context()
    }

    fn hostname(&self) -> String {
        (**self).hostname()
    }

    async fn send_to_extension(&self, request: &Request) -> Result<Response> {
        (**self).send_to_extension(request).await
    }

    async fn write_pending_address(&self, address: &str) -> Result<()> {
        (**self).write_pending_address(address).await
    }

    fn post_window_message(&self, message: &WindowMessage) -> Result<()> {
        (**self).post_window_message(message)
    }

    fn render(&self, status: PageStatus) {
        (**self).render(status)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    Direct(Response),
    /// Best-effort fallbacks; either one may have failed
    Bridged { stored: bool, posted: bool },
}

pub struct ConnectionPage<E, H> {
    adapter: WalletAdapter<E>,
    host: H,
}

impl<E: ProviderEnvironment, H: PageHost> ConnectionPage<E, H> {
    pub fn new(adapter: WalletAdapter<E>, host: H) -> Self {
        Self { adapter, host }
    }

    pub fn adapter(&self) -> &WalletAdapter<E> {
        &self.adapter
    }

    pub fn context(&self) -> ExecutionContext {
        match self.host.runtime_id().filter(|id| !id.is_empty()) {
            Some(runtime_id) => ExecutionContext::Extension { runtime_id },
            None => ExecutionContext::ExternalPage,
        }
    }

    /// Warn about plain transport, then report which wallets are present.
    pub fn initialize(&self) -> ProviderDetection {
        let hostname = self.host.hostname();
        let local = hostname == "localhost" || hostname == "127.0.0.1";
        if !self.host.is_secure_context() && !local {
            log::warn!("Connection page served without HTTPS on {}", hostname);
            self.host.render(PageStatus::Warning(
                "Warning: Phantom requires HTTPS or localhost for wallet connections. Wallet detection may fail."
                    .to_string(),
            ));
        }

        let detection = self.adapter.detect_providers();
        log::info!(
            "Wallets detected (phantom: {}, solflare: {})",
            detection.phantom_present,
            detection.solflare_present
        );
        self.host.render(PageStatus::Availability(detection));
        detection
    }

    /// Connect through the wallet and hand the address to the extension.
    ///
    /// The connected state is rendered before any delivery is attempted.
    pub async fn connect(&self, preferred: Option<ProviderKind>) -> Result<Delivery> {
        let label = preferred.map(|k| k.name()).unwrap_or("wallet");
        self.host.render(PageStatus::Info(format!("Connecting to {}...", label)));

        let result = match self.adapter.connect_with(preferred).await {
            Ok(result) => result,
            Err(err) => {
                log::warn!("Wallet connect failed: {}", err);
                self.render_error(&err);
                return Err(err);
            }
        };

        self.host.render(PageStatus::Connected {
            short: short_address(&result.address),
            full: result.address.clone(),
            provider: result.provider,
        });

        Ok(self.deliver(&result.address).await)
    }

    async fn deliver(&self, address: &str) -> Delivery {
        if let ExecutionContext::Extension { runtime_id } = self.context() {
            match self
                .host
                .send_to_extension(&Request::wallet_connected(address))
                .await
            {
                Ok(response) => {
                    log::info!("Delivered {} to extension {}", address, runtime_id);
                    return Delivery::Direct(response);
                }
                Err(err) => log::warn!("Direct delivery failed, using page fallbacks: {}", err),
            }
        }

        let stored = match self.host.write_pending_address(address).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not store pending address: {}", err);
                false
            }
        };
        let message = WindowMessage::WalletConnected {
            public_key: address.to_string(),
        };
        let posted = match self.host.post_window_message(&message) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not post WALLET_CONNECTED: {}", err);
                false
            }
        };

        Delivery::Bridged { stored, posted }
    }

    pub async fn sign_message(&self, text: &str) -> Result<SignedMessage> {
        match self.adapter.sign_message(text).await {
            Ok(signed) => {
                self.host.render(PageStatus::Signed {
                    signature: signed.signature.clone(),
                });
                Ok(signed)
            }
            Err(err) => {
                self.render_error(&err);
                Err(err)
            }
        }
    }

    /// Disconnects the wallet on this page only. The extension keeps its
    /// state until the user disconnects from the popup.
    pub async fn disconnect(&self) -> Result<()> {
        if let Err(err) = self.adapter.disconnect().await {
            self.render_error(&err);
            return Err(err);
        }
        self.host.render(PageStatus::Disconnected);
        Ok(())
    }

    fn render_error(&self, err: &WalletError) {
        self.host.render(PageStatus::Error {
            message: err.to_string(),
            suggestion: err.suggestion().map(str::to_string),
        });
    }
}
