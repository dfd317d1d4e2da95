use thiserror::Error;

/// Failures of a storage backend (chrome.storage, localStorage, memory).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Every failure a wallet connection can run into.
///
/// None of these escape a component boundary: the background coordinator
/// turns them into an error [`Response`](crate::protocol::Response) and the
/// connection page renders them as status text.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No wallet extension injected into the page.
    #[error("No Solana wallet found. Please install Phantom or Solflare and reload the page")]
    ProviderNotFound,

    /// The user (or the provider) declined the connect request.
    #[error("Connection rejected: {0}")]
    ConnectRejected(String),

    /// A connection event arrived without a usable address.
    #[error("No public key provided")]
    MissingAddress,

    /// Direct extension messaging is not reachable from this context.
    #[error("Extension messaging unavailable: {0}")]
    TransportUnavailable(String),

    /// Signing was requested before a connection was established.
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wallet provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WalletError {
    /// Hint shown next to the status text.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            WalletError::ProviderNotFound => {
                Some("Install Phantom (https://phantom.app) or Solflare (https://solflare.com), then reload.")
            }
            WalletError::ConnectRejected(_) => Some("Approve the request in your wallet to try again."),
            WalletError::NotConnected => Some("Connect a wallet first."),
            WalletError::TransportUnavailable(_) => {
                Some("If the tab doesn't open, please check your popup blocker settings.")
            }
            WalletError::Provider(_) => Some("Retry, or unlock your wallet extension."),
            WalletError::MissingAddress | WalletError::Store(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
