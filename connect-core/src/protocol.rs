// Cross-context message schema
// Shared by the popup, content script, connection page and background worker

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inbound message to the background worker, tagged by `action`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    // Connection page (any channel) reporting a connected wallet
    #[serde(alias = "wallet_connected", rename_all = "camelCase")]
    WalletConnected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },

    // Popup
    CheckWalletConnection,
    OpenWalletConnect,
    DisconnectWallet,
    ToggleDevelopmentMode,
    #[serde(alias = "toggleGitHubPages")]
    ToggleAlternateHost,

    // Hosted site login (external messaging)
    Login {
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        address: Option<String>,
    },

    ApplyGiftCard,

    // Debug panel
    ClearStorage,
}

impl Request {
    pub fn wallet_connected(address: impl Into<String>) -> Self {
        Request::WalletConnected {
            address: None,
            public_key: Some(address.into()),
            token: None,
            source: None,
        }
    }

    /// Connection forwarded by the content script, tagged with the channel
    /// it arrived on.
    pub fn relayed(address: impl Into<String>, channel: Channel) -> Self {
        Request::WalletConnected {
            address: None,
            public_key: Some(address.into()),
            token: None,
            source: Some(channel.to_string()),
        }
    }

    /// Channel named by a relayed request's `source`, else `fallback`.
    pub fn origin(&self, fallback: Channel) -> Channel {
        match self {
            Request::WalletConnected {
                source: Some(source),
                ..
            } => Channel::from_source(source).unwrap_or(fallback),
            _ => fallback,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
    Opening,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_local_development: Option<bool>,
    #[serde(
        default,
        rename = "useGitHubPages",
        skip_serializing_if = "Option::is_none"
    )]
    pub use_alternate_host: Option<bool>,
}

impl Response {
    fn with_status(status: Status) -> Self {
        Self {
            status,
            connected: None,
            public_key: None,
            points: None,
            message: None,
            use_local_development: None,
            use_alternate_host: None,
        }
    }

    pub fn success() -> Self {
        Self::with_status(Status::Success)
    }

    pub fn opening() -> Self {
        Self::with_status(Status::Opening)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::with_status(Status::Error)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Pushed from the background worker to every listening context.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action")]
pub enum Notification {
    #[serde(rename = "wallet_update")]
    WalletUpdate { address: Option<String> },
}

/// Same-page `window.postMessage` payload from the connection page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum WindowMessage {
    #[serde(rename = "WALLET_CONNECTED")]
    WalletConnected {
        #[serde(rename = "publicKey")]
        public_key: String,
    },
}

/// Popup -> content script.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ContentRequest {
    #[serde(rename_all = "camelCase")]
    PerformAction {
        #[serde(default)]
        wallet_address: Option<String>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContentResponse {
    pub status: Status,
    pub message: String,
}

/// Detail of the `solanaWalletInjection` page event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletInjection {
    pub wallet_address: Option<String>,
    pub source: String,
}

/// Which transport delivered an event to the background worker.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// chrome.runtime.sendMessage from an extension page
    Direct,
    /// Pending address picked up from page storage
    SharedStorage,
    /// WALLET_CONNECTED window message relayed by the content script
    WindowMessage,
    /// chrome.runtime.onMessageExternal from the hosted site
    External,
}

impl Channel {
    pub fn from_source(source: &str) -> Option<Self> {
        match source {
            "direct" => Some(Channel::Direct),
            "shared-storage" => Some(Channel::SharedStorage),
            "window-message" => Some(Channel::WindowMessage),
            "external" => Some(Channel::External),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Direct => "direct",
            Channel::SharedStorage => "shared-storage",
            Channel::WindowMessage => "window-message",
            Channel::External => "external",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFlag {
    LocalDevelopment,
    AlternateHost,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Connected,
    Disconnected,
    CheckStatus,
    OpenConnectUi,
    ToggleSourceMode(SourceFlag),
    Login,
    ApplyGiftCard,
    ClearStorage,
}

/// One dispatch worth of work for the background coordinator.
///
/// Not persisted. The same logical connection may arrive once per channel;
/// the address itself is the dedup key.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionEvent {
    pub kind: EventKind,
    pub address: Option<String>,
    pub token: Option<String>,
    pub origin: Channel,
}

impl ConnectionEvent {
    pub fn new(kind: EventKind, origin: Channel) -> Self {
        Self {
            kind,
            address: None,
            token: None,
            origin,
        }
    }

    pub fn connected(address: impl Into<String>, origin: Channel) -> Self {
        Self {
            address: non_blank(Some(address.into())),
            ..Self::new(EventKind::Connected, origin)
        }
    }

    pub fn from_request(request: Request, origin: Channel) -> Self {
        match request {
            Request::WalletConnected {
                address,
                public_key,
                token,
                ..
            } => Self {
                kind: EventKind::Connected,
                address: non_blank(public_key).or_else(|| non_blank(address)),
                token: non_blank(token),
                origin,
            },
            Request::CheckWalletConnection => Self::new(EventKind::CheckStatus, origin),
            Request::OpenWalletConnect => Self::new(EventKind::OpenConnectUi, origin),
            Request::DisconnectWallet => Self::new(EventKind::Disconnected, origin),
            Request::ToggleDevelopmentMode => Self::new(
                EventKind::ToggleSourceMode(SourceFlag::LocalDevelopment),
                origin,
            ),
            Request::ToggleAlternateHost => Self::new(
                EventKind::ToggleSourceMode(SourceFlag::AlternateHost),
                origin,
            ),
            Request::Login { token, address } => Self {
                kind: EventKind::Login,
                address: non_blank(address),
                token: non_blank(token),
                origin,
            },
            Request::ApplyGiftCard => Self::new(EventKind::ApplyGiftCard, origin),
            Request::ClearStorage => Self::new(EventKind::ClearStorage, origin),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
