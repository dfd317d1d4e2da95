// Wallet connection core for the SolConnect browser extension
//
// Platform-independent: every browser API sits behind a trait so the
// reconciliation logic builds and tests natively. The wasm extension crate
// supplies the chrome.* implementations.

pub mod adapter;
pub mod background;
pub mod bridge;
pub mod config;
pub mod content;
pub mod error;
pub mod format;
pub mod page;
pub mod popup;
pub mod protocol;
pub mod store;

#[cfg(test)]
mod testing;

pub use adapter::{ProviderEnvironment, ProviderKind, WalletAdapter, WalletProvider};
pub use background::{Badge, BackgroundCoordinator, ExtensionHost};
pub use bridge::{EventSink, PendingAddressBridge, PollOutcome, Timer};
pub use config::ConfigFile;
pub use content::{ContentScript, PageDom};
pub use error::{StoreError, WalletError};
pub use page::{ConnectionPage, PageHost, PageStatus};
pub use popup::{PopupController, PopupHost, PopupView};
pub use protocol::{Channel, ConnectionEvent, Notification, Request, Response, Status};
pub use store::{ConnectionStore, MemoryStore, StorageChange, WalletConnection, WalletStorage};
