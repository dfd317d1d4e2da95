// Persistent connection store
// Flat key-value namespace per browser profile (chrome.storage.local in the
// extension, MemoryStore in tests)

mod memory;
mod wallet;

pub use memory::MemoryStore;
pub use wallet::{SourceModePreference, WalletConnection, WalletStorage};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub type StorageMap = serde_json::Map<String, Value>;

/// Persisted key names, shared with the JavaScript side of the extension.
pub mod keys {
    pub const WALLET_CONNECTED: &str = "walletConnected";
    pub const WALLET_PUBLIC_KEY: &str = "walletPublicKey";
    pub const SOLANA_ADDRESS: &str = "solanaAddress";
    pub const USER_POINTS: &str = "userPoints";
    pub const AUTH_TOKEN: &str = "authToken";
    pub const USE_LOCAL_DEVELOPMENT: &str = "useLocalDevelopment";
    pub const USE_GITHUB_PAGES: &str = "useGitHubPages";
    pub const REWARDED_ADDRESSES: &str = "rewardedAddresses";
}

/// A single key transition, delivered to every `on_change` listener.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

pub type ChangeListener = Box<dyn Fn(&StorageChange)>;

#[async_trait(?Send)]
pub trait ConnectionStore {
    /// Values for the requested keys. Unset keys are simply missing from
    /// the returned map.
    async fn get(&self, keys: &[&str]) -> Result<StorageMap, StoreError>;

    /// Everything in the namespace. Debug views only.
    async fn get_all(&self) -> Result<StorageMap, StoreError>;

    async fn set(&self, items: StorageMap) -> Result<(), StoreError>;

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    /// Every key whose value actually changed is reported once per write.
    fn on_change(&self, listener: ChangeListener);
}

#[async_trait(?Send)]
impl<S: ConnectionStore + ?Sized> ConnectionStore for std::rc::Rc<S> {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap, StoreError> {
        (**self).get(keys).await
    }

    async fn get_all(&self) -> Result<StorageMap, StoreError> {
        (**self).get_all().await
    }

    async fn set(&self, items: StorageMap) -> Result<(), StoreError> {
        (**self).set(items).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        (**self).remove(keys).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        (**self).clear().await
    }

    fn on_change(&self, listener: ChangeListener) {
        (**self).on_change(listener)
    }
}
