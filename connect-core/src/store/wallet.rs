use serde_json::{json, Value};

use super::{keys, ConnectionStore, StorageMap};
use crate::config::UrlConfig;
use crate::error::StoreError;
use crate::protocol::SourceFlag;

/// Canonical wallet state, as every context reads it.
///
/// `connected` is true exactly when `address` is set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletConnection {
    pub connected: bool,
    pub address: Option<String>,
    pub points_balance: u64,
    pub auth_token: Option<String>,
}

/// Which host serves the connection page. At most one flag is set after
/// any toggle; both clear means production.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceModePreference {
    pub use_local_development: bool,
    pub use_alternate_host: bool,
}

impl SourceModePreference {
    /// Local development wins over the alternate host, which wins over
    /// production, should both flags ever be set.
    pub fn resolve_url<'a>(&self, urls: &'a UrlConfig) -> &'a str {
        if self.use_local_development {
            &urls.local_development
        } else if self.use_alternate_host {
            &urls.alternate_host
        } else {
            &urls.production
        }
    }

    /// Flip `flag` and force the other one off.
    pub fn toggled(&self, flag: SourceFlag) -> Self {
        match flag {
            SourceFlag::LocalDevelopment => Self {
                use_local_development: !self.use_local_development,
                use_alternate_host: false,
            },
            SourceFlag::AlternateHost => Self {
                use_local_development: false,
                use_alternate_host: !self.use_alternate_host,
            },
        }
    }

    pub fn describe(&self) -> &'static str {
        if self.use_local_development {
            "Using local development URLs"
        } else if self.use_alternate_host {
            "Using GitHub Pages URL"
        } else {
            "Using production URL"
        }
    }
}

/// Typed view over a [`ConnectionStore`].
///
/// Reads fall back to defaults for anything unset.
pub struct WalletStorage<S> {
    store: S,
}

impl<S: ConnectionStore> WalletStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn load_connection(&self) -> Result<WalletConnection, StoreError> {
        let result = self
            .store
            .get(&[
                keys::WALLET_CONNECTED,
                keys::WALLET_PUBLIC_KEY,
                keys::SOLANA_ADDRESS,
                keys::USER_POINTS,
                keys::AUTH_TOKEN,
            ])
            .await?;

        // Either name may hold the address
        let address = string_at(&result, keys::WALLET_PUBLIC_KEY)
            .or_else(|| string_at(&result, keys::SOLANA_ADDRESS));
        let flagged = bool_at(&result, keys::WALLET_CONNECTED);

        Ok(WalletConnection {
            connected: flagged && address.is_some(),
            address: address.filter(|_| flagged),
            points_balance: u64_at(&result, keys::USER_POINTS),
            auth_token: string_at(&result, keys::AUTH_TOKEN),
        })
    }

    /// Mark `address` connected under both key names.
    pub async fn save_address(&self, address: &str) -> Result<(), StoreError> {
        self.store
            .set(object([
                (keys::WALLET_CONNECTED, json!(true)),
                (keys::WALLET_PUBLIC_KEY, json!(address)),
                (keys::SOLANA_ADDRESS, json!(address)),
            ]))
            .await
    }

    /// True only when the flag and both key names already agree on `address`.
    pub async fn holds_address(&self, address: &str) -> Result<bool, StoreError> {
        let result = self
            .store
            .get(&[
                keys::WALLET_CONNECTED,
                keys::WALLET_PUBLIC_KEY,
                keys::SOLANA_ADDRESS,
            ])
            .await?;
        Ok(bool_at(&result, keys::WALLET_CONNECTED)
            && string_at(&result, keys::WALLET_PUBLIC_KEY).as_deref() == Some(address)
            && string_at(&result, keys::SOLANA_ADDRESS).as_deref() == Some(address))
    }

    pub async fn clear_address(&self) -> Result<(), StoreError> {
        self.store
            .remove(&[
                keys::WALLET_CONNECTED,
                keys::WALLET_PUBLIC_KEY,
                keys::SOLANA_ADDRESS,
            ])
            .await
    }

    pub async fn points(&self) -> Result<u64, StoreError> {
        let result = self.store.get(&[keys::USER_POINTS]).await?;
        Ok(u64_at(&result, keys::USER_POINTS))
    }

    pub async fn set_points(&self, points: u64) -> Result<(), StoreError> {
        self.store
            .set(object([(keys::USER_POINTS, json!(points))]))
            .await
    }

    pub async fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.store
            .set(object([(keys::AUTH_TOKEN, json!(token))]))
            .await
    }

    pub async fn source_mode(&self) -> Result<SourceModePreference, StoreError> {
        let result = self
            .store
            .get(&[keys::USE_LOCAL_DEVELOPMENT, keys::USE_GITHUB_PAGES])
            .await?;
        Ok(SourceModePreference {
            use_local_development: bool_at(&result, keys::USE_LOCAL_DEVELOPMENT),
            use_alternate_host: bool_at(&result, keys::USE_GITHUB_PAGES),
        })
    }

    pub async fn save_source_mode(&self, mode: SourceModePreference) -> Result<(), StoreError> {
        self.store
            .set(object([
                (keys::USE_LOCAL_DEVELOPMENT, json!(mode.use_local_development)),
                (keys::USE_GITHUB_PAGES, json!(mode.use_alternate_host)),
            ]))
            .await
    }

    pub async fn is_rewarded(&self, address: &str) -> Result<bool, StoreError> {
        Ok(self.rewarded_addresses().await?.iter().any(|a| a == address))
    }

    pub async fn mark_rewarded(&self, address: &str) -> Result<(), StoreError> {
        let mut rewarded = self.rewarded_addresses().await?;
        if rewarded.iter().any(|a| a == address) {
            return Ok(());
        }
        rewarded.push(address.to_string());
        self.store
            .set(object([(keys::REWARDED_ADDRESSES, json!(rewarded))]))
            .await
    }

    async fn rewarded_addresses(&self) -> Result<Vec<String>, StoreError> {
        let mut result = self.store.get(&[keys::REWARDED_ADDRESSES]).await?;
        match result.remove(keys::REWARDED_ADDRESSES) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn entries(&self) -> Result<StorageMap, StoreError> {
        self.store.get_all().await
    }

    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.store.clear().await
    }
}

fn object<const N: usize>(entries: [(&str, Value); N]) -> StorageMap {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn string_at(map: &StorageMap, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn bool_at(map: &StorageMap, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn u64_at(map: &StorageMap, key: &str) -> u64 {
    map.get(key).and_then(Value::as_u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn raw(value: Value) -> StorageMap {
        value.as_object().cloned().unwrap()
    }

    fn storage() -> WalletStorage<MemoryStore> {
        WalletStorage::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_defaults_for_empty_store() {
        let state = storage().load_connection().await.unwrap();
        assert_eq!(state, WalletConnection::default());
        assert!(!state.connected);
        assert_eq!(state.points_balance, 0);
    }

    #[tokio::test]
    async fn test_address_written_under_both_names() {
        let storage = storage();
        storage.save_address("Abc123").await.unwrap();

        let raw = storage
            .store()
            .get(&[keys::WALLET_PUBLIC_KEY, keys::SOLANA_ADDRESS])
            .await
            .unwrap();
        assert_eq!(raw[keys::WALLET_PUBLIC_KEY], json!("Abc123"));
        assert_eq!(raw[keys::SOLANA_ADDRESS], json!("Abc123"));
    }

    #[tokio::test]
    async fn test_legacy_solana_address_is_read() {
        let storage = storage();
        storage
            .store()
            .set(raw(json!({"walletConnected": true, "solanaAddress": "Legacy"})))
            .await
            .unwrap();

        let state = storage.load_connection().await.unwrap();
        assert!(state.connected);
        assert_eq!(state.address.as_deref(), Some("Legacy"));
    }

    #[tokio::test]
    async fn test_holds_address_needs_both_names() {
        let storage = storage();
        storage
            .store()
            .set(raw(json!({"walletConnected": true, "solanaAddress": "Legacy"})))
            .await
            .unwrap();
        assert!(!storage.holds_address("Legacy").await.unwrap());

        storage.save_address("Legacy").await.unwrap();
        assert!(storage.holds_address("Legacy").await.unwrap());
        assert!(!storage.holds_address("Other").await.unwrap());
    }

    #[tokio::test]
    async fn test_flag_without_address_is_not_connected() {
        let storage = storage();
        storage
            .store()
            .set(raw(json!({"walletConnected": true})))
            .await
            .unwrap();
        let state = storage.load_connection().await.unwrap();
        assert!(!state.connected);
        assert_eq!(state.address, None);
    }

    #[tokio::test]
    async fn test_clear_address_keeps_points() {
        let storage = storage();
        storage.save_address("Abc").await.unwrap();
        storage.set_points(15).await.unwrap();
        storage.clear_address().await.unwrap();

        let state = storage.load_connection().await.unwrap();
        assert!(!state.connected);
        assert_eq!(state.points_balance, 15);
    }

    #[tokio::test]
    async fn test_mark_rewarded_is_idempotent() {
        let storage = storage();
        storage.mark_rewarded("A").await.unwrap();
        storage.mark_rewarded("A").await.unwrap();
        storage.mark_rewarded("B").await.unwrap();

        assert!(storage.is_rewarded("A").await.unwrap());
        assert!(!storage.is_rewarded("C").await.unwrap());
        let raw = storage.store().get(&[keys::REWARDED_ADDRESSES]).await.unwrap();
        assert_eq!(raw[keys::REWARDED_ADDRESSES], json!(["A", "B"]));
    }

    #[test]
    fn test_url_precedence() {
        let urls = UrlConfig::default();
        let both = SourceModePreference {
            use_local_development: true,
            use_alternate_host: true,
        };
        assert_eq!(both.resolve_url(&urls), urls.local_development);

        let alt = SourceModePreference {
            use_local_development: false,
            use_alternate_host: true,
        };
        assert_eq!(alt.resolve_url(&urls), urls.alternate_host);
        assert_eq!(SourceModePreference::default().resolve_url(&urls), urls.production);
    }

    #[test]
    fn test_toggles_stay_exclusive() {
        let flags = [SourceFlag::LocalDevelopment, SourceFlag::AlternateHost];
        let mut mode = SourceModePreference {
            use_local_development: true,
            use_alternate_host: true,
        };
        for i in 0..16 {
            mode = mode.toggled(flags[i % 2]);
            assert!(!(mode.use_local_development && mode.use_alternate_host));
        }

        let local = SourceModePreference::default().toggled(SourceFlag::LocalDevelopment);
        assert!(local.use_local_development);
        let alt = local.toggled(SourceFlag::AlternateHost);
        assert!(alt.use_alternate_host && !alt.use_local_development);
        let prod = alt.toggled(SourceFlag::AlternateHost);
        assert_eq!(prod, SourceModePreference::default());
    }
}
