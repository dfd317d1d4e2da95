// window.localStorage as a ConnectionStore
// Page-scoped: the connection page writes the pending address here and the
// content script on the same origin reads it back.

use async_trait::async_trait;
use serde_json::Value;
use solconnect_core::error::StoreError;
use solconnect_core::store::{ChangeListener, ConnectionStore, StorageChange, StorageMap};
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::Storage;

use super::chrome::js_error_message;

/// Values are stored and read back as the raw text a page script sees.
/// Non-string values are written as their JSON text and come back as that
/// string.
pub struct LocalStore {
    listeners: RefCell<Vec<Rc<dyn Fn(&StorageChange)>>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }

    fn storage(&self) -> Result<Storage, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Backend("no window".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StoreError::Backend(js_error_message(&e)))?
            .ok_or_else(|| StoreError::Backend("localStorage is disabled".to_string()))
    }

    fn read(storage: &Storage, key: &str) -> Result<Option<Value>, StoreError> {
        let raw = storage
            .get_item(key)
            .map_err(|e| StoreError::Backend(js_error_message(&e)))?;
        Ok(raw.map(read_back))
    }

    fn notify(&self, changes: Vec<StorageChange>) {
        let listeners: Vec<_> = self.listeners.borrow().iter().cloned().collect();
        for change in &changes {
            for listener in &listeners {
                listener(change);
            }
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl ConnectionStore for LocalStore {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap, StoreError> {
        let storage = self.storage()?;
        let mut result = StorageMap::new();
        for key in keys {
            if let Some(value) = Self::read(&storage, key)? {
                result.insert(key.to_string(), value);
            }
        }
        Ok(result)
    }

    async fn get_all(&self) -> Result<StorageMap, StoreError> {
        let storage = self.storage()?;
        let len = storage
            .length()
            .map_err(|e| StoreError::Backend(js_error_message(&e)))?;
        let mut result = StorageMap::new();
        for index in 0..len {
            let key = storage
                .key(index)
                .map_err(|e| StoreError::Backend(js_error_message(&e)))?;
            if let Some(key) = key {
                if let Some(value) = Self::read(&storage, &key)? {
                    result.insert(key, value);
                }
            }
        }
        Ok(result)
    }

    async fn set(&self, items: StorageMap) -> Result<(), StoreError> {
        let storage = self.storage()?;
        let mut changes = Vec::new();
        for (key, value) in items {
            let old = Self::read(&storage, &key)?;
            let text = stored_text(&value);
            storage
                .set_item(&key, &text)
                .map_err(|e| StoreError::Backend(js_error_message(&e)))?;
            let new = read_back(text);
            if old.as_ref() != Some(&new) {
                changes.push(StorageChange {
                    key,
                    old_value: old,
                    new_value: Some(new),
                });
            }
        }
        self.notify(changes);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let storage = self.storage()?;
        let mut changes = Vec::new();
        for key in keys {
            if let Some(old) = Self::read(&storage, key)? {
                storage
                    .remove_item(key)
                    .map_err(|e| StoreError::Backend(js_error_message(&e)))?;
                changes.push(StorageChange {
                    key: key.to_string(),
                    old_value: Some(old),
                    new_value: None,
                });
            }
        }
        self.notify(changes);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let old = self.get_all().await?;
        self.storage()?
            .clear()
            .map_err(|e| StoreError::Backend(js_error_message(&e)))?;
        let changes = old
            .into_iter()
            .map(|(key, value)| StorageChange {
                key,
                old_value: Some(value),
                new_value: None,
            })
            .collect();
        self.notify(changes);
        Ok(())
    }

    /// Writes made through this instance only; other tabs are not observed.
    fn on_change(&self, listener: ChangeListener) {
        self.listeners.borrow_mut().push(Rc::from(listener));
    }
}

// No JSON decoding: "123" written by a page must not come back as a number
fn read_back(text: String) -> Value {
    Value::String(text)
}

fn stored_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
