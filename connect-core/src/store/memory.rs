use async_trait::async_trait;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{ChangeListener, ConnectionStore, StorageChange, StorageMap};
use crate::error::StoreError;

/// In-process store with synchronous change notification.
///
/// Backs the core's tests and stands in for any storage area that has no
/// native change events.
#[derive(Default)]
pub struct MemoryStore {
    items: RefCell<BTreeMap<String, Value>>,
    listeners: RefCell<Vec<Rc<dyn Fn(&StorageChange)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored item.
    pub fn snapshot(&self) -> StorageMap {
        self.items
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn notify(&self, changes: Vec<StorageChange>) {
        if changes.is_empty() {
            return;
        }
        // Listeners may read the store again; release borrows first.
        let listeners: Vec<_> = self.listeners.borrow().iter().cloned().collect();
        for change in &changes {
            for listener in &listeners {
                listener(change);
            }
        }
    }
}

#[async_trait(?Send)]
impl ConnectionStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap, StoreError> {
        let items = self.items.borrow();
        Ok(keys
            .iter()
            .filter_map(|k| items.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn get_all(&self) -> Result<StorageMap, StoreError> {
        Ok(self.snapshot())
    }

    async fn set(&self, items: StorageMap) -> Result<(), StoreError> {
        let mut changes = Vec::new();
        {
            let mut stored = self.items.borrow_mut();
            for (key, value) in items {
                let old = stored.insert(key.clone(), value.clone());
                if old.as_ref() != Some(&value) {
                    changes.push(StorageChange {
                        key,
                        old_value: old,
                        new_value: Some(value),
                    });
                }
            }
        }
        self.notify(changes);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let changes: Vec<_> = {
            let mut stored = self.items.borrow_mut();
            keys.iter()
                .filter_map(|key| {
                    stored.remove(*key).map(|old| StorageChange {
                        key: key.to_string(),
                        old_value: Some(old),
                        new_value: None,
                    })
                })
                .collect()
        };
        self.notify(changes);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let drained = std::mem::take(&mut *self.items.borrow_mut());
        let changes = drained
            .into_iter()
            .map(|(key, old)| StorageChange {
                key,
                old_value: Some(old),
                new_value: None,
            })
            .collect();
        self.notify(changes);
        Ok(())
    }

    fn on_change(&self, listener: ChangeListener) {
        self.listeners.borrow_mut().push(Rc::from(listener));
    }
}
