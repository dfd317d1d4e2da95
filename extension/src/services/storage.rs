// Chrome Storage API Integration
// chrome.storage.local backs the connection store shared by every context

use async_trait::async_trait;
use serde_json::Value;
use solconnect_core::error::StoreError;
use solconnect_core::store::{ChangeListener, ConnectionStore, StorageChange, StorageMap};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::chrome::{self, from_js, js_error_message, to_js};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"])]
    fn get(keys: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"])]
    fn set(items: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"])]
    fn remove(keys: JsValue) -> js_sys::Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"])]
    fn clear() -> js_sys::Promise;
}

fn backend(err: JsValue) -> StoreError {
    StoreError::Backend(js_error_message(&err))
}

fn into_map(result: JsValue) -> Result<StorageMap, StoreError> {
    match from_js::<Value>(result).map_err(backend)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(StorageMap::new()),
        other => Err(StoreError::Backend(format!(
            "unexpected storage result: {}",
            other
        ))),
    }
}

/// Missing and `undefined` both mean "unset".
fn optional(value: JsValue) -> Option<Value> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    from_js(value).ok()
}

pub struct ChromeStore;

impl ChromeStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChromeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl ConnectionStore for ChromeStore {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap, StoreError> {
        let keys = to_js(keys).map_err(backend)?;
        let result = JsFuture::from(get(keys)).await.map_err(backend)?;
        into_map(result)
    }

    async fn get_all(&self) -> Result<StorageMap, StoreError> {
        let result = JsFuture::from(get(JsValue::NULL)).await.map_err(backend)?;
        into_map(result)
    }

    async fn set(&self, items: StorageMap) -> Result<(), StoreError> {
        let items = to_js(&items).map_err(backend)?;
        JsFuture::from(set(items)).await.map_err(backend)?;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let keys = to_js(keys).map_err(backend)?;
        JsFuture::from(remove(keys)).await.map_err(backend)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        log::info!("Clearing storage...");
        JsFuture::from(clear()).await.map_err(backend)?;
        Ok(())
    }

    /// chrome.storage.onChanged, which also reports writes from other
    /// contexts. Listeners live for the rest of the context.
    fn on_change(&self, listener: ChangeListener) {
        let closure = Closure::wrap(Box::new(move |key: String, old: JsValue, new: JsValue| {
            listener(&StorageChange {
                key,
                old_value: optional(old),
                new_value: optional(new),
            });
        }) as Box<dyn FnMut(String, JsValue, JsValue)>);
        chrome::on_storage_changed(&closure);
        closure.forget();
    }
}
