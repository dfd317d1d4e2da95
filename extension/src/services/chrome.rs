// chrome.* bindings used outside storage
// Thin JS shims so a missing API surfaces as a rejected promise or a no-op
// rather than a TypeError in the page

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen(inline_js = "
export function extensionRuntimeId() {
    if (typeof chrome !== 'undefined' && chrome.runtime && chrome.runtime.id) {
        return chrome.runtime.id;
    }
    return null;
}

export async function sendRuntimeMessage(message) {
    if (typeof chrome === 'undefined' || !chrome.runtime || !chrome.runtime.sendMessage) {
        throw new Error('chrome.runtime is not available');
    }
    return await chrome.runtime.sendMessage(message);
}

export function broadcastRuntimeMessage(message) {
    // Rejects when no extension page is open
    chrome.runtime.sendMessage(message).catch(() => {});
}

export function onRuntimeMessage(callback) {
    chrome.runtime.onMessage.addListener((message) => {
        callback(message);
        return false;
    });
}

export function onRuntimeRequest(callback) {
    chrome.runtime.onMessage.addListener((message, sender, sendResponse) => {
        const reply = callback(message);
        if (reply !== null && reply !== undefined) {
            sendResponse(reply);
        }
        return false;
    });
}

export function onStorageChanged(callback) {
    chrome.storage.onChanged.addListener((changes, area) => {
        if (area !== 'local') {
            return;
        }
        for (const [key, change] of Object.entries(changes)) {
            callback(key, change.oldValue, change.newValue);
        }
    });
}

export function setBadge(text, color) {
    chrome.action.setBadgeText({ text });
    if (color) {
        chrome.action.setBadgeBackgroundColor({ color });
    }
}

export function openTab(url) {
    chrome.tabs.create({ url });
}

export async function sendToActiveTab(message) {
    const [tab] = await chrome.tabs.query({ active: true, currentWindow: true });
    if (!tab || tab.id === undefined) {
        throw new Error('No active tab');
    }
    return await chrome.tabs.sendMessage(tab.id, message);
}

export function showNotification(title, message) {
    chrome.notifications.create({
        type: 'basic',
        iconUrl: 'icons/icon128.png',
        title,
        message,
    });
}
")]
extern "C" {
    #[wasm_bindgen(js_name = extensionRuntimeId)]
    pub fn extension_runtime_id() -> Option<String>;

    #[wasm_bindgen(js_name = sendRuntimeMessage, catch)]
    pub async fn send_runtime_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = broadcastRuntimeMessage)]
    pub fn broadcast_runtime_message(message: JsValue);

    #[wasm_bindgen(js_name = onRuntimeMessage)]
    pub fn on_runtime_message(callback: &Closure<dyn FnMut(JsValue)>);

    /// Listener whose non-null return value becomes the reply.
    #[wasm_bindgen(js_name = onRuntimeRequest)]
    pub fn on_runtime_request(callback: &Closure<dyn FnMut(JsValue) -> JsValue>);

    #[wasm_bindgen(js_name = onStorageChanged)]
    pub fn on_storage_changed(callback: &Closure<dyn FnMut(String, JsValue, JsValue)>);

    #[wasm_bindgen(js_name = setBadge)]
    pub fn set_badge(text: &str, color: Option<String>);

    #[wasm_bindgen(js_name = openTab)]
    pub fn open_tab(url: &str);

    #[wasm_bindgen(js_name = sendToActiveTab, catch)]
    pub async fn send_to_active_tab(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = showNotification)]
    pub fn show_notification(title: &str, message: &str);
}

/// Plain JS objects, not Maps, so chrome.* accepts them.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(Into::into)
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(Into::into)
}

pub fn js_error_message(err: &JsValue) -> String {
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}
