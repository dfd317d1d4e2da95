// Injected Solana wallet providers (window.phantom.solana, window.solflare)

use async_trait::async_trait;
use solconnect_core::adapter::{
    ProviderCallback, ProviderEnvironment, ProviderEvent, ProviderKind, WalletProvider,
};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use super::chrome::js_error_message;

#[wasm_bindgen(inline_js = "
export function phantomProvider() {
    if (window.phantom && window.phantom.solana && window.phantom.solana.isPhantom) {
        return window.phantom.solana;
    }
    if (window.solana && window.solana.isPhantom) {
        return window.solana;
    }
    return null;
}

export function solflareProvider() {
    return window.solflare || null;
}

export async function providerConnect(provider) {
    const response = await provider.connect();
    const key = (response && response.publicKey) || provider.publicKey;
    if (!key) {
        throw new Error('Connected but could not retrieve public key');
    }
    return key.toString();
}

export async function providerDisconnect(provider) {
    await provider.disconnect();
}

export async function providerSignMessage(provider, bytes) {
    const result = await provider.signMessage(bytes, 'utf8');
    const signature = result && result.signature ? result.signature : result;
    return new Uint8Array(signature);
}

export function providerOn(provider, event, callback) {
    provider.on(event, (publicKey) => {
        callback(publicKey ? publicKey.toString() : null);
    });
}
")]
extern "C" {
    #[wasm_bindgen(js_name = phantomProvider)]
    fn phantom_provider() -> JsValue;

    #[wasm_bindgen(js_name = solflareProvider)]
    fn solflare_provider() -> JsValue;

    #[wasm_bindgen(js_name = providerConnect, catch)]
    async fn provider_connect(provider: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = providerDisconnect, catch)]
    async fn provider_disconnect(provider: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = providerSignMessage, catch)]
    async fn provider_sign_message(provider: &JsValue, bytes: &[u8]) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = providerOn)]
    fn provider_on(provider: &JsValue, event: &str, callback: &Closure<dyn FnMut(Option<String>)>);
}

pub struct JsWalletProvider {
    kind: ProviderKind,
    handle: JsValue,
}

#[async_trait(?Send)]
impl WalletProvider for JsWalletProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    // Only Phantom exposes on(accountChanged | disconnect)
    fn supports_account_change_events(&self) -> bool {
        self.kind == ProviderKind::Phantom
    }

    async fn connect(&self) -> Result<String, String> {
        let key = provider_connect(&self.handle)
            .await
            .map_err(|e| js_error_message(&e))?;
        key.as_string()
            .ok_or_else(|| "public key is not a string".to_string())
    }

    async fn disconnect(&self) -> Result<(), String> {
        provider_disconnect(&self.handle)
            .await
            .map(|_| ())
            .map_err(|e| js_error_message(&e))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        let signature = provider_sign_message(&self.handle, message)
            .await
            .map_err(|e| js_error_message(&e))?;
        Ok(js_sys::Uint8Array::new(&signature).to_vec())
    }

    fn on(&self, event: ProviderEvent, callback: ProviderCallback) {
        let closure = Closure::wrap(Box::new(move |address: Option<String>| {
            callback(address);
        }) as Box<dyn FnMut(Option<String>)>);
        provider_on(&self.handle, event.as_str(), &closure);
        closure.forget();
    }
}

/// Reads the globals on every call, so a wallet injected after page load
/// is still found.
pub struct BrowserProviders;

impl BrowserProviders {
    fn wrap(kind: ProviderKind, handle: JsValue) -> Option<Rc<dyn WalletProvider>> {
        if handle.is_null() || handle.is_undefined() {
            return None;
        }
        Some(Rc::new(JsWalletProvider { kind, handle }))
    }
}

impl ProviderEnvironment for BrowserProviders {
    fn phantom(&self) -> Option<Rc<dyn WalletProvider>> {
        Self::wrap(ProviderKind::Phantom, phantom_provider())
    }

    fn solflare(&self) -> Option<Rc<dyn WalletProvider>> {
        Self::wrap(ProviderKind::Solflare, solflare_provider())
    }
}
