// Browser side of the connection page

use async_trait::async_trait;
use solconnect_core::bridge::PendingAddressBridge;
use solconnect_core::config::ConfigFile;
use solconnect_core::error::{Result, WalletError};
use solconnect_core::page::{PageHost, PageStatus};
use solconnect_core::protocol::{Request, Response, WindowMessage};
use std::rc::Rc;

use super::chrome::{self, js_error_message, to_js};
use super::local::LocalStore;
use super::messaging::RuntimeClient;

pub struct BrowserPage {
    bridge: PendingAddressBridge<LocalStore>,
    on_render: Rc<dyn Fn(PageStatus)>,
}

impl BrowserPage {
    pub fn new(config: &ConfigFile, on_render: Rc<dyn Fn(PageStatus)>) -> Self {
        Self {
            bridge: PendingAddressBridge::from_config(LocalStore::new(), &config.bridge),
            on_render,
        }
    }
}

#[async_trait(?Send)]
impl PageHost for BrowserPage {
    fn runtime_id(&self) -> Option<String> {
        chrome::extension_runtime_id()
    }

    fn is_secure_context(&self) -> bool {
        web_sys::window()
            .map(|w| w.is_secure_context())
            .unwrap_or(false)
    }

    fn hostname(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().hostname().ok())
            .unwrap_or_default()
    }

    async fn send_to_extension(&self, request: &Request) -> Result<Response> {
        RuntimeClient.request(request).await
    }

    async fn write_pending_address(&self, address: &str) -> Result<()> {
        self.bridge.write_pending(address).await?;
        Ok(())
    }

    fn post_window_message(&self, message: &WindowMessage) -> Result<()> {
        let window = web_sys::window()
            .ok_or_else(|| WalletError::TransportUnavailable("no window".to_string()))?;
        let data = to_js(message)
            .map_err(|e| WalletError::TransportUnavailable(js_error_message(&e)))?;
        window
            .post_message(&data, "*")
            .map_err(|e| WalletError::TransportUnavailable(js_error_message(&e)))
    }

    fn render(&self, status: PageStatus) {
        (self.on_render)(status);
    }
}
