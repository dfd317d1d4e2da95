// chrome.runtime / chrome.tabs messaging on both ends

use async_trait::async_trait;
use solconnect_core::background::{Badge, ExtensionHost};
use solconnect_core::bridge::EventSink;
use solconnect_core::error::{Result, WalletError};
use solconnect_core::popup::PopupHost;
use solconnect_core::protocol::{
    ConnectionEvent, ContentRequest, ContentResponse, Notification, Request, Response,
};

use super::chrome::{self, from_js, js_error_message, to_js};

/// Background side: badge, tabs, broadcasts and desktop notifications.
pub struct ChromeHost;

impl ExtensionHost for ChromeHost {
    fn set_badge(&self, badge: Badge) {
        chrome::set_badge(badge.text(), badge.color().map(str::to_string));
    }

    fn open_tab(&self, url: &str) {
        chrome::open_tab(url);
    }

    fn broadcast(&self, notification: &Notification) {
        match to_js(notification) {
            Ok(message) => chrome::broadcast_runtime_message(message),
            Err(err) => log::error!("Failed to encode broadcast: {}", js_error_message(&err)),
        }
    }

    fn show_notification(&self, title: &str, message: &str) {
        chrome::show_notification(title, message);
    }
}

/// Sends requests to the background worker.
pub struct RuntimeClient;

impl RuntimeClient {
    pub async fn request(&self, request: &Request) -> Result<Response> {
        let message = to_js(request)
            .map_err(|e| WalletError::TransportUnavailable(js_error_message(&e)))?;
        let reply = chrome::send_runtime_message(message)
            .await
            .map_err(|e| WalletError::TransportUnavailable(js_error_message(&e)))?;
        // No listener answered
        if reply.is_undefined() {
            return Err(WalletError::TransportUnavailable(
                "no response from extension".to_string(),
            ));
        }
        from_js(reply).map_err(|e| WalletError::Provider(js_error_message(&e)))
    }
}

#[async_trait(?Send)]
impl PopupHost for RuntimeClient {
    async fn send(&self, request: &Request) -> Result<Response> {
        self.request(request).await
    }

    async fn send_to_active_tab(&self, request: &ContentRequest) -> Result<ContentResponse> {
        let message = to_js(request)
            .map_err(|e| WalletError::TransportUnavailable(js_error_message(&e)))?;
        let reply = chrome::send_to_active_tab(message)
            .await
            .map_err(|e| WalletError::TransportUnavailable(js_error_message(&e)))?;
        from_js(reply).map_err(|e| WalletError::Provider(js_error_message(&e)))
    }
}

/// Content script side of the fallback channels: forwards bridged events
/// to the background with their channel recorded.
pub struct RuntimeForwarder;

#[async_trait(?Send)]
impl EventSink for RuntimeForwarder {
    async fn deliver(&self, event: ConnectionEvent) -> Response {
        let Some(address) = event.address else {
            return Response::error(WalletError::MissingAddress.to_string());
        };
        match RuntimeClient
            .request(&Request::relayed(address, event.origin))
            .await
        {
            Ok(response) => response,
            Err(err) => {
                log::warn!("Could not forward {} connection: {}", event.origin, err);
                Response::error(err.to_string())
            }
        }
    }
}
