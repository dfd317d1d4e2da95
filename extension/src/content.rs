// Content script
// Answers popup actions on the active page. On connection-page origins it
// also relays WALLET_CONNECTED window messages and polls for a pending
// address.

use gloo_timers::callback::Timeout;
use serde_json::Value;
use solconnect_core::bridge::{relay_window_message, EventSink, PendingAddressBridge, PollOutcome};
use solconnect_core::content::{ContentScript, PageDom, CONNECTED_EVENT};
use solconnect_core::protocol::{ContentRequest, WalletInjection};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, CustomEventInit, Document, HtmlElement, MessageEvent};

use crate::services::chrome::{self, from_js, js_error_message, to_js};
use crate::services::{GlooTimer, LocalStore, RuntimeForwarder};

const NOTIFICATION_STYLE: &str = "position:fixed;top:20px;right:20px;padding:15px;\
background-color:#9945FF;color:white;border-radius:4px;z-index:9999;\
box-shadow:0 2px 10px rgba(0,0,0,0.2);transition:opacity 0.5s;\
display:flex;flex-direction:column;gap:5px;";

pub struct DomPage {
    document: Document,
}

impl DomPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn element(&self, tag: &str) -> Result<HtmlElement, JsValue> {
        Ok(self.document.create_element(tag)?.unchecked_into::<HtmlElement>())
    }

    fn build_notification(&self, title: &str, detail: &str) -> Result<HtmlElement, JsValue> {
        let container = self.element("div")?;
        container.style().set_css_text(NOTIFICATION_STYLE);

        let heading = self.element("div")?;
        heading.set_text_content(Some(title));
        heading.style().set_property("font-weight", "bold")?;

        let body = self.element("div")?;
        body.set_text_content(Some(detail));
        body.style().set_property("font-size", "12px")?;

        container.append_child(&heading)?;
        container.append_child(&body)?;
        Ok(container)
    }

    fn custom_event(name: &str, detail: &WalletInjection) -> Result<CustomEvent, JsValue> {
        let init = CustomEventInit::new();
        init.set_detail(&to_js(detail)?);
        CustomEvent::new_with_event_init_dict(name, &init)
    }
}

impl PageDom for DomPage {
    fn page_title(&self) -> String {
        self.document.title()
    }

    fn show_notification(&self, title: &str, detail: &str) {
        let Some(body) = self.document.body() else {
            return;
        };
        let notification = match self.build_notification(title, detail) {
            Ok(n) => n,
            Err(err) => {
                log::warn!("Could not build notification: {}", js_error_message(&err));
                return;
            }
        };
        if body.append_child(&notification).is_err() {
            return;
        }

        // Fade after 3s, remove 500ms later
        Timeout::new(3_000, move || {
            let _ = notification.style().set_property("opacity", "0");
            Timeout::new(500, move || notification.remove()).forget();
        })
        .forget();
    }

    fn dispatch_event(&self, name: &str, detail: &WalletInjection) {
        match Self::custom_event(name, detail) {
            Ok(event) => {
                let _ = self.document.dispatch_event(&event);
            }
            Err(err) => log::warn!("Could not dispatch {}: {}", name, js_error_message(&err)),
        }
    }

    fn answer_connect_requests(&self, detail: &WalletInjection) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let document = self.document.clone();
        let detail = detail.clone();
        let listener = Closure::wrap(Box::new(move |_: web_sys::Event| {
            if let Ok(event) = Self::custom_event(CONNECTED_EVENT, &detail) {
                let _ = document.dispatch_event(&event);
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        let _ = window
            .add_event_listener_with_callback("connectSolanaWallet", listener.as_ref().unchecked_ref());
        listener.forget();
    }
}

/// Entry point injected into every page.
pub fn start() {
    crate::init_logging();
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    listen_for_popup(ContentScript::new(DomPage::new(document)));

    // Both fallback channels only matter on the connection page itself
    let config = crate::extension_config();
    let href = window.location().href().unwrap_or_default();
    if config.urls.is_connect_page(&href) {
        relay_window_messages(&window);
        wasm_bindgen_futures::spawn_local(async move {
            let bridge = PendingAddressBridge::from_config(LocalStore::new(), &config.bridge);
            match bridge.poll(&GlooTimer, &RuntimeForwarder).await {
                PollOutcome::Delivered { address, response, .. } => {
                    log::info!("Forwarded pending address {} ({:?})", address, response.status)
                }
                PollOutcome::Expired { checks } => {
                    log::debug!("No pending address after {} checks", checks)
                }
            }
        });
    }
}

fn listen_for_popup(script: ContentScript<DomPage>) {
    let listener = Closure::wrap(Box::new(move |message: JsValue| -> JsValue {
        let request: ContentRequest = match from_js(message) {
            Ok(request) => request,
            // Not for us
            Err(_) => return JsValue::NULL,
        };
        let response = script.handle(request);
        to_js(&response).unwrap_or(JsValue::NULL)
    }) as Box<dyn FnMut(JsValue) -> JsValue>);
    chrome::on_runtime_request(&listener);
    listener.forget();
}

fn relay_window_messages(window: &web_sys::Window) {
    let listener = Closure::wrap(Box::new(move |event: MessageEvent| {
        let Ok(data) = from_js::<Value>(event.data()) else {
            return;
        };
        let Some(connection) = relay_window_message(&data) else {
            return;
        };
        log::info!("Relaying WALLET_CONNECTED from page");
        wasm_bindgen_futures::spawn_local(async move {
            RuntimeForwarder.deliver(connection).await;
        });
    }) as Box<dyn FnMut(MessageEvent)>);
    let _ = window.add_event_listener_with_callback("message", listener.as_ref().unchecked_ref());
    listener.forget();
}
