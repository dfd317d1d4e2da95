// Background service worker for SolConnect
// No Dioxus here. All reconciliation logic lives in solconnect-core;
// JavaScript is just glue forwarding chrome.* events to these exports.

use solconnect_core::background::BackgroundCoordinator;
use solconnect_core::protocol::{Channel, Request, Response};
use solconnect_core::store::ConnectionStore;
use solconnect_extension::services::chrome::{from_js, js_error_message, to_js};
use solconnect_extension::services::{ChromeHost, ChromeStore, GlooTimer};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

// Dummy main for binary target
fn main() {}

type Coordinator = BackgroundCoordinator<ChromeStore, ChromeHost>;

thread_local! {
    static COORDINATOR: Rc<Coordinator> = Rc::new(BackgroundCoordinator::new(
        ChromeStore::new(),
        ChromeHost,
        solconnect_extension::extension_config(),
    ));
}

fn coordinator() -> Rc<Coordinator> {
    COORDINATOR.with(Rc::clone)
}

/// Initialize background service worker.
/// Called on every worker start; only re-reads persisted state.
#[wasm_bindgen]
pub fn init_background() {
    solconnect_extension::init_logging();
    log::info!("SolConnect background service initialized");

    let c = coordinator();
    let listener = c.clone();
    c.storage()
        .store()
        .on_change(Box::new(move |change| listener.on_storage_change(change)));

    wasm_bindgen_futures::spawn_local(async move {
        if let Err(err) = c.initialize().await {
            log::error!("Failed to read persisted wallet state: {}", err);
        }
    });
}

/// Handle extension installation
#[wasm_bindgen]
pub fn handle_install() {
    wasm_bindgen_futures::spawn_local(async move {
        coordinator().handle_install(&GlooTimer).await;
    });
}

/// Handle a runtime message. `external` is true for
/// chrome.runtime.onMessageExternal (the hosted connection page).
/// Resolves to the response object for sendResponse.
#[wasm_bindgen]
pub fn handle_message(message: JsValue, external: bool) -> js_sys::Promise {
    wasm_bindgen_futures::future_to_promise(async move {
        let channel = if external {
            Channel::External
        } else {
            Channel::Direct
        };

        let response = match from_js::<Request>(message) {
            Ok(request) => coordinator().handle_request(request, channel).await,
            Err(err) => {
                let reason = js_error_message(&err);
                log::warn!("Ignoring unsupported message via {}: {}", channel, reason);
                Response::error(format!("Unsupported message: {}", reason))
            }
        };
        to_js(&response)
    })
}
