// SolConnect browser extension
// Popup and connection page are Dioxus apps; the content script is plain
// web-sys. Everything stateful lives in solconnect-core.

#[cfg(feature = "dioxus")]
mod components;
#[cfg(feature = "dioxus")]
pub mod icons;

pub mod content;
pub mod services;

use solconnect_core::config::ConfigFile;
use std::sync::Once;
use wasm_bindgen::prelude::*;

const BUNDLED_CONFIG: &str = include_str!("../extension.toml");

static LOGGER: Once = Once::new();

/// Safe to call from every entry point.
pub fn init_logging() {
    LOGGER.call_once(|| wasm_logger::init(wasm_logger::Config::default()));
}

/// Configuration bundled with the extension at build time.
pub fn extension_config() -> ConfigFile {
    match ConfigFile::from_toml_str(BUNDLED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid bundled extension.toml, using defaults: {:#}", e);
            ConfigFile::default()
        }
    }
}

#[cfg(feature = "dioxus")]
#[wasm_bindgen]
pub fn launch_popup() {
    init_logging();
    log::info!("SolConnect popup starting...");
    dioxus::launch(components::Popup);
}

#[cfg(feature = "dioxus")]
#[wasm_bindgen]
pub fn launch_connect_page() {
    init_logging();
    log::info!("SolConnect connection page starting...");
    dioxus::launch(components::ConnectPage);
}

#[wasm_bindgen]
pub fn start_content_script() {
    content::start();
}
