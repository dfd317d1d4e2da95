// Content script actions on the hosting page
// One-way: the page gets a notification and a DOM event, nothing flows back
// to the background from here.

use crate::format::truncate_address;
use crate::protocol::{ContentRequest, ContentResponse, Status, WalletInjection};

/// Event the hosting page can listen for to pick up the wallet address.
pub const INJECTION_EVENT: &str = "solanaWalletInjection";

/// Answer to a page-dispatched `connectSolanaWallet` request.
pub const CONNECTED_EVENT: &str = "solanaWalletConnected";

pub const INJECTION_SOURCE: &str = "solconnect-extension";

pub trait PageDom {
    fn page_title(&self) -> String;

    /// Transient overlay, removed by the implementation after a few seconds.
    fn show_notification(&self, title: &str, detail: &str);

    fn dispatch_event(&self, name: &str, detail: &WalletInjection);

    /// Reply to later `connectSolanaWallet` events with `detail`.
    fn answer_connect_requests(&self, detail: &WalletInjection);
}

pub struct ContentScript<D> {
    dom: D,
}

impl<D: PageDom> ContentScript<D> {
    pub fn new(dom: D) -> Self {
        Self { dom }
    }

    pub fn handle(&self, request: ContentRequest) -> ContentResponse {
        match request {
            ContentRequest::PerformAction { wallet_address } => self.perform_action(wallet_address),
        }
    }

    fn perform_action(&self, wallet_address: Option<String>) -> ContentResponse {
        let wallet_address = wallet_address.filter(|a| !a.trim().is_empty());
        let title = format!("Extension activated on: {}", self.dom.page_title());
        let detail = match &wallet_address {
            Some(address) => format!("Connected wallet: {}", truncate_address(address, 6, 4)),
            None => "No wallet connected".to_string(),
        };
        self.dom.show_notification(&title, &detail);

        let injection = WalletInjection {
            wallet_address,
            source: INJECTION_SOURCE.to_string(),
        };
        self.dom.dispatch_event(INJECTION_EVENT, &injection);
        if injection.wallet_address.is_some() {
            self.dom.answer_connect_requests(&injection);
        }
        log::debug!("Injected wallet info: {:?}", injection.wallet_address);

        ContentResponse {
            status: Status::Success,
            message: "Action performed successfully".to_string(),
        }
    }
}
