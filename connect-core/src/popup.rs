// Popup controller
// Mirrors the background's view of the connection. Never writes wallet state
// itself, every change goes through a request.

use async_trait::async_trait;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Result, StoreError};
use crate::format::short_address;
use crate::protocol::{ContentRequest, ContentResponse, Notification, Request, Response, SourceFlag, Status};
use crate::store::{keys, ConnectionStore, SourceModePreference, StorageChange, WalletStorage};

const OPENING_NOTICE: &str = "Opening wallet connection in a new tab...";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopupView {
    pub connected: bool,
    pub address: Option<String>,
    pub points: u64,
    pub source_mode: SourceModePreference,
    pub notice: Option<Notice>,
}

impl PopupView {
    pub fn short_address(&self) -> Option<String> {
        self.address.as_deref().map(short_address)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub hint: Option<String>,
    pub is_error: bool,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hint: None,
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hint: None,
            is_error: true,
        }
    }
}

#[async_trait(?Send)]
pub trait PopupHost {
    async fn send(&self, request: &Request) -> Result<Response>;

    async fn send_to_active_tab(&self, request: &ContentRequest) -> Result<ContentResponse>;
}

pub struct PopupController<H, S> {
    host: H,
    storage: WalletStorage<S>,
    view: Rc<RefCell<PopupView>>,
}

impl<H: PopupHost, S: ConnectionStore> PopupController<H, S> {
    /// `store` is only read, for the source mode and the debug panel.
    pub fn new(host: H, store: S) -> Self {
        Self {
            host,
            storage: WalletStorage::new(store),
            view: Rc::new(RefCell::new(PopupView::default())),
        }
    }

    pub fn view(&self) -> PopupView {
        self.view.borrow().clone()
    }

    /// Shared handle for notification listeners registered by the UI.
    pub fn view_handle(&self) -> Rc<RefCell<PopupView>> {
        self.view.clone()
    }

    pub async fn open(&self) -> PopupView {
        match self.host.send(&Request::CheckWalletConnection).await {
            Ok(response) if response.is_success() => {
                let connected = response.connected.unwrap_or(false);
                let mut view = self.view.borrow_mut();
                view.connected = connected;
                view.address = response.public_key.filter(|_| connected);
                view.points = response.points.unwrap_or(0);
            }
            Ok(response) => self.set_notice(Notice::error(error_text(&response))),
            Err(err) => {
                log::warn!("Status check failed: {}", err);
                self.set_notice(Notice::error(err.to_string()));
            }
        }

        match self.storage.source_mode().await {
            Ok(mode) => self.view.borrow_mut().source_mode = mode,
            Err(err) => log::warn!("Could not read source mode: {}", err),
        }
        self.view()
    }

    pub fn on_notification(&self, notification: &Notification) {
        apply_notification(&mut self.view.borrow_mut(), notification);
    }

    pub fn on_storage_change(&self, change: &StorageChange) {
        apply_storage_change(&mut self.view.borrow_mut(), change);
    }

    pub async fn connect(&self) -> PopupView {
        match self.host.send(&Request::OpenWalletConnect).await {
            Ok(response) if response.status == Status::Opening => {
                self.set_notice(Notice {
                    hint: Some(
                        "If the tab doesn't open, please check your popup blocker settings."
                            .to_string(),
                    ),
                    ..Notice::info(OPENING_NOTICE)
                });
            }
            Ok(response) => self.set_notice(Notice::error(error_text(&response))),
            Err(err) => self.set_notice(Notice::error(err.to_string())),
        }
        self.view()
    }

    pub async fn disconnect(&self) -> PopupView {
        match self.host.send(&Request::DisconnectWallet).await {
            Ok(response) if response.is_success() => {
                let mut view = self.view.borrow_mut();
                view.connected = false;
                view.address = None;
                view.notice = None;
            }
            Ok(response) => self.set_notice(Notice::error(error_text(&response))),
            Err(err) => self.set_notice(Notice::error(err.to_string())),
        }
        self.view()
    }

    pub async fn toggle(&self, flag: SourceFlag) -> PopupView {
        let request = match flag {
            SourceFlag::LocalDevelopment => Request::ToggleDevelopmentMode,
            SourceFlag::AlternateHost => Request::ToggleAlternateHost,
        };
        match self.host.send(&request).await {
            Ok(response) if response.is_success() => {
                let mut view = self.view.borrow_mut();
                view.source_mode = SourceModePreference {
                    use_local_development: response.use_local_development.unwrap_or(false),
                    use_alternate_host: response.use_alternate_host.unwrap_or(false),
                };
                view.notice = response.message.map(Notice::info);
            }
            Ok(response) => self.set_notice(Notice::error(error_text(&response))),
            Err(err) => self.set_notice(Notice::error(err.to_string())),
        }
        self.view()
    }

    /// Move to `target` (`None` meaning production) with at most one toggle.
    pub async fn select_source(&self, target: Option<SourceFlag>) -> PopupView {
        let current = self.view.borrow().source_mode;
        let active = if current.use_local_development {
            Some(SourceFlag::LocalDevelopment)
        } else if current.use_alternate_host {
            Some(SourceFlag::AlternateHost)
        } else {
            None
        };

        match (active, target) {
            (a, t) if a == t => self.view(),
            (Some(flag), None) => self.toggle(flag).await,
            (_, Some(flag)) => self.toggle(flag).await,
            (None, None) => self.view(),
        }
    }

    pub async fn apply_gift_card(&self) -> PopupView {
        match self.host.send(&Request::ApplyGiftCard).await {
            Ok(response) if response.is_success() => {
                let mut view = self.view.borrow_mut();
                view.points = response.points.unwrap_or(view.points);
                view.notice = Some(Notice::info("Gift card applied"));
            }
            Ok(response) => self.set_notice(Notice::error(error_text(&response))),
            Err(err) => self.set_notice(Notice::error(err.to_string())),
        }
        self.view()
    }

    pub async fn clear_storage(&self) -> PopupView {
        match self.host.send(&Request::ClearStorage).await {
            Ok(response) if response.is_success() => {
                *self.view.borrow_mut() = PopupView {
                    notice: Some(Notice::info("Storage cleared")),
                    ..PopupView::default()
                };
            }
            Ok(response) => self.set_notice(Notice::error(error_text(&response))),
            Err(err) => self.set_notice(Notice::error(err.to_string())),
        }
        self.view()
    }

    /// Ask the content script of the active tab to announce the wallet.
    pub async fn perform_action(&self) -> PopupView {
        let wallet_address = self.view.borrow().address.clone();
        match self
            .host
            .send_to_active_tab(&ContentRequest::PerformAction { wallet_address })
            .await
        {
            Ok(response) if response.status == Status::Success => {
                self.set_notice(Notice::info("Action Completed!"))
            }
            Ok(response) => self.set_notice(Notice::error(response.message)),
            Err(err) => {
                log::warn!("Active tab did not answer: {}", err);
                self.set_notice(Notice::error("This page does not accept extension actions"));
            }
        }
        self.view()
    }

    /// Rows for the debug panel, values rendered as JSON.
    pub async fn debug_entries(&self) -> std::result::Result<Vec<(String, String)>, StoreError> {
        Ok(self
            .storage
            .entries()
            .await?
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect())
    }

    fn set_notice(&self, notice: Notice) {
        self.view.borrow_mut().notice = Some(notice);
    }
}

/// Live update from a background broadcast.
pub fn apply_notification(view: &mut PopupView, notification: &Notification) {
    match notification {
        Notification::WalletUpdate { address } => {
            view.connected = address.is_some();
            view.address = address.clone();
            if view.connected {
                view.notice = None;
            }
        }
    }
}

/// Reflect a store write made while the popup is open.
pub fn apply_storage_change(view: &mut PopupView, change: &StorageChange) {
    let new_value = change.new_value.as_ref();
    match change.key.as_str() {
        keys::WALLET_CONNECTED => {
            view.connected = new_value.and_then(Value::as_bool).unwrap_or(false);
            if !view.connected {
                view.address = None;
            }
        }
        keys::WALLET_PUBLIC_KEY => {
            view.address = new_value.and_then(Value::as_str).map(str::to_string);
        }
        keys::USER_POINTS => {
            view.points = new_value.and_then(Value::as_u64).unwrap_or(0);
        }
        keys::USE_LOCAL_DEVELOPMENT => {
            view.source_mode.use_local_development =
                new_value.and_then(Value::as_bool).unwrap_or(false);
        }
        keys::USE_GITHUB_PAGES => {
            view.source_mode.use_alternate_host = new_value.and_then(Value::as_bool).unwrap_or(false);
        }
        _ => {}
    }
}

fn error_text(response: &Response) -> String {
    response
        .message
        .clone()
        .unwrap_or_else(|| "Request failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::BackgroundCoordinator;
    use crate::config::ConfigFile;
    use crate::protocol::{Channel, ConnectionEvent};
    use crate::store::MemoryStore;
    use crate::testing::{LoopbackPopupHost, RecordingHost};
    use serde_json::json;

    const ADDR: &str = "Addr1234567890abcdefghijklmnt123";

    type Coordinator = BackgroundCoordinator<Rc<MemoryStore>, Rc<RecordingHost>>;

    fn setup() -> (
        PopupController<LoopbackPopupHost<Rc<MemoryStore>, Rc<RecordingHost>>, Rc<MemoryStore>>,
        Rc<Coordinator>,
        Rc<MemoryStore>,
    ) {
        let store = Rc::new(MemoryStore::new());
        let coordinator = Rc::new(BackgroundCoordinator::new(
            store.clone(),
            Rc::new(RecordingHost::new()),
            ConfigFile::default(),
        ));
        let popup = PopupController::new(LoopbackPopupHost::new(coordinator.clone()), store.clone());
        (popup, coordinator, store)
    }

    #[tokio::test]
    async fn test_open_shows_connection_made_while_closed() {
        let (popup, coordinator, _) = setup();
        coordinator
            .dispatch(ConnectionEvent::connected(ADDR, Channel::SharedStorage))
            .await;

        let view = popup.open().await;
        assert!(view.connected);
        assert_eq!(view.short_address().as_deref(), Some("Addr...t123"));
        assert_eq!(view.points, 15);
    }

    #[tokio::test]
    async fn test_broadcast_updates_open_popup() {
        let (popup, _, _) = setup();
        popup.open().await;
        assert!(!popup.view().connected);

        popup.on_notification(&Notification::WalletUpdate {
            address: Some(ADDR.into()),
        });
        assert!(popup.view().connected);
        assert_eq!(popup.view().address.as_deref(), Some(ADDR));

        popup.on_notification(&Notification::WalletUpdate { address: None });
        assert!(!popup.view().connected);
    }

    #[tokio::test]
    async fn test_storage_changes_update_open_popup() {
        let (popup, coordinator, store) = setup();
        popup.open().await;

        let view = popup.view_handle();
        store.on_change(Box::new(move |change| {
            apply_storage_change(&mut view.borrow_mut(), change)
        }));

        coordinator
            .dispatch(ConnectionEvent::connected(ADDR, Channel::WindowMessage))
            .await;
        let view = popup.view();
        assert!(view.connected);
        assert_eq!(view.address.as_deref(), Some(ADDR));
        assert_eq!(view.points, 15);
    }

    #[tokio::test]
    async fn test_connect_shows_opening_notice() {
        let (popup, _, _) = setup();
        let view = popup.connect().await;
        let notice = view.notice.unwrap();
        assert_eq!(notice.text, OPENING_NOTICE);
        assert!(notice.hint.unwrap().contains("popup blocker"));
        assert!(!notice.is_error);
    }

    #[tokio::test]
    async fn test_disconnect_clears_view() {
        let (popup, coordinator, _) = setup();
        coordinator
            .dispatch(ConnectionEvent::connected(ADDR, Channel::Direct))
            .await;
        popup.open().await;

        let view = popup.disconnect().await;
        assert!(!view.connected);
        assert_eq!(view.address, None);
        assert_eq!(view.points, 15);
    }

    #[tokio::test]
    async fn test_source_selection() {
        let (popup, _, store) = setup();
        popup.open().await;

        let view = popup.select_source(Some(SourceFlag::AlternateHost)).await;
        assert!(view.source_mode.use_alternate_host);
        assert_eq!(view.notice.unwrap().text, "Using GitHub Pages URL");

        let view = popup.select_source(Some(SourceFlag::LocalDevelopment)).await;
        assert!(view.source_mode.use_local_development);
        assert!(!view.source_mode.use_alternate_host);

        let view = popup.select_source(None).await;
        assert_eq!(view.source_mode, SourceModePreference::default());
        assert_eq!(store.snapshot()["useLocalDevelopment"], json!(false));
    }

    #[tokio::test]
    async fn test_reselecting_active_source_sends_nothing() {
        let (popup, _, store) = setup();
        popup.open().await;
        popup.select_source(None).await;
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_debug_panel_and_clear() {
        let (popup, coordinator, _) = setup();
        coordinator
            .dispatch(ConnectionEvent::connected(ADDR, Channel::Direct))
            .await;

        let entries = popup.debug_entries().await.unwrap();
        assert!(entries
            .iter()
            .any(|(k, v)| k == "walletPublicKey" && v == &format!("\"{}\"", ADDR)));

        let view = popup.clear_storage().await;
        assert_eq!(view.points, 0);
        assert!(popup.debug_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_perform_action_passes_address() {
        let (popup, coordinator, _) = setup();
        coordinator
            .dispatch(ConnectionEvent::connected(ADDR, Channel::Direct))
            .await;
        popup.open().await;

        let view = popup.perform_action().await;
        assert_eq!(view.notice.unwrap().text, "Action Completed!");
    }

    #[tokio::test]
    async fn test_gift_card_updates_points() {
        let (popup, _, _) = setup();
        let view = popup.apply_gift_card().await;
        assert_eq!(view.points, 18);
    }
}
