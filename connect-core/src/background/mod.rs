// Background coordinator
// Converges every channel's connection events onto one persisted state

mod host;

pub use host::{Badge, ExtensionHost};

use async_trait::async_trait;
use futures::lock::Mutex;
use std::cell::Cell;

use crate::bridge::{EventSink, Timer};
use crate::config::ConfigFile;
use crate::error::{Result, WalletError};
use crate::format::short_address;
use crate::protocol::{Channel, ConnectionEvent, EventKind, Notification, Request, Response, SourceFlag};
use crate::store::{keys, ConnectionStore, StorageChange, WalletConnection, WalletStorage};

/// Sole writer of the wallet connection fields.
///
/// Owns the badge state and the broadcast path. Duplicate deliveries of the
/// same address (one per fallback channel) short-circuit on equality, so
/// repeated events converge instead of stacking side effects. Events run
/// one at a time; a delivery arriving mid-event waits for it to finish.
pub struct BackgroundCoordinator<S, H> {
    storage: WalletStorage<S>,
    host: H,
    config: ConfigFile,
    badge: Cell<Badge>,
    in_flight: Mutex<()>,
}

impl<S: ConnectionStore, H: ExtensionHost> BackgroundCoordinator<S, H> {
    pub fn new(store: S, host: H, config: ConfigFile) -> Self {
        Self {
            storage: WalletStorage::new(store),
            host,
            config,
            badge: Cell::new(Badge::Clear),
            in_flight: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &WalletStorage<S> {
        &self.storage
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn badge(&self) -> Badge {
        self.badge.get()
    }

    /// Re-read persisted state and re-derive the badge. Safe to call on
    /// every worker start.
    pub async fn initialize(&self) -> Result<WalletConnection> {
        let state = self.storage.load_connection().await?;
        self.set_badge(Badge::for_connection(state.connected));
        log::info!(
            "Background initialized (connected: {}, points: {})",
            state.connected,
            state.points_balance
        );
        Ok(state)
    }

    /// Flash the install badge, then fall back to the persisted state.
    pub async fn handle_install<T: Timer + ?Sized>(&self, timer: &T) {
        log::info!("Extension installed or updated");
        self.set_badge(Badge::New);
        timer.sleep(self.config.bridge.install_badge()).await;
        if let Err(err) = self.initialize().await {
            log::error!("Failed to restore badge after install: {}", err);
        }
    }

    /// Keeps the badge in step with writes made by other contexts.
    pub fn on_storage_change(&self, change: &StorageChange) {
        if change.key != keys::WALLET_CONNECTED {
            return;
        }
        let connected = change
            .new_value
            .as_ref()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        self.set_badge(Badge::for_connection(connected));
    }

    /// Pages outside the extension may only report a wallet or a login,
    /// and cannot relabel where their message came from.
    pub async fn handle_request(&self, request: Request, channel: Channel) -> Response {
        let origin = match channel {
            Channel::External => Channel::External,
            _ => request.origin(channel),
        };
        let event = ConnectionEvent::from_request(request, origin);
        if channel == Channel::External
            && !matches!(event.kind, EventKind::Connected | EventKind::Login)
        {
            log::warn!("Refused {:?} from an external page", event.kind);
            return Response::error(format!("{:?} is not allowed from external pages", event.kind));
        }
        self.dispatch(event).await
    }

    /// Run one event to completion. Failures come back as an error
    /// response, never as a panic or an `Err`.
    pub async fn dispatch(&self, event: ConnectionEvent) -> Response {
        let kind = event.kind.clone();
        let origin = event.origin;
        let _guard = self.in_flight.lock().await;
        match self.apply(event).await {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    WalletError::Store(_) => {
                        log::error!("{:?} via {} failed: {}", kind, origin, err)
                    }
                    _ => log::warn!("Dropped {:?} via {}: {}", kind, origin, err),
                }
                Response::error(err.to_string())
            }
        }
    }

    async fn apply(&self, event: ConnectionEvent) -> Result<Response> {
        match event.kind {
            EventKind::Connected => self.connect(&event, "Wallet Connected").await,
            EventKind::Login => self.login(&event).await,
            EventKind::CheckStatus => self.check_status().await,
            EventKind::Disconnected => self.disconnect().await,
            EventKind::OpenConnectUi => self.open_connect_ui().await,
            EventKind::ToggleSourceMode(flag) => self.toggle_source_mode(flag).await,
            EventKind::ApplyGiftCard => self.apply_gift_card().await,
            EventKind::ClearStorage => self.clear_storage().await,
        }
    }

    async fn connect(&self, event: &ConnectionEvent, title: &str) -> Result<Response> {
        let address = event.address.as_deref().ok_or(WalletError::MissingAddress)?;
        let current = self.storage.load_connection().await?;

        if self.storage.holds_address(address).await? {
            log::debug!("{} already connected, delivery via {} ignored", address, event.origin);
        } else {
            self.storage.save_address(address).await?;
            log::info!("Wallet connected via {}: {}", event.origin, address);
        }

        if !self.storage.is_rewarded(address).await? {
            let bonus = self.config.rewards.welcome_bonus;
            if current.points_balance < bonus {
                self.storage.set_points(bonus).await?;
            }
            self.storage.mark_rewarded(address).await?;
            log::info!("Welcome bonus applied for {}", address);
        }

        if let Some(token) = &event.token {
            self.storage.set_token(token).await?;
        }

        self.set_badge(Badge::Connected);
        self.host.broadcast(&Notification::WalletUpdate {
            address: Some(address.to_string()),
        });
        if event.origin == Channel::External {
            self.host.show_notification(
                title,
                &format!("Connected to wallet: {}", short_address(address)),
            );
        }

        Ok(Response {
            connected: Some(true),
            public_key: Some(address.to_string()),
            points: Some(self.storage.points().await?),
            ..Response::success()
        })
    }

    async fn login(&self, event: &ConnectionEvent) -> Result<Response> {
        if event.address.is_some() {
            return self.connect(event, "Login Successful").await;
        }

        // Token-only login keeps whatever connection exists
        let Some(token) = &event.token else {
            return Err(WalletError::MissingAddress);
        };
        self.storage.set_token(token).await?;
        if event.origin == Channel::External {
            self.host
                .show_notification("Login Successful", "Signed in to SolConnect");
        }
        self.check_status().await
    }

    async fn check_status(&self) -> Result<Response> {
        let state = self.storage.load_connection().await?;
        Ok(Response {
            connected: Some(state.connected),
            public_key: state.address,
            points: Some(state.points_balance),
            ..Response::success()
        })
    }

    async fn disconnect(&self) -> Result<Response> {
        self.storage.clear_address().await?;
        self.set_badge(Badge::Clear);
        self.host
            .broadcast(&Notification::WalletUpdate { address: None });
        log::info!("Wallet disconnected");

        Ok(Response {
            connected: Some(false),
            ..Response::success()
        })
    }

    async fn open_connect_ui(&self) -> Result<Response> {
        let mode = self.storage.source_mode().await?;
        let url = mode.resolve_url(&self.config.urls);
        log::info!("Opening wallet connect page ({}): {}", mode.describe(), url);
        self.host.open_tab(url);
        Ok(Response::opening())
    }

    async fn toggle_source_mode(&self, flag: SourceFlag) -> Result<Response> {
        let mode = self.storage.source_mode().await?.toggled(flag);
        self.storage.save_source_mode(mode).await?;
        log::info!("{}", mode.describe());

        Ok(Response {
            use_local_development: Some(mode.use_local_development),
            use_alternate_host: Some(mode.use_alternate_host),
            message: Some(mode.describe().to_string()),
            ..Response::success()
        })
    }

    async fn apply_gift_card(&self) -> Result<Response> {
        let points = self.config.rewards.gift_card_points;
        self.storage.set_points(points).await?;
        log::info!("Gift card applied, balance now {}", points);
        Ok(Response {
            points: Some(points),
            ..Response::success()
        })
    }

    async fn clear_storage(&self) -> Result<Response> {
        self.storage.clear_all().await?;
        self.set_badge(Badge::Clear);
        self.host
            .broadcast(&Notification::WalletUpdate { address: None });
        log::info!("Storage cleared");
        Ok(Response {
            message: Some("Storage cleared".to_string()),
            ..Response::success()
        })
    }

    fn set_badge(&self, badge: Badge) {
        self.badge.set(badge);
        self.host.set_badge(badge);
    }
}

#[async_trait(?Send)]
impl<S: ConnectionStore, H: ExtensionHost> EventSink for BackgroundCoordinator<S, H> {
    async fn deliver(&self, event: ConnectionEvent) -> Response {
        self.dispatch(event).await
    }
}
