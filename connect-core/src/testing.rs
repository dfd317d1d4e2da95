// In-memory fakes for the browser surfaces

use async_trait::async_trait;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

use crate::adapter::{ProviderCallback, ProviderEnvironment, ProviderEvent, ProviderKind, WalletProvider};
use crate::background::{Badge, BackgroundCoordinator, ExtensionHost};
use crate::bridge::{EventSink, Timer};
use crate::content::{ContentScript, PageDom};
use crate::error::{Result, StoreError, WalletError};
use crate::page::{PageHost, PageStatus};
use crate::popup::PopupHost;
use crate::protocol::{
    Channel, ConnectionEvent, ContentRequest, ContentResponse, Notification, Request, Response,
    WalletInjection, WindowMessage,
};
use crate::store::{ChangeListener, ConnectionStore, MemoryStore, StorageMap};

pub struct ScriptedProvider {
    kind: ProviderKind,
    connect_result: std::result::Result<String, String>,
    signature: RefCell<Vec<u8>>,
    last_signed: RefCell<Option<Vec<u8>>>,
    calls: RefCell<Vec<&'static str>>,
    listeners: RefCell<Vec<(ProviderEvent, ProviderCallback)>>,
}

impl ScriptedProvider {
    fn build(kind: ProviderKind, connect_result: std::result::Result<String, String>) -> Rc<Self> {
        Rc::new(Self {
            kind,
            connect_result,
            signature: RefCell::new(vec![0u8; 64]),
            last_signed: RefCell::new(None),
            calls: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
        })
    }

    pub fn phantom(address: &str) -> Rc<Self> {
        Self::build(ProviderKind::Phantom, Ok(address.to_string()))
    }

    pub fn solflare(address: &str) -> Rc<Self> {
        Self::build(ProviderKind::Solflare, Ok(address.to_string()))
    }

    pub fn rejecting(kind: ProviderKind, message: &str) -> Rc<Self> {
        Self::build(kind, Err(message.to_string()))
    }

    pub fn set_signature(&self, signature: Vec<u8>) {
        *self.signature.borrow_mut() = signature;
    }

    pub fn last_signed(&self) -> Option<Vec<u8>> {
        self.last_signed.borrow().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Fire a native provider event.
    pub fn emit(&self, event: ProviderEvent, address: Option<String>) {
        let callbacks: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(address.clone());
        }
    }
}

#[async_trait(?Send)]
impl WalletProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn supports_account_change_events(&self) -> bool {
        self.kind == ProviderKind::Phantom
    }

    async fn connect(&self) -> std::result::Result<String, String> {
        self.calls.borrow_mut().push("connect");
        self.connect_result.clone()
    }

    async fn disconnect(&self) -> std::result::Result<(), String> {
        self.calls.borrow_mut().push("disconnect");
        Ok(())
    }

    async fn sign_message(&self, message: &[u8]) -> std::result::Result<Vec<u8>, String> {
        self.calls.borrow_mut().push("sign");
        *self.last_signed.borrow_mut() = Some(message.to_vec());
        Ok(self.signature.borrow().clone())
    }

    fn on(&self, event: ProviderEvent, callback: ProviderCallback) {
        self.listeners.borrow_mut().push((event, callback));
    }
}

#[derive(Default)]
pub struct FakeEnvironment {
    phantom: Option<Rc<ScriptedProvider>>,
    solflare: Option<Rc<ScriptedProvider>>,
}

impl FakeEnvironment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(phantom: Option<Rc<ScriptedProvider>>, solflare: Option<Rc<ScriptedProvider>>) -> Self {
        Self { phantom, solflare }
    }

    pub fn both(phantom: &str, solflare: &str) -> Self {
        Self::with(
            Some(ScriptedProvider::phantom(phantom)),
            Some(ScriptedProvider::solflare(solflare)),
        )
    }

    pub fn solflare_only(address: &str) -> Self {
        Self::with(None, Some(ScriptedProvider::solflare(address)))
    }
}

impl ProviderEnvironment for FakeEnvironment {
    fn phantom(&self) -> Option<Rc<dyn WalletProvider>> {
        self.phantom
            .clone()
            .map(|p| p as Rc<dyn WalletProvider>)
    }

    fn solflare(&self) -> Option<Rc<dyn WalletProvider>> {
        self.solflare
            .clone()
            .map(|p| p as Rc<dyn WalletProvider>)
    }
}

#[derive(Default)]
pub struct RecordingHost {
    badges: RefCell<Vec<Badge>>,
    tabs: RefCell<Vec<String>>,
    broadcasts: RefCell<Vec<Notification>>,
    notifications: RefCell<Vec<(String, String)>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn badges(&self) -> Vec<Badge> {
        self.badges.borrow().clone()
    }

    pub fn tabs(&self) -> Vec<String> {
        self.tabs.borrow().clone()
    }

    pub fn broadcasts(&self) -> Vec<Notification> {
        self.broadcasts.borrow().clone()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.borrow().clone()
    }
}

impl ExtensionHost for RecordingHost {
    fn set_badge(&self, badge: Badge) {
        self.badges.borrow_mut().push(badge);
    }

    fn open_tab(&self, url: &str) {
        self.tabs.borrow_mut().push(url.to_string());
    }

    fn broadcast(&self, notification: &Notification) {
        self.broadcasts.borrow_mut().push(notification.clone());
    }

    fn show_notification(&self, title: &str, message: &str) {
        self.notifications
            .borrow_mut()
            .push((title.to_string(), message.to_string()));
    }
}

/// Real tokio sleep; pair with `start_paused = true`.
pub struct TokioTimer;

#[async_trait(?Send)]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: RefCell<Vec<ConnectionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.borrow().clone()
    }
}

#[async_trait(?Send)]
impl EventSink for RecordingSink {
    async fn deliver(&self, event: ConnectionEvent) -> Response {
        self.events.borrow_mut().push(event);
        Response::success()
    }
}

/// Memory store that timestamps every read and can plant a value on the
/// n-th read.
#[derive(Default)]
pub struct ReadLogStore {
    inner: MemoryStore,
    reads: RefCell<Vec<Instant>>,
    planted: RefCell<Option<(usize, String, Value)>>,
}

impl ReadLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn reads(&self) -> Vec<Instant> {
        self.reads.borrow().clone()
    }

    pub fn inject_on_read(&self, read: usize, key: &str, value: Value) {
        *self.planted.borrow_mut() = Some((read, key.to_string(), value));
    }
}

#[async_trait(?Send)]
impl ConnectionStore for ReadLogStore {
    async fn get(&self, keys: &[&str]) -> std::result::Result<StorageMap, StoreError> {
        let read = {
            let mut reads = self.reads.borrow_mut();
            reads.push(Instant::now());
            reads.len() - 1
        };
        let due = match self.planted.borrow().as_ref() {
            Some((at, _, _)) => *at == read,
            None => false,
        };
        if due {
            if let Some((_, key, value)) = self.planted.borrow_mut().take() {
                let mut items = StorageMap::new();
                items.insert(key, value);
                self.inner.set(items).await?;
            }
        }
        self.inner.get(keys).await
    }

    async fn get_all(&self) -> std::result::Result<StorageMap, StoreError> {
        self.inner.get_all().await
    }

    async fn set(&self, items: StorageMap) -> std::result::Result<(), StoreError> {
        self.inner.set(items).await
    }

    async fn remove(&self, keys: &[&str]) -> std::result::Result<(), StoreError> {
        self.inner.remove(keys).await
    }

    async fn clear(&self) -> std::result::Result<(), StoreError> {
        self.inner.clear().await
    }

    fn on_change(&self, listener: ChangeListener) {
        self.inner.on_change(listener)
    }
}

/// Gives up the executor before every operation, so events driven
/// together with `tokio::join!` interleave at each storage call.
#[derive(Default)]
pub struct YieldingStore {
    inner: MemoryStore,
}

impl YieldingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait(?Send)]
impl ConnectionStore for YieldingStore {
    async fn get(&self, keys: &[&str]) -> std::result::Result<StorageMap, StoreError> {
        tokio::task::yield_now().await;
        self.inner.get(keys).await
    }

    async fn get_all(&self) -> std::result::Result<StorageMap, StoreError> {
        tokio::task::yield_now().await;
        self.inner.get_all().await
    }

    async fn set(&self, items: StorageMap) -> std::result::Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.set(items).await
    }

    async fn remove(&self, keys: &[&str]) -> std::result::Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.remove(keys).await
    }

    async fn clear(&self) -> std::result::Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.clear().await
    }

    fn on_change(&self, listener: ChangeListener) {
        self.inner.on_change(listener)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PageTrace {
    Render(PageStatus),
    Send(Request),
    Pending(String),
    Post(WindowMessage),
}

pub struct RecordingPageHost {
    runtime_id: Option<String>,
    secure: bool,
    hostname: String,
    receiver: bool,
    local_storage: bool,
    trace: RefCell<Vec<PageTrace>>,
}

impl RecordingPageHost {
    pub fn in_extension(runtime_id: &str) -> Self {
        Self {
            runtime_id: Some(runtime_id.to_string()),
            hostname: runtime_id.to_string(),
            ..Self::external()
        }
    }

    pub fn external() -> Self {
        Self {
            runtime_id: None,
            secure: true,
            hostname: "hoepeyemi.github.io".to_string(),
            receiver: true,
            local_storage: true,
            trace: RefCell::new(Vec::new()),
        }
    }

    pub fn insecure(self, hostname: &str) -> Self {
        Self {
            secure: false,
            hostname: hostname.to_string(),
            ..self
        }
    }

    /// Messaging API present but no background listening.
    pub fn without_receiver(self) -> Self {
        Self {
            receiver: false,
            ..self
        }
    }

    pub fn without_local_storage(self) -> Self {
        Self {
            local_storage: false,
            ..self
        }
    }

    pub fn trace(&self) -> Vec<PageTrace> {
        self.trace.borrow().clone()
    }

    pub fn rendered(&self) -> Vec<PageStatus> {
        self.trace()
            .into_iter()
            .filter_map(|t| match t {
                PageTrace::Render(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<Request> {
        self.trace()
            .into_iter()
            .filter_map(|t| match t {
                PageTrace::Send(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn pending(&self) -> Vec<String> {
        self.trace()
            .into_iter()
            .filter_map(|t| match t {
                PageTrace::Pending(address) => Some(address),
                _ => None,
            })
            .collect()
    }

    pub fn posted(&self) -> Vec<WindowMessage> {
        self.trace()
            .into_iter()
            .filter_map(|t| match t {
                PageTrace::Post(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

#[async_trait(?Send)]
impl PageHost for RecordingPageHost {
    fn runtime_id(&self) -> Option<String> {
        self.runtime_id.clone()
    }

    fn is_secure_context(&self) -> bool {
        self.secure
    }

    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    async fn send_to_extension(&self, request: &Request) -> Result<Response> {
        if !self.receiver {
            return Err(WalletError::TransportUnavailable(
                "Could not establish connection. Receiving end does not exist.".to_string(),
            ));
        }
        self.trace.borrow_mut().push(PageTrace::Send(request.clone()));
        Ok(Response::success())
    }

    async fn write_pending_address(&self, address: &str) -> Result<()> {
        if !self.local_storage {
            return Err(StoreError::Backend("localStorage is disabled".to_string()).into());
        }
        self.trace
            .borrow_mut()
            .push(PageTrace::Pending(address.to_string()));
        Ok(())
    }

    fn post_window_message(&self, message: &WindowMessage) -> Result<()> {
        self.trace.borrow_mut().push(PageTrace::Post(message.clone()));
        Ok(())
    }

    fn render(&self, status: PageStatus) {
        self.trace.borrow_mut().push(PageTrace::Render(status));
    }
}

#[derive(Default)]
pub struct RecordingDom {
    title: String,
    notifications: RefCell<Vec<(String, String)>>,
    events: RefCell<Vec<(String, WalletInjection)>>,
    connect_answers: RefCell<usize>,
}

impl RecordingDom {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.borrow().clone()
    }

    pub fn events(&self) -> Vec<(String, WalletInjection)> {
        self.events.borrow().clone()
    }

    pub fn connect_answers(&self) -> usize {
        *self.connect_answers.borrow()
    }
}

impl PageDom for RecordingDom {
    fn page_title(&self) -> String {
        self.title.clone()
    }

    fn show_notification(&self, title: &str, detail: &str) {
        self.notifications
            .borrow_mut()
            .push((title.to_string(), detail.to_string()));
    }

    fn dispatch_event(&self, name: &str, detail: &WalletInjection) {
        self.events
            .borrow_mut()
            .push((name.to_string(), detail.clone()));
    }

    fn answer_connect_requests(&self, _detail: &WalletInjection) {
        *self.connect_answers.borrow_mut() += 1;
    }
}

/// Popup host wired straight to a coordinator and a content script, the
/// way chrome.runtime and chrome.tabs would route the messages.
pub struct LoopbackPopupHost<S, H> {
    coordinator: Rc<BackgroundCoordinator<S, H>>,
    content: ContentScript<RecordingDom>,
}

impl<S, H> LoopbackPopupHost<S, H> {
    pub fn new(coordinator: Rc<BackgroundCoordinator<S, H>>) -> Self {
        Self {
            coordinator,
            content: ContentScript::new(RecordingDom::titled("Active Tab")),
        }
    }
}

#[async_trait(?Send)]
impl<S: ConnectionStore, H: ExtensionHost> PopupHost for LoopbackPopupHost<S, H> {
    async fn send(&self, request: &Request) -> Result<Response> {
        Ok(self
            .coordinator
            .handle_request(request.clone(), Channel::Direct)
            .await)
    }

    async fn send_to_active_tab(&self, request: &ContentRequest) -> Result<ContentResponse> {
        Ok(self.content.handle(request.clone()))
    }
}
