use dioxus::prelude::*;
use solconnect_core::adapter::{ProviderDetection, ProviderKind, WalletAdapter};
use solconnect_core::page::{ConnectionPage, Delivery, PageStatus};
use std::rc::Rc;

use crate::icons;
use crate::services::{BrowserPage, BrowserProviders};

const SIGN_TEXT: &str = "Hello from SolConnect!";

type Page = ConnectionPage<BrowserProviders, BrowserPage>;

/// Everything `PageStatus` can say, split into what the page shows at once.
#[derive(Clone, Debug, Default, PartialEq)]
struct PageView {
    detection: Option<ProviderDetection>,
    connected: Option<(String, String, ProviderKind)>,
    signature: Option<String>,
    line: Option<StatusLine>,
}

#[derive(Clone, Debug, PartialEq)]
struct StatusLine {
    text: String,
    suggestion: Option<String>,
    tone: Tone,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Tone {
    Info,
    Warning,
    Error,
}

impl PageView {
    fn apply(&mut self, status: PageStatus) {
        match status {
            PageStatus::Info(text) => self.line = Some(StatusLine::new(text, Tone::Info)),
            PageStatus::Warning(text) => self.line = Some(StatusLine::new(text, Tone::Warning)),
            PageStatus::Error { message, suggestion } => {
                self.line = Some(StatusLine {
                    text: message,
                    suggestion,
                    tone: Tone::Error,
                })
            }
            PageStatus::Connected { short, full, provider } => {
                self.line = Some(StatusLine::new(
                    format!("Connected to {}", provider.name()),
                    Tone::Info,
                ));
                self.connected = Some((short, full, provider));
                self.signature = None;
            }
            PageStatus::Signed { signature } => self.signature = Some(signature),
            PageStatus::Disconnected => {
                self.connected = None;
                self.signature = None;
                self.line = Some(StatusLine::new("Wallet disconnected".to_string(), Tone::Info));
            }
            PageStatus::Availability(detection) => self.detection = Some(detection),
        }
    }
}

impl StatusLine {
    fn new(text: String, tone: Tone) -> Self {
        Self {
            text,
            suggestion: None,
            tone,
        }
    }
}

#[component]
pub fn ConnectPage() -> Element {
    let view = use_signal(PageView::default);
    let mut busy = use_signal(|| false);

    let page: Rc<Page> = use_hook(move || {
        let config = crate::extension_config();
        let on_render: Rc<dyn Fn(PageStatus)> = Rc::new(move |status| {
            let mut view = view;
            view.write().apply(status);
        });
        Rc::new(ConnectionPage::new(
            WalletAdapter::new(BrowserProviders),
            BrowserPage::new(&config, on_render),
        ))
    });

    {
        let page = page.clone();
        use_effect(move || {
            page.initialize();
        });
    }

    let connect = {
        let page = page.clone();
        move |preferred: ProviderKind| {
            let page = page.clone();
            spawn(async move {
                busy.set(true);
                match page.connect(Some(preferred)).await {
                    Ok(Delivery::Direct(response)) => {
                        log::info!("Extension answered {:?}", response.status)
                    }
                    Ok(Delivery::Bridged { stored, posted }) => {
                        log::info!("Handed off via page fallbacks (stored: {}, posted: {})", stored, posted)
                    }
                    // Already rendered by the controller
                    Err(_) => {}
                }
                busy.set(false);
            });
        }
    };

    let sign = {
        let page = page.clone();
        move |_: MouseEvent| {
            let page = page.clone();
            spawn(async move {
                busy.set(true);
                let _ = page.sign_message(SIGN_TEXT).await;
                busy.set(false);
            });
        }
    };

    let disconnect = {
        let page = page.clone();
        move |_: MouseEvent| {
            let page = page.clone();
            spawn(async move {
                let _ = page.disconnect().await;
            });
        }
    };

    let current = view();
    let detection = current.detection.unwrap_or_default();
    let status = current.line.clone().map(|line| rsx! { StatusRegion { line } });
    let connected = current.connected.is_some();
    let signature_panel = current.signature.clone().map(|signature| {
        rsx! {
            div { class: "mt-6",
                p { class: "text-sm font-medium text-gray-500 mb-1", "Signature" }
                p { class: "font-mono text-xs text-gray-900 break-all bg-gray-50 rounded p-2",
                    "{signature}"
                }
            }
        }
    });
    let connected_panel = current.connected.clone().map(|(short, full, provider)| {
        let name = provider.name();
        rsx! {
            div { class: "bg-gradient-to-br from-purple-500 to-purple-700 rounded-lg p-6 text-white mb-6",
                div { class: "flex items-center mb-2",
                    icons::CheckCircle { class: Some("w-5 h-5 mr-2".to_string()) }
                    span { class: "font-medium", "{name} connected" }
                }
                p { class: "font-mono text-lg", title: "{full}", "{short}" }
            }

            div { class: "grid grid-cols-2 gap-4",
                button {
                    class: "bg-purple-600 text-white py-3 px-4 rounded-lg hover:bg-purple-700 transition disabled:opacity-50",
                    disabled: busy(),
                    onclick: sign,
                    "Sign Message"
                }
                button {
                    class: "bg-gray-100 text-gray-700 py-3 px-4 rounded-lg hover:bg-gray-200 transition",
                    onclick: disconnect,
                    "Disconnect"
                }
            }

            {signature_panel}
        }
    });

    rsx! {
        div { class: "min-h-screen bg-gray-50 p-4",
            div { class: "max-w-md mx-auto mt-20 p-8 bg-white rounded-lg shadow-lg",
                div { class: "text-center mb-8",
                    h1 { class: "text-3xl font-bold text-gray-900 mb-2", "Connect your wallet" }
                    p { class: "text-gray-600", "Link a Solana wallet to the SolConnect extension" }
                }

                if connected {
                    {connected_panel}
                } else {
                    div { class: "space-y-4",
                        for (kind , present) in [
                            (ProviderKind::Phantom, detection.phantom_present),
                            (ProviderKind::Solflare, detection.solflare_present),
                        ] {
                            WalletButton {
                                key: "{kind.name()}",
                                kind,
                                present,
                                busy: busy(),
                                on_connect: {
                                    let connect = connect.clone();
                                    move |kind| connect(kind)
                                },
                            }
                        }
                    }
                }

                {status}
            }
        }
    }
}

#[component]
fn WalletButton(
    kind: ProviderKind,
    present: bool,
    busy: bool,
    on_connect: EventHandler<ProviderKind>,
) -> Element {
    let name = kind.name();
    let install_url = kind.install_url();

    rsx! {
        div {
            button {
                class: "w-full bg-purple-600 text-white py-3 px-4 rounded-lg hover:bg-purple-700 transition disabled:opacity-50 disabled:cursor-not-allowed",
                disabled: busy,
                onclick: move |_| on_connect.call(kind),
                "Connect {name}"
            }
            if !present {
                p { class: "mt-1 text-xs text-gray-500",
                    "{name} not detected. "
                    a { class: "text-purple-600 underline", href: "{install_url}", target: "_blank", "Install" }
                }
            }
        }
    }
}

#[component]
fn StatusRegion(line: StatusLine) -> Element {
    let (box_class, text_class) = match line.tone {
        Tone::Info => ("bg-blue-50 border-blue-200", "text-blue-800"),
        Tone::Warning => ("bg-yellow-50 border-yellow-200", "text-yellow-800"),
        Tone::Error => ("bg-red-50 border-red-200", "text-red-800"),
    };
    let text = line.text.clone();
    let hint = line
        .suggestion
        .clone()
        .map(|hint| rsx! { p { class: "mt-1 text-xs text-gray-600", "{hint}" } });

    rsx! {
        div { class: "mt-6 border rounded-lg p-4 {box_class}",
            div { class: "flex items-start",
                icons::AlertCircle { class: Some(format!("w-4 h-4 mr-2 mt-0.5 {}", text_class)) }
                div {
                    p { class: "text-sm {text_class}", "{text}" }
                    {hint}
                }
            }
        }
    }
}
