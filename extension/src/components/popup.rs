use dioxus::prelude::*;
use solconnect_core::popup::{PopupController, PopupView};
use solconnect_core::protocol::{Notification, SourceFlag};
use solconnect_core::store::ConnectionStore;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use crate::icons;
use crate::services::chrome::{self, from_js};
use crate::services::{ChromeStore, RuntimeClient};

type Controller = PopupController<RuntimeClient, ChromeStore>;

#[component]
pub fn Popup() -> Element {
    let mut view = use_signal(PopupView::default);
    let mut busy = use_signal(|| false);
    let mut show_debug = use_signal(|| false);
    let mut debug_rows = use_signal(Vec::<(String, String)>::new);

    let controller = use_hook(|| Rc::new(PopupController::new(RuntimeClient, ChromeStore::new())));

    // Live updates while the popup is open
    {
        let controller = controller.clone();
        use_hook(move || subscribe(controller, view));
    }

    {
        let controller = controller.clone();
        use_effect(move || {
            let controller = controller.clone();
            spawn(async move {
                view.set(controller.open().await);
            });
        });
    }

    // Every button goes through the same busy/update cycle
    let run = {
        let controller = controller.clone();
        move |action: Action| {
            let controller = controller.clone();
            spawn(async move {
                busy.set(true);
                let next = match action {
                    Action::Connect => controller.connect().await,
                    Action::Disconnect => controller.disconnect().await,
                    Action::PerformAction => controller.perform_action().await,
                    Action::GiftCard => controller.apply_gift_card().await,
                    Action::Source(target) => controller.select_source(target).await,
                    Action::ClearStorage => controller.clear_storage().await,
                };
                view.set(next);
                if matches!(action, Action::ClearStorage) {
                    if let Ok(rows) = controller.debug_entries().await {
                        debug_rows.set(rows);
                    }
                }
                busy.set(false);
            });
        }
    };

    let refresh_debug = {
        let controller = controller.clone();
        move || {
            let controller = controller.clone();
            spawn(async move {
                match controller.debug_entries().await {
                    Ok(rows) => debug_rows.set(rows),
                    Err(e) => log::error!("Failed to read storage: {}", e),
                }
            });
        }
    };

    let current = view();
    let short = current.short_address().unwrap_or_default();
    let points = current.points;
    let mode = current.source_mode;
    let mode_text = mode.describe();
    let notice = current.notice.clone().map(|notice| {
        rsx! {
            NoticeBanner { text: notice.text, hint: notice.hint, is_error: notice.is_error }
        }
    });
    let active_source = if mode.use_local_development {
        Some(SourceFlag::LocalDevelopment)
    } else if mode.use_alternate_host {
        Some(SourceFlag::AlternateHost)
    } else {
        None
    };

    rsx! {
        div { class: "w-80 p-4 bg-white",
            // Header
            div { class: "flex items-center justify-between mb-4",
                h1 { class: "text-xl font-bold text-gray-900", "SolConnect" }
                button {
                    class: "text-gray-400 hover:text-gray-600",
                    onclick: {
                        let refresh_debug = refresh_debug.clone();
                        move |_| {
                            show_debug.set(!show_debug());
                            if show_debug() {
                                refresh_debug();
                            }
                        }
                    },
                    icons::Settings { class: Some("w-5 h-5".to_string()) }
                }
            }

            // Status card
            if current.connected {
                div { class: "bg-gradient-to-br from-purple-500 to-purple-700 rounded-lg p-4 text-white mb-4",
                    div { class: "flex items-center mb-2",
                        icons::CheckCircle { class: Some("w-4 h-4 mr-2".to_string()) }
                        span { class: "text-sm font-medium", "Wallet Connected" }
                    }
                    p { class: "font-mono text-sm opacity-90", "{short}" }
                    p { class: "mt-3 text-2xl font-bold", "{points} points" }
                }
            } else {
                div { class: "bg-gray-100 rounded-lg p-4 mb-4",
                    p { class: "text-sm text-gray-600", "No wallet connected" }
                    p { class: "mt-1 text-xs text-gray-500", "{points} points" }
                }
            }

            // Actions
            div { class: "space-y-2 mb-4",
                if current.connected {
                    button {
                        class: "w-full bg-purple-600 text-white py-2 px-4 rounded-lg hover:bg-purple-700 transition disabled:opacity-50",
                        disabled: busy(),
                        onclick: {
                            let run = run.clone();
                            move |_| run(Action::PerformAction)
                        },
                        "Take Action"
                    }
                    button {
                        class: "w-full bg-gray-200 text-gray-700 py-2 px-4 rounded-lg hover:bg-gray-300 transition disabled:opacity-50",
                        disabled: busy(),
                        onclick: {
                            let run = run.clone();
                            move |_| run(Action::Disconnect)
                        },
                        "Disconnect"
                    }
                } else {
                    button {
                        class: "w-full bg-purple-600 text-white py-2 px-4 rounded-lg hover:bg-purple-700 transition disabled:opacity-50",
                        disabled: busy(),
                        onclick: {
                            let run = run.clone();
                            move |_| run(Action::Connect)
                        },
                        "Connect Wallet"
                    }
                }
                button {
                    class: "w-full bg-green-600 text-white py-2 px-4 rounded-lg hover:bg-green-700 transition disabled:opacity-50",
                    disabled: busy(),
                    onclick: {
                        let run = run.clone();
                        move |_| run(Action::GiftCard)
                    },
                    "Apply Gift Card"
                }
            }

            {notice}

            // Connection page source
            div { class: "pt-4 border-t border-gray-200",
                p { class: "text-xs font-medium text-gray-500 uppercase mb-2", "Connection page" }
                div { class: "grid grid-cols-3 gap-2",
                    for (label , target) in [
                        ("Production", None),
                        ("GitHub", Some(SourceFlag::AlternateHost)),
                        ("Local", Some(SourceFlag::LocalDevelopment)),
                    ] {
                        button {
                            key: "{label}",
                            class: source_button_class(active_source == target),
                            disabled: busy(),
                            onclick: {
                                let run = run.clone();
                                move |_| run(Action::Source(target))
                            },
                            "{label}"
                        }
                    }
                }
                p { class: "mt-2 text-xs text-gray-500", "{mode_text}" }
            }

            if show_debug() {
                div { class: "mt-4 pt-4 border-t border-gray-200",
                    div { class: "flex items-center justify-between mb-2",
                        p { class: "text-xs font-medium text-gray-500 uppercase", "Storage" }
                        button {
                            class: "text-xs text-red-600 hover:text-red-700",
                            disabled: busy(),
                            onclick: {
                                let run = run.clone();
                                move |_| run(Action::ClearStorage)
                            },
                            "Clear Storage"
                        }
                    }
                    if debug_rows.read().is_empty() {
                        p { class: "text-xs text-gray-400", "Storage is empty" }
                    }
                    for (key , value) in debug_rows() {
                        div { key: "{key}", class: "flex justify-between text-xs font-mono py-0.5",
                            span { class: "text-gray-500", "{key}" }
                            span { class: "text-gray-900 truncate ml-2", "{value}" }
                        }
                    }
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Action {
    Connect,
    Disconnect,
    PerformAction,
    GiftCard,
    Source(Option<SourceFlag>),
    ClearStorage,
}

fn source_button_class(active: bool) -> &'static str {
    if active {
        "py-1 text-xs rounded bg-purple-600 text-white"
    } else {
        "py-1 text-xs rounded bg-gray-100 text-gray-700 hover:bg-gray-200"
    }
}

#[component]
fn NoticeBanner(text: String, hint: Option<String>, is_error: bool) -> Element {
    let (box_class, text_class) = if is_error {
        ("bg-red-50 border-red-200", "text-red-800")
    } else {
        ("bg-blue-50 border-blue-200", "text-blue-800")
    };

    rsx! {
        div { class: "mb-4 border rounded-lg p-3 {box_class}",
            div { class: "flex items-start",
                if is_error {
                    icons::AlertCircle { class: Some("w-4 h-4 text-red-600 mr-2 mt-0.5".to_string()) }
                } else {
                    icons::Lightbulb { class: Some("w-4 h-4 text-blue-600 mr-2 mt-0.5".to_string()) }
                }
                div {
                    p { class: "text-xs {text_class}", "{text}" }
                    {hint.map(|hint| rsx! { p { class: "mt-1 text-xs text-gray-500", "{hint}" } })}
                }
            }
        }
    }
}

/// Background broadcasts and storage writes from other contexts both land
/// in the controller, then in the signal.
fn subscribe(controller: Rc<Controller>, view: Signal<PopupView>) {
    let on_message = {
        let controller = controller.clone();
        Closure::wrap(Box::new(move |message: JsValue| {
            let Ok(notification) = from_js::<Notification>(message) else {
                return;
            };
            controller.on_notification(&notification);
            let mut view = view;
            view.set(controller.view());
        }) as Box<dyn FnMut(JsValue)>)
    };
    chrome::on_runtime_message(&on_message);
    on_message.forget();

    let store = ChromeStore::new();
    store.on_change(Box::new(move |change| {
        controller.on_storage_change(change);
        let mut view = view;
        view.set(controller.view());
    }));
}
