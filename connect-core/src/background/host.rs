use std::rc::Rc;

use crate::protocol::Notification;

/// Extension icon overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Badge {
    #[default]
    Clear,
    /// Shown for a few seconds after install
    New,
    Connected,
}

impl Badge {
    pub fn text(&self) -> &'static str {
        match self {
            Badge::Clear => "",
            Badge::New => "NEW",
            Badge::Connected => "SOL",
        }
    }

    /// Background color, `None` when the badge is cleared.
    pub fn color(&self) -> Option<&'static str> {
        match self {
            Badge::Clear => None,
            Badge::New => Some("#9945FF"),
            Badge::Connected => Some("#14F195"),
        }
    }

    pub fn for_connection(connected: bool) -> Self {
        if connected {
            Badge::Connected
        } else {
            Badge::Clear
        }
    }
}

/// Browser surface the background worker drives.
///
/// All calls are fire-and-forget; an implementation logs its own failures.
pub trait ExtensionHost {
    fn set_badge(&self, badge: Badge);

    fn open_tab(&self, url: &str);

    /// Deliver to every open extension context (popup, pages).
    fn broadcast(&self, notification: &Notification);

    fn show_notification(&self, title: &str, message: &str);
}

impl<H: ExtensionHost + ?Sized> ExtensionHost for Rc<H> {
    fn set_badge(&self, badge: Badge) {
        (**self).set_badge(badge)
    }

    fn open_tab(&self, url: &str) {
        (**self).open_tab(url)
    }

    fn broadcast(&self, notification: &Notification) {
        (**self).broadcast(notification)
    }

    fn show_notification(&self, title: &str, message: &str) {
        (**self).show_notification(title, message)
    }
}
