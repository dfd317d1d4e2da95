pub mod chrome;
pub mod local;
pub mod messaging;
pub mod page;
pub mod provider;
pub mod storage;
pub mod timer;

pub use local::LocalStore;
pub use messaging::{ChromeHost, RuntimeClient, RuntimeForwarder};
pub use page::BrowserPage;
pub use provider::BrowserProviders;
pub use storage::ChromeStore;
pub use timer::GlooTimer;
