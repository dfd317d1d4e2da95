mod connect_page;
mod popup;

pub use connect_page::ConnectPage;
pub use popup::Popup;
