pub mod http_server;
pub mod terminal_chat;

pub use http_server::{router, start_server, AppState};
