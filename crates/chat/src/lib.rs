pub mod args;
pub mod client;
pub mod commands;
pub mod error;
pub mod export;
pub mod prelude;
pub mod render;
pub mod repl;
pub mod session;
pub mod turn;

pub use client::RelayClient;
pub use session::Session;
