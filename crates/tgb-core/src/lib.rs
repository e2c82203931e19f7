//! Core of a minimal Telegram Bot API polling client.
//!
//! This crate is transport-agnostic: HTTP lives behind the `BotApi` port
//! implemented in `tgb-http`.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod message;
pub mod ports;
pub mod session;

pub use errors::{Error, Result};
