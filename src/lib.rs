//! A small HTTP service that answers `GET /sleep?seconds=N` after waiting
//! `N` seconds, and records every such request in an append-only log file.

pub mod client_addr;
pub mod config;
pub mod health;
pub mod json_body;
pub mod logger;
pub mod server;
pub mod sleep;
pub mod timing;

pub use config::{Config, ConfigError};
pub use logger::SleepLog;
pub use server::{router, AppState, ServerHandle, SleepServer};
pub use timing::RequestTimingLayer;
