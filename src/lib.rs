// Public API for integration tests and potential library usage

pub mod api;
pub mod broadcast;
pub mod config;
pub mod content;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod store;
pub mod types;
pub mod ws;
