/// Shared modules for the NexusCorr client
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod session;
pub mod store;
pub mod types;
pub mod validator;
pub mod websocket;
