//! MCP tool implementations.
//!
//! This module contains all tools exposed by the appshell server.

pub mod cache;
pub mod fetch;
pub mod lifecycle;

pub use fetch::{FetchParams, fetch_impl};
pub use lifecycle::{OpenClientParams, activate_impl, install_impl, open_client_impl};
