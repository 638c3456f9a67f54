//! Store inspection MCP tools.
//!
//! Read-only views over the versioned stores; nothing here touches the
//! network or the agent's state.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
