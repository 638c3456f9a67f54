//! Core types and shared functionality for appshell.
//!
//! This crate provides:
//! - Versioned response stores with SQLite backend
//! - Request/response descriptors
//! - Unified error types
//! - Deployment configuration

pub mod config;
pub mod error;
pub mod http;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, Response, ResponseType};
pub use store::{CacheStorage, StoreDb, StoredEntry};
