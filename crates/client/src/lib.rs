//! Network transport for appshell.
//!
//! This crate provides the `Network` abstraction the router fetches
//! through, its reqwest implementation, and URL resolution helpers.

pub mod fetch;

pub use fetch::{
    FetchConfig, HttpNetwork, Network, NetworkError, UrlError, classify_response_type, is_same_origin, resolve,
};
