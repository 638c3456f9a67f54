//! Unified error types for appshell.
//!
//! Each variant carries a stable code prefix in its message and maps onto
//! a JSON-RPC error code for the MCP host surface.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the appshell agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// A pinned asset could not be fetched during install.
    #[error("POPULATION_FAILED: {0}")]
    PopulationFailed(String),

    /// Network transport failed while routing a request.
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(String),

    /// A stale store could not be deleted during activation.
    #[error("STORE_DELETION_FAILED: {0}")]
    StoreDeletionFailed(String),

    /// Lifecycle event delivered in the wrong state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// Activation held back by clients still open under a previous version.
    #[error("WAITING_FOR_CLIENTS: {0} open client(s)")]
    WaitingForClients(usize),

    /// No entry stored for the given request key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored data could not be encoded or decoded.
    #[error("CACHE_ERROR: serialization failed: {0}")]
    Serialization(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::PopulationFailed(msg) => (-32020, msg.clone()),
            Error::NetworkFailure(msg) => (-32021, msg.clone()),
            Error::StoreDeletionFailed(msg) => (-32022, msg.clone()),
            Error::InvalidState(msg) => (-32023, msg.clone()),
            Error::WaitingForClients(_) => (-32024, err.to_string()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Serialization(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
