//! Request key derivation.

use sha2::{Digest, Sha256};

use crate::http::Request;

/// Compute the storage key for a request: SHA-256 over method and URL.
///
/// The URL is expected to be fragment-free already (see [`Request::new`]).
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Storage key for an intercepted request.
pub fn request_key(request: &Request) -> String {
    compute_request_key(&request.method, request.url.as_str())
}
