//! Serving cached images by request path
//!
//! Pure passthrough: no validation of formula content, no key derivation,
//! no toolchain work.

use crate::cache::CacheStore;
use crate::error::{TracMathError, TracMathResult};
use crate::render::ROUTE_PREFIX;

/// An image read from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub name: String,
    /// MIME type guessed from the file extension
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Entry name addressed by a request path such as `/tracmath/<name>`
///
/// The remainder after the route prefix must be exactly one segment.
pub fn entry_name(request_path: &str) -> TracMathResult<&str> {
    let rest = request_path
        .strip_prefix(ROUTE_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| TracMathError::NotFound(request_path.to_string()))?;

    if rest.is_empty() {
        return Err(TracMathError::NotFound(request_path.to_string()));
    }
    if rest.contains('/') {
        return Err(TracMathError::InvalidName(rest.to_string()));
    }
    Ok(rest)
}

/// Fetch the entry addressed by a request path
pub async fn fetch(store: &CacheStore, request_path: &str) -> TracMathResult<FetchedImage> {
    let name = entry_name(request_path)?;
    fetch_name(store, name).await
}

/// Fetch an entry by its bare file name
pub async fn fetch_name(store: &CacheStore, name: &str) -> TracMathResult<FetchedImage> {
    let bytes = store.read(name).await?;
    let content_type = mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(FetchedImage {
        name: name.to_string(),
        content_type,
        bytes,
    })
}
