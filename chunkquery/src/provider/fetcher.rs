//! Chunk download.

use std::future::Future;
use std::pin::Pin;

use serde_json::json;
use tracing::debug;

use super::http::AsyncHttpClient;
use super::types::{base_url, classify_body, FetchError};
use crate::chunk::ChunkRecord;
use crate::coord::ChunkKey;

/// Boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of chunk payloads.
///
/// The download workers hold one of these as `Arc<dyn ChunkFetcher>`; tests
/// substitute in-memory implementations.
pub trait ChunkFetcher: Send + Sync {
    /// Fetch one chunk. Exactly one request per call; retries are the
    /// caller's business.
    fn fetch<'a>(&'a self, key: &'a ChunkKey) -> BoxFuture<'a, Result<ChunkRecord, FetchError>>;
}

/// [`ChunkFetcher`] backed by the game server's `/get_chunk_data` endpoint.
pub struct HttpChunkFetcher<C> {
    client: C,
    url: String,
}

impl<C: AsyncHttpClient> HttpChunkFetcher<C> {
    /// Creates a fetcher for the API server at `api_server` (`host:port` or a URL).
    pub fn new(client: C, api_server: &str) -> Self {
        Self {
            client,
            url: format!("{}/get_chunk_data", base_url(api_server)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<C: AsyncHttpClient> ChunkFetcher for HttpChunkFetcher<C> {
    fn fetch<'a>(&'a self, key: &'a ChunkKey) -> BoxFuture<'a, Result<ChunkRecord, FetchError>> {
        Box::pin(async move {
            let body = json!({ "cx": key.cx, "cz": key.cz, "world": key.world }).to_string();
            let response = self.client.post_json(&self.url, &body).await?;
            debug!(chunk = %key, bytes = response.len(), "Chunk response received");
            classify_body(&response)
        })
    }
}
