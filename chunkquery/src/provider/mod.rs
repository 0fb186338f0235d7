//! Game server access.
//!
//! Everything that talks to the game server's HTTP API lives here:
//!
//! - [`ChunkFetcher`]: one request per chunk, classified into [`FetchError`]
//! - [`PlayerLocator`]: where a named player currently stands
//! - [`AsyncHttpClient`]: the transport seam, with [`AsyncReqwestClient`] as
//!   the production implementation
//!
//! Both request kinds POST a small JSON body and read a JSON object back.
//! The HTTP status is not inspected; an object carrying an `error` field is a
//! server-reported failure whatever status it was served with.

mod fetcher;
mod http;
mod player;
mod types;

pub use fetcher::{BoxFuture, ChunkFetcher, HttpChunkFetcher};
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use player::PlayerLocator;
pub use types::{base_url, FetchError, PlayerLocation, DEFAULT_API_SERVER};

#[cfg(test)]
pub(crate) use http::tests::MockAsyncHttpClient;
