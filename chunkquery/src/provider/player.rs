//! Player lookup via `/get_player_data`.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::http::AsyncHttpClient;
use super::types::{base_url, classify_body, FetchError, PlayerLocation};
use crate::coord::DEFAULT_WORLD;

#[derive(Debug, Deserialize)]
struct PlayerPayload {
    cx: i32,
    cz: i32,
    #[serde(default)]
    world: Option<String>,
}

/// Resolves a player name to the chunk they stand in.
pub struct PlayerLocator<C> {
    client: C,
    url: String,
}

impl<C: AsyncHttpClient> PlayerLocator<C> {
    pub fn new(client: C, api_server: &str) -> Self {
        Self {
            client,
            url: format!("{}/get_player_data", base_url(api_server)),
        }
    }

    /// Ask the server where `name` is.
    pub async fn locate(&self, name: &str) -> Result<PlayerLocation, FetchError> {
        let body = json!({ "name": name }).to_string();
        let response = self.client.post_json(&self.url, &body).await?;
        let payload: PlayerPayload = classify_body(&response)?;

        let location = PlayerLocation {
            name: name.to_string(),
            cx: payload.cx,
            cz: payload.cz,
            world: payload.world.unwrap_or_else(|| DEFAULT_WORLD.to_string()),
        };
        info!(
            player = name,
            cx = location.cx,
            cz = location.cz,
            world = %location.world,
            "Located player"
        );
        Ok(location)
    }
}
