//! FiveM server integration.
//!
//! This module provides the HTTP client used by the presence monitor to poll
//! the game server for the list of online players and their jobs.

use crate::error::{ConcessError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoint serving the player snapshot.
pub const PLAYERS_ENDPOINT: &str = "/players.json";
/// Hard timeout on a snapshot fetch; past it the poll cycle is abandoned.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A player's job as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FivemJob {
    pub name: String,
    pub label: String,
    pub grade: u32,
}

/// One entry of the player snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FivemPlayer {
    pub id: String,
    pub name: String,
    pub job: FivemJob,
}

/// HTTP client for the FiveM server API.
pub struct FivemClient {
    client: reqwest::Client,
    base_url: String,
}

impl FivemClient {
    /// Create a client for the given base URL (e.g. `http://localhost:30120`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ConcessError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// Fetch the current player snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, timeout, non-2xx status or a
    /// malformed payload. Callers must treat any error as "no snapshot this
    /// tick" and leave their tracked state untouched.
    pub async fn fetch_snapshot(&self) -> Result<Vec<FivemPlayer>> {
        let url = format!("{}{}", self.base_url, PLAYERS_ENDPOINT);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ConcessError::Network(format!("Snapshot request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ConcessError::FivemApi(format!(
                "Server returned error: {}",
                resp.status()
            )));
        }

        resp.json::<Vec<FivemPlayer>>()
            .await
            .map_err(|e| ConcessError::FivemApi(format!("Invalid snapshot payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> &'static str {
        r#"[
            {"id": "steam:1", "name": "Jean", "job": {"name": "cardealer", "label": "Vendeur", "grade": 2}},
            {"id": "steam:2", "name": "Luc", "job": {"name": "police", "label": "Officier", "grade": 1}}
        ]"#
    }

    #[tokio::test]
    async fn test_fetch_snapshot_parses_players() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/players.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(sample_body())
            .create_async()
            .await;

        let client = FivemClient::new(server.url()).unwrap();
        let snapshot = client.fetch_snapshot().await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "steam:1");
        assert_eq!(snapshot[0].job.name, "cardealer");
        assert_eq!(snapshot[1].job.grade, 1);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_snapshot_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/players.json")
            .with_status(500)
            .create_async()
            .await;

        let client = FivemClient::new(server.url()).unwrap();
        let err = client.fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, ConcessError::FivemApi(_)));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_malformed_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/players.json")
            .with_status(200)
            .with_body("{\"this\": \"is not a player list\"}")
            .create_async()
            .await;

        let client = FivemClient::new(server.url()).unwrap();
        let err = client.fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, ConcessError::FivemApi(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client = FivemClient::new("http://localhost:30120/").unwrap();
        assert_eq!(client.base_url, "http://localhost:30120");
    }
}
