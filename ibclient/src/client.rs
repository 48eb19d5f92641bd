//! HTTP client for the InfoBerry server API

use crate::error::{Error, Result};
use ibengine::{PlayerSettings, Registration, SerialRequest, SnapshotRecord};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Default InfoBerry server base URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Default timeout for API requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("infoberry/", env!("CARGO_PKG_VERSION"));

/// InfoBerry HTTP client
///
/// Wraps the player-facing routes of the server: registration, snapshot
/// retrieval and liveness ping.
///
/// # Example
///
/// ```no_run
/// use ibclient::InfoBerryClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = InfoBerryClient::builder()
///         .server_url("http://infoberry.local:5000")
///         .build()?;
///     let snapshot = client.snapshot("00000000d1ab3c4e").await?;
///     println!("{} media for {}", snapshot.media.len(), snapshot.player.name);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct InfoBerryClient {
    client: Client,
    server_url: String,
}

impl InfoBerryClient {
    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client with a custom reqwest::Client
    pub fn with_client(client: Client, server_url: impl Into<String>) -> Self {
        Self {
            client,
            server_url: normalize_base(server_url.into()),
        }
    }

    /// Base URL of the server, without trailing slash
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.server_url, route)
    }

    /// Register this player on the server
    ///
    /// The server answers 201 both for a new player and for an already
    /// known serial; any other status is an error.
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        debug!(serial = %registration.serial, "Registering player");
        let response = self
            .client
            .post(self.url("/register"))
            .json(registration)
            .send()
            .await?;

        if response.status() == StatusCode::CREATED {
            return Ok(());
        }
        Err(status_error(response).await)
    }

    /// Fetch the player row and its ordered media rows
    pub async fn snapshot(&self, serial: &str) -> Result<SnapshotRecord> {
        let response = self.get_for_serial("/snapshot", serial).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch only the playlist URLs
    pub async fn playlist(&self, serial: &str) -> Result<Vec<String>> {
        let response = self.get_for_serial("/playlist", serial).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch only the schedule settings
    pub async fn settings(&self, serial: &str) -> Result<PlayerSettings> {
        let response = self.get_for_serial("/settings", serial).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Tell the server this player is alive
    pub async fn ping(&self, serial: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/ping"))
            .json(&SerialRequest {
                serial: serial.to_string(),
            })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::NotRegistered(serial.to_string())),
            _ => Err(status_error(response).await),
        }
    }

    async fn get_for_serial(&self, route: &str, serial: &str) -> Result<Response> {
        let response = self
            .client
            .get(self.url(route))
            .query(&[("serial", serial)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::NOT_FOUND => Err(Error::NotRegistered(serial.to_string())),
            _ => Err(status_error(response).await),
        }
    }
}

async fn status_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::Status { status, body }
}

fn normalize_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Builder for [`InfoBerryClient`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    client: Option<Client>,
    server_url: String,
    request_timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client (timeout and user agent are then ignored)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<InfoBerryClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.request_timeout)
                .build()?,
        };

        Ok(InfoBerryClient {
            client,
            server_url: normalize_base(self.server_url),
        })
    }
}
