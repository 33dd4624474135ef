use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::light::{LightState, LightUpdate, Metadata, ResourceRef};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("no lights found in room '{0}'")]
    NoLightsInRoom(String),
    #[error("light '{0}' not found")]
    LightNotFound(String),
}

impl BridgeError {
    /// Configuration problems that retrying cannot fix
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::RoomNotFound(_) | BridgeError::NoLightsInRoom(_)
        )
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BridgeError::Timeout
        } else if e.is_decode() {
            BridgeError::Decode(e.to_string())
        } else {
            BridgeError::Request(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Decode(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub services: Vec<ResourceRef>,
}

impl Device {
    /// Id of the device's light service, if it has one
    pub fn light_service(&self) -> Option<&str> {
        self.services
            .iter()
            .find(|s| s.rtype == "light")
            .map(|s| s.rid.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub children: Vec<ResourceRef>,
}

/// One envelope from the event stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Vec<LightUpdate>,
}

impl Event {
    pub fn is_update(&self) -> bool {
        self.event_type == "update"
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// The parts of the bridge API the sync loop consumes
#[async_trait]
pub trait BridgeApi: Send + Sync {
    async fn devices(&self) -> Result<Vec<Device>, BridgeError>;

    async fn rooms(&self) -> Result<Vec<Room>, BridgeError>;

    async fn light(&self, light_id: &str) -> Result<LightState, BridgeError>;

    /// Wait up to `timeout` for the next batch of events. An expired wait
    /// is reported as `BridgeError::Timeout`.
    async fn events(&self, timeout: Duration) -> Result<Vec<Event>, BridgeError>;
}

/// Parse an event stream body. The bridge answers either with a JSON array
/// or with server-sent-event text whose `data:` lines hold JSON arrays.
pub fn parse_event_body(body: &str) -> Result<Vec<Event>, BridgeError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut events = Vec::new();
    for line in trimmed.lines() {
        if let Some(data) = line.strip_prefix("data:") {
            let batch: Vec<Event> = serde_json::from_str(data.trim())?;
            events.extend(batch);
        }
    }
    Ok(events)
}

/// HTTPS client for a Hue bridge's CLIP v2 API
pub struct HueClient {
    base_url: String,
    http: reqwest::Client,
}

impl HueClient {
    pub fn new(ip: &str, username: &str) -> Result<Self, BridgeError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let key = reqwest::header::HeaderValue::from_str(username)
            .map_err(|e| BridgeError::Request(format!("invalid application key: {}", e)))?;
        headers.insert("hue-application-key", key);

        // Bridges serve a self-signed certificate
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            base_url: format!("https://{}", ip),
            http,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, BridgeError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?
            .error_for_status()?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    /// One long-poll of the event endpoint. A bridge that streams instead
    /// keeps the body open, so every complete server-sent-event block is
    /// parsed as it arrives and the first one carrying events is returned.
    async fn read_events(&self) -> Result<Vec<Event>, BridgeError> {
        let mut response = self
            .http
            .get(format!("{}/eventstream/clip/v2", self.base_url))
            .send()
            .await?
            .error_for_status()?;

        let mut body: Vec<u8> = Vec::new();
        let mut parsed = 0;
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            // a plain JSON array is only complete once the body ends
            if body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'[') {
                continue;
            }

            if let Some(end) = find_block_end(&body[parsed..]) {
                let block_end = parsed + end;
                let block = String::from_utf8_lossy(&body[parsed..block_end]);
                let events = parse_event_body(&block)?;
                parsed = block_end;
                if !events.is_empty() {
                    return Ok(events);
                }
            }
        }

        parse_event_body(&String::from_utf8_lossy(&body[parsed..]))
    }
}

/// Offset just past the last blank line that ends a server-sent-event block
fn find_block_end(data: &[u8]) -> Option<usize> {
    data.windows(2).rposition(|w| w == b"\n\n").map(|i| i + 2)
}

#[async_trait]
impl BridgeApi for HueClient {
    async fn devices(&self) -> Result<Vec<Device>, BridgeError> {
        self.get("/clip/v2/resource/device").await
    }

    async fn rooms(&self) -> Result<Vec<Room>, BridgeError> {
        self.get("/clip/v2/resource/room").await
    }

    async fn light(&self, light_id: &str) -> Result<LightState, BridgeError> {
        self.get(&format!("/clip/v2/resource/light/{}", light_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::LightNotFound(light_id.to_string()))
    }

    async fn events(&self, timeout: Duration) -> Result<Vec<Event>, BridgeError> {
        match tokio::time::timeout(timeout, self.read_events()).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout),
        }
    }
}
