use crate::config::PublicIpConfig;
use reqwest::{Client, StatusCode};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("sysdumper/", env!("CARGO_PKG_VERSION"));
const BODY_PREVIEW_CHARS: usize = 64;
/// Echo services answer with a few dozen bytes; anything past this is refused.
const MAX_BODY_BYTES: usize = 1024;

/// Source of the host's public address as seen from outside.
pub trait PublicIpFetcher {
    /// Best effort: `None` on any failure, never an error.
    async fn fetch_public_ip(&self) -> Option<IpAddr>;
}

#[derive(Debug, Error)]
enum LookupError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("endpoint answered {0}")]
    Status(StatusCode),
    #[error("response body exceeds {} bytes", MAX_BODY_BYTES)]
    TooLarge,
    #[error("response is not an IP address: {0:?}")]
    Malformed(String),
}

/// Single GET against an IP echo service.
#[derive(Debug, Clone)]
pub struct HttpPublicIpFetcher {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpPublicIpFetcher {
    pub fn new(cfg: &PublicIpConfig) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client, cfg)
    }

    pub fn with_client(client: Client, cfg: &PublicIpConfig) -> Self {
        Self {
            client,
            endpoint: cfg.endpoint.trim().to_string(),
            timeout: Duration::from_millis(cfg.timeout_ms),
        }
    }

    async fn lookup(&self) -> Result<IpAddr, LookupError> {
        let mut resp = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        if resp
            .content_length()
            .is_some_and(|len| len > MAX_BODY_BYTES as u64)
        {
            return Err(LookupError::TooLarge);
        }

        let mut raw = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if raw.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(LookupError::TooLarge);
            }
            raw.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&raw);
        parse_public_ip(&body)
            .ok_or_else(|| LookupError::Malformed(body.chars().take(BODY_PREVIEW_CHARS).collect()))
    }
}

impl PublicIpFetcher for HttpPublicIpFetcher {
    async fn fetch_public_ip(&self) -> Option<IpAddr> {
        match self.lookup().await {
            Ok(ip) => {
                debug!(endpoint = %self.endpoint, ip = %ip, "public ip resolved");
                Some(ip)
            }
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "public ip lookup failed");
                None
            }
        }
    }
}

/// Accepts a bare address or a JSON object carrying `ip` / `ip_addr`, the two
/// shapes common echo services answer with.
pub fn parse_public_ip(body: &str) -> Option<IpAddr> {
    let trimmed = body.trim();
    let ip = match trimmed.parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => {
            let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
            ["ip", "ip_addr"]
                .into_iter()
                .find_map(|key| value.get(key)?.as_str()?.trim().parse::<IpAddr>().ok())?
        }
    };
    if ip.is_unspecified() {
        return None;
    }
    Some(ip)
}
