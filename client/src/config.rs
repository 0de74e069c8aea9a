use std::{env, time::Duration};

use url::Url;

use crate::Result;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/";
pub const DEFAULT_RECONNECT_SECONDS: u64 = 5;

/// Where to connect and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: Url,
    pub reconnect_backoff: Duration,
}

impl ClientConfig {
    /// Accepts `ws`/`wss` URLs as-is and maps `http`/`https` onto them.
    pub fn new(server_url: &str) -> Result<Self> {
        let mut url = Url::parse(server_url)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => return Err(format!("Unsupported URL scheme: {}", other).into()),
        };
        url.set_scheme(scheme)
            .map_err(|_| "Failed to set WebSocket scheme")?;

        Ok(Self {
            server_url: url,
            reconnect_backoff: Duration::from_secs(DEFAULT_RECONNECT_SECONDS),
        })
    }

    pub fn from_env() -> Result<Self> {
        let server_url = env::var("MINESWEEPER_SERVER_URL")
            .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

        let reconnect_seconds: u64 = env::var("MINESWEEPER_RECONNECT_SECONDS")
            .unwrap_or_else(|_| DEFAULT_RECONNECT_SECONDS.to_string())
            .parse()
            .unwrap_or(DEFAULT_RECONNECT_SECONDS);

        Ok(Self::new(&server_url)?.with_backoff(Duration::from_secs(reconnect_seconds)))
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_maps_to_ws() {
        let config = ClientConfig::new("http://localhost:8000").unwrap();
        assert_eq!(config.server_url.as_str(), "ws://localhost:8000/");

        let config = ClientConfig::new("https://example.org/game").unwrap();
        assert_eq!(config.server_url.scheme(), "wss");
    }

    #[test]
    fn ws_is_kept() {
        let config = ClientConfig::new(DEFAULT_SERVER_URL).unwrap();
        assert_eq!(config.server_url.as_str(), DEFAULT_SERVER_URL);
        assert_eq!(config.reconnect_backoff, Duration::from_secs(5));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(ClientConfig::new("ftp://localhost").is_err());
        assert!(ClientConfig::new("not a url").is_err());
    }
}
