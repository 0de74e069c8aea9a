use std::env;

use tracing::warn;

use minesweeper_common::models::Difficulty;

/// Process-wide settings resolved once at startup. Listen address and port
/// come from Rocket's own configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerConfig {
    pub difficulty: Difficulty,
    /// Match reconnecting players by IP alone instead of IP and port.
    pub key_by_ip: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let difficulty = env::var("MINESWEEPER_DIFFICULTY")
            .ok()
            .and_then(|value| match value.parse() {
                Ok(difficulty) => Some(difficulty),
                Err(e) => {
                    warn!("{}, falling back to easy", e);
                    None
                }
            })
            .unwrap_or_default();

        let key_by_ip: bool = env::var("MINESWEEPER_KEY_BY_IP")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Self {
            difficulty,
            key_by_ip,
        }
    }
}
