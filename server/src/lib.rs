pub mod config;
pub mod registry;
pub mod routes;
pub mod session;
pub mod turn;

use std::sync::Arc;

use rocket::{Build, Rocket, routes};
use tokio::sync::Mutex;
use tracing::info;

use minesweeper_common::error::BoardError;

use crate::{
    config::ServerConfig,
    routes::{SharedSession, websocket_handler},
    session::Session,
};

/// Builds the server around a fresh game at the configured difficulty.
pub fn build(config: ServerConfig) -> Result<Rocket<Build>, BoardError> {
    let session: SharedSession = Arc::new(Mutex::new(Session::with_difficulty(config.difficulty)?));

    info!(
        "Session ready: {:?}, players keyed by {}",
        config.difficulty,
        if config.key_by_ip { "ip" } else { "ip and port" }
    );

    Ok(rocket::build()
        .manage(session)
        .manage(config)
        .mount("/", routes![websocket_handler]))
}
