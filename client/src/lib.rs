//! Minesweeper Client Library
//!
//! Keeps a two-player minesweeper client in sync with the session server.
//! The server owns the board; this crate only mirrors what it pushes and
//! forwards local input.
//!
//! ## Usage
//!
//! `SyncClient` connects, handshakes and reconnects on its own. Run it on a
//! task and drive it with key presses:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use minesweeper_client::{ClientConfig, Input, LocalView, SyncClient, SyncEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = Arc::new(SyncClient::new(ClientConfig::from_env()?));
//!     let mut events = client.subscribe_to_events().await;
//!
//!     let runner = client.clone();
//!     tokio::spawn(async move { runner.run().await });
//!
//!     let mut view = LocalView::new();
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             SyncEvent::BoardReplaced => {
//!                 if let Some(mirror) = client.mirror().await {
//!                     view.sync(&mirror);
//!                     if mirror.is_my_turn() {
//!                         client.press(&mut view, Input::Open).await?;
//!                     }
//!                 }
//!             }
//!             SyncEvent::LobbyFull => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Low-Level Interface
//!
//! `MinesweeperWebSocket` is a single connection without reconnection:
//!
//! ```rust,no_run
//! use minesweeper_client::{Event, MinesweeperWebSocket};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut ws = MinesweeperWebSocket::connect("ws://127.0.0.1:8000/").await?;
//!     ws.send_message(Event::no_op())?;
//!
//!     if let Some(message) = ws.receive_message().await? {
//!         println!("Received: {:?}", message);
//!     }
//!
//!     ws.close().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod sync;
mod view;
mod websocket;

pub use config::{ClientConfig, DEFAULT_RECONNECT_SECONDS, DEFAULT_SERVER_URL};
pub use sync::{ConnectionState, Mirror, SyncClient, SyncEvent};
pub use view::{Input, LocalView, Marker};
pub use websocket::{Inbound, MinesweeperWebSocket};

// Re-export common types for convenience
pub use minesweeper_common::{board::Board, models::*, protocol::*};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
