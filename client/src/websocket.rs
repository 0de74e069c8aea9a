use futures_util::{SinkExt, StreamExt, stream::SplitStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use minesweeper_common::{
    codec::Frame,
    protocol::{Event, LOBBY_FULL_NOTICE, ServerMessage},
};

use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsReader = SplitStream<WsStream>;

/// What the server pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(ServerMessage),
    LobbyFull,
}

/// One websocket connection to the session server
pub struct MinesweeperWebSocket {
    sender: mpsc::UnboundedSender<Event>,
    reader: WsReader,
    writer_task: JoinHandle<()>,
}

impl MinesweeperWebSocket {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url).await?;
        info!("WebSocket connected successfully");

        let (writer, reader) = ws_stream.split();

        let (sender, mut receiver) = mpsc::unbounded_channel::<Event>();

        // Spawn writer task that handles all outgoing messages
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(event) = receiver.recv().await {
                let frame = match event.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Failed to encode event: {}", e);
                        continue;
                    }
                };

                debug!("Sending {:?}", event);
                if let Err(e) = writer.send(Message::Binary(frame.into())).await {
                    warn!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }

            let _ = writer.close().await;
        });

        Ok(Self {
            sender,
            reader,
            writer_task,
        })
    }

    pub fn send_message(&self, event: Event) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| "WebSocket sender channel closed")?;
        Ok(())
    }

    /// Next message from the server, or `None` once the connection is closed.
    /// Frames that fail to decode are logged and skipped.
    pub async fn receive_message(&mut self) -> Result<Option<Inbound>> {
        while let Some(msg) = self.reader.next().await {
            match msg? {
                Message::Binary(data) => match ServerMessage::from_frame(&data) {
                    Ok(message) => return Ok(Some(Inbound::Message(message))),
                    Err(e) => warn!("Discarding undecodable server frame: {}", e),
                },
                Message::Text(text) if text.as_str() == LOBBY_FULL_NOTICE => {
                    info!("Server refused us: lobby full");
                    return Ok(Some(Inbound::LobbyFull));
                }
                Message::Text(text) => debug!("Ignoring text message: {}", text),
                Message::Close(_) => {
                    info!("WebSocket connection closed");
                    return Ok(None);
                }
                // ping/pong are answered by tungstenite
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(self) -> Result<()> {
        // Dropping the sender ends the writer task, which closes the socket
        drop(self.sender);
        let _ = self.writer_task.await;
        Ok(())
    }
}
