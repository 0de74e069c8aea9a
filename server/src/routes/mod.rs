use std::{net::SocketAddr, sync::Arc};

use rocket::{
    State,
    futures::{StreamExt, stream::SplitSink},
    get,
};
use rocket_ws::{Channel, Message, WebSocket, stream::DuplexStream};
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::{config::ServerConfig, registry::PeerAddr, session::Session};

pub type WsSink = SplitSink<DuplexStream, Message>;
pub type SharedSession = Arc<Mutex<Session<WsSink>>>;

#[get("/")]
#[instrument(level = "trace", skip(ws, session, config, remote), fields(remote = %remote))]
pub fn websocket_handler(
    ws: WebSocket,
    session: &State<SharedSession>,
    config: &State<ServerConfig>,
    remote: SocketAddr,
) -> Channel<'static> {
    let session = session.inner().clone();
    let addr = PeerAddr::from_socket(remote, config.key_by_ip);
    info!("Client {} connected", addr);

    ws.channel(move |stream| {
        Box::pin(async move {
            let (write, mut read) = stream.split();
            let mut write = Some(write);
            let mut connection = None;

            while let Some(message) = read.next().await {
                let message = match message {
                    Ok(message @ (Message::Binary(_) | Message::Text(_))) => message,
                    Ok(Message::Close(_)) => {
                        info!("Client {} closed the connection", addr);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                };

                if connection.is_none() {
                    // first message of any content is the handshake
                    let Some(sink) = write.take() else {
                        break;
                    };
                    let mut session = session.lock().await;
                    match session.handshake(addr.clone(), sink).await {
                        Some(id) => connection = Some(id),
                        None => return Ok(()),
                    }
                    continue;
                }

                let mut session = session.lock().await;
                session.handle_message(&addr, message).await;
            }

            if let Some(id) = connection {
                let mut session = session.lock().await;
                session.disconnect(&addr, id).await;
            }

            info!("Client {} disconnected", addr);
            Ok(())
        })
    })
}
