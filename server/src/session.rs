use std::fmt::Display;

use rocket::futures::{Sink, SinkExt, future::join_all};
use rocket_ws::Message;
use tracing::{debug, error, info, instrument, warn};

use minesweeper_common::{
    board::Board,
    codec::Frame,
    error::BoardError,
    models::{Difficulty, PlayerView, Point, Slot},
    protocol::{Event, EventKind, LOBBY_FULL_NOTICE, ServerMessage, Snapshot},
};

use crate::{
    registry::{Connection, ConnectionId, LobbyFull, MAX_PLAYERS, PeerAddr, PlayerRegistry},
    turn::TurnCoordinator,
};

/// The single authority of a server process: one board, its players and
/// whose turn it is. Lives behind one lock; every method runs with it held,
/// broadcasts included.
pub struct Session<S> {
    board: Board,
    registry: PlayerRegistry<S>,
    turn: TurnCoordinator,
}

async fn send<S>(connection: &mut Connection<S>, frame: Vec<u8>) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    match connection.sink.send(Message::Binary(frame.into())).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to write to connection {}: {}", connection.id(), e);
            false
        }
    }
}

impl<S> Session<S>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    pub fn new(board: Board) -> Self {
        Self {
            board,
            registry: PlayerRegistry::new(),
            turn: TurnCoordinator::default(),
        }
    }

    pub fn with_difficulty(difficulty: Difficulty) -> Result<Self, BoardError> {
        let params = difficulty.params();
        info!(
            "Creating new game: {}x{} with {} mines",
            params.rows, params.cols, params.mines
        );
        Ok(Self::new(Board::create(params.rows, params.cols, params.mines)?))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn registry(&self) -> &PlayerRegistry<S> {
        &self.registry
    }

    pub fn turn(&self) -> &TurnCoordinator {
        &self.turn
    }

    fn snapshot_for(&self, you: Slot) -> ServerMessage {
        ServerMessage::Snapshot(Snapshot {
            board: self.board.clone(),
            active: self.turn.active(),
            you,
            players: self.registry.views(),
        })
    }

    /// Seats a freshly accepted connection. Returns its id, or `None` when
    /// the lobby is full and the connection has been told so and closed.
    #[instrument(level = "trace", skip(self, addr, sink), fields(addr = %addr))]
    pub async fn handshake(&mut self, addr: PeerAddr, sink: S) -> Option<ConnectionId> {
        let connection = Connection::new(sink);
        let id = connection.id();

        let slot = match self.registry.join(addr.clone(), connection) {
            Ok(joined) => joined.slot(),
            Err(LobbyFull(mut connection)) => {
                warn!("Lobby full, turning away {}", addr);
                let notice = Message::Text(LOBBY_FULL_NOTICE.into());
                if let Err(e) = connection.sink.send(notice).await {
                    debug!("Could not deliver lobby-full notice to {}: {}", addr, e);
                }
                let _ = connection.sink.close().await;
                return None;
            }
        };

        match self.snapshot_for(slot).to_frame() {
            Ok(frame) => {
                let delivered = match self.registry.connection_mut(slot) {
                    Some(connection) => send(connection, frame).await,
                    None => true,
                };
                if !delivered {
                    self.registry.detach(slot, id);
                }
            }
            Err(e) => error!("Failed to encode snapshot for {}: {}", slot, e),
        }

        if let Some(view) = self.registry.view(slot) {
            self.broadcast_player(view, Some(slot)).await;
        }

        info!(
            "{} seated, {} of {} players online",
            slot,
            self.registry.online_count(),
            MAX_PLAYERS
        );
        Some(id)
    }

    /// Applies one message received after the handshake. Text and frames
    /// that fail to decode are logged and dropped; the connection stays up.
    pub async fn handle_message(&mut self, addr: &PeerAddr, message: Message) {
        let data = match message {
            Message::Binary(data) => data,
            Message::Text(_) => {
                debug!("Ignoring text message from {}", addr);
                return;
            }
            other => {
                debug!("Ignoring {:?} from {}", other, addr);
                return;
            }
        };

        match Event::from_frame(&data) {
            Ok(event) => {
                debug!("Received {:?} from {}", event, addr);
                self.handle_event(addr, event).await;
            }
            Err(e) => warn!("Malformed event from {}: {}", addr, e),
        }
    }

    #[instrument(level = "trace", skip(self, addr), fields(addr = %addr))]
    pub async fn handle_event(&mut self, addr: &PeerAddr, event: Event) {
        match event.kind {
            EventKind::NoOp => debug!("No-op from {}", addr),
            EventKind::CursorMove => self.move_cursor(addr, event.position).await,
            EventKind::OpenCell => self.open_cell(addr).await,
        }
    }

    async fn move_cursor(&mut self, addr: &PeerAddr, position: Point) {
        if !self.board.dimensions().contains(position) {
            warn!("Cursor from {} outside the board: {}", addr, position);
            return;
        }

        let Some(view) = self.registry.set_cursor(addr, position) else {
            warn!("Cursor move from unregistered {}", addr);
            return;
        };

        self.broadcast_player(view, None).await;
    }

    async fn open_cell(&mut self, addr: &PeerAddr) {
        let Some(player) = self.registry.get(addr) else {
            warn!("Open from unregistered {}", addr);
            return;
        };
        let (slot, cursor) = (player.slot(), player.cursor());

        if !self.turn.is_turn_of(&self.registry, addr) {
            debug!("Dropping out-of-turn open from {}", slot);
            return;
        }

        match self.board.reveal(cursor) {
            Ok(outcome) if outcome.phase.is_in_progress() => {
                debug!(
                    "{} opened {}, {} cells revealed, {} empty cells left",
                    slot,
                    cursor,
                    outcome.revealed,
                    self.board.remaining()
                );
                self.turn.advance();
            }
            Ok(outcome) => info!("{} opened {}, game over: {:?}", slot, cursor, outcome.phase),
            Err(BoardError::Finished) => {
                debug!("Ignoring open from {} on finished game", slot);
                return;
            }
            Err(e) => {
                warn!("Rejected open from {}: {}", slot, e);
                return;
            }
        }

        self.broadcast_snapshot().await;
    }

    /// Read loop of `id` ended. Ends an in-progress game once the lobby
    /// drops below two players.
    #[instrument(level = "trace", skip(self, addr), fields(addr = %addr))]
    pub async fn disconnect(&mut self, addr: &PeerAddr, id: ConnectionId) {
        let online_before = self.registry.online_count();
        let Some(slot) = self.registry.disconnect(addr, id) else {
            return;
        };
        info!("{} ({}) went offline", slot, addr);

        if online_before == MAX_PLAYERS
            && self.registry.online_count() < MAX_PLAYERS
            && self.board.abandon()
        {
            warn!("{} left mid-game, game abandoned", slot);
            self.broadcast_snapshot().await;
        } else if let Some(view) = self.registry.view(slot) {
            self.broadcast_player(view, None).await;
        }
    }

    async fn broadcast_snapshot(&mut self) {
        let players = self.registry.views();
        let active = self.turn.active();

        let mut frames = Vec::new();
        for (slot, connection) in self.registry.connections_mut() {
            let message = ServerMessage::Snapshot(Snapshot {
                board: self.board.clone(),
                active,
                you: slot,
                players: players.clone(),
            });
            match message.to_frame() {
                Ok(frame) => frames.push((slot, connection, frame)),
                Err(e) => error!("Failed to encode snapshot for {}: {}", slot, e),
            }
        }

        let futures = frames.into_iter().map(|(slot, connection, frame)| async move {
            let id = connection.id();
            (!send(connection, frame).await).then_some((slot, id))
        });
        let failed: Vec<_> = join_all(futures).await.into_iter().flatten().collect();

        for (slot, id) in failed {
            self.registry.detach(slot, id);
        }
    }

    async fn broadcast_player(&mut self, view: PlayerView, except: Option<Slot>) {
        let frame = match ServerMessage::Player(view).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode player update: {}", e);
                return;
            }
        };

        let futures = self
            .registry
            .connections_mut()
            .filter(|(slot, _)| Some(*slot) != except)
            .map(|(slot, connection)| {
                let frame = frame.clone();
                async move {
                    let id = connection.id();
                    (!send(connection, frame).await).then_some((slot, id))
                }
            });
        let failed: Vec<_> = join_all(futures).await.into_iter().flatten().collect();

        for (slot, id) in failed {
            self.registry.detach(slot, id);
        }
    }
}
