use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use minesweeper_common::{
    board::Board,
    models::{PlayerView, Point, Slot},
    protocol::{Event, ServerMessage, Snapshot},
};
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::{
    ClientConfig, Result,
    view::{Input, LocalView},
    websocket::{Inbound, MinesweeperWebSocket},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Synced,
}

/// Events emitted by the sync loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    StateChanged(ConnectionState),
    /// A snapshot replaced the mirror wholesale
    BoardReplaced,
    PlayerUpdated(PlayerView),
    /// The server refused us; the loop has stopped
    LobbyFull,
}

/// Read-only copy of the server's state as of the last snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    snapshot: Snapshot,
    epoch: u64,
}

impl Mirror {
    /// `epoch` identifies the connection the snapshot arrived on.
    pub fn new(snapshot: Snapshot, epoch: u64) -> Self {
        Self { snapshot, epoch }
    }

    /// Bumped once per successful handshake. A view that last synced
    /// against another epoch must take its cursor from the server again.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn board(&self) -> &Board {
        &self.snapshot.board
    }

    pub fn active(&self) -> Slot {
        self.snapshot.active
    }

    pub fn you(&self) -> Slot {
        self.snapshot.you
    }

    pub fn players(&self) -> &[PlayerView] {
        &self.snapshot.players
    }

    pub fn player(&self, slot: Slot) -> Option<&PlayerView> {
        self.snapshot.players.iter().find(|p| p.slot == slot)
    }

    /// Where the server believes this player's cursor is.
    pub fn own_cursor(&self) -> Option<Point> {
        self.player(self.you()).map(|p| p.cursor)
    }

    pub fn is_my_turn(&self) -> bool {
        self.active() == self.you() && self.board().phase().is_in_progress()
    }

    fn apply_player(&mut self, view: PlayerView) {
        let players = &mut self.snapshot.players;
        match players.iter_mut().find(|p| p.slot == view.slot) {
            Some(existing) => *existing = view,
            None => {
                players.push(view);
                players.sort_by_key(|p| p.slot);
            }
        }
    }
}

enum Ended {
    LobbyFull,
    ConnectionLost,
}

/// Keeps one connection to the session server alive and mirrors what it
/// pushes. Input is forwarded fire-and-forget.
pub struct SyncClient {
    config: ClientConfig,
    state: Arc<RwLock<ConnectionState>>,
    mirror: Arc<RwLock<Option<Mirror>>>,
    event_sender: Arc<RwLock<Option<mpsc::UnboundedSender<SyncEvent>>>>,
    input: mpsc::UnboundedSender<Event>,
    input_rx: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
    epoch: AtomicU64,
}

impl SyncClient {
    pub fn new(config: ClientConfig) -> Self {
        let (input, input_rx) = mpsc::unbounded_channel();
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            mirror: Arc::new(RwLock::new(None)),
            event_sender: Arc::new(RwLock::new(None)),
            input,
            input_rx: Mutex::new(Some(input_rx)),
            epoch: AtomicU64::new(0),
        }
    }

    /// Subscribe to sync events. Returns a receiver for sync events.
    pub async fn subscribe_to_events(&self) -> mpsc::UnboundedReceiver<SyncEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut event_sender = self.event_sender.write().await;
        *event_sender = Some(sender);
        receiver
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn mirror(&self) -> Option<Mirror> {
        self.mirror.read().await.clone()
    }

    /// Queues an event for the server. Nothing waits for a reply.
    pub fn send(&self, event: Event) -> Result<()> {
        self.input
            .send(event)
            .map_err(|_| "Sync input channel closed")?;
        Ok(())
    }

    /// Translates a key press against the current mirror and forwards the
    /// resulting event, if any. Ignored unless synced, since anything sent
    /// while offline is dropped at the next handshake.
    pub async fn press(&self, view: &mut LocalView, input: Input) -> Result<()> {
        if self.state().await != ConnectionState::Synced {
            debug!("Ignoring {:?} while not synced", input);
            return Ok(());
        }
        let event = match *self.mirror.read().await {
            Some(ref mirror) => {
                view.sync(mirror);
                view.apply(input, mirror.board())
            }
            None => return Ok(()),
        };
        if let Some(event) = event {
            self.send(event)?;
        }
        Ok(())
    }

    /// Runs until the server reports a full lobby. Connection failures are
    /// retried after the configured backoff.
    pub async fn run(&self) -> Result<()> {
        let mut input = self
            .input_rx
            .lock()
            .await
            .take()
            .ok_or("Sync loop is already running")?;

        loop {
            self.set_state(ConnectionState::Connecting).await;
            let url = self.config.server_url.as_str();
            let mut websocket = match MinesweeperWebSocket::connect(url).await {
                Ok(websocket) => websocket,
                Err(e) => {
                    warn!("Failed to connect to {}: {}", url, e);
                    self.back_off().await;
                    continue;
                }
            };

            self.set_state(ConnectionState::Handshaking).await;
            let mut stale = 0;
            while input.try_recv().is_ok() {
                stale += 1;
            }
            if stale > 0 {
                debug!("Discarded {} inputs queued while offline", stale);
            }

            let ended = match websocket.send_message(Event::no_op()) {
                Ok(()) => self.pump(&mut websocket, &mut input).await,
                Err(e) => {
                    warn!("Handshake failed: {}", e);
                    Ended::ConnectionLost
                }
            };
            let _ = websocket.close().await;

            match ended {
                Ended::LobbyFull => {
                    self.set_state(ConnectionState::Disconnected).await;
                    self.emit(SyncEvent::LobbyFull).await;
                    *self.input_rx.lock().await = Some(input);
                    return Ok(());
                }
                Ended::ConnectionLost => {
                    info!("Connection to server lost");
                    self.back_off().await;
                }
            }
        }
    }

    async fn pump(
        &self,
        websocket: &mut MinesweeperWebSocket,
        input: &mut mpsc::UnboundedReceiver<Event>,
    ) -> Ended {
        let mut synced = false;
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed) + 1;
        loop {
            tokio::select! {
                inbound = websocket.receive_message() => match inbound {
                    Ok(Some(Inbound::Message(ServerMessage::Snapshot(snapshot)))) => {
                        debug!("Snapshot received, phase {:?}", snapshot.board.phase());
                        *self.mirror.write().await = Some(Mirror::new(snapshot, epoch));
                        if !synced {
                            synced = true;
                            self.set_state(ConnectionState::Synced).await;
                        }
                        self.emit(SyncEvent::BoardReplaced).await;
                    }
                    Ok(Some(Inbound::Message(ServerMessage::Player(view)))) => {
                        if let Some(ref mut mirror) = *self.mirror.write().await {
                            mirror.apply_player(view);
                        }
                        self.emit(SyncEvent::PlayerUpdated(view)).await;
                    }
                    Ok(Some(Inbound::LobbyFull)) => return Ended::LobbyFull,
                    Ok(None) => return Ended::ConnectionLost,
                    Err(e) => {
                        warn!("Error receiving WebSocket message: {}", e);
                        return Ended::ConnectionLost;
                    }
                },
                Some(event) = input.recv() => {
                    if !synced {
                        debug!("Dropping {:?} before first snapshot", event.kind);
                    } else if let Err(e) = websocket.send_message(event) {
                        warn!("Failed to forward input: {}", e);
                        return Ended::ConnectionLost;
                    }
                }
            }
        }
    }

    async fn back_off(&self) {
        self.set_state(ConnectionState::Disconnected).await;
        tokio::time::sleep(self.config.reconnect_backoff).await;
    }

    async fn set_state(&self, state: ConnectionState) {
        {
            let mut current = self.state.write().await;
            if *current == state {
                return;
            }
            *current = state;
        }
        self.emit(SyncEvent::StateChanged(state)).await;
    }

    async fn emit(&self, event: SyncEvent) {
        if let Some(ref sender) = *self.event_sender.read().await {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            board: Board::from_mines(3, 3, &[Point::new(2, 2)]).unwrap(),
            active: Slot::P1,
            you: Slot::P1,
            players: vec![PlayerView {
                slot: Slot::P1,
                online: true,
                cursor: Point::ORIGIN,
            }],
        }
    }

    #[test]
    fn player_updates_replace_or_insert() {
        let mut mirror = Mirror::new(snapshot(), 1);
        let p2 = PlayerView {
            slot: Slot::P2,
            online: true,
            cursor: Point::new(1, 1),
        };
        mirror.apply_player(p2);
        assert_eq!(mirror.players().len(), 2);

        mirror.apply_player(PlayerView { online: false, ..p2 });
        assert_eq!(mirror.players().len(), 2);
        assert!(!mirror.player(Slot::P2).unwrap().online);
    }

    #[test]
    fn turn_needs_active_slot_and_live_game() {
        let mut snap = snapshot();
        assert!(Mirror::new(snap.clone(), 1).is_my_turn());

        snap.you = Slot::P2;
        assert!(!Mirror::new(snap.clone(), 1).is_my_turn());

        snap.you = Slot::P1;
        snap.board.abandon();
        assert!(!Mirror::new(snap, 1).is_my_turn());
    }

    fn client() -> SyncClient {
        SyncClient::new(ClientConfig::new("ws://127.0.0.1:1/").unwrap())
    }

    #[tokio::test]
    async fn press_is_ignored_without_mirror() {
        let client = client();
        *client.state.write().await = ConnectionState::Synced;
        let mut view = LocalView::new();
        client.press(&mut view, Input::Down).await.unwrap();
        assert_eq!(view.cursor(), Point::ORIGIN);
    }

    #[tokio::test]
    async fn press_is_ignored_while_offline() {
        let client = client();
        *client.mirror.write().await = Some(Mirror::new(snapshot(), 1));
        let mut view = LocalView::new();

        client.press(&mut view, Input::Down).await.unwrap();

        assert_eq!(view.cursor(), Point::ORIGIN);
        let mut rx = client.input_rx.lock().await.take().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn press_forwards_translated_event() {
        let client = client();
        *client.mirror.write().await = Some(Mirror::new(snapshot(), 1));
        *client.state.write().await = ConnectionState::Synced;
        let mut view = LocalView::new();

        client.press(&mut view, Input::Right).await.unwrap();
        client.press(&mut view, Input::Mark).await.unwrap();
        client.press(&mut view, Input::Open).await.unwrap();

        let mut rx = client.input_rx.lock().await.take().unwrap();
        assert_eq!(rx.try_recv().unwrap(), Event::cursor_move(Point::new(0, 1)));
        assert_eq!(rx.try_recv().unwrap(), Event::open_cell(Point::new(0, 1)));
        assert!(rx.try_recv().is_err());
    }
}
