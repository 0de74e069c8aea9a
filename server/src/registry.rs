use std::{collections::BTreeMap, fmt, net::SocketAddr};

use tracing::{debug, info};
use uuid::Uuid;

use minesweeper_common::models::{PlayerView, Point, Slot};

pub const MAX_PLAYERS: usize = 2;

pub type ConnectionId = Uuid;

/// Network identity a player is matched back to on reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr(String);

impl PeerAddr {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// With `key_by_ip` the port is dropped, so a client that reconnects from a
    /// fresh ephemeral port keeps its slot.
    pub fn from_socket(addr: SocketAddr, key_by_ip: bool) -> Self {
        if key_by_ip {
            Self(addr.ip().to_string())
        } else {
            Self(addr.to_string())
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Write half of one websocket connection.
pub struct Connection<S> {
    id: ConnectionId,
    pub(crate) sink: S,
}

impl<S> Connection<S> {
    pub fn new(sink: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            sink,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

pub struct Player<S> {
    addr: PeerAddr,
    slot: Slot,
    online: bool,
    cursor: Point,
    connection: Option<Connection<S>>,
}

impl<S> Player<S> {
    pub fn addr(&self) -> &PeerAddr {
        &self.addr
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            slot: self.slot,
            online: self.online,
            cursor: self.cursor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joined {
    New(Slot),
    Rejoined(Slot),
}

impl Joined {
    pub fn slot(self) -> Slot {
        match self {
            Self::New(slot) | Self::Rejoined(slot) => slot,
        }
    }
}

/// Admission refused; hands the connection back so the caller can notify it.
pub struct LobbyFull<S>(pub Connection<S>);

/// Slot-indexed player table. Entries are never removed on disconnect, only
/// replaced when a newcomer takes over an offline player's slot.
pub struct PlayerRegistry<S> {
    players: BTreeMap<Slot, Player<S>>,
}

impl<S> Default for PlayerRegistry<S> {
    fn default() -> Self {
        Self {
            players: BTreeMap::new(),
        }
    }
}

impl<S> PlayerRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_mut(&mut self, addr: &PeerAddr) -> Option<&mut Player<S>> {
        self.players.values_mut().find(|p| &p.addr == addr)
    }

    pub fn get(&self, addr: &PeerAddr) -> Option<&Player<S>> {
        self.players.values().find(|p| &p.addr == addr)
    }

    pub fn join(
        &mut self,
        addr: PeerAddr,
        connection: Connection<S>,
    ) -> Result<Joined, LobbyFull<S>> {
        if let Some(player) = self.find_mut(&addr) {
            player.online = true;
            player.connection = Some(connection);
            info!("Player {} ({}) reconnected", player.slot, addr);
            return Ok(Joined::Rejoined(player.slot));
        }

        if self.online_count() >= MAX_PLAYERS {
            debug!("Lobby full, refusing {}", addr);
            return Err(LobbyFull(connection));
        }

        let Some(slot) = Slot::ALL
            .into_iter()
            .find(|slot| self.players.get(slot).is_none_or(|p| !p.online))
        else {
            return Err(LobbyFull(connection));
        };

        if let Some(evicted) = self.players.get(&slot) {
            info!(
                "Slot {} handed from offline {} to {}",
                slot, evicted.addr, addr
            );
        }

        info!("Player {} joined from {}", slot, addr);
        self.players.insert(
            slot,
            Player {
                addr,
                slot,
                online: true,
                cursor: Point::ORIGIN,
                connection: Some(connection),
            },
        );
        Ok(Joined::New(slot))
    }

    /// Marks the player offline if `id` is still its live connection. A
    /// connection that was already superseded by a reconnect is ignored.
    pub fn disconnect(&mut self, addr: &PeerAddr, id: ConnectionId) -> Option<Slot> {
        let player = self.find_mut(addr)?;
        if !player.online || player.connection.as_ref().is_some_and(|c| c.id != id) {
            debug!("Ignoring stale disconnect for {}", addr);
            return None;
        }

        player.online = false;
        player.connection = None;
        Some(player.slot)
    }

    pub fn online_count(&self) -> usize {
        self.players.values().filter(|p| p.online).count()
    }

    pub fn set_cursor(&mut self, addr: &PeerAddr, cursor: Point) -> Option<PlayerView> {
        let player = self.find_mut(addr)?;
        player.cursor = cursor;
        Some(player.view())
    }

    pub fn view(&self, slot: Slot) -> Option<PlayerView> {
        self.players.get(&slot).map(Player::view)
    }

    pub fn views(&self) -> Vec<PlayerView> {
        self.players.values().map(Player::view).collect()
    }

    /// Live handles of online players, the broadcast targets.
    pub fn connections_mut(&mut self) -> impl Iterator<Item = (Slot, &mut Connection<S>)> {
        self.players
            .values_mut()
            .filter(|p| p.online)
            .filter_map(|p| {
                let slot = p.slot;
                p.connection.as_mut().map(move |c| (slot, c))
            })
    }

    pub fn connection_mut(&mut self, slot: Slot) -> Option<&mut Connection<S>> {
        self.players
            .get_mut(&slot)
            .filter(|p| p.online)
            .and_then(|p| p.connection.as_mut())
    }

    /// Drops a handle that failed a write so it is never written again.
    pub fn detach(&mut self, slot: Slot, id: ConnectionId) {
        if let Some(player) = self.players.get_mut(&slot)
            && player.connection.as_ref().is_some_and(|c| c.id == id)
        {
            debug!("Detaching dead connection of {}", slot);
            player.connection = None;
        }
    }
}
