use serde::{Deserialize, Serialize};

use crate::{
    board::Board,
    codec::Frame,
    models::{PlayerView, Point, Slot},
};

/// Text payload the server sends once before closing a connection it cannot
/// seat.
pub const LOBBY_FULL_NOTICE: &str = "LOBBY FULL";

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    NoOp,
    CursorMove,
    OpenCell,
}

/// Player intent, client to server. `position` is only read for
/// [`EventKind::CursorMove`].
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub position: Point,
}

impl Event {
    pub fn no_op() -> Self {
        Self {
            kind: EventKind::NoOp,
            position: Point::ORIGIN,
        }
    }

    pub fn cursor_move(position: Point) -> Self {
        Self {
            kind: EventKind::CursorMove,
            position,
        }
    }

    pub fn open_cell(position: Point) -> Self {
        Self {
            kind: EventKind::OpenCell,
            position,
        }
    }
}

impl Frame for Event {}

/// Whole-state update. Each recipient gets its own `you`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub board: Board,
    pub active: Slot,
    pub you: Slot,
    pub players: Vec<PlayerView>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Player(PlayerView),
}

impl Frame for ServerMessage {}
