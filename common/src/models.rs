use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A (row, column) pair on the board.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub const ORIGIN: Point = Point { row: 0, col: 0 };

    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.row, self.col)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
}

impl Dimensions {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn area(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, point: Point) -> bool {
        point.row < self.rows && point.col < self.cols
    }

    /// Row-major index of an in-bounds point.
    pub fn index(&self, point: Point) -> usize {
        point.row * self.cols + point.col
    }

    pub fn point(&self, index: usize) -> Point {
        Point::new(index / self.cols, index % self.cols)
    }

    /// The up-to-8 in-bounds neighbours of `point`.
    pub fn neighbours(&self, point: Point) -> impl Iterator<Item = Point> + '_ {
        (-1i64..=1)
            .flat_map(|dr| (-1i64..=1).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .filter_map(move |(dr, dc)| {
                let row = point.row as i64 + dr;
                let col = point.col as i64 + dc;
                if row >= 0 && row < self.rows as i64 && col >= 0 && col < self.cols as i64 {
                    Some(Point::new(row as usize, col as usize))
                } else {
                    None
                }
            })
    }
}

/// What a cell actually holds. Fixed at board creation.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Content {
    Mine,
    Adjacent(u8),
}

/// What a cell currently shows.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Hidden,
    Flagged,
    Guessed,
    Revealed(u8),
    Empty,
    Mine,
}

impl CellState {
    pub fn is_revealed(&self) -> bool {
        matches!(self, Self::Revealed(_) | Self::Empty | Self::Mine)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossCause {
    Mine,
    Abandoned,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    InProgress,
    Lost(LossCause),
    Won,
}

impl Phase {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

/// Logical player identity, handed out in join order.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    P1,
    P2,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::P1, Slot::P2];

    pub fn other(self) -> Self {
        match self {
            Self::P1 => Self::P2,
            Self::P2 => Self::P1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P1 => f.write_str("P1"),
            Self::P2 => f.write_str("P2"),
        }
    }
}

/// Read-only player record shared with every participant.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerView {
    pub slot: Slot,
    pub online: bool,
    pub cursor: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardParams {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub fn params(self) -> BoardParams {
        match self {
            Self::Easy => BoardParams {
                rows: 9,
                cols: 9,
                mines: 10,
            },
            Self::Normal => BoardParams {
                rows: 16,
                cols: 16,
                mines: 40,
            },
            Self::Hard => BoardParams {
                rows: 16,
                cols: 30,
                mines: 99,
            },
        }
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            other => Err(ConfigError::UnknownDifficulty(other.to_string())),
        }
    }
}
