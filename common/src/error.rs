use thiserror::Error;

use crate::models::Point;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    #[error("board must have at least one row and one column, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
    #[error("mine count must be between 1 and {max}, got {mines}")]
    InvalidMineCount { mines: usize, max: usize },
    #[error("point {0} is outside the board")]
    OutOfBounds(Point),
    #[error("game already ended, no new moves are accepted")]
    Finished,
    #[error("grids do not cover the board: {area} cells, {contents} contents, {states} states")]
    GridMismatch {
        area: usize,
        contents: usize,
        states: usize,
    },
    #[error("board reports {reported} empty cells left, grids show {actual}")]
    RemainingMismatch { reported: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("frame has {0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("frame too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: u32 },
    #[error("malformed payload: {0}")]
    Malformed(#[from] bincode::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown difficulty {0:?}, expected easy, normal or hard")]
    UnknownDifficulty(String),
}
