//! Types shared by the minesweeper server and client: the board engine, the
//! wire protocol and its binary codec.

pub mod board;
pub mod codec;
pub mod error;
pub mod models;
pub mod protocol;
