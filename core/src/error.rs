use thiserror::Error;

use crate::{CellCount, Coord, Position};

/// Failures while bringing the interpreter and engine module up.
///
/// `Clone` because a single initialization result is shared by every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Interpreter failed to start: {0}")]
    Interpreter(String),
    #[error("Could not fetch engine bundle: {0}")]
    Network(String),
    #[error("Could not unpack engine bundle: {0}")]
    Unpack(String),
    #[error("Could not import engine module: {0}")]
    Module(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid board {rows}x{cols} with {mines} mines")]
    InvalidConfig {
        rows: Coord,
        cols: Coord,
        mines: CellCount,
    },
    #[error("Invalid position {0}")]
    InvalidPosition(Position),
    #[error("Game already ended, no new moves are accepted")]
    StaleSession,
    #[error("No game in progress")]
    NoSession,
    #[error("Unknown tile code {0:?}")]
    UnknownTile(char),
    #[error("Engine error: {0}")]
    Engine(String),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T, E = GameError> = core::result::Result<T, E>;
