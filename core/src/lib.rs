//! Glue between a browser front end and a minesweeper engine that runs
//! inside an embedded interpreter.
//!
//! [`RuntimeBridge`] boots the interpreter and loads the engine module,
//! [`GameSessionAdapter`] routes every game action to the engine,
//! [`GestureClassifier`] turns timed presses into actions and
//! [`BoardPublisher`] hands new boards to whoever renders them.

pub use board::*;
pub use bridge::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use gesture::*;
pub use publisher::*;
pub use session::*;
pub use tile::*;
pub use types::*;

mod board;
mod bridge;
mod config;
mod engine;
mod error;
mod gesture;
mod publisher;
mod session;
#[cfg(test)]
mod testing;
mod tile;
mod types;
