//! Typed view of the external game engine and the runtime that hosts it.
//!
//! The engine itself is opaque: it lives inside an embedded interpreter and
//! speaks the single-character tile alphabet. Everything the rest of the crate
//! needs from it goes through these traits.

use crate::*;

/// Invoked by the engine once per session with `true` on victory.
pub type EndCallback = Box<dyn Fn(bool)>;

/// One live game instance owned by the engine.
///
/// Methods take `&self` because handles into the interpreter are shared;
/// the engine mutates its board internally.
pub trait EngineSession {
    fn rows(&self) -> Coord;

    fn cols(&self) -> Coord;

    /// Raw wire code of the tile at `pos`.
    fn tile_code(&self, pos: Position) -> Result<char>;

    fn reveal(&self, pos: Position) -> Result<()>;

    /// Cycles the mark on `pos`: hidden, flag, question, hidden.
    fn mark(&self, pos: Position) -> Result<()>;

    fn hint(&self) -> Result<()>;
}

/// Loaded engine module, able to create sessions.
pub trait EngineModule {
    fn create_session(
        &self,
        config: GameConfig,
        options: SessionOptions,
        on_end: EndCallback,
    ) -> Result<Box<dyn EngineSession>>;
}

/// Embedded interpreter hosting the engine module.
#[allow(async_fn_in_trait)]
pub trait Interpreter {
    type Module: EngineModule;

    /// Resolves once the interpreter is live.
    async fn start(&self) -> Result<(), BridgeError>;

    /// Unpacks an archive into the interpreter's file namespace.
    async fn unpack(&self, bundle: Vec<u8>, format: &str) -> Result<(), BridgeError>;

    async fn import(
        &self,
        module_name: &str,
        factory_name: &str,
    ) -> Result<Self::Module, BridgeError>;
}

/// Transport for the engine's code bundle.
#[allow(async_fn_in_trait)]
pub trait BundleFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BridgeError>;
}
