use core::fmt;
use ndarray::Array2;
use std::rc::Rc;

use crate::*;

/// Shared, read-only view of one session's board.
///
/// Reads go straight to the engine, so reveal and mark effects show up on
/// the next read without any re-broadcast.
#[derive(Clone)]
pub struct BoardHandle {
    id: SessionId,
    config: GameConfig,
    engine: Rc<dyn EngineSession>,
}

impl BoardHandle {
    /// Wraps a freshly created engine session, checking it reports the
    /// requested shape.
    pub fn new(id: SessionId, config: GameConfig, engine: Rc<dyn EngineSession>) -> Result<Self> {
        let (rows, cols) = (engine.rows(), engine.cols());
        if (rows, cols) != (config.rows, config.cols) {
            return Err(GameError::Engine(format!(
                "requested a {}x{} board but the engine created {}x{}",
                config.rows, config.cols, rows, cols
            )));
        }
        Ok(Self { id, config, engine })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Shape and mine count this board was created with.
    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn rows(&self) -> Coord {
        self.config.rows
    }

    pub fn cols(&self) -> Coord {
        self.config.cols
    }

    pub fn mines(&self) -> CellCount {
        self.config.mines
    }

    pub fn validate_position(&self, pos: Position) -> Result<Position> {
        if pos.is_within(self.rows(), self.cols()) {
            Ok(pos)
        } else {
            Err(GameError::InvalidPosition(pos))
        }
    }

    pub fn tile_state(&self, pos: Position) -> Result<TileState> {
        let pos = self.validate_position(pos)?;
        TileState::from_wire(self.engine.tile_code(pos)?)
    }

    pub fn tile(&self, pos: Position) -> TileAccessor {
        TileAccessor {
            board: self.clone(),
            position: pos,
        }
    }

    pub fn get_tile(&self, row: Coord, col: Coord) -> TileAccessor {
        self.tile(Position::new(row, col))
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let GameConfig { rows, cols, .. } = self.config;
        (0..rows).flat_map(move |row| (0..cols).map(move |col| Position::new(row, col)))
    }

    /// Copies the whole board out of the engine.
    pub fn snapshot(&self) -> Result<Array2<TileState>> {
        let mut board = Array2::default((usize::from(self.rows()), usize::from(self.cols())));
        for pos in self.positions() {
            board[pos.to_nd_index()] = self.tile_state(pos)?;
        }
        Ok(board)
    }

    /// Mines minus flags placed, for the mine counter. Goes negative when
    /// the player over-flags.
    pub fn flags_left(&self) -> Result<i32> {
        let mut flagged = 0;
        for pos in self.positions() {
            if self.tile_state(pos)? == TileState::Flagged {
                flagged += 1;
            }
        }
        Ok(i32::from(self.mines()) - flagged)
    }

    pub(crate) fn engine(&self) -> &dyn EngineSession {
        &*self.engine
    }
}

impl PartialEq for BoardHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.engine, &other.engine)
    }
}

impl fmt::Debug for BoardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardHandle")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Lazy reference to a single tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileAccessor {
    board: BoardHandle,
    position: Position,
}

impl TileAccessor {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn get(&self) -> Result<TileState> {
        self.board.tile_state(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn accessor_observes_later_mutations() {
        let board = fake_board(GameConfig::new(2, 3, 1).unwrap());
        let tile = board.get_tile(0, 0);

        assert_eq!(tile.get(), Ok(TileState::Hidden));
        board.engine().mark(Position::new(0, 0)).unwrap();
        assert_eq!(tile.get(), Ok(TileState::Flagged));
    }

    #[test]
    fn snapshot_matches_dimensions() {
        let board = fake_board(GameConfig::new(2, 3, 1).unwrap());

        let snapshot = board.snapshot().unwrap();

        assert_eq!(snapshot.dim(), (2, 3));
        assert!(snapshot.iter().all(|&tile| tile == TileState::Hidden));
    }

    #[test]
    fn out_of_range_reads_are_rejected() {
        let board = fake_board(GameConfig::new(2, 3, 1).unwrap());

        assert_eq!(
            board.get_tile(2, 0).get(),
            Err(GameError::InvalidPosition(Position::new(2, 0)))
        );
    }

    #[test]
    fn flags_left_counts_down_from_the_boards_own_mines() {
        let board = fake_board(GameConfig::new(3, 3, 2).unwrap());
        assert_eq!(board.flags_left(), Ok(2));

        for col in 0..3 {
            board.engine().mark(Position::new(0, col)).unwrap();
        }
        assert_eq!(board.flags_left(), Ok(-1));

        // second mark turns a flag into a question mark
        board.engine().mark(Position::new(0, 0)).unwrap();
        assert_eq!(board.flags_left(), Ok(0));
    }

    #[test]
    fn rejects_engine_with_wrong_shape() {
        let engine: Rc<dyn EngineSession> = Rc::new(FakeSession::new(
            GameConfig::new(3, 3, 1).unwrap(),
            Box::new(|_: bool| {}),
        ));

        let err = BoardHandle::new(SessionId(1), GameConfig::new(2, 2, 1).unwrap(), engine);

        assert!(matches!(err, Err(GameError::Engine(_))));
    }
}
