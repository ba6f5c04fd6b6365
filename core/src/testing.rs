//! In-memory interpreter, transport and engine used by the unit tests.

use core::cell::{Cell, RefCell};
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use ndarray::Array2;
use std::rc::Rc;

use crate::*;

/// Suspends exactly once, like a real runtime awaiting I/O.
pub(crate) struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

pub(crate) fn yield_now() -> YieldNow {
    YieldNow(false)
}

/// Call counters and failure switches shared between the fakes and a test.
#[derive(Default)]
pub(crate) struct Probe {
    pub starts: Cell<u32>,
    pub fetches: Cell<u32>,
    pub unpacks: Cell<u32>,
    pub imports: Cell<u32>,
    pub sessions: Cell<u32>,
    pub failing_fetches: Cell<u32>,
    pub corrupt_bundle: Cell<bool>,
    pub missing_module: Cell<bool>,
}

pub(crate) struct FakeInterpreter {
    probe: Rc<Probe>,
}

impl Interpreter for FakeInterpreter {
    type Module = FakeModule;

    async fn start(&self) -> Result<(), BridgeError> {
        self.probe.starts.set(self.probe.starts.get() + 1);
        yield_now().await;
        Ok(())
    }

    async fn unpack(&self, bundle: Vec<u8>, format: &str) -> Result<(), BridgeError> {
        self.probe.unpacks.set(self.probe.unpacks.get() + 1);
        yield_now().await;
        if self.probe.corrupt_bundle.get() || bundle.is_empty() {
            return Err(BridgeError::Unpack(format!("not a {} archive", format)));
        }
        Ok(())
    }

    async fn import(
        &self,
        module_name: &str,
        _factory_name: &str,
    ) -> Result<FakeModule, BridgeError> {
        self.probe.imports.set(self.probe.imports.get() + 1);
        if self.probe.missing_module.get() {
            return Err(BridgeError::Module(format!("no module named {}", module_name)));
        }
        Ok(FakeModule {
            probe: self.probe.clone(),
        })
    }
}

pub(crate) struct FakeFetcher {
    probe: Rc<Probe>,
}

impl BundleFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BridgeError> {
        self.probe.fetches.set(self.probe.fetches.get() + 1);
        yield_now().await;
        let failing = self.probe.failing_fetches.get();
        if failing > 0 {
            self.probe.failing_fetches.set(failing - 1);
            return Err(BridgeError::Network(format!("GET {} failed", url)));
        }
        Ok(b"fake bundle".to_vec())
    }
}

pub(crate) struct FakeModule {
    probe: Rc<Probe>,
}

impl EngineModule for FakeModule {
    fn create_session(
        &self,
        config: GameConfig,
        _options: SessionOptions,
        on_end: EndCallback,
    ) -> Result<Box<dyn EngineSession>> {
        self.probe.sessions.set(self.probe.sessions.get() + 1);
        Ok(Box::new(FakeSession::new(config, on_end)))
    }
}

/// Tiny engine: mines fill the last tiles in row-major order, reveals do
/// not flood, and the end callback fires on every terminal reveal so the
/// adapter's once-only forwarding is actually exercised.
pub(crate) struct FakeSession {
    mines: Array2<bool>,
    board: RefCell<Array2<char>>,
    on_end: EndCallback,
}

impl FakeSession {
    pub fn new(config: GameConfig, on_end: EndCallback) -> Self {
        let shape = (usize::from(config.rows), usize::from(config.cols));
        let total = usize::from(config.total_tiles());
        let mines = Array2::from_shape_fn(shape, |(row, col)| {
            row * shape.1 + col >= total - usize::from(config.mines)
        });
        Self {
            mines,
            board: RefCell::new(Array2::from_elem(shape, '#')),
            on_end,
        }
    }

    fn adjacent_mines(&self, pos: Position) -> u8 {
        let (rows, cols) = self.mines.dim();
        let (row, col) = (usize::from(pos.row), usize::from(pos.col));
        let mut count = 0;
        for r in row.saturating_sub(1)..=(row + 1).min(rows - 1) {
            for c in col.saturating_sub(1)..=(col + 1).min(cols - 1) {
                if (r, c) != (row, col) && self.mines[(r, c)] {
                    count += 1;
                }
            }
        }
        count
    }
}

impl EngineSession for FakeSession {
    fn rows(&self) -> Coord {
        self.mines.dim().0 as Coord
    }

    fn cols(&self) -> Coord {
        self.mines.dim().1 as Coord
    }

    fn tile_code(&self, pos: Position) -> Result<char> {
        Ok(self.board.borrow()[pos.to_nd_index()])
    }

    fn reveal(&self, pos: Position) -> Result<()> {
        let index = pos.to_nd_index();
        if self.mines[index] {
            self.board.borrow_mut()[index] = 'X';
            (self.on_end)(false);
            return Ok(());
        }

        let count = self.adjacent_mines(pos);
        self.board.borrow_mut()[index] = if count == 0 {
            ' '
        } else {
            (b'0' + count) as char
        };

        let board = self.board.borrow();
        let all_safe_open = board
            .iter()
            .zip(self.mines.iter())
            .all(|(&tile, &mine)| mine || !matches!(tile, '#' | '!' | '?' | 'O'));
        drop(board);
        if all_safe_open {
            (self.on_end)(true);
        }
        Ok(())
    }

    fn mark(&self, pos: Position) -> Result<()> {
        let mut board = self.board.borrow_mut();
        let tile = &mut board[pos.to_nd_index()];
        *tile = match *tile {
            '#' => '!',
            '!' => '?',
            '?' => '#',
            other => other,
        };
        Ok(())
    }

    fn hint(&self) -> Result<()> {
        let mut board = self.board.borrow_mut();
        let safe_hidden = board
            .indexed_iter()
            .find(|&(index, &tile)| tile == '#' && !self.mines[index])
            .map(|(index, _)| index);
        match safe_hidden {
            Some(index) => {
                board[index] = 'O';
                Ok(())
            }
            None => Err(GameError::Engine("no hint available".into())),
        }
    }
}

pub(crate) fn fake_runtime() -> (FakeInterpreter, FakeFetcher, Rc<Probe>) {
    let probe = Rc::new(Probe::default());
    (
        FakeInterpreter {
            probe: probe.clone(),
        },
        FakeFetcher {
            probe: probe.clone(),
        },
        probe,
    )
}

pub(crate) fn fake_bridge() -> (RuntimeBridge<FakeInterpreter, FakeFetcher>, Rc<Probe>) {
    let (interpreter, fetcher, probe) = fake_runtime();
    (
        RuntimeBridge::new(interpreter, fetcher, BridgeConfig::default()),
        probe,
    )
}

pub(crate) fn fake_board(config: GameConfig) -> BoardHandle {
    let engine: Rc<dyn EngineSession> = Rc::new(FakeSession::new(config, Box::new(|_: bool| {})));
    BoardHandle::new(SessionId(1), config, engine).unwrap()
}
