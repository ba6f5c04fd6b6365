use core::cell::RefCell;
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use std::rc::Rc;

use crate::*;

/// New-game event delivered to board views.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardUpdate {
    pub session_id: SessionId,
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
    pub board: BoardHandle,
}

impl From<&BoardHandle> for BoardUpdate {
    fn from(board: &BoardHandle) -> Self {
        Self {
            session_id: board.id(),
            rows: board.rows(),
            cols: board.cols(),
            mines: board.mines(),
            board: board.clone(),
        }
    }
}

pub type BoardSubscription = UnboundedReceiver<BoardUpdate>;

/// Fan-out of new-game events from the session adapter.
///
/// There is one producer. Subscribers only see broadcasts made after they
/// subscribed; nothing is replayed. Clones share the subscriber list.
#[derive(Clone, Default)]
pub struct BoardPublisher {
    subscribers: Rc<RefCell<Vec<UnboundedSender<BoardUpdate>>>>,
}

impl BoardPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> BoardSubscription {
        let (sender, receiver) = unbounded();
        self.subscribers.borrow_mut().push(sender);
        receiver
    }

    /// Sends `update` to every live subscriber and returns how many got it.
    pub fn broadcast(&self, update: BoardUpdate) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|sender| sender.unbounded_send(update.clone()).is_ok());
        log::debug!(
            "board {:?} ({}x{}) sent to {} subscribers",
            update.session_id,
            update.rows,
            update.cols,
            subscribers.len()
        );
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl PartialEq for BoardPublisher {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.subscribers, &other.subscribers)
    }
}
