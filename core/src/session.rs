use core::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::*;

/// Receives the end-of-game signal, once per session.
pub trait NotificationSink {
    fn game_ended(&self, outcome: GameOutcome);
}

impl<F: Fn(GameOutcome)> NotificationSink for F {
    fn game_ended(&self, outcome: GameOutcome) {
        self(outcome)
    }
}

struct ActiveSession {
    board: BoardHandle,
    ended: Rc<Cell<Option<GameOutcome>>>,
    notified: Cell<bool>,
}

impl ActiveSession {
    fn is_terminal(&self) -> bool {
        self.ended.get().is_some()
    }
}

struct AdapterInner<I: Interpreter, F, C> {
    bridge: RuntimeBridge<I, F>,
    publisher: BoardPublisher,
    sink: Box<dyn NotificationSink>,
    classifier: RefCell<GestureClassifier<C>>,
    session: RefCell<Option<ActiveSession>>,
    last_id: Cell<SessionId>,
    options: Cell<SessionOptions>,
}

/// Single entry point for every game action.
///
/// The engine decides what a reveal or mark means; the adapter only
/// refuses calls it can tell are wrong (no game, game over, off the board)
/// and relays the engine's end-of-game signal.
pub struct GameSessionAdapter<I: Interpreter, F, C = SystemClock> {
    inner: Rc<AdapterInner<I, F, C>>,
}

impl<I: Interpreter, F, C> Clone for GameSessionAdapter<I, F, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I: Interpreter, F, C> PartialEq for GameSessionAdapter<I, F, C> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<I, F, C> GameSessionAdapter<I, F, C>
where
    I: Interpreter + 'static,
    F: BundleFetcher + 'static,
    C: Clock,
{
    pub fn new(
        bridge: RuntimeBridge<I, F>,
        publisher: BoardPublisher,
        classifier: GestureClassifier<C>,
        sink: impl NotificationSink + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(AdapterInner {
                bridge,
                publisher,
                sink: Box::new(sink),
                classifier: RefCell::new(classifier),
                session: RefCell::new(None),
                last_id: Cell::new(SessionId::default()),
                options: Cell::new(SessionOptions::default()),
            }),
        }
    }

    pub fn bridge(&self) -> &RuntimeBridge<I, F> {
        &self.inner.bridge
    }

    pub fn publisher(&self) -> &BoardPublisher {
        &self.inner.publisher
    }

    pub fn set_options(&self, options: SessionOptions) {
        self.inner.options.set(options);
    }

    pub fn gesture_policy(&self) -> GesturePolicy {
        self.inner.classifier.borrow().policy()
    }

    pub fn set_gesture_policy(&self, policy: GesturePolicy) {
        self.inner.classifier.borrow_mut().set_policy(policy);
    }

    pub fn board(&self) -> Option<BoardHandle> {
        self.inner
            .session
            .borrow()
            .as_ref()
            .map(|session| session.board.clone())
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.inner
            .session
            .borrow()
            .as_ref()
            .and_then(|session| session.ended.get())
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Replaces the current session with a fresh one and broadcasts it.
    pub async fn new_game(&self, config: GameConfig) -> Result<BoardUpdate> {
        config.validate()?;

        let ended = Rc::new(Cell::new(None));
        let on_end: EndCallback = {
            let ended = ended.clone();
            Box::new(move |victory| {
                if ended.get().is_none() {
                    ended.set(Some(GameOutcome::from_victory(victory)));
                }
            })
        };

        let options = self.inner.options.get();
        let engine = self
            .inner
            .bridge
            .create_session(config, options, on_end)
            .await?;

        let id = self.inner.last_id.get().next();
        self.inner.last_id.set(id);
        let board = BoardHandle::new(id, config, Rc::from(engine))?;

        self.inner.classifier.borrow_mut().reset();
        *self.inner.session.borrow_mut() = Some(ActiveSession {
            board: board.clone(),
            ended,
            notified: Cell::new(false),
        });
        log::info!(
            "new game {:?}: {}x{} with {} mines",
            id,
            config.rows,
            config.cols,
            config.mines
        );

        let update = BoardUpdate::from(&board);
        self.inner.publisher.broadcast(update.clone());
        self.flush_end_signal();
        Ok(update)
    }

    pub fn reveal(&self, pos: Position) -> Result<()> {
        self.dispatch(Some(pos), |engine| engine.reveal(pos))
    }

    pub fn mark(&self, pos: Position) -> Result<()> {
        self.dispatch(Some(pos), |engine| engine.mark(pos))
    }

    pub fn hint(&self) -> Result<()> {
        self.dispatch(None, |engine| engine.hint())
    }

    /// Runs a press event through the classifier and performs the action it
    /// resolves to, if any.
    pub fn handle_gesture(&self, event: GestureEvent) -> Result<Option<GestureAction>> {
        let action = self.inner.classifier.borrow_mut().handle(event);
        match action {
            Some(GestureAction::Reveal) => self.reveal(event.position)?,
            Some(GestureAction::Mark) => self.mark(event.position)?,
            None => {}
        }
        Ok(action)
    }

    /// Same as [`Self::handle_gesture`], stamped with the classifier's clock.
    pub fn press(&self, position: Position, phase: GesturePhase) -> Result<Option<GestureAction>> {
        let event = self.inner.classifier.borrow().stamp(position, phase);
        self.handle_gesture(event)
    }

    pub fn cancel_press(&self, position: Position) {
        self.inner.classifier.borrow_mut().cancel(position);
    }

    fn dispatch(
        &self,
        pos: Option<Position>,
        call: impl FnOnce(&dyn EngineSession) -> Result<()>,
    ) -> Result<()> {
        let board = {
            let session = self.inner.session.borrow();
            let session = session.as_ref().ok_or(GameError::NoSession)?;
            if session.is_terminal() {
                return Err(GameError::StaleSession);
            }
            session.board.clone()
        };
        if let Some(pos) = pos {
            board.validate_position(pos)?;
        }

        let result = call(board.engine());
        if let Err(err) = &result {
            log::warn!("engine rejected action: {}", err);
        }
        self.flush_end_signal();
        result
    }

    // The engine calls back from inside reveal; forwarding happens here,
    // after the call returned and no borrow is held.
    fn flush_end_signal(&self) {
        let outcome = {
            let session = self.inner.session.borrow();
            match session.as_ref() {
                Some(session) if !session.notified.get() => {
                    let outcome = session.ended.get();
                    session.notified.set(outcome.is_some());
                    outcome
                }
                _ => None,
            }
        };

        if let Some(outcome) = outcome {
            log::info!("game over: {:?}", outcome);
            self.inner.sink.game_ended(outcome);
        }
    }
}

impl<I, F> GameSessionAdapter<I, F, SystemClock>
where
    I: Interpreter + 'static,
    F: BundleFetcher + 'static,
{
    pub fn with_policy(
        bridge: RuntimeBridge<I, F>,
        publisher: BoardPublisher,
        policy: GesturePolicy,
        sink: impl NotificationSink + 'static,
    ) -> Self {
        Self::new(bridge, publisher, GestureClassifier::new(policy), sink)
    }
}
