//! Turns timed press events on a tile into reveal or mark actions.
//!
//! Every tile keeps its own clock record; presses on different tiles never
//! influence each other. Threshold ties resolve to [`GestureAction::Mark`].

use core::cell::Cell;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use web_time::Instant;

use crate::Position;

/// Milliseconds on the classifier's clock.
pub type Millis = u64;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePolicy {
    /// Holding longer than the threshold reveals, a shorter press marks.
    HoldDuration { threshold_ms: Millis },
    /// Two presses on the same tile closer than the threshold reveal, a lone
    /// press marks.
    DoubleActivation { threshold_ms: Millis },
}

impl GesturePolicy {
    pub const DEFAULT_HOLD_MS: Millis = 200;
    pub const DEFAULT_DOUBLE_MS: Millis = 250;

    pub const fn threshold_ms(self) -> Millis {
        match self {
            Self::HoldDuration { threshold_ms } | Self::DoubleActivation { threshold_ms } => {
                threshold_ms
            }
        }
    }

    pub const fn with_threshold(self, threshold_ms: Millis) -> Self {
        match self {
            Self::HoldDuration { .. } => Self::HoldDuration { threshold_ms },
            Self::DoubleActivation { .. } => Self::DoubleActivation { threshold_ms },
        }
    }
}

impl Default for GesturePolicy {
    fn default() -> Self {
        Self::HoldDuration {
            threshold_ms: Self::DEFAULT_HOLD_MS,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GesturePhase {
    PressStart,
    PressEnd,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub position: Position,
    pub timestamp_ms: Millis,
    pub phase: GesturePhase,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureAction {
    Reveal,
    Mark,
}

pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// Monotonic clock measured from its creation.
#[derive(Copy, Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis().try_into().unwrap_or(Millis::MAX)
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<Millis>>);

impl ManualClock {
    pub fn new(start_ms: Millis) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn set(&self, now_ms: Millis) {
        self.0.set(now_ms);
    }

    pub fn advance(&self, delta_ms: Millis) {
        self.0.set(self.0.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.0.get()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct PendingGesture {
    pressed_at: Option<Millis>,
    last_activation: Option<Millis>,
}

impl PendingGesture {
    const fn is_idle(&self) -> bool {
        self.pressed_at.is_none() && self.last_activation.is_none()
    }
}

#[derive(Debug)]
pub struct GestureClassifier<C = SystemClock> {
    policy: GesturePolicy,
    clock: C,
    pending: HashMap<Position, PendingGesture>,
}

impl GestureClassifier<SystemClock> {
    pub fn new(policy: GesturePolicy) -> Self {
        Self::with_clock(policy, SystemClock::new())
    }
}

impl<C: Clock> GestureClassifier<C> {
    pub fn with_clock(policy: GesturePolicy, clock: C) -> Self {
        Self {
            policy,
            clock,
            pending: HashMap::new(),
        }
    }

    pub fn policy(&self) -> GesturePolicy {
        self.policy
    }

    /// Switches policy, dropping whatever was pending under the old one.
    pub fn set_policy(&mut self, policy: GesturePolicy) {
        if self.policy != policy {
            self.policy = policy;
            self.reset();
        }
    }

    /// Builds an event stamped with the current clock time.
    pub fn stamp(&self, position: Position, phase: GesturePhase) -> GestureEvent {
        GestureEvent {
            position,
            timestamp_ms: self.clock.now_ms(),
            phase,
        }
    }

    pub fn press_start(&mut self, position: Position) -> Option<GestureAction> {
        self.handle(self.stamp(position, GesturePhase::PressStart))
    }

    pub fn press_end(&mut self, position: Position) -> Option<GestureAction> {
        self.handle(self.stamp(position, GesturePhase::PressEnd))
    }

    pub fn handle(&mut self, event: GestureEvent) -> Option<GestureAction> {
        let GestureEvent {
            position,
            timestamp_ms: now,
            phase,
        } = event;

        match phase {
            GesturePhase::PressStart => {
                self.pending.entry(position).or_default().pressed_at = Some(now);
                log::trace!("{} pressed at {}", position, now);
                None
            }
            GesturePhase::PressEnd => {
                let pending = self.pending.get_mut(&position)?;
                let Some(started) = pending.pressed_at.take() else {
                    log::trace!("{} released without a press", position);
                    return None;
                };

                let action = match self.policy {
                    GesturePolicy::HoldDuration { threshold_ms } => {
                        if now.saturating_sub(started) > threshold_ms {
                            GestureAction::Reveal
                        } else {
                            GestureAction::Mark
                        }
                    }
                    GesturePolicy::DoubleActivation { threshold_ms } => {
                        match pending.last_activation {
                            Some(previous) if now.saturating_sub(previous) < threshold_ms => {
                                pending.last_activation = None;
                                GestureAction::Reveal
                            }
                            _ => {
                                pending.last_activation = Some(now);
                                GestureAction::Mark
                            }
                        }
                    }
                };

                if pending.is_idle() {
                    self.pending.remove(&position);
                }
                log::trace!("{} released at {}: {:?}", position, now, action);
                Some(action)
            }
        }
    }

    /// Forgets an unfinished press, e.g. when the pointer leaves the tile.
    pub fn cancel(&mut self, position: Position) {
        if let Some(pending) = self.pending.get_mut(&position) {
            pending.pressed_at = None;
            if pending.is_idle() {
                self.pending.remove(&position);
            }
        }
    }

    /// Drops all per-tile state; used when the board is replaced.
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("discarding {} pending gestures", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn pending_tiles(&self) -> usize {
        self.pending.len()
    }
}
