use chrono::prelude::*;
use clap::{Args, ValueEnum};
use gloo::timers::callback::Interval;
use pysweeper_core::*;
use yew::prelude::*;

use crate::board::BoardView;
use crate::dialog::{EndDialog, HelpDialog};
use crate::header::HeaderView;
use crate::pyodide::{HttpFetcher, PyodideInterpreter};
use crate::settings::{Difficulty, Settings};
use crate::utils::*;

pub(crate) type Adapter = GameSessionAdapter<PyodideInterpreter, HttpFetcher>;

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq)]
pub(crate) enum PolicyKind {
    /// Long press reveals, short press marks
    Hold,
    /// Double tap reveals, single tap marks
    Double,
}

#[derive(Args, Properties, Debug, Clone, PartialEq)]
pub(crate) struct GameProps {
    /// Force a seed instead of random
    #[arg(short, long)]
    #[prop_or_default]
    seed: Option<u64>,

    /// Override the stored gesture policy
    #[arg(long, value_enum)]
    #[prop_or_default]
    policy: Option<PolicyKind>,

    /// Override the gesture threshold in milliseconds
    #[arg(long)]
    #[prop_or_default]
    threshold: Option<u64>,
}

impl GameProps {
    fn gesture_policy(&self, stored: GesturePolicy) -> GesturePolicy {
        let policy = match self.policy {
            Some(PolicyKind::Hold) => GesturePolicy::HoldDuration {
                threshold_ms: GesturePolicy::DEFAULT_HOLD_MS,
            },
            Some(PolicyKind::Double) => GesturePolicy::DoubleActivation {
                threshold_ms: GesturePolicy::DEFAULT_DOUBLE_MS,
            },
            None => stored,
        };
        self.threshold
            .map_or(policy, |threshold_ms| policy.with_threshold(threshold_ms))
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Phase {
    Loading,
    Failed(String),
    Playing,
}

pub(crate) enum Msg {
    NewGame(Difficulty),
    Restart,
    Retry,
    GameStarted(Difficulty, Result<SessionId>),
    GameEnded(GameOutcome),
    BoardChanged,
    Hint,
    ShowHelp,
    CloseHelp,
    CloseEndDialog,
    UpdateTime,
}

// Built once so that re-rendering for the timer leaves child props equal.
struct Callbacks {
    new_game: Callback<Difficulty>,
    restart: Callback<()>,
    retry: Callback<MouseEvent>,
    board_changed: Callback<()>,
    hint: Callback<()>,
    show_help: Callback<()>,
    close_help: Callback<()>,
    close_end: Callback<()>,
}

impl Callbacks {
    fn new(link: &yew::html::Scope<GameView>) -> Self {
        use Msg::*;

        Self {
            new_game: link.callback(NewGame),
            restart: link.callback(|_| Restart),
            retry: link.callback(|_| Retry),
            board_changed: link.callback(|_| BoardChanged),
            hint: link.callback(|_| Hint),
            show_help: link.callback(|_| ShowHelp),
            close_help: link.callback(|_| CloseHelp),
            close_end: link.callback(|_| CloseEndDialog),
        }
    }
}

pub(crate) struct GameView {
    adapter: Adapter,
    settings: Settings,
    phase: Phase,
    /// Last difficulty asked for; differs from `settings` while it loads or
    /// after it failed.
    requested: Difficulty,
    flags_left: Option<i32>,
    help_open: bool,
    end_dialog: Option<GameOutcome>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    prev_time: u32,
    callbacks: Callbacks,
    _timer_interval: Interval,
}

impl GameView {
    fn create_timer(ctx: &Context<Self>) -> Interval {
        let link = ctx.link().clone();
        Interval::new(500, move || link.send_message(Msg::UpdateTime))
    }

    fn start_game(&mut self, ctx: &Context<Self>, difficulty: Difficulty) {
        self.requested = difficulty;
        if !self.adapter.bridge().status().is_ready() {
            self.phase = Phase::Loading;
        }

        let adapter = self.adapter.clone();
        ctx.link().send_future(async move {
            let started = adapter.new_game(difficulty.config()).await;
            Msg::GameStarted(difficulty, started.map(|update| update.session_id))
        });
    }

    fn elapsed_secs(&self) -> u32 {
        self.started_at.map_or(0, |started_at| {
            (self.ended_at.unwrap_or_else(utc_now) - started_at)
                .num_seconds()
                .max(0) as u32
        })
    }

    fn refresh_counter(&mut self) {
        self.flags_left = self.adapter.board().map(|board| {
            board.flags_left().unwrap_or_else(|err| {
                log::warn!("cannot count flags: {}", err);
                i32::from(board.mines())
            })
        });
    }

    fn mines_left(&self) -> i32 {
        self.flags_left
            .unwrap_or_else(|| i32::from(self.settings.difficulty.config().mines))
    }

    fn is_playable(&self) -> bool {
        self.phase == Phase::Playing && !self.adapter.is_terminal()
    }
}

impl Component for GameView {
    type Message = Msg;
    type Properties = GameProps;

    fn create(ctx: &Context<Self>) -> Self {
        let settings: Settings = LocalOrDefault::local_or_default();
        let props = ctx.props();

        let bridge = RuntimeBridge::new(
            PyodideInterpreter::default(),
            HttpFetcher,
            BridgeConfig::default(),
        );
        let sink = {
            let link = ctx.link().clone();
            move |outcome: GameOutcome| link.send_message(Msg::GameEnded(outcome))
        };
        let adapter = Adapter::with_policy(
            bridge,
            BoardPublisher::new(),
            props.gesture_policy(settings.gesture),
            sink,
        );
        adapter.set_options(SessionOptions {
            seed: props.seed,
            ..Default::default()
        });

        Self {
            adapter,
            help_open: !settings.help_seen,
            requested: settings.difficulty,
            settings,
            phase: Phase::Loading,
            flags_left: None,
            end_dialog: None,
            started_at: None,
            ended_at: None,
            prev_time: 0,
            callbacks: Callbacks::new(ctx.link()),
            _timer_interval: GameView::create_timer(ctx),
        }
    }

    fn rendered(&mut self, ctx: &Context<Self>, first_render: bool) {
        // the board view subscribed while rendering, so the first game can go out now
        if first_render {
            self.start_game(ctx, self.requested);
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        use Msg::*;

        match msg {
            NewGame(difficulty) => {
                self.end_dialog = None;
                self.start_game(ctx, difficulty);
                true
            }
            Restart => {
                self.end_dialog = None;
                self.start_game(ctx, self.settings.difficulty);
                true
            }
            Retry => {
                self.start_game(ctx, self.requested);
                true
            }
            GameStarted(difficulty, Ok(session_id)) => {
                log::debug!("session {:?} started", session_id);
                if self.settings.difficulty != difficulty {
                    self.settings.difficulty = difficulty;
                    self.settings.local_save();
                }
                self.phase = Phase::Playing;
                self.started_at = Some(utc_now());
                self.ended_at = None;
                self.prev_time = 0;
                self.refresh_counter();
                true
            }
            GameStarted(difficulty, Err(err)) => {
                log::error!("could not start {} game: {}", difficulty.label(), err);
                self.phase = Phase::Failed(err.to_string());
                true
            }
            GameEnded(outcome) => {
                self.ended_at = Some(utc_now());
                self.end_dialog = Some(outcome);
                true
            }
            BoardChanged => {
                self.refresh_counter();
                true
            }
            Hint => match self.adapter.hint() {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("hint failed: {}", err);
                    false
                }
            },
            ShowHelp => {
                self.help_open = true;
                true
            }
            CloseHelp => {
                self.help_open = false;
                if !self.settings.help_seen {
                    self.settings.help_seen = true;
                    self.settings.local_save();
                }
                true
            }
            CloseEndDialog => self.end_dialog.take().is_some(),
            UpdateTime => {
                let time = self.elapsed_secs();
                if self.prev_time != time {
                    self.prev_time = time;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn view(&self, _ctx: &Context<Self>) -> Html {
        let callbacks = &self.callbacks;

        let status = match &self.phase {
            Phase::Loading => html! { <p class="status loading">{"Loading game engine…"}</p> },
            Phase::Failed(reason) => html! {
                <p class="status failed">
                    {format!("The game engine could not be loaded: {}", reason)}
                    <button onclick={callbacks.retry.clone()}>{"Retry"}</button>
                </p>
            },
            Phase::Playing => html! {},
        };

        let help = self.help_open.then(|| {
            html! {
                <HelpDialog
                    policy={self.adapter.gesture_policy()}
                    on_close={callbacks.close_help.clone()}
                />
            }
        });

        let end = self.end_dialog.map(|outcome| {
            html! {
                <EndDialog
                    {outcome}
                    on_new_game={callbacks.restart.clone()}
                    on_close={callbacks.close_end.clone()}
                />
            }
        });

        html! {
            <div class="pysweeper">
                <HeaderView
                    mines_left={self.mines_left()}
                    elapsed_secs={self.elapsed_secs()}
                    difficulty={self.settings.difficulty}
                    outcome={self.adapter.outcome()}
                    playable={self.is_playable()}
                    on_new_game={callbacks.new_game.clone()}
                    on_hint={callbacks.hint.clone()}
                    on_help={callbacks.show_help.clone()}
                />
                {status}
                <BoardView
                    adapter={self.adapter.clone()}
                    playable={self.is_playable()}
                    on_change={callbacks.board_changed.clone()}
                />
                {help}
                {end}
            </div>
        }
    }
}
