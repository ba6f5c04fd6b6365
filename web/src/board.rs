use bitflags::bitflags;
use futures_util::StreamExt;
use pysweeper_core::{BoardHandle, BoardUpdate, GesturePhase, Position, TileState};
use yew::prelude::*;

use crate::game::Adapter;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    struct PointerButtons: u16 {
        const PRIMARY   = 1;
        const SECONDARY = 1 << 1;
        const AUXILIARY = 1 << 2;
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum TileEvent {
    Press(Position, GesturePhase),
    Leave(Position),
}

#[derive(Properties, Clone, PartialEq)]
struct TileProps {
    position: Position,
    tile: TileState,
    #[prop_or_default]
    pressed: bool,
    callback: Callback<TileEvent>,
}

#[function_component(TileView)]
fn tile_component(props: &TileProps) -> Html {
    let TileProps {
        position,
        tile,
        pressed,
        callback,
    } = props.clone();

    let class = classes!(
        "tile",
        tile.class_name(),
        tile.is_closed().then_some("closed"),
        pressed.then_some("pressed")
    );

    let onpointerdown = {
        let callback = callback.clone();
        Callback::from(move |e: PointerEvent| {
            let buttons = PointerButtons::from_bits_truncate(e.buttons());
            log::trace!("{} pointer down ({:?})", position, buttons);
            if buttons == PointerButtons::PRIMARY {
                callback.emit(TileEvent::Press(position, GesturePhase::PressStart));
            }
        })
    };

    let onpointerup = {
        let callback = callback.clone();
        Callback::from(move |e: PointerEvent| {
            log::trace!("{} pointer up (button {})", position, e.button());
            if e.button() == 0 {
                callback.emit(TileEvent::Press(position, GesturePhase::PressEnd));
            }
        })
    };

    let onpointerleave = Callback::from(move |_: PointerEvent| {
        log::trace!("{} pointer leave", position);
        callback.emit(TileEvent::Leave(position));
    });

    html! {
        <td {class} {onpointerdown} {onpointerup} {onpointerleave}>
            {tile.glyph().to_string()}
        </td>
    }
}

#[derive(Properties, Clone, PartialEq)]
pub(crate) struct BoardProps {
    pub adapter: Adapter,
    #[prop_or_default]
    pub playable: bool,
    /// Fired after an action reached the engine.
    pub on_change: Callback<()>,
}

pub(crate) enum BoardMsg {
    NewBoard(BoardUpdate),
    Tile(TileEvent),
}

/// Renders whichever board the publisher announced last.
pub(crate) struct BoardView {
    board: Option<BoardHandle>,
    pressed: Option<Position>,
}

impl Component for BoardView {
    type Message = BoardMsg;
    type Properties = BoardProps;

    fn create(ctx: &Context<Self>) -> Self {
        // must happen before the first game starts, updates are not replayed
        let mut subscription = ctx.props().adapter.publisher().subscribe();
        let link = ctx.link().clone();
        wasm_bindgen_futures::spawn_local(async move {
            while let Some(update) = subscription.next().await {
                link.send_message(BoardMsg::NewBoard(update));
            }
        });

        Self {
            board: None,
            pressed: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            BoardMsg::NewBoard(update) => {
                log::debug!(
                    "board {:?}: {}x{}",
                    update.session_id,
                    update.rows,
                    update.cols
                );
                self.board = Some(update.board);
                self.pressed = None;
                true
            }
            BoardMsg::Tile(TileEvent::Leave(pos)) => {
                ctx.props().adapter.cancel_press(pos);
                self.pressed.take().is_some()
            }
            BoardMsg::Tile(TileEvent::Press(pos, phase)) => {
                self.pressed = match phase {
                    GesturePhase::PressStart => Some(pos),
                    GesturePhase::PressEnd => None,
                };
                match ctx.props().adapter.press(pos, phase) {
                    Ok(Some(action)) => {
                        log::debug!("{:?} {}", action, pos);
                        ctx.props().on_change.emit(());
                    }
                    Ok(None) => {}
                    Err(err) => log::warn!("{} at {} rejected: {}", phase_name(phase), pos, err),
                }
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let Some(board) = &self.board else {
            return html! { <table class="board loading"/> };
        };
        let callback = ctx.link().callback(BoardMsg::Tile);

        html! {
            <table
                class={classes!("board", ctx.props().playable.then_some("playable"))}
                oncontextmenu={Callback::from(|e: MouseEvent| e.prevent_default())}
            >
                {
                    for (0..board.rows()).map(|row| html! {
                        <tr>
                            {
                                for (0..board.cols()).map(|col| {
                                    let position = Position::new(row, col);
                                    let tile = board.tile(position).get().unwrap_or_else(|err| {
                                        log::error!("cannot read tile {}: {}", position, err);
                                        TileState::Hidden
                                    });
                                    let pressed = self.pressed == Some(position) && tile.is_closed();
                                    let callback = callback.clone();
                                    html! {
                                        <TileView {position} {tile} {pressed} {callback}/>
                                    }
                                })
                            }
                        </tr>
                    })
                }
            </table>
        }
    }
}

fn phase_name(phase: GesturePhase) -> &'static str {
    match phase {
        GesturePhase::PressStart => "press",
        GesturePhase::PressEnd => "release",
    }
}
