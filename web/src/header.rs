use pysweeper_core::GameOutcome;
use yew::prelude::*;

use crate::settings::Difficulty;
use crate::utils::format_for_counter;

#[derive(Properties, Clone, PartialEq)]
pub(crate) struct HeaderProps {
    pub mines_left: i32,
    pub elapsed_secs: u32,
    pub difficulty: Difficulty,
    #[prop_or_default]
    pub outcome: Option<GameOutcome>,
    #[prop_or_default]
    pub playable: bool,
    pub on_new_game: Callback<Difficulty>,
    pub on_hint: Callback<()>,
    pub on_help: Callback<()>,
}

#[function_component]
pub(crate) fn HeaderView(props: &HeaderProps) -> Html {
    let HeaderProps {
        mines_left,
        elapsed_secs,
        difficulty,
        outcome,
        playable,
        on_new_game,
        on_hint,
        on_help,
    } = props.clone();

    let state_class = match outcome {
        Some(GameOutcome::Victory) => "win",
        Some(GameOutcome::Defeat) => "lose",
        None if playable => "in-progress",
        None => "not-started",
    };

    let restart = {
        let on_new_game = on_new_game.clone();
        Callback::from(move |e: MouseEvent| {
            e.stop_propagation();
            on_new_game.emit(difficulty);
        })
    };

    html! {
        <header>
            <nav>
                <aside>{format_for_counter(mines_left)}</aside>
                <span><button class={classes!("face", state_class)} onclick={restart}/></span>
                <aside>{format_for_counter(elapsed_secs.try_into().unwrap_or(i32::MAX))}</aside>
            </nav>
            <menu>
                {
                    for Difficulty::ALL.into_iter().map(|choice| {
                        let on_new_game = on_new_game.clone();
                        let onclick = Callback::from(move |_: MouseEvent| on_new_game.emit(choice));
                        html! {
                            <li>
                                <button class={classes!((choice == difficulty).then_some("selected"))} {onclick}>
                                    {choice.label()}
                                </button>
                            </li>
                        }
                    })
                }
                <li>
                    <button disabled={!playable} onclick={Callback::from(move |_: MouseEvent| on_hint.emit(()))}>
                        {"Hint"}
                    </button>
                </li>
                <li>
                    <button onclick={Callback::from(move |_: MouseEvent| on_help.emit(()))}>{"Help"}</button>
                </li>
            </menu>
        </header>
    }
}
