use pysweeper_core::{GameOutcome, GesturePolicy};
use yew::prelude::*;

use crate::utils::Modal;

#[derive(Properties, Clone, PartialEq)]
pub(crate) struct HelpProps {
    pub policy: GesturePolicy,
    pub on_close: Callback<()>,
}

fn instructions(policy: GesturePolicy) -> String {
    match policy {
        GesturePolicy::HoldDuration { threshold_ms } => format!(
            "Tap a tile to cycle its mark. Hold for more than {} ms to reveal it.",
            threshold_ms
        ),
        GesturePolicy::DoubleActivation { threshold_ms } => format!(
            "Tap a tile to cycle its mark. Tap twice within {} ms to reveal it.",
            threshold_ms
        ),
    }
}

#[function_component]
pub(crate) fn HelpDialog(props: &HelpProps) -> Html {
    let instructions = instructions(props.policy);
    let on_close = props.on_close.clone();

    html! {
        <Modal>
            <dialog id="help" open={true}>
                <article>
                    <h2>{"How to play"}</h2>
                    <p>{"Reveal every tile that does not hide a mine. Numbers tell how many of the neighbouring tiles are mines."}</p>
                    <p>{instructions}</p>
                    <footer>
                        <button onclick={Callback::from(move |_: MouseEvent| on_close.emit(()))}>{"Play"}</button>
                    </footer>
                </article>
            </dialog>
        </Modal>
    }
}

#[derive(Properties, Clone, PartialEq)]
pub(crate) struct EndProps {
    pub outcome: GameOutcome,
    pub on_new_game: Callback<()>,
    pub on_close: Callback<()>,
}

#[function_component]
pub(crate) fn EndDialog(props: &EndProps) -> Html {
    let (title, body) = match props.outcome {
        GameOutcome::Victory => ("You won!", "Every safe tile is open."),
        GameOutcome::Defeat => ("Boom!", "That one was a mine."),
    };
    let on_new_game = props.on_new_game.clone();
    let on_close = props.on_close.clone();

    html! {
        <Modal>
            <dialog id="game-end" open={true}>
                <article>
                    <h2>{title}</h2>
                    <p>{body}</p>
                    <footer>
                        <button type="reset" onclick={Callback::from(move |_: MouseEvent| on_close.emit(()))}>
                            {"Close"}
                        </button>
                        <button onclick={Callback::from(move |_: MouseEvent| on_new_game.emit(()))}>
                            {"New game"}
                        </button>
                    </footer>
                </article>
            </dialog>
        </Modal>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_leave_mark_order_to_the_engine() {
        let policies = [
            GesturePolicy::HoldDuration { threshold_ms: 200 },
            GesturePolicy::DoubleActivation { threshold_ms: 250 },
        ];
        for policy in policies {
            let text = instructions(policy);
            assert!(text.contains("cycle its mark"));
            assert!(!text.contains("flag"));
            assert!(text.contains(&policy.threshold_ms().to_string()));
        }
    }
}
