use nv_core::TranscriptChoice;

use super::*;

/// Folds the history log into what the player saw: dialogue lines and the
/// menus offered, with the answer picked marked on the menu it answered.
pub fn narrative_history(entries: &[HistoryEntry]) -> Vec<TranscriptEntry> {
    let mut transcript: Vec<TranscriptEntry> = Vec::new();
    let mut open_menu: Option<usize> = None;

    for entry in entries {
        if let Some(choice_index) = entry.choice_index_made {
            match open_menu.take().and_then(|at| transcript.get_mut(at)) {
                Some(menu) => {
                    if let Some(choice) = menu
                        .choices
                        .as_mut()
                        .and_then(|choices| choices.get_mut(choice_index))
                    {
                        choice.is_response = true;
                        menu.player_made_choice = true;
                    }
                }
                None => tracing::debug!(
                    index = entry.index,
                    choice_index,
                    "choice made without a recorded menu"
                ),
            }
        }

        let choices = entry.choices.as_ref().map(|options| {
            options
                .iter()
                .map(|option| TranscriptChoice {
                    text: option.text.clone(),
                    is_response: false,
                })
                .collect::<Vec<_>>()
        });
        if entry.dialogue.is_none() && choices.is_none() {
            continue;
        }
        if choices.is_some() {
            open_menu = Some(transcript.len());
        }
        transcript.push(TranscriptEntry {
            dialogue: entry.dialogue.clone(),
            choices,
            player_made_choice: false,
            step_index: entry.index,
        });
    }

    transcript
}

impl Narration {
    pub fn narrative_history(&self) -> Vec<TranscriptEntry> {
        narrative_history(&self.history)
    }
}
