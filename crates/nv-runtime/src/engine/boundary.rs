use nv_core::{CHOICE_INDEX, STEP_FAILED};

use super::bookkeeping::{read_reserved, write_reserved};
use super::*;

pub(super) const CURRENT_DIALOGUE_KEY: &str = "___current_dialogue___";
pub(super) const LAST_DIALOGUE_STEP_KEY: &str = "___last_dialogue_added_in_step___";
pub(super) const CURRENT_MENU_OPTIONS_KEY: &str = "___current_menu_options___";
pub(super) const LAST_MENU_OPTIONS_STEP_KEY: &str = "___last_menu_options_added_in_step___";
pub(super) const CURRENT_INPUT_REQUEST_KEY: &str = "___current_input_request___";
pub(super) const CURRENT_INPUT_VALUE_KEY: &str = "___current_input_value___";
pub(super) const LAST_INPUT_STEP_KEY: &str = "___last_input_added_in_step___";

/// Narration state from just before a choice was taken.
pub(super) struct ChoiceCheckpoint {
    live: HistoryStepData,
    base: HistoryStepData,
    rng_state: u32,
}

impl Narration {
    pub fn dialogue(&self) -> Option<Dialogue> {
        read_reserved(self.storage.as_ref(), CURRENT_DIALOGUE_KEY)
    }

    pub fn set_dialogue(&mut self, dialogue: Option<Dialogue>) {
        match dialogue {
            Some(dialogue) => {
                write_reserved(self.storage.as_mut(), CURRENT_DIALOGUE_KEY, &dialogue);
                self.touch_marker(LAST_DIALOGUE_STEP_KEY);
            }
            None => self.storage.remove_variable(CURRENT_DIALOGUE_KEY),
        }
    }

    /// Options still on offer, each with its index in the menu as set.
    /// One-time options already taken at this step are left out.
    pub fn choice_menu_options(&self) -> Vec<OfferedChoice> {
        let Some(options) = self.raw_choice_menu_options() else {
            return Vec::new();
        };
        let made = self.already_current_step_made_choices();
        options
            .into_iter()
            .enumerate()
            .filter(|(index, option)| !(option.one_time && made.contains(index)))
            .map(|(index, option)| OfferedChoice { index, option })
            .collect()
    }

    pub(super) fn raw_choice_menu_options(&self) -> Option<Vec<ChoiceOption>> {
        read_reserved(self.storage.as_ref(), CURRENT_MENU_OPTIONS_KEY)
    }

    pub fn set_choice_menu_options(&mut self, options: Option<Vec<ChoiceOption>>) {
        match options {
            Some(options) if !options.is_empty() => {
                write_reserved(self.storage.as_mut(), CURRENT_MENU_OPTIONS_KEY, &options);
                self.touch_marker(LAST_MENU_OPTIONS_STEP_KEY);
            }
            _ => self.storage.remove_variable(CURRENT_MENU_OPTIONS_KEY),
        }
    }

    pub fn input_request(&self) -> Option<InputRequest> {
        read_reserved(self.storage.as_ref(), CURRENT_INPUT_REQUEST_KEY)
    }

    /// Blocks `go_next` until a value is supplied with `set_input_value`.
    pub fn request_input(&mut self, request: InputRequest) {
        write_reserved(self.storage.as_mut(), CURRENT_INPUT_REQUEST_KEY, &request);
        self.storage.remove_variable(CURRENT_INPUT_VALUE_KEY);
    }

    pub fn input_value(&self) -> Option<Value> {
        self.storage.get_variable(CURRENT_INPUT_VALUE_KEY)
    }

    pub fn set_input_value(&mut self, value: Value) {
        self.storage.set_variable(CURRENT_INPUT_VALUE_KEY, value);
        self.storage.remove_variable(CURRENT_INPUT_REQUEST_KEY);
        self.touch_marker(LAST_INPUT_STEP_KEY);
    }

    pub fn can_go_next(&self) -> bool {
        self.choice_menu_options().is_empty() && self.input_request().is_none()
    }

    /// Stamps a slot with the step counter so the history entry for this
    /// step knows the slot was written during it.
    fn touch_marker(&mut self, key: &str) {
        self.storage
            .set_variable(key, Value::from(self.last_step_index));
    }

    pub(super) fn touched_this_step(&self, key: &str) -> bool {
        self.storage
            .get_variable(key)
            .and_then(|value| value.as_u64())
            .is_some_and(|step| step == self.last_step_index)
    }

    pub(super) fn choice_checkpoint(&self) -> ChoiceCheckpoint {
        ChoiceCheckpoint {
            live: self.capture_snapshot(),
            base: self.last_snapshot.clone(),
            rng_state: self.rng_state,
        }
    }

    /// A choice whose follow-up step fails is not consumed: the menu is put
    /// back and the ledger forgets the answer, so the player can pick again.
    pub(super) fn settle_choice(
        &mut self,
        checkpoint: ChoiceCheckpoint,
        result: Result<Option<Value>, NarrationError>,
    ) -> Result<Option<Value>, NarrationError> {
        match result {
            Err(error) if error.is(STEP_FAILED) => {
                tracing::warn!(%error, "choice follow-up failed, menu restored");
                if let Err(restore_error) = self.restore_snapshot(checkpoint.live) {
                    tracing::error!(%restore_error, "could not restore the menu");
                }
                self.last_snapshot = checkpoint.base;
                self.rng_state = checkpoint.rng_state;
                self.ended = false;
                Err(error)
            }
            other => other,
        }
    }

    /// Validates a choice against the pending menu, stores it in the ledger
    /// and clears the menu. The index is stamped on the next history entry.
    pub(super) fn take_choice(&mut self, index: usize) -> Result<ChoiceOption, NarrationError> {
        let offered = self.choice_menu_options();
        let Some(choice) = offered.into_iter().find(|choice| choice.index == index) else {
            tracing::warn!(index, "choice index is not on offer");
            return Err(NarrationError::new(
                CHOICE_INDEX,
                format!("Choice index {} is not among the pending options.", index),
            ));
        };

        self.mark_choice_made(index);
        self.set_choice_menu_options(None);
        self.pending_choice_made = Some(index);
        Ok(choice.option)
    }

    /// Runs the option's own target: call or jump to its label, or close
    /// the current label and continue with the caller.
    pub async fn select_choice(
        &mut self,
        index: usize,
        props: &StepProps,
    ) -> Result<Option<Value>, NarrationError> {
        self.ensure_not_halted()?;
        let target_label = self
            .choice_menu_options()
            .into_iter()
            .find(|choice| choice.index == index)
            .and_then(|choice| match choice.option.target {
                ChoiceTarget::Call { label } | ChoiceTarget::Jump { label } => Some(label),
                ChoiceTarget::Close => None,
            });
        if let Some(label) = target_label {
            if !self.labels.contains(label.as_str()) {
                tracing::error!(label = %label, "choice points at an unregistered label");
                return Err(NarrationError::label_not_found(label.as_str()));
            }
        }

        let checkpoint = self.choice_checkpoint();
        let option = self.take_choice(index)?;
        let props = if option.props.is_null() {
            props.clone()
        } else {
            option.props.clone()
        };
        tracing::debug!(index, text = %option.text, "choice selected");

        let result = match option.target {
            ChoiceTarget::Call { label } => self.call_label(label, &props).await,
            ChoiceTarget::Jump { label } => self.jump_label(label, &props).await,
            ChoiceTarget::Close => {
                self.pop_label();
                if self.opened_labels.is_empty() {
                    self.run_current_step(&props).await
                } else {
                    self.advance(&props).await
                }
            }
        };
        self.settle_choice(checkpoint, result)
    }
}
