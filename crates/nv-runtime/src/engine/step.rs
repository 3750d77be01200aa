use nv_core::{NO_OPEN_LABEL_AT_END, NO_STEPS_REMAINING};

use super::*;

/// Where the run loop goes after following an outcome.
enum Flow {
    Settle(Option<Value>),
    Chain(StepProps),
}

impl Narration {
    pub async fn call_label(
        &mut self,
        label: impl Into<LabelId>,
        props: &StepProps,
    ) -> Result<Option<Value>, NarrationError> {
        let label = label.into();
        self.push_label(&label)?;
        self.run_current_step(props).await
    }

    /// Replaces the whole stack with `label`.
    pub async fn jump_label(
        &mut self,
        label: impl Into<LabelId>,
        props: &StepProps,
    ) -> Result<Option<Value>, NarrationError> {
        let label = label.into();
        if !self.labels.contains(label.as_str()) {
            tracing::error!(label = %label, "cannot jump to an unregistered label");
            return Err(NarrationError::label_not_found(label.as_str()));
        }
        self.pop_all();
        self.push_label(&label)?;
        self.run_current_step(props).await
    }

    /// Moves past the current step. Returns `Ok(None)` without advancing
    /// while a menu or input request is pending and nothing answers it.
    pub async fn go_next(
        &mut self,
        props: &StepProps,
        choice_index: Option<usize>,
    ) -> Result<Option<Value>, NarrationError> {
        self.ensure_not_halted()?;
        if self.opened_labels.is_empty() {
            tracing::warn!("go_next with no open label");
            return Ok(None);
        }

        let checkpoint = match choice_index {
            Some(index) => {
                let checkpoint = self.choice_checkpoint();
                self.take_choice(index)?;
                Some(checkpoint)
            }
            None if !self.can_go_next() => {
                tracing::warn!(
                    pending_choices = self.choice_menu_options().len(),
                    awaiting_input = self.input_request().is_some(),
                    "go_next blocked until the player answers"
                );
                return Ok(None);
            }
            None => None,
        };

        let result = self.advance(props).await;
        match checkpoint {
            Some(checkpoint) => self.settle_choice(checkpoint, result),
            None => result,
        }
    }

    pub(super) async fn advance(
        &mut self,
        props: &StepProps,
    ) -> Result<Option<Value>, NarrationError> {
        self.fire_step_end();
        self.advance_top();
        self.run_current_step(props).await
    }

    /// Runs the step on top of the stack, following transitions until one
    /// step settles. Only the settling step gets a history entry.
    pub(super) async fn run_current_step(
        &mut self,
        props: &StepProps,
    ) -> Result<Option<Value>, NarrationError> {
        let mut props = props.clone();
        let mut game_end_fired = false;

        loop {
            let Some(top) = self.opened_labels.last().cloned() else {
                if game_end_fired {
                    self.record_step();
                    return Ok(None);
                }
                let Some(hook) = self.on_game_end.clone() else {
                    self.record_step();
                    self.halted = true;
                    tracing::error!(
                        code = NO_OPEN_LABEL_AT_END,
                        "last label closed and no game end hook is installed"
                    );
                    return Err(NarrationError::new(
                        NO_OPEN_LABEL_AT_END,
                        "No label is open and no game end hook is installed.",
                    ));
                };
                game_end_fired = true;
                self.ended = true;
                tracing::info!("narration reached its end");
                let outcome = hook(&mut StepContext::new(self), &props);
                match self.follow(outcome, &props) {
                    Ok(Flow::Settle(value)) => {
                        self.record_step();
                        return Ok(value);
                    }
                    Ok(Flow::Chain(next)) => {
                        props = next;
                        continue;
                    }
                    Err(error) => {
                        self.record_step();
                        return Err(error);
                    }
                }
            };

            let Some(label) = self.labels.get(top.label.as_str()).cloned() else {
                tracing::error!(label = %top.label, "open label is no longer registered");
                return Err(NarrationError::label_not_found(top.label.as_str()));
            };
            let index = top.current_step_index;

            let Some(step) = label.steps().get(index).cloned() else {
                tracing::warn!(
                    code = NO_STEPS_REMAINING,
                    label = %top.label,
                    index,
                    "label has no steps left, closing it"
                );
                self.mark_label_progress(&top.label, label.step_count());
                self.pop_label();
                if !self.opened_labels.is_empty() {
                    self.fire_step_end();
                    self.advance_top();
                }
                continue;
            };

            if let Some(hook) = label.on_step_start.clone() {
                hook(&mut StepContext::new(self), index);
            }
            if index == 0 {
                if let Some(hook) = label.on_load_step.clone() {
                    hook(&mut StepContext::new(self), index);
                }
            }

            tracing::debug!(label = %top.label, index, "running step");
            let outcome = match step.run(&mut StepContext::new(self), &props).await {
                Ok(outcome) => outcome,
                Err(cause) => {
                    let error = NarrationError::step_failed(top.label.as_str(), index, &cause);
                    tracing::error!(label = %top.label, index, %cause, "step failed");
                    if let Some(hook) = self.on_step_error.clone() {
                        hook(&error, &props);
                    }
                    return Err(error);
                }
            };
            self.mark_label_progress(&top.label, index + 1);

            match self.follow(outcome, &props) {
                Ok(Flow::Settle(value)) => {
                    self.record_step();
                    return Ok(value);
                }
                Ok(Flow::Chain(next)) => props = next,
                Err(error) => {
                    self.record_step();
                    return Err(error);
                }
            }
        }
    }

    fn follow(&mut self, outcome: StepOutcome, props: &StepProps) -> Result<Flow, NarrationError> {
        match outcome {
            StepOutcome::Continue => Ok(Flow::Settle(None)),
            StepOutcome::Value(value) => Ok(Flow::Settle(Some(value))),
            StepOutcome::CallLabel { label, props } => {
                self.push_label(&label)?;
                Ok(Flow::Chain(props))
            }
            StepOutcome::JumpLabel { label, props } => {
                if !self.labels.contains(label.as_str()) {
                    tracing::error!(label = %label, "cannot jump to an unregistered label");
                    return Err(NarrationError::label_not_found(label.as_str()));
                }
                self.pop_all();
                self.push_label(&label)?;
                Ok(Flow::Chain(props))
            }
            StepOutcome::GoNext { props } => {
                self.fire_step_end();
                self.advance_top();
                Ok(Flow::Chain(props))
            }
            StepOutcome::CloseLabel => {
                self.pop_label();
                if !self.opened_labels.is_empty() {
                    self.fire_step_end();
                    self.advance_top();
                }
                Ok(Flow::Chain(props.clone()))
            }
            StepOutcome::CloseAllLabels => {
                self.pop_all();
                Ok(Flow::Chain(props.clone()))
            }
        }
    }
}
