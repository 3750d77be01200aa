use super::*;

impl Narration {
    pub(super) fn push_label(&mut self, label: &LabelId) -> Result<(), NarrationError> {
        if !self.labels.contains(label.as_str()) {
            tracing::error!(label = %label, "cannot open an unregistered label");
            return Err(NarrationError::label_not_found(label.as_str()));
        }

        self.opened_labels.push(OpenedLabel {
            label: label.clone(),
            current_step_index: 0,
        });
        self.count_label_opened(label);
        self.ended = false;
        self.halted = false;
        tracing::debug!(label = %label, depth = self.opened_labels.len(), "label opened");
        Ok(())
    }

    pub(super) fn pop_label(&mut self) -> Option<OpenedLabel> {
        let popped = self.opened_labels.pop();
        match &popped {
            Some(opened) => {
                tracing::debug!(label = %opened.label, depth = self.opened_labels.len(), "label closed")
            }
            None => tracing::warn!("close requested with no open label"),
        }
        popped
    }

    pub(super) fn pop_all(&mut self) {
        while !self.opened_labels.is_empty() {
            self.pop_label();
        }
    }

    pub(super) fn advance_top(&mut self) {
        match self.opened_labels.last_mut() {
            Some(top) => top.current_step_index += 1,
            None => tracing::error!("cannot advance a step with no open label"),
        }
    }

    pub(super) fn fire_step_end(&mut self) {
        let Some(top) = self.opened_labels.last().cloned() else {
            return;
        };
        let hook = self
            .labels
            .get(top.label.as_str())
            .and_then(|label| label.on_step_end.clone());
        if let Some(hook) = hook {
            hook(&mut StepContext::new(self), top.current_step_index);
        }
    }

    pub(super) fn fire_load_step(&mut self) {
        let Some(top) = self.opened_labels.last().cloned() else {
            return;
        };
        let hook = self
            .labels
            .get(top.label.as_str())
            .and_then(|label| label.on_load_step.clone());
        if let Some(hook) = hook {
            hook(&mut StepContext::new(self), top.current_step_index);
        }
    }

    /// Pops the current label. The caller continues on its next step; with
    /// nothing left open the game end hook runs.
    pub async fn close_current_label(
        &mut self,
        props: &StepProps,
    ) -> Result<Option<Value>, NarrationError> {
        self.ensure_not_halted()?;
        if self.pop_label().is_none() {
            return Ok(None);
        }
        if self.opened_labels.is_empty() {
            return self.run_current_step(props).await;
        }
        self.advance(props).await
    }

    pub async fn close_all_labels(
        &mut self,
        props: &StepProps,
    ) -> Result<Option<Value>, NarrationError> {
        self.ensure_not_halted()?;
        self.pop_all();
        self.run_current_step(props).await
    }
}
