use nv_core::{DIFF_REPLAY_FAILED, GO_BACK_UNDERFLOW};

use super::boundary::{
    CURRENT_INPUT_VALUE_KEY, LAST_DIALOGUE_STEP_KEY, LAST_INPUT_STEP_KEY,
    LAST_MENU_OPTIONS_STEP_KEY,
};
use super::*;

impl Narration {
    pub fn capture_snapshot(&self) -> HistoryStepData {
        HistoryStepData {
            path: self.path.clone(),
            storage: self.storage.export(),
            canvas: self.canvas.export(),
            sound: self.sound.export(),
            label_index: self.current_step_index(),
            opened_labels: self.opened_labels.clone(),
        }
    }

    pub(super) fn record_step(&mut self) -> bool {
        let choice_made = self.pending_choice_made.take();
        let snapshot = self.capture_snapshot();
        self.record(snapshot, choice_made)
    }

    /// Appends a history entry for `snapshot` unless nothing moved since the
    /// previous one. Returns whether an entry was added.
    pub(super) fn record(&mut self, snapshot: HistoryStepData, choice_made: Option<usize>) -> bool {
        let changes = diff(&self.last_snapshot.to_value(), &snapshot.to_value());
        if changes.is_empty() && snapshot.same_position(&self.last_snapshot) {
            tracing::debug!(index = self.last_step_index, "snapshot unchanged, nothing recorded");
            return false;
        }

        let dialogue = if self.touched_this_step(LAST_DIALOGUE_STEP_KEY) {
            self.dialogue()
        } else {
            None
        };
        let choices = if self.touched_this_step(LAST_MENU_OPTIONS_STEP_KEY) {
            self.raw_choice_menu_options()
        } else {
            None
        };
        let input_value = if self.touched_this_step(LAST_INPUT_STEP_KEY) {
            self.storage.get_variable(CURRENT_INPUT_VALUE_KEY)
        } else {
            None
        };

        let entry = HistoryEntry {
            diff: changes,
            current_label: self.current_label().cloned(),
            step_hash: self.current_step_hash(),
            index: self.last_step_index,
            label_step_index: self.current_step_index(),
            dialogue,
            choices,
            choice_index_made: choice_made,
            input_value,
        };
        tracing::debug!(
            index = entry.index,
            label = ?entry.current_label,
            changes = entry.diff.len(),
            "history entry recorded"
        );
        self.history.push(entry);

        if let Some(limit) = self.history_limit {
            if self.history.len() > limit {
                let excess = self.history.len() - limit;
                self.history.drain(..excess);
            }
        }

        self.last_snapshot = snapshot;
        self.last_step_index += 1;
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.history.len() > 1
    }

    /// Reverts up to `steps` entries, never the first one. `navigate` gets
    /// the restored path before `on_load_step` fires.
    ///
    /// If an entry cannot be reverted, the state stops at the last entry
    /// that could and the error is returned.
    pub fn go_back(
        &mut self,
        mut navigate: impl FnMut(&str),
        steps: usize,
    ) -> Result<(), NarrationError> {
        if steps == 0 || self.history.len() < 2 {
            tracing::warn!(steps, entries = self.history.len(), "nothing to go back to");
            return Err(NarrationError::new(
                GO_BACK_UNDERFLOW,
                format!(
                    "Cannot go back {} step(s) with {} history entries.",
                    steps,
                    self.history.len()
                ),
            ));
        }

        let count = steps.min(self.history.len() - 1);
        let mut current = self.last_snapshot.to_value();
        let mut reverted = 0;
        let mut failure = None;
        for entry in self.history.iter().rev().take(count) {
            match revert(&current, &entry.diff) {
                Ok(previous) => {
                    current = previous;
                    reverted += 1;
                }
                Err(error) => {
                    tracing::error!(index = entry.index, %error, "history entry could not be reverted");
                    failure = Some(error);
                    break;
                }
            }
        }
        if reverted == 0 {
            return Err(failure.unwrap_or_else(|| {
                NarrationError::new(DIFF_REPLAY_FAILED, "No history entry was reverted.")
            }));
        }

        let snapshot = HistoryStepData::from_value(current).map_err(|error| {
            tracing::error!(%error, "reverted snapshot does not decode");
            NarrationError::new(
                DIFF_REPLAY_FAILED,
                format!("Reverted snapshot is malformed: {}", error),
            )
        })?;

        self.restore_snapshot(snapshot)?;
        let keep = self.history.len() - reverted;
        let resume_index = self.history[keep].index;
        self.history.truncate(keep);
        self.last_step_index = resume_index;
        self.ended = false;
        tracing::debug!(reverted, resume_index, "went back in history");

        navigate(&self.path);
        self.fire_load_step();

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Loads a snapshot into the collaborators and the stack. A collaborator
    /// that refuses the import rolls every collaborator back.
    pub(super) fn restore_snapshot(&mut self, snapshot: HistoryStepData) -> Result<(), NarrationError> {
        let rollback = self.capture_snapshot();
        if let Err(error) = self.import_collaborators(&snapshot) {
            tracing::error!(%error, "snapshot import failed, rolling back");
            if let Err(rollback_error) = self.import_collaborators(&rollback) {
                tracing::error!(%rollback_error, "rollback import failed as well");
            }
            return Err(error);
        }

        self.opened_labels = snapshot.opened_labels.clone();
        self.path = snapshot.path.clone();
        self.last_snapshot = snapshot;
        self.pending_choice_made = None;
        self.halted = false;
        Ok(())
    }

    fn import_collaborators(&mut self, snapshot: &HistoryStepData) -> Result<(), NarrationError> {
        self.storage.import(snapshot.storage.clone())?;
        self.canvas.import(snapshot.canvas.clone())?;
        self.sound.import(snapshot.sound.clone())
    }
}
