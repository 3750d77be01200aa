use nv_core::{SAVE_INVALID, SAVE_SCHEMA};
use serde::{Deserialize, Serialize};

use super::*;

pub const NARRATION_SAVE_SCHEMA: &str = "narration-save.v1";

/// Everything needed to resume a narration.
///
/// `last_snapshot` is the state as of the last recorded step and stays the
/// base `go_back` replays diffs against. Writes made after that step (a
/// submitted input, a UI storage write) travel in `live_snapshot`, which is
/// omitted when nothing changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationSave {
    pub schema_version: String,
    pub history: Vec<HistoryEntry>,
    pub opened_labels: Vec<OpenedLabel>,
    pub last_step_index: u64,
    pub last_snapshot: HistoryStepData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_snapshot: Option<HistoryStepData>,
    pub rng_state: u32,
}

impl Narration {
    pub fn export_state(&self) -> NarrationSave {
        let live = self.capture_snapshot();
        NarrationSave {
            schema_version: NARRATION_SAVE_SCHEMA.to_string(),
            history: self.history.clone(),
            opened_labels: self.opened_labels.clone(),
            last_step_index: self.last_step_index,
            last_snapshot: self.last_snapshot.clone(),
            live_snapshot: (live != self.last_snapshot).then_some(live),
            rng_state: self.rng_state,
        }
    }

    pub fn export_json(&self) -> Result<String, NarrationError> {
        serde_json::to_string(&self.export_state()).map_err(|error| {
            tracing::error!(%error, "failed to encode save");
            NarrationError::new(SAVE_INVALID, format!("Failed to encode save: {}", error))
        })
    }

    /// Replaces the whole narration state with `save`, then fires
    /// `on_load_step` for the step the save stopped on.
    pub fn import_state(&mut self, save: NarrationSave) -> Result<(), NarrationError> {
        if save.schema_version != NARRATION_SAVE_SCHEMA {
            tracing::error!(schema = %save.schema_version, "unsupported save schema");
            return Err(NarrationError::new(
                SAVE_SCHEMA,
                format!(
                    "Save schema \"{}\" is not supported, expected \"{}\".",
                    save.schema_version, NARRATION_SAVE_SCHEMA
                ),
            ));
        }
        if let Some(missing) = save
            .opened_labels
            .iter()
            .find(|opened| !self.labels.contains(opened.label.as_str()))
        {
            tracing::error!(label = %missing.label, "save opens a label that is not registered");
            return Err(NarrationError::label_not_found(missing.label.as_str()));
        }

        let recorded = save.last_snapshot;
        let mut live = save.live_snapshot.unwrap_or_else(|| recorded.clone());
        live.opened_labels = save.opened_labels;
        self.restore_snapshot(live)?;
        self.last_snapshot = recorded;
        self.history = save.history;
        self.last_step_index = save.last_step_index;
        self.rng_state = save.rng_state;
        self.ended = self.opened_labels.is_empty() && !self.history.is_empty();
        tracing::debug!(
            entries = self.history.len(),
            step = self.last_step_index,
            "save imported"
        );

        self.fire_load_step();
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<(), NarrationError> {
        let save: NarrationSave = serde_json::from_str(json).map_err(|error| {
            tracing::error!(%error, "save document does not decode");
            NarrationError::new(SAVE_INVALID, format!("Save document is invalid: {}", error))
        })?;
        self.import_state(save)
    }
}
