use std::collections::BTreeMap;

use nv_core::RANDOM_RANGE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::*;

pub(super) const OPENED_LABELS_COUNTER_KEY: &str = "___opened_labels_counter___";
pub(super) const ALL_CHOICES_MADE_KEY: &str = "___all_choices_made___";
pub(super) const ONCE_RANDOM_DRAWS_KEY: &str = "___once_random_draws___";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomOptions {
    /// Never return the same number twice for the current step.
    pub once_only: bool,
    /// Distinguishes several once-only draws made by one step.
    pub nested_id: Option<u32>,
}

impl RandomOptions {
    pub fn once_only() -> Self {
        Self {
            once_only: true,
            nested_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnceDraws {
    step_hash: StepHash,
    drawn: Vec<i64>,
}

pub(super) fn read_reserved<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let value = storage.get_variable(key)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            tracing::warn!(key, %error, "reserved storage slot has an unexpected shape, ignoring it");
            None
        }
    }
}

pub(super) fn write_reserved<T: Serialize>(storage: &mut dyn Storage, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(encoded) => storage.set_variable(key, encoded),
        Err(error) => tracing::error!(key, %error, "failed to encode reserved storage slot"),
    }
}

impl Narration {
    pub fn label_progress(&self, label: &str) -> Option<LabelProgress> {
        let counters: BTreeMap<String, LabelProgress> =
            read_reserved(self.storage.as_ref(), OPENED_LABELS_COUNTER_KEY)?;
        counters.get(label).copied()
    }

    pub(super) fn count_label_opened(&mut self, label: &LabelId) {
        self.update_label_progress(label, |progress| progress.open_count += 1);
    }

    /// Raises the label's high-water mark; never lowers it.
    pub(super) fn mark_label_progress(&mut self, label: &LabelId, reached: usize) {
        self.update_label_progress(label, |progress| {
            progress.biggest_step = progress.biggest_step.max(reached);
        });
    }

    fn update_label_progress(&mut self, label: &LabelId, update: impl FnOnce(&mut LabelProgress)) {
        let mut counters: BTreeMap<String, LabelProgress> =
            read_reserved(self.storage.as_ref(), OPENED_LABELS_COUNTER_KEY).unwrap_or_default();
        update(counters.entry(label.to_string()).or_default());
        write_reserved(self.storage.as_mut(), OPENED_LABELS_COUNTER_KEY, &counters);
    }

    /// Best effort: the high-water mark is compared with the label as it is
    /// defined now, so a label that grew since the save reads as unfinished.
    pub fn is_label_already_completed(&self, label: &str) -> bool {
        let Some(definition) = self.labels.get(label) else {
            tracing::warn!(label, "completion check for an unregistered label");
            return false;
        };
        self.label_progress(label)
            .map(|progress| progress.biggest_step >= definition.step_count())
            .unwrap_or(false)
    }

    pub fn choices_made(&self) -> Vec<ChoiceMade> {
        read_reserved(self.storage.as_ref(), ALL_CHOICES_MADE_KEY).unwrap_or_default()
    }

    pub(super) fn mark_choice_made(&mut self, choice_index: usize) {
        let Some(top) = self.opened_labels.last().cloned() else {
            tracing::warn!(choice_index, "choice made with no open label");
            return;
        };
        let Some(step_hash) = self.current_step_hash() else {
            tracing::warn!(label = %top.label, "choice made outside of a known step");
            return;
        };

        let mut made = self.choices_made();
        match made.iter_mut().find(|entry| {
            entry.matches(&top.label, top.current_step_index, choice_index, &step_hash)
        }) {
            Some(entry) => entry.made_times += 1,
            None => made.push(ChoiceMade {
                label: top.label,
                step_index: top.current_step_index,
                choice_index,
                step_hash,
                made_times: 1,
            }),
        }
        write_reserved(self.storage.as_mut(), ALL_CHOICES_MADE_KEY, &made);
    }

    /// Choice indices already taken at the current step. A step whose code
    /// changed since the choice was made reads as untouched.
    pub fn already_current_step_made_choices(&self) -> Vec<usize> {
        let (Some(top), Some(step_hash)) = (self.opened_labels.last(), self.current_step_hash())
        else {
            return Vec::new();
        };
        self.choices_made()
            .into_iter()
            .filter(|entry| {
                entry.label == top.label
                    && entry.step_index == top.current_step_index
                    && entry.step_hash == step_hash
            })
            .map(|entry| entry.choice_index)
            .collect()
    }

    pub fn get_random_number(
        &mut self,
        min: i64,
        max: i64,
        options: RandomOptions,
    ) -> Result<RandomDraw, NarrationError> {
        if min > max {
            tracing::warn!(min, max, "random range is empty");
            return Err(NarrationError::new(
                RANDOM_RANGE,
                format!("Random range [{}, {}] is empty.", min, max),
            ));
        }
        let span = max.abs_diff(min).saturating_add(1);

        if !options.once_only {
            return Ok(RandomDraw::Value(self.draw_offset(min, span)));
        }

        let (Some(top), Some(step_hash)) =
            (self.opened_labels.last().cloned(), self.current_step_hash())
        else {
            tracing::warn!("once-only random draw outside of a step, drawing without memory");
            return Ok(RandomDraw::Value(self.draw_offset(min, span)));
        };

        let slot = match options.nested_id {
            Some(nested) => format!("{}:{}:{}", top.label, top.current_step_index, nested),
            None => format!("{}:{}", top.label, top.current_step_index),
        };
        let mut slots: BTreeMap<String, OnceDraws> =
            read_reserved(self.storage.as_ref(), ONCE_RANDOM_DRAWS_KEY).unwrap_or_default();
        let entry = slots.entry(slot).or_default();
        if entry.step_hash != step_hash {
            entry.step_hash = step_hash;
            entry.drawn.clear();
        }

        let mut drawn_in_range = entry
            .drawn
            .iter()
            .copied()
            .filter(|value| (min..=max).contains(value))
            .collect::<Vec<_>>();
        drawn_in_range.sort_unstable();
        drawn_in_range.dedup();

        let remaining = span - drawn_in_range.len() as u64;
        if remaining == 0 {
            return Ok(RandomDraw::Exhausted);
        }

        // k-th value of the range that has not been drawn yet
        let mut offset = next_random_below(&mut self.rng_state, remaining);
        for value in &drawn_in_range {
            if value.abs_diff(min) <= offset {
                offset += 1;
            }
        }
        let value = min.saturating_add_unsigned(offset);
        entry.drawn.push(value);
        write_reserved(self.storage.as_mut(), ONCE_RANDOM_DRAWS_KEY, &slots);
        Ok(RandomDraw::Value(value))
    }

    fn draw_offset(&mut self, min: i64, span: u64) -> i64 {
        min.saturating_add_unsigned(next_random_below(&mut self.rng_state, span))
    }
}
