mod rng;

use std::collections::HashMap;
use std::sync::Arc;

use nv_core::{
    diff, revert, ChoiceMade, ChoiceOption, ChoiceTarget, Dialogue, HistoryEntry,
    HistoryStepData, InputRequest, LabelId, LabelProgress, NarrationError, NarrationState,
    OfferedChoice, OpenedLabel, RandomDraw, StepHash, TranscriptEntry,
};
use rng::next_random_below;
use serde_json::Value;

mod bookkeeping;
mod boundary;
mod collaborators;
mod context;
mod hasher;
mod history;
mod lifecycle;
mod registry;
mod snapshot;
mod stack;
mod step;
mod transcript;

pub use bookkeeping::RandomOptions;
pub use collaborators::{Canvas, MemoryCanvas, MemorySound, MemoryStorage, Sound, Storage};
pub use context::StepContext;
pub use hasher::{Sha256StepHasher, StepHasher};
pub use lifecycle::{GameEndHook, Narration, NarrationOptions, StepErrorHook, StepProps};
pub use registry::{step_fn, FnStep, Label, LabelHook, LabelRegistry, Step, StepOutcome};
pub use snapshot::{NarrationSave, NARRATION_SAVE_SCHEMA};
pub use transcript::narrative_history;


#[cfg(test)]
mod tests;
