use super::*;

pub type StepProps = Value;

/// Invoked when the last open label closes. The returned outcome is
/// followed, so a hook can jump back to a title label.
pub type GameEndHook = Arc<dyn Fn(&mut StepContext<'_>, &StepProps) -> StepOutcome>;

pub type StepErrorHook = Arc<dyn Fn(&NarrationError, &StepProps)>;

pub struct NarrationOptions {
    pub labels: LabelRegistry,
    pub storage: Box<dyn Storage>,
    pub canvas: Box<dyn Canvas>,
    pub sound: Box<dyn Sound>,
    pub hasher: Option<Arc<dyn StepHasher>>,
    /// Oldest entries are dropped once the log grows past this length.
    pub history_limit: Option<usize>,
    pub random_seed: Option<u32>,
    pub on_game_end: Option<GameEndHook>,
    pub on_step_error: Option<StepErrorHook>,
}

impl Default for NarrationOptions {
    fn default() -> Self {
        Self {
            labels: LabelRegistry::new(),
            storage: Box::new(MemoryStorage::new()),
            canvas: Box::new(MemoryCanvas::new()),
            sound: Box::new(MemorySound::new()),
            hasher: None,
            history_limit: None,
            random_seed: None,
            on_game_end: None,
            on_step_error: None,
        }
    }
}

impl NarrationOptions {
    pub fn with_game_end(
        mut self,
        hook: impl Fn(&mut StepContext<'_>, &StepProps) -> StepOutcome + 'static,
    ) -> Self {
        self.on_game_end = Some(Arc::new(hook));
        self
    }

    pub fn with_step_error(mut self, hook: impl Fn(&NarrationError, &StepProps) + 'static) -> Self {
        self.on_step_error = Some(Arc::new(hook));
        self
    }
}

pub struct Narration {
    pub(super) labels: LabelRegistry,
    pub(super) step_hashes: HashMap<LabelId, Vec<StepHash>>,
    pub(super) storage: Box<dyn Storage>,
    pub(super) canvas: Box<dyn Canvas>,
    pub(super) sound: Box<dyn Sound>,
    pub(super) history_limit: Option<usize>,
    pub(super) on_game_end: Option<GameEndHook>,
    pub(super) on_step_error: Option<StepErrorHook>,

    pub(super) opened_labels: Vec<OpenedLabel>,
    pub(super) history: Vec<HistoryEntry>,
    pub(super) last_snapshot: HistoryStepData,
    pub(super) last_step_index: u64,
    pub(super) path: String,
    pub(super) rng_state: u32,
    pub(super) pending_choice_made: Option<usize>,
    pub(super) ended: bool,
    pub(super) halted: bool,
}

impl std::fmt::Debug for Narration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Narration")
            .field("labels", &self.labels.len())
            .field("opened_labels", &self.opened_labels)
            .field("history", &self.history.len())
            .field("last_step_index", &self.last_step_index)
            .field("state", &self.state())
            .finish()
    }
}

impl Narration {
    pub fn new(options: NarrationOptions) -> Self {
        let hasher: Arc<dyn StepHasher> = options
            .hasher
            .unwrap_or_else(|| Arc::new(Sha256StepHasher));

        let step_hashes = options
            .labels
            .iter()
            .map(|label| {
                let hashes = label
                    .steps()
                    .iter()
                    .map(|step| hasher.hash(&step.source()))
                    .collect::<Vec<_>>();
                (label.id().clone(), hashes)
            })
            .collect();

        Self {
            labels: options.labels,
            step_hashes,
            storage: options.storage,
            canvas: options.canvas,
            sound: options.sound,
            history_limit: options.history_limit,
            on_game_end: options.on_game_end,
            on_step_error: options.on_step_error,
            opened_labels: Vec::new(),
            history: Vec::new(),
            last_snapshot: HistoryStepData::default(),
            last_step_index: 0,
            path: String::new(),
            rng_state: options.random_seed.unwrap_or(1),
            pending_choice_made: None,
            ended: false,
            halted: false,
        }
    }

    pub fn state(&self) -> NarrationState {
        if self.halted {
            return NarrationState::Halted;
        }
        if self.opened_labels.is_empty() {
            return if self.ended {
                NarrationState::Ended
            } else {
                NarrationState::Idle
            };
        }
        if !self.choice_menu_options().is_empty() {
            return NarrationState::AwaitingChoice;
        }
        if self.input_request().is_some() {
            return NarrationState::AwaitingInput;
        }
        NarrationState::Running
    }

    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    pub fn opened_labels(&self) -> &[OpenedLabel] {
        &self.opened_labels
    }

    pub fn current_label(&self) -> Option<&LabelId> {
        self.opened_labels.last().map(|opened| &opened.label)
    }

    pub fn current_step_index(&self) -> Option<usize> {
        self.opened_labels
            .last()
            .map(|opened| opened.current_step_index)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Monotonic counter of recorded steps; the index the next entry gets.
    pub fn step_counter(&self) -> u64 {
        self.last_step_index
    }

    pub fn last_snapshot(&self) -> &HistoryStepData {
        &self.last_snapshot
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Route shown by the UI; captured in every snapshot.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }

    pub fn canvas(&self) -> &dyn Canvas {
        self.canvas.as_ref()
    }

    pub fn canvas_mut(&mut self) -> &mut dyn Canvas {
        self.canvas.as_mut()
    }

    pub fn sound(&self) -> &dyn Sound {
        self.sound.as_ref()
    }

    pub fn sound_mut(&mut self) -> &mut dyn Sound {
        self.sound.as_mut()
    }

    pub fn step_hash(&self, label: &str, step_index: usize) -> Option<&StepHash> {
        self.step_hashes
            .get(label)
            .and_then(|hashes| hashes.get(step_index))
    }

    pub(super) fn current_step_hash(&self) -> Option<StepHash> {
        let top = self.opened_labels.last()?;
        self.step_hash(top.label.as_str(), top.current_step_index)
            .cloned()
    }

    pub(super) fn ensure_not_halted(&self) -> Result<(), NarrationError> {
        if !self.halted {
            return Ok(());
        }
        tracing::error!("narration halted after the last label closed without a game end hook");
        Err(NarrationError::new(
            nv_core::HALTED,
            "Narration is halted; call or jump to a label, or load a save.",
        ))
    }
}
