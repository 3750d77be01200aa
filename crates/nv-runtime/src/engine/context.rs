use super::*;

/// The narration as seen from inside a running step or hook.
///
/// Transitions (call, jump, next, close) are not available here: a step
/// requests them through its returned [`StepOutcome`] so the run loop stays
/// the only place that moves the stack.
pub struct StepContext<'a> {
    narration: &'a mut Narration,
}

impl<'a> StepContext<'a> {
    pub(super) fn new(narration: &'a mut Narration) -> Self {
        Self { narration }
    }

    pub fn current_label(&self) -> Option<&LabelId> {
        self.narration.current_label()
    }

    pub fn current_step_index(&self) -> Option<usize> {
        self.narration.current_step_index()
    }

    pub fn step_counter(&self) -> u64 {
        self.narration.step_counter()
    }

    pub fn storage(&self) -> &dyn Storage {
        self.narration.storage()
    }

    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        self.narration.storage_mut()
    }

    pub fn canvas_mut(&mut self) -> &mut dyn Canvas {
        self.narration.canvas_mut()
    }

    pub fn sound_mut(&mut self) -> &mut dyn Sound {
        self.narration.sound_mut()
    }

    pub fn navigate(&mut self, path: impl Into<String>) {
        self.narration.set_path(path);
    }

    pub fn dialogue(&self) -> Option<Dialogue> {
        self.narration.dialogue()
    }

    pub fn set_dialogue(&mut self, dialogue: Option<Dialogue>) {
        self.narration.set_dialogue(dialogue);
    }

    pub fn choice_menu_options(&self) -> Vec<OfferedChoice> {
        self.narration.choice_menu_options()
    }

    pub fn set_choice_menu_options(&mut self, options: Option<Vec<ChoiceOption>>) {
        self.narration.set_choice_menu_options(options);
    }

    pub fn request_input(&mut self, request: InputRequest) {
        self.narration.request_input(request);
    }

    pub fn input_value(&self) -> Option<Value> {
        self.narration.input_value()
    }

    pub fn get_random_number(
        &mut self,
        min: i64,
        max: i64,
        options: RandomOptions,
    ) -> Result<RandomDraw, NarrationError> {
        self.narration.get_random_number(min, max, options)
    }

    pub fn is_label_already_completed(&self, label: &str) -> bool {
        self.narration.is_label_already_completed(label)
    }

    pub fn already_current_step_made_choices(&self) -> Vec<usize> {
        self.narration.already_current_step_made_choices()
    }

    pub fn label_progress(&self, label: &str) -> Option<LabelProgress> {
        self.narration.label_progress(label)
    }
}
