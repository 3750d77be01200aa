use std::borrow::Cow;

use async_trait::async_trait;

use super::*;

/// What a step asks the run loop to do once it has finished.
///
/// Transition variants are tail-chained by the loop: the step that requested
/// them does not get a history entry of its own, its effects are folded into
/// the entry of the step the transition lands on.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Continue,
    Value(Value),
    CallLabel { label: LabelId, props: StepProps },
    JumpLabel { label: LabelId, props: StepProps },
    GoNext { props: StepProps },
    CloseLabel,
    CloseAllLabels,
}

impl StepOutcome {
    pub fn call(label: impl Into<LabelId>) -> Self {
        Self::CallLabel {
            label: label.into(),
            props: Value::Null,
        }
    }

    pub fn jump(label: impl Into<LabelId>) -> Self {
        Self::JumpLabel {
            label: label.into(),
            props: Value::Null,
        }
    }

    pub fn go_next() -> Self {
        Self::GoNext { props: Value::Null }
    }
}

#[async_trait(?Send)]
pub trait Step {
    /// Serialized form of the step; the input of the step hash.
    fn source(&self) -> Cow<'_, str>;

    async fn run(
        &self,
        ctx: &mut StepContext<'_>,
        props: &StepProps,
    ) -> Result<StepOutcome, NarrationError>;
}

pub struct FnStep<F> {
    source: String,
    run: F,
}

#[async_trait(?Send)]
impl<F> Step for FnStep<F>
where
    F: Fn(&mut StepContext<'_>, &StepProps) -> Result<StepOutcome, NarrationError>,
{
    fn source(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.source)
    }

    async fn run(
        &self,
        ctx: &mut StepContext<'_>,
        props: &StepProps,
    ) -> Result<StepOutcome, NarrationError> {
        (self.run)(ctx, props)
    }
}

pub fn step_fn<F>(source: impl Into<String>, run: F) -> Arc<dyn Step>
where
    F: Fn(&mut StepContext<'_>, &StepProps) -> Result<StepOutcome, NarrationError> + 'static,
{
    Arc::new(FnStep {
        source: source.into(),
        run,
    })
}

pub type LabelHook = Arc<dyn Fn(&mut StepContext<'_>, usize)>;

pub struct Label {
    id: LabelId,
    steps: Vec<Arc<dyn Step>>,
    pub(super) on_step_start: Option<LabelHook>,
    pub(super) on_load_step: Option<LabelHook>,
    pub(super) on_step_end: Option<LabelHook>,
}

impl Label {
    pub fn new(id: impl Into<LabelId>, steps: Vec<Arc<dyn Step>>) -> Self {
        Self {
            id: id.into(),
            steps,
            on_step_start: None,
            on_load_step: None,
            on_step_end: None,
        }
    }

    pub fn on_step_start(mut self, hook: impl Fn(&mut StepContext<'_>, usize) + 'static) -> Self {
        self.on_step_start = Some(Arc::new(hook));
        self
    }

    /// Fires before step 0 and whenever a step is re-entered by load or back.
    pub fn on_load_step(mut self, hook: impl Fn(&mut StepContext<'_>, usize) + 'static) -> Self {
        self.on_load_step = Some(Arc::new(hook));
        self
    }

    pub fn on_step_end(mut self, hook: impl Fn(&mut StepContext<'_>, usize) + 'static) -> Self {
        self.on_step_end = Some(Arc::new(hook));
        self
    }

    pub fn id(&self) -> &LabelId {
        &self.id
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl std::fmt::Debug for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Label")
            .field("id", &self.id)
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct LabelRegistry {
    labels: HashMap<LabelId, Arc<Label>>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering an id twice keeps the newer label and reports the
    /// conflict; the replaced label is returned.
    pub fn register(&mut self, label: Label) -> Option<Arc<Label>> {
        let id = label.id.clone();
        let previous = self.labels.insert(id.clone(), Arc::new(label));
        if previous.is_some() {
            tracing::warn!(label = %id, "label registered twice, keeping the newer definition");
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Label>> {
        let label = self.labels.get(id);
        if label.is_none() {
            tracing::debug!(label = id, "label lookup missed");
        }
        label
    }

    pub fn contains(&self, id: &str) -> bool {
        self.labels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Label>> {
        self.labels.values()
    }
}

impl FromIterator<Label> for LabelRegistry {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        let mut registry = Self::new();
        for label in iter {
            registry.register(label);
        }
        registry
    }
}

#[cfg(test)]
mod registry_tests {
    use super::runtime_test_support::*;
    use super::*;

    #[test]
    fn register_overwrites_and_returns_previous() {
        let mut registry = LabelRegistry::new();
        assert!(registry
            .register(label("intro", vec![say("a")]))
            .is_none());
        let previous = registry
            .register(label("intro", vec![say("a"), say("b")]))
            .expect("first definition should be returned");
        assert_eq!(previous.step_count(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("intro").map(|label| label.step_count()),
            Some(2)
        );
    }

    #[test]
    fn get_unknown_label_is_none() {
        let registry: LabelRegistry = vec![label("a", Vec::new())].into_iter().collect();
        assert!(registry.get("missing").is_none());
        assert!(registry.contains("a"));
    }
}
