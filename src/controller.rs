use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde::Serialize;

use crate::annotate::{Annotator, Marker};
use crate::collect::{CollectScope, CollectedValues};
use crate::dom::{Document, InputEvent, NodeId, SubmitEvent};
use crate::rules::RuleSet;

/// Field name -> error message, produced once per rejected attempt.
pub type ErrorSet = BTreeMap<String, String>;

pub type OnValid = Arc<dyn Fn(&mut SubmitEvent, NodeId, &CollectedValues, BusyReset) + Send + Sync>;
pub type OnInvalid = Arc<dyn Fn(&ErrorSet) + Send + Sync>;

/// Restores the submit control captured at the start of an accepted
/// submission: re-enables it and puts its original markup back. Invocation
/// is entirely at the caller's discretion, possibly much later.
#[derive(Clone)]
pub struct BusyReset {
    restore: Arc<dyn Fn() + Send + Sync>,
}

impl BusyReset {
    pub(crate) fn new(restore: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self { restore }
    }

    pub(crate) fn noop() -> Self {
        Self {
            restore: Arc::new(|| {}),
        }
    }

    pub fn call(&self) {
        (self.restore)()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitPhase {
    Idle,
    Evaluating,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GuardError {
    StatePoisoned(&'static str),
    InvalidPhaseTransition { from: SubmitPhase, to: SubmitPhase },
}

impl Display for GuardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardError::StatePoisoned(context) => {
                write!(f, "guard state lock poisoned while {context}")
            }
            GuardError::InvalidPhaseTransition { from, to } => {
                write!(f, "invalid submit phase transition: {from:?} -> {to:?}")
            }
        }
    }
}

impl std::error::Error for GuardError {}

pub type GuardResult<T> = Result<T, GuardError>;

pub struct GuardOptions {
    pub(crate) rules: RuleSet,
    pub(crate) on_valid: Option<OnValid>,
    pub(crate) on_invalid: Option<OnInvalid>,
    pub(crate) submit_button: Option<String>,
    pub(crate) busy_markup: Option<String>,
    pub(crate) collect_scope: CollectScope,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            rules: RuleSet::new(),
            on_valid: None,
            on_invalid: None,
            submit_button: None,
            busy_markup: None,
            collect_scope: CollectScope::default(),
        }
    }
}

impl GuardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn on_valid(
        mut self,
        callback: impl Fn(&mut SubmitEvent, NodeId, &CollectedValues, BusyReset)
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.on_valid = Some(Arc::new(callback));
        self
    }

    pub fn on_invalid(mut self, callback: impl Fn(&ErrorSet) + Send + Sync + 'static) -> Self {
        self.on_invalid = Some(Arc::new(callback));
        self
    }

    pub fn submit_button(mut self, selector: impl Into<String>) -> Self {
        self.submit_button = Some(selector.into());
        self
    }

    pub fn busy_markup(mut self, markup: impl Into<String>) -> Self {
        self.busy_markup = Some(markup.into());
        self
    }

    pub fn collect_scope(mut self, scope: CollectScope) -> Self {
        self.collect_scope = scope;
        self
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GuardSnapshot {
    pub phase: SubmitPhase,
    pub attempts: u32,
    pub bound: bool,
    pub markers: BTreeMap<String, Marker>,
}

pub(crate) struct GuardState {
    pub(crate) phase: SubmitPhase,
    pub(crate) attempts: u32,
    pub(crate) annotator: Annotator,
}

pub(crate) struct GuardInner<D: Document> {
    pub(crate) doc: Weak<D>,
    pub(crate) form: Option<NodeId>,
    pub(crate) options: GuardOptions,
    pub(crate) state: RwLock<GuardState>,
}

/// The one unit exposed to callers: binds rules, callbacks, and busy-state
/// handling to a single form for the lifetime of that form. Unmounting is
/// the host's responsibility; there is no teardown API.
pub struct FormGuard<D: Document> {
    pub(crate) inner: Arc<GuardInner<D>>,
}

impl<D: Document> Clone for FormGuard<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Document> FormGuard<D> {
    /// Resolves the form and wires the submit and input subscriptions. An
    /// unresolvable selector is logged and yields a permanently inert
    /// controller, never a panic.
    pub fn bind(doc: &Arc<D>, form_selector: &str, options: GuardOptions) -> Self {
        let form = doc.query(form_selector);
        if form.is_none() {
            log::error!("form not found for selector {form_selector}; controller is inert");
        }

        let inner = Arc::new(GuardInner {
            doc: Arc::downgrade(doc),
            form,
            options,
            state: RwLock::new(GuardState {
                phase: SubmitPhase::Idle,
                attempts: 0,
                annotator: Annotator::new(),
            }),
        });

        if let Some(form) = form {
            doc.disable_native_validation(form);

            let submit_inner = Arc::clone(&inner);
            doc.add_submit_listener(
                form,
                Arc::new(move |event: &mut SubmitEvent| {
                    let Some(doc) = submit_inner.doc.upgrade() else {
                        return;
                    };
                    if let Err(error) = submit_inner.run_submit_pass(&doc, event) {
                        log::error!("submit validation pass failed: {error}");
                    }
                }),
            );

            let input_inner = Arc::clone(&inner);
            doc.add_input_listener(
                form,
                Arc::new(move |event: &InputEvent| {
                    let Some(doc) = input_inner.doc.upgrade() else {
                        return;
                    };
                    if let Err(error) = input_inner.revalidate_on_input(&doc, event.target()) {
                        log::error!("input revalidation failed: {error}");
                    }
                }),
            );
        }

        Self { inner }
    }

    pub fn is_bound(&self) -> bool {
        self.inner.form.is_some()
    }

    pub fn form(&self) -> Option<NodeId> {
        self.inner.form
    }

    pub fn marker(&self, field: &str) -> GuardResult<Marker> {
        Ok(read_lock(&self.inner.state, "reading field marker")?
            .annotator
            .marker(field))
    }

    pub fn snapshot(&self) -> GuardResult<GuardSnapshot> {
        let state = read_lock(&self.inner.state, "creating guard snapshot")?;
        Ok(GuardSnapshot {
            phase: state.phase,
            attempts: state.attempts,
            bound: self.inner.form.is_some(),
            markers: state.annotator.markers().clone(),
        })
    }
}

pub(crate) fn transition_phase(state: &mut GuardState, next: SubmitPhase) -> GuardResult<()> {
    let current = state.phase;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitPhase::Idle, SubmitPhase::Evaluating)
            | (SubmitPhase::Evaluating, SubmitPhase::Accepted)
            | (SubmitPhase::Evaluating, SubmitPhase::Rejected)
            | (SubmitPhase::Accepted, SubmitPhase::Evaluating)
            | (SubmitPhase::Rejected, SubmitPhase::Evaluating)
            | (_, SubmitPhase::Idle)
    );
    if !allowed {
        return Err(GuardError::InvalidPhaseTransition {
            from: current,
            to: next,
        });
    }
    state.phase = next;
    Ok(())
}

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> GuardResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| GuardError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> GuardResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| GuardError::StatePoisoned(context))
}
