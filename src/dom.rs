use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::annotate::Marker;

pub type SubmitListener = Arc<dyn Fn(&mut SubmitEvent) + Send + Sync>;
pub type InputListener = Arc<dyn Fn(&InputEvent) + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControlKind {
    Text,
    Checkbox,
    Radio,
    Submit,
}

#[derive(Debug)]
pub struct SubmitEvent {
    form: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl SubmitEvent {
    pub fn new(form: NodeId) -> Self {
        Self {
            form,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InputEvent {
    target: NodeId,
}

impl InputEvent {
    pub fn new(target: NodeId) -> Self {
        Self { target }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }
}

/// The host boundary: everything the controller consumes from a document
/// tree. Implementations are expected to use interior mutability so the
/// controller can share them behind an `Arc`.
pub trait Document: Send + Sync + 'static {
    fn query(&self, selector: &str) -> Option<NodeId>;
    fn named_controls(&self, form: NodeId) -> Vec<NodeId>;
    fn controls_named(&self, form: NodeId, name: &str) -> Vec<NodeId>;
    fn control_name(&self, control: NodeId) -> Option<String>;
    fn control_kind(&self, control: NodeId) -> Option<ControlKind>;
    fn value(&self, control: NodeId) -> Option<String>;
    fn is_checked(&self, control: NodeId) -> bool;
    fn is_disabled(&self, control: NodeId) -> bool;
    fn set_disabled(&self, control: NodeId, disabled: bool);
    fn markup(&self, control: NodeId) -> Option<String>;
    fn set_markup(&self, control: NodeId, markup: &str);
    fn apply_marker(&self, control: NodeId, marker: Marker);
    fn set_feedback(&self, control: NodeId, message: &str);
    fn submit_control(&self, form: NodeId) -> Option<NodeId>;
    fn disable_native_validation(&self, form: NodeId);
    fn add_submit_listener(&self, form: NodeId, listener: SubmitListener);
    fn add_input_listener(&self, form: NodeId, listener: InputListener);
}

pub struct ControlSpec {
    name: Option<String>,
    kind: ControlKind,
    value: String,
    checked: bool,
    markup: String,
    selector: Option<String>,
}

impl ControlSpec {
    pub fn text(name: impl Into<String>) -> Self {
        Self::named(name, ControlKind::Text)
    }

    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::named(name, ControlKind::Checkbox)
    }

    pub fn radio(name: impl Into<String>) -> Self {
        Self::named(name, ControlKind::Radio)
    }

    pub fn submit(markup: impl Into<String>) -> Self {
        Self {
            name: None,
            kind: ControlKind::Submit,
            value: String::new(),
            checked: false,
            markup: markup.into(),
            selector: None,
        }
    }

    fn named(name: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            name: Some(name.into()),
            kind,
            value: String::new(),
            checked: false,
            markup: String::new(),
            selector: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}

struct ControlNode {
    form: NodeId,
    name: Option<String>,
    kind: ControlKind,
    value: String,
    checked: bool,
    disabled: bool,
    markup: String,
    marker: Marker,
    feedback: Option<String>,
    feedback_nodes: usize,
    selector: Option<String>,
}

struct FormNode {
    selector: String,
    controls: Vec<NodeId>,
    novalidate: bool,
}

#[derive(Default)]
struct DocumentState {
    next_id: u64,
    forms: BTreeMap<NodeId, FormNode>,
    controls: BTreeMap<NodeId, ControlNode>,
    submit_listeners: BTreeMap<NodeId, Vec<SubmitListener>>,
    input_listeners: BTreeMap<NodeId, Vec<InputListener>>,
    native_submissions: Vec<NodeId>,
}

impl DocumentState {
    fn allocate(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }
}

/// In-memory document with browser-shaped form semantics. Backs the test
/// suite and any host that drives the controller without a real renderer.
#[derive(Default)]
pub struct MemoryDocument {
    state: RwLock<DocumentState>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_form(&self, selector: impl Into<String>) -> NodeId {
        let mut state = self.write();
        let id = state.allocate();
        state.forms.insert(
            id,
            FormNode {
                selector: selector.into(),
                controls: Vec::new(),
                novalidate: false,
            },
        );
        id
    }

    pub fn add_control(&self, form: NodeId, spec: ControlSpec) -> NodeId {
        let mut state = self.write();
        let id = state.allocate();
        state.controls.insert(
            id,
            ControlNode {
                form,
                name: spec.name,
                kind: spec.kind,
                value: spec.value,
                checked: spec.checked,
                disabled: false,
                markup: spec.markup,
                marker: Marker::Neutral,
                feedback: None,
                feedback_nodes: 0,
                selector: spec.selector,
            },
        );
        if let Some(node) = state.forms.get_mut(&form) {
            node.controls.push(id);
        }
        id
    }

    pub fn set_value(&self, control: NodeId, value: impl Into<String>) {
        if let Some(node) = self.write().controls.get_mut(&control) {
            node.value = value.into();
        }
    }

    pub fn set_checked(&self, control: NodeId, checked: bool) {
        if let Some(node) = self.write().controls.get_mut(&control) {
            node.checked = checked;
        }
    }

    /// Runs the form's submit listeners and, unless one of them prevented the
    /// default action, records a native submission. Returns the settled event
    /// so callers can inspect its flags.
    pub fn dispatch_submit(&self, form: NodeId) -> SubmitEvent {
        let listeners = self
            .read()
            .submit_listeners
            .get(&form)
            .cloned()
            .unwrap_or_default();
        let mut event = SubmitEvent::new(form);
        for listener in listeners {
            listener(&mut event);
        }
        if !event.default_prevented() {
            self.write().native_submissions.push(form);
        }
        event
    }

    pub fn dispatch_input(&self, control: NodeId) {
        let Some(form) = self.read().controls.get(&control).map(|node| node.form) else {
            return;
        };
        let listeners = self
            .read()
            .input_listeners
            .get(&form)
            .cloned()
            .unwrap_or_default();
        let event = InputEvent::new(control);
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn marker_of(&self, control: NodeId) -> Marker {
        self.read()
            .controls
            .get(&control)
            .map(|node| node.marker)
            .unwrap_or_default()
    }

    pub fn feedback(&self, control: NodeId) -> Option<String> {
        self.read()
            .controls
            .get(&control)
            .and_then(|node| node.feedback.clone())
    }

    pub fn feedback_node_count(&self, control: NodeId) -> usize {
        self.read()
            .controls
            .get(&control)
            .map(|node| node.feedback_nodes)
            .unwrap_or(0)
    }

    pub fn native_submissions(&self) -> Vec<NodeId> {
        self.read().native_submissions.clone()
    }

    pub fn native_validation_disabled(&self, form: NodeId) -> bool {
        self.read()
            .forms
            .get(&form)
            .is_some_and(|node| node.novalidate)
    }

    fn read(&self) -> RwLockReadGuard<'_, DocumentState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, DocumentState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Document for MemoryDocument {
    fn query(&self, selector: &str) -> Option<NodeId> {
        let state = self.read();
        if let Some((id, _)) = state
            .forms
            .iter()
            .find(|(_, node)| node.selector == selector)
        {
            return Some(*id);
        }
        state
            .controls
            .iter()
            .find(|(_, node)| node.selector.as_deref() == Some(selector))
            .map(|(id, _)| *id)
    }

    fn named_controls(&self, form: NodeId) -> Vec<NodeId> {
        let state = self.read();
        let Some(node) = state.forms.get(&form) else {
            return Vec::new();
        };
        node.controls
            .iter()
            .copied()
            .filter(|id| {
                state
                    .controls
                    .get(id)
                    .is_some_and(|control| control.name.is_some())
            })
            .collect()
    }

    fn controls_named(&self, form: NodeId, name: &str) -> Vec<NodeId> {
        let state = self.read();
        let Some(node) = state.forms.get(&form) else {
            return Vec::new();
        };
        node.controls
            .iter()
            .copied()
            .filter(|id| {
                state
                    .controls
                    .get(id)
                    .is_some_and(|control| control.name.as_deref() == Some(name))
            })
            .collect()
    }

    fn control_name(&self, control: NodeId) -> Option<String> {
        self.read()
            .controls
            .get(&control)
            .and_then(|node| node.name.clone())
    }

    fn control_kind(&self, control: NodeId) -> Option<ControlKind> {
        self.read().controls.get(&control).map(|node| node.kind)
    }

    fn value(&self, control: NodeId) -> Option<String> {
        self.read()
            .controls
            .get(&control)
            .map(|node| node.value.clone())
    }

    fn is_checked(&self, control: NodeId) -> bool {
        self.read()
            .controls
            .get(&control)
            .is_some_and(|node| node.checked)
    }

    fn is_disabled(&self, control: NodeId) -> bool {
        self.read()
            .controls
            .get(&control)
            .is_some_and(|node| node.disabled)
    }

    fn set_disabled(&self, control: NodeId, disabled: bool) {
        if let Some(node) = self.write().controls.get_mut(&control) {
            node.disabled = disabled;
        }
    }

    fn markup(&self, control: NodeId) -> Option<String> {
        self.read()
            .controls
            .get(&control)
            .map(|node| node.markup.clone())
    }

    fn set_markup(&self, control: NodeId, markup: &str) {
        if let Some(node) = self.write().controls.get_mut(&control) {
            node.markup = markup.to_string();
        }
    }

    fn apply_marker(&self, control: NodeId, marker: Marker) {
        if let Some(node) = self.write().controls.get_mut(&control) {
            node.marker = marker;
        }
    }

    fn set_feedback(&self, control: NodeId, message: &str) {
        if let Some(node) = self.write().controls.get_mut(&control) {
            if node.feedback.is_none() {
                node.feedback_nodes += 1;
            }
            node.feedback = Some(message.to_string());
        }
    }

    fn submit_control(&self, form: NodeId) -> Option<NodeId> {
        let state = self.read();
        let node = state.forms.get(&form)?;
        node.controls
            .iter()
            .copied()
            .find(|id| {
                state
                    .controls
                    .get(id)
                    .is_some_and(|control| control.kind == ControlKind::Submit)
            })
    }

    fn disable_native_validation(&self, form: NodeId) {
        if let Some(node) = self.write().forms.get_mut(&form) {
            node.novalidate = true;
        }
    }

    fn add_submit_listener(&self, form: NodeId, listener: SubmitListener) {
        self.write()
            .submit_listeners
            .entry(form)
            .or_default()
            .push(listener);
    }

    fn add_input_listener(&self, form: NodeId, listener: InputListener) {
        self.write()
            .input_listeners
            .entry(form)
            .or_default()
            .push(listener);
    }
}
