use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dom::{ControlKind, Document, NodeId};
use crate::rules::RuleSet;

/// A control's shaped value: plain text for text-like controls, a boolean
/// for a lone checkbox, an array for a checkbox group, the checked member's
/// value for a radio group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectedValue {
    Flag(bool),
    Text(String),
    Many(Vec<String>),
}

impl CollectedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&[String]> {
        match self {
            Self::Many(values) => Some(values),
            _ => None,
        }
    }
}

pub type CollectedValues = BTreeMap<String, CollectedValue>;

/// Which controls a submission harvest covers. A configuration choice made
/// once at bind time, not a runtime branch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CollectScope {
    #[default]
    WholeForm,
    ConfiguredFields,
}

/// Harvests the form's current values. Pure over document state: no side
/// effects, rebuilt fresh on every call.
pub fn collect<D>(doc: &D, form: NodeId, scope: CollectScope, rules: &RuleSet) -> CollectedValues
where
    D: Document + ?Sized,
{
    match scope {
        CollectScope::WholeForm => collect_whole_form(doc, form),
        CollectScope::ConfiguredFields => collect_configured(doc, form, rules),
    }
}

fn collect_whole_form<D>(doc: &D, form: NodeId) -> CollectedValues
where
    D: Document + ?Sized,
{
    let mut values = CollectedValues::new();
    for control in doc.named_controls(form) {
        let Some(name) = doc.control_name(control) else {
            continue;
        };
        match doc.control_kind(control) {
            Some(ControlKind::Radio) => {
                if doc.is_checked(control) {
                    values.insert(name, CollectedValue::Text(value_of(doc, control)));
                }
            }
            Some(ControlKind::Checkbox) => {
                // The whole group is shaped on its first member; later
                // members must not overwrite it.
                if !values.contains_key(&name) {
                    values.insert(name.clone(), shape_checkboxes(doc, form, &name, control));
                }
            }
            Some(ControlKind::Text) | Some(ControlKind::Submit) => {
                values.insert(name, CollectedValue::Text(value_of(doc, control)));
            }
            None => {}
        }
    }
    values
}

fn collect_configured<D>(doc: &D, form: NodeId, rules: &RuleSet) -> CollectedValues
where
    D: Document + ?Sized,
{
    let mut values = CollectedValues::new();
    for name in rules.field_names() {
        let controls = doc.controls_named(form, name);
        let Some(first) = controls.first().copied() else {
            continue;
        };
        match doc.control_kind(first) {
            Some(ControlKind::Radio) => {
                if let Some(checked) = controls.iter().copied().find(|id| doc.is_checked(*id)) {
                    values.insert(name.to_string(), CollectedValue::Text(value_of(doc, checked)));
                }
            }
            Some(ControlKind::Checkbox) => {
                values.insert(name.to_string(), shape_checkboxes(doc, form, name, first));
            }
            Some(ControlKind::Text) | Some(ControlKind::Submit) => {
                values.insert(name.to_string(), CollectedValue::Text(value_of(doc, first)));
            }
            None => {}
        }
    }
    values
}

fn shape_checkboxes<D>(doc: &D, form: NodeId, name: &str, control: NodeId) -> CollectedValue
where
    D: Document + ?Sized,
{
    let group = doc.controls_named(form, name);
    if group.len() > 1 {
        let checked = group
            .into_iter()
            .filter(|id| doc.is_checked(*id))
            .map(|id| value_of(doc, id))
            .collect();
        CollectedValue::Many(checked)
    } else {
        CollectedValue::Flag(doc.is_checked(control))
    }
}

fn value_of<D>(doc: &D, control: NodeId) -> String
where
    D: Document + ?Sized,
{
    doc.value(control).unwrap_or_default()
}
