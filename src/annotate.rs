use std::collections::BTreeMap;

use serde::Serialize;

use crate::dom::{Document, NodeId};

/// DOM-visible validity indicator for one control. A control never carries
/// both the valid and invalid markers at once.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    #[default]
    Neutral,
    Valid,
    Invalid,
}

/// Applies validity markers to the host and mirrors them into an explicit
/// per-field ledger so the engine never has to read presentation state back
/// out of the document.
pub(crate) struct Annotator {
    markers: BTreeMap<String, Marker>,
}

impl Annotator {
    pub(crate) fn new() -> Self {
        Self {
            markers: BTreeMap::new(),
        }
    }

    /// Sets the invalid marker and ensures exactly one adjacent feedback
    /// node shows `message`. Idempotent: repeat calls reuse the node.
    pub(crate) fn mark_invalid<D>(&mut self, doc: &D, control: NodeId, field: &str, message: &str)
    where
        D: Document + ?Sized,
    {
        doc.apply_marker(control, Marker::Invalid);
        doc.set_feedback(control, message);
        self.markers.insert(field.to_string(), Marker::Invalid);
    }

    /// Sets the valid marker. Any feedback node is left in place, visually
    /// inert: clear, don't destroy.
    pub(crate) fn mark_valid<D>(&mut self, doc: &D, control: NodeId, field: &str)
    where
        D: Document + ?Sized,
    {
        doc.apply_marker(control, Marker::Valid);
        self.markers.insert(field.to_string(), Marker::Valid);
    }

    pub(crate) fn marker(&self, field: &str) -> Marker {
        self.markers.get(field).copied().unwrap_or_default()
    }

    pub(crate) fn markers(&self) -> &BTreeMap<String, Marker> {
        &self.markers
    }
}
