mod annotate;
mod collect;
mod controller;
mod dom;
mod rules;
mod submit;


pub use annotate::Marker;
pub use collect::{CollectScope, CollectedValue, CollectedValues, collect};
pub use controller::{
    BusyReset, ErrorSet, FormGuard, GuardError, GuardOptions, GuardResult, GuardSnapshot,
    OnInvalid, OnValid, SubmitPhase,
};
pub use dom::{
    ControlKind, ControlSpec, Document, InputEvent, InputListener, MemoryDocument, NodeId,
    SubmitEvent, SubmitListener,
};
pub use rules::{FieldPredicate, FieldRule, RuleSet};
