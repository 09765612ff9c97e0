use std::sync::Arc;

use crate::annotate::Marker;
use crate::collect::collect;
use crate::controller::{
    BusyReset, ErrorSet, GuardInner, GuardResult, SubmitPhase, transition_phase, write_lock,
};
use crate::dom::{Document, NodeId, SubmitEvent};

impl<D: Document> GuardInner<D> {
    /// One full validation pass: evaluate every configured rule against its
    /// bound control, annotate outcomes, then accept or reject the attempt.
    pub(crate) fn run_submit_pass(&self, doc: &D, event: &mut SubmitEvent) -> GuardResult<()> {
        let Some(form) = self.form else {
            return Ok(());
        };

        {
            let mut state = write_lock(&self.state, "starting submit evaluation")?;
            transition_phase(&mut state, SubmitPhase::Evaluating)?;
            state.attempts = state.attempts.saturating_add(1);
        }

        let mut errors = ErrorSet::new();
        {
            let mut state = write_lock(&self.state, "annotating field outcomes")?;
            for (field, rule) in self.options.rules.iter() {
                // A configured field with no control in the document is
                // tolerated: neither pass nor fail.
                let Some(control) = doc.controls_named(form, field).first().copied() else {
                    continue;
                };
                let value = doc.value(control).unwrap_or_default();
                if rule.test(&value) {
                    state.annotator.mark_valid(doc, control, field);
                } else {
                    errors.insert(field.to_string(), rule.message().to_string());
                    state.annotator.mark_invalid(doc, control, field, rule.message());
                }
            }
        }

        if errors.is_empty() {
            self.accept(doc, form, event)
        } else {
            self.reject(event, errors)
        }
    }

    fn reject(&self, event: &mut SubmitEvent, errors: ErrorSet) -> GuardResult<()> {
        {
            let mut state = write_lock(&self.state, "recording rejected attempt")?;
            transition_phase(&mut state, SubmitPhase::Rejected)?;
        }
        event.prevent_default();
        event.stop_propagation();
        log::debug!("submission rejected with {} field error(s)", errors.len());
        if let Some(on_invalid) = &self.options.on_invalid {
            on_invalid(&errors);
        }
        Ok(())
    }

    fn accept(&self, doc: &D, form: NodeId, event: &mut SubmitEvent) -> GuardResult<()> {
        {
            let mut state = write_lock(&self.state, "recording accepted attempt")?;
            transition_phase(&mut state, SubmitPhase::Accepted)?;
        }

        let values = collect(doc, form, self.options.collect_scope, &self.options.rules);
        let reset = self.enter_busy_state(doc, form);
        log::debug!("submission accepted with {} collected value(s)", values.len());

        // Default submission is deliberately not suppressed here: unless the
        // callback prevents it, the host proceeds while the submit control
        // stays busy, and the caller owns recovery through `reset`.
        if let Some(on_valid) = &self.options.on_valid {
            on_valid(event, form, &values, reset);
        }
        Ok(())
    }

    fn enter_busy_state(&self, doc: &D, form: NodeId) -> BusyReset {
        let control = match &self.options.submit_button {
            Some(selector) => doc.query(selector),
            None => doc.submit_control(form),
        };
        let Some(control) = control else {
            return BusyReset::noop();
        };

        let original = doc.markup(control).unwrap_or_default();
        if let Some(busy) = &self.options.busy_markup {
            doc.set_markup(control, busy);
        }
        doc.set_disabled(control, true);

        let doc = self.doc.clone();
        BusyReset::new(Arc::new(move || {
            let Some(doc) = doc.upgrade() else {
                return;
            };
            doc.set_disabled(control, false);
            doc.set_markup(control, &original);
        }))
    }

    /// Live correction: strictly lazy until a submit attempt has flagged the
    /// field, then eager about clearing. Never flags a clean field early.
    pub(crate) fn revalidate_on_input(&self, doc: &D, target: NodeId) -> GuardResult<()> {
        let Some(name) = doc.control_name(target) else {
            return Ok(());
        };
        let Some(rule) = self.options.rules.get(&name) else {
            return Ok(());
        };

        let mut state = write_lock(&self.state, "revalidating edited field")?;
        if state.annotator.marker(&name) != Marker::Invalid {
            return Ok(());
        }
        let value = doc.value(target).unwrap_or_default();
        if rule.test(&value) {
            state.annotator.mark_valid(doc, target, &name);
        }
        Ok(())
    }
}
