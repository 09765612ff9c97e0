use std::collections::BTreeMap;
use std::sync::Arc;

pub trait FieldPredicate: Send + Sync {
    fn test(&self, value: &str) -> bool;
}

impl<F> FieldPredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn test(&self, value: &str) -> bool {
        (self)(value)
    }
}

/// A named field's validity check plus the message reported when it fails.
#[derive(Clone)]
pub struct FieldRule {
    predicate: Arc<dyn FieldPredicate>,
    message: String,
}

impl FieldRule {
    pub fn new(predicate: impl FieldPredicate + 'static, message: impl Into<String>) -> Self {
        Self {
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }

    pub fn test(&self, value: &str) -> bool {
        self.predicate.test(value)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Field name -> rule mapping, assembled up front and immutable for the
/// lifetime of the controller that owns it.
#[derive(Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, FieldRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(
        mut self,
        field: impl Into<String>,
        predicate: impl FieldPredicate + 'static,
        message: impl Into<String>,
    ) -> Self {
        self.rules
            .insert(field.into(), FieldRule::new(predicate, message));
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.rules.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.rules.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
