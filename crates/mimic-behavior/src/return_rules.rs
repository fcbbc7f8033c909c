//! Value-synthesis rules
//!
//! Ordered rules that turn a requested return type into a zero-value
//! container. The first rule that applies wins; a type no rule covers is
//! left to full nested-substitute construction.

use crate::behaviors::MockCollection;
use crate::mixin::MockMixin;
use mimic_reflect::{ArrayValue, TypeRef, Value};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A single synthesis rule
pub trait ReturnRule: Send + Sync + fmt::Debug {
    /// Value for `ty`, or `None` when the rule does not apply
    fn create_value(&self, ty: &TypeRef, owner: &MockMixin) -> Option<Value>;

    /// Rule name (for debugging)
    fn name(&self) -> &'static str;
}

/// Arrays become zero-length arrays of the same rank
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayReturnRule;

impl ReturnRule for ArrayReturnRule {
    fn create_value(&self, ty: &TypeRef, _owner: &MockMixin) -> Option<Value> {
        let (element, rank) = ty.array_shape()?;
        Some(Value::Array(ArrayValue::empty(element, rank)))
    }

    fn name(&self) -> &'static str {
        "array"
    }
}

/// Keyed maps become empty, stub-tracked maps
#[derive(Debug, Clone, Copy, Default)]
pub struct MapReturnRule;

impl ReturnRule for MapReturnRule {
    fn create_value(&self, ty: &TypeRef, owner: &MockMixin) -> Option<Value> {
        let (key, value) = ty.implementation_of_map()?;
        MockCollection::create_map(ty, &key, &value, owner)
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

/// Sequences become empty, stub-tracked sequences
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceReturnRule;

impl ReturnRule for SequenceReturnRule {
    fn create_value(&self, ty: &TypeRef, owner: &MockMixin) -> Option<Value> {
        let item = ty.implementation_of_sequence()?;
        MockCollection::create_sequence(ty, &item, owner)
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}

/// Ordered, extensible rule set
#[derive(Debug, Default)]
pub struct ReturnRules {
    rules: RwLock<Vec<Arc<dyn ReturnRule>>>,
}

impl ReturnRules {
    /// Create an empty rule set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule set with the built-in rules: arrays, maps, sequences
    #[must_use]
    pub fn with_defaults() -> Self {
        let rules = Self::new();
        rules.register(Arc::new(ArrayReturnRule));
        rules.register(Arc::new(MapReturnRule));
        rules.register(Arc::new(SequenceReturnRule));
        rules
    }

    /// Append a rule; it is tried after every rule registered before it
    pub fn register(&self, rule: Arc<dyn ReturnRule>) {
        self.rules.write().push(rule);
    }

    /// Value from the first applicable rule
    #[must_use]
    pub fn create_value(&self, ty: &TypeRef, owner: &MockMixin) -> Option<Value> {
        let rules = self.rules.read().clone();
        rules.iter().find_map(|rule| rule.create_value(ty, owner))
    }

    /// Rule names in evaluation order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.read().iter().map(|rule| rule.name()).collect()
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Whether no rule is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}
