//! Per-request construction options

use mimic_behavior::{InterceptorFilter, PolicyOverrides, Preset};
use mimic_reflect::{TypeRef, Value};

/// What a caller asks for when creating a substitute
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Preset; the repository default applies when absent
    pub preset: Option<Preset>,

    /// Constructor arguments
    pub args: Option<Vec<Value>>,

    /// Extra units, mixins and constructor handling
    pub overrides: PolicyOverrides,

    /// Extra interfaces the substitute implements
    pub interfaces: Vec<TypeRef>,

    /// Extra type-level annotations
    pub attributes: Vec<String>,

    /// Restricts interception to selected members
    pub filter: Option<InterceptorFilter>,

    /// Static-constructor suppression for [`crate::MocksRepository::intercept_statics`]
    pub mock_static_constructor: Option<bool>,
}

impl MockOptions {
    /// Options using the configured default preset
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options using `preset`
    #[inline]
    #[must_use]
    pub fn preset(preset: Preset) -> Self {
        Self::default().with_preset(preset)
    }

    /// Use `preset` instead of the configured default
    #[inline]
    #[must_use]
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }

    /// Constructor arguments; supplying any (even none) runs the real constructor
    #[must_use]
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = Some(args);
        self
    }

    /// Extra units, mixins and constructor handling
    #[must_use]
    pub fn with_overrides(mut self, overrides: PolicyOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Also implement `interface`
    #[must_use]
    pub fn with_interface(mut self, interface: &TypeRef) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Tag the generated type with `attribute`
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Intercept only the members `filter` allows
    #[must_use]
    pub fn with_filter(mut self, filter: InterceptorFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Whether the static constructor is suppressed on static interception
    #[must_use]
    pub fn with_static_constructor_mocked(mut self, mocked: bool) -> Self {
        self.mock_static_constructor = Some(mocked);
        self
    }
}
