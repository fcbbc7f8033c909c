//! Policy assembly
//!
//! Translates a [`Preset`] plus [`PolicyOverrides`] into the complete
//! [`MockCreationSettings`] a substitute is built from: constructor handling,
//! ordered supplementary and fallback units, and mixins.

use crate::behavior::Behavior;
use crate::behaviors::{
    CallOriginalBehavior, CallOriginalObjectMethodsBehavior, EventStubsBehavior,
    ExecuteConstructorBehavior, PropertyStubsBehavior, RecursiveMockingBehavior, RecursiveMode,
    StaticConstructorMockBehavior, StrictBehavior,
};
use crate::mixin::MixinSet;
use mimic_reflect::{MemberInfo, TypeRef, Value};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Named default policy
///
/// Serializes as snake_case; deserializing goes through [`FromStr`], so every
/// spelling accepted there is accepted in config files too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Preset {
    /// Unarranged calls return defaults
    Loose,

    /// Like [`Preset::Loose`], but reference-typed members return nested substitutes
    #[default]
    RecursiveLoose,

    /// Unarranged calls fail
    Strict,

    /// Unarranged calls run the original implementation
    CallOriginal,
}

impl Preset {
    /// All presets, in declaration order
    pub const ALL: [Preset; 4] = [
        Preset::Loose,
        Preset::RecursiveLoose,
        Preset::Strict,
        Preset::CallOriginal,
    ];

    /// Snake-case name, as serialized
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loose => "loose",
            Self::RecursiveLoose => "recursive_loose",
            Self::Strict => "strict",
            Self::CallOriginal => "call_original",
        }
    }
}

impl Display for Preset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown preset name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown preset '{0}' (expected loose, recursive_loose, strict or call_original)")]
pub struct PresetParseError(pub String);

impl FromStr for Preset {
    type Err = PresetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "loose" => Ok(Self::Loose),
            "recursiveloose" => Ok(Self::RecursiveLoose),
            "strict" => Ok(Self::Strict),
            "calloriginal" => Ok(Self::CallOriginal),
            _ => Err(PresetParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Preset {
    type Error = PresetParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Mixin recording which preset a substitute was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetConfiguration {
    preset: Preset,
}

impl PresetConfiguration {
    /// Record `preset`
    #[inline]
    #[must_use]
    pub fn new(preset: Preset) -> Self {
        Self { preset }
    }

    /// Recorded preset
    #[inline]
    #[must_use]
    pub fn preset(&self) -> Preset {
        self.preset
    }
}

/// Predicate deciding which members of a generated type are intercepted
///
/// The name is the filter's identity for type caching: two filters with the
/// same name are assumed to select the same members.
#[derive(Clone)]
pub struct InterceptorFilter {
    name: String,
    predicate: Arc<dyn Fn(&MemberInfo) -> bool + Send + Sync>,
}

impl InterceptorFilter {
    /// Filter named `name` intercepting members for which `predicate` holds
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&MemberInfo) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Identity used in generated-type cache keys
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `member` is intercepted
    #[must_use]
    pub fn allows(&self, member: &MemberInfo) -> bool {
        (self.predicate)(member)
    }
}

impl fmt::Debug for InterceptorFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterceptorFilter").field(&self.name).finish()
    }
}

/// Caller-supplied adjustments applied before preset defaults
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
    /// Explicit constructor suppression; `None` lets the preset decide
    pub mock_constructor_call: Option<bool>,
    /// Units placed ahead of the preset's supplementary units
    pub supplementary: Vec<Arc<dyn Behavior>>,
    /// Units placed ahead of the preset's fallback units
    pub fallback: Vec<Arc<dyn Behavior>>,
    /// Extra mixins attached to the substitute
    pub mixins: MixinSet,
}

impl PolicyOverrides {
    /// Force constructor suppression on or off
    #[must_use]
    pub fn with_mock_constructor_call(mut self, mock: bool) -> Self {
        self.mock_constructor_call = Some(mock);
        self
    }

    /// Add a unit ahead of the preset's supplementary units
    #[must_use]
    pub fn with_supplementary(mut self, unit: Arc<dyn Behavior>) -> Self {
        self.supplementary.push(unit);
        self
    }

    /// Add a unit ahead of the preset's fallback units
    #[must_use]
    pub fn with_fallback(mut self, unit: Arc<dyn Behavior>) -> Self {
        self.fallback.push(unit);
        self
    }

    /// Replace the extra mixins
    #[must_use]
    pub fn with_mixins(mut self, mixins: MixinSet) -> Self {
        self.mixins = mixins;
        self
    }
}

/// Everything needed to build one substitute
#[derive(Debug, Clone, Default)]
pub struct MockCreationSettings {
    /// Constructor arguments (absent means "no explicit arguments")
    pub args: Option<Vec<Value>>,

    /// Whether the target type's constructor is suppressed
    pub mock_constructor_call: bool,

    /// Units consulted first, in order
    pub supplementary: Vec<Arc<dyn Behavior>>,
    /// Units consulted when every supplementary unit declined
    pub fallback: Vec<Arc<dyn Behavior>>,
    /// Mixins attached to the substitute
    pub mixins: MixinSet,
    /// Preset the settings were assembled from
    pub preset: Preset,

    /// Extra interfaces the generated type implements
    pub additional_interfaces: Vec<TypeRef>,

    /// Extra type-level annotations on the generated type
    pub additional_attributes: Vec<String>,

    /// Restricts interception to the members it allows
    pub interceptor_filter: Option<InterceptorFilter>,
}

impl MockCreationSettings {
    /// Also implement `interfaces`
    #[must_use]
    pub fn with_interfaces(mut self, interfaces: impl IntoIterator<Item = TypeRef>) -> Self {
        self.additional_interfaces.extend(interfaces);
        self
    }

    /// Tag the generated type with `attribute`
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.additional_attributes.push(attribute.into());
        self
    }

    /// Restrict interception to the members `filter` allows
    #[must_use]
    pub fn with_interceptor_filter(mut self, filter: InterceptorFilter) -> Self {
        self.interceptor_filter = Some(filter);
        self
    }

    /// Descriptions of every unit, supplementary first
    #[must_use]
    pub fn describe(&self) -> (Vec<String>, Vec<String>) {
        (
            self.supplementary.iter().map(|u| u.describe()).collect(),
            self.fallback.iter().map(|u| u.describe()).collect(),
        )
    }
}

/// Assemble the settings for `preset`
///
/// Units supplied through `overrides` keep their position ahead of the
/// preset's own units.
#[must_use]
pub fn assemble(
    preset: Preset,
    args: Option<Vec<Value>>,
    overrides: PolicyOverrides,
) -> MockCreationSettings {
    let PolicyOverrides {
        mock_constructor_call,
        mut supplementary,
        mut fallback,
        mut mixins,
    } = overrides;

    mixins.insert(Arc::new(PresetConfiguration::new(preset)));

    let event_stubs = Arc::new(EventStubsBehavior::new());
    mixins.insert(event_stubs.clone());
    mixins.insert(event_stubs.subscriptions().clone());

    let no_args = args.is_none();
    let mock_ctor = match preset {
        Preset::Loose | Preset::RecursiveLoose => {
            let mode = if preset == Preset::RecursiveLoose {
                RecursiveMode::ReturnMock
            } else {
                RecursiveMode::ReturnDefault
            };
            fallback.push(event_stubs);
            fallback.push(Arc::new(PropertyStubsBehavior::new()));
            fallback.push(Arc::new(CallOriginalObjectMethodsBehavior));
            fallback.push(Arc::new(RecursiveMockingBehavior::new(mode)));
            fallback.push(Arc::new(StaticConstructorMockBehavior));
            fallback.push(Arc::new(ExecuteConstructorBehavior));
            mock_constructor_call.unwrap_or(no_args)
        }
        Preset::Strict => {
            fallback.push(event_stubs);
            fallback.push(Arc::new(RecursiveMockingBehavior::new(
                RecursiveMode::OnlyDuringAnalysis,
            )));
            fallback.push(Arc::new(StaticConstructorMockBehavior));
            fallback.push(Arc::new(ExecuteConstructorBehavior));
            fallback.push(Arc::new(StrictBehavior::new(false)));
            supplementary.push(Arc::new(StrictBehavior::new(true)));
            mock_constructor_call.unwrap_or(no_args)
        }
        Preset::CallOriginal => {
            fallback.push(Arc::new(CallOriginalBehavior::new(true)));
            fallback.push(Arc::new(PropertyStubsBehavior::new()));
            fallback.push(event_stubs);
            fallback.push(Arc::new(RecursiveMockingBehavior::new(RecursiveMode::ReturnMock)));
            fallback.push(Arc::new(StaticConstructorMockBehavior));
            fallback.push(Arc::new(ExecuteConstructorBehavior));
            false
        }
    };

    tracing::debug!(
        %preset,
        supplementary = supplementary.len(),
        fallback = fallback.len(),
        mock_constructor_call = mock_ctor,
        "assembled mock policy"
    );

    MockCreationSettings {
        args,
        mock_constructor_call: mock_ctor,
        supplementary,
        fallback,
        mixins,
        preset,
        ..MockCreationSettings::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::EventSubscriptions;
    use pretty_assertions::assert_eq;

    fn names(units: &[Arc<dyn Behavior>]) -> Vec<String> {
        units.iter().map(|u| u.describe()).collect()
    }

    #[test]
    fn loose_order() {
        let settings = assemble(Preset::Loose, None, PolicyOverrides::default());
        assert!(settings.supplementary.is_empty());
        assert_eq!(
            names(&settings.fallback),
            vec![
                "event_stubs",
                "property_stubs",
                "call_original_object_methods",
                "recursive_mocking(return_default)",
                "static_constructor_mock",
                "execute_constructor",
            ]
        );
        assert!(settings.mock_constructor_call);
    }

    #[test]
    fn recursive_loose_returns_mocks() {
        let settings = assemble(Preset::RecursiveLoose, None, PolicyOverrides::default());
        assert_eq!(settings.fallback[3].describe(), "recursive_mocking(return_mock)");
    }

    #[test]
    fn strict_has_supplementary_strict() {
        let settings = assemble(Preset::Strict, None, PolicyOverrides::default());
        assert_eq!(
            names(&settings.supplementary),
            vec!["strict(value_returning_only)"]
        );
        assert_eq!(
            names(&settings.fallback),
            vec![
                "event_stubs",
                "recursive_mocking(only_during_analysis)",
                "static_constructor_mock",
                "execute_constructor",
                "strict",
            ]
        );
    }

    #[test]
    fn call_original_never_mocks_constructor() {
        let settings = assemble(
            Preset::CallOriginal,
            None,
            PolicyOverrides::default().with_mock_constructor_call(true),
        );
        assert!(!settings.mock_constructor_call);
        assert_eq!(
            names(&settings.fallback),
            vec![
                "call_original(skip_abstract)",
                "property_stubs",
                "event_stubs",
                "recursive_mocking(return_mock)",
                "static_constructor_mock",
                "execute_constructor",
            ]
        );
    }

    #[test]
    fn supplied_constructor_args_disable_suppression() {
        for preset in [Preset::Loose, Preset::RecursiveLoose, Preset::Strict] {
            let with_args = assemble(preset, Some(vec![Value::Int(1)]), PolicyOverrides::default());
            assert!(!with_args.mock_constructor_call, "{preset}");
            let empty = assemble(preset, Some(Vec::new()), PolicyOverrides::default());
            assert!(!empty.mock_constructor_call, "{preset}");
            let absent = assemble(preset, None, PolicyOverrides::default());
            assert!(absent.mock_constructor_call, "{preset}");
        }
    }

    #[test]
    fn explicit_override_wins() {
        let settings = assemble(
            Preset::Loose,
            None,
            PolicyOverrides::default().with_mock_constructor_call(false),
        );
        assert!(!settings.mock_constructor_call);
    }

    #[test]
    fn supplied_units_come_first() {
        let custom: Arc<dyn Behavior> = Arc::new(StrictBehavior::new(true));
        let settings = assemble(
            Preset::Strict,
            None,
            PolicyOverrides::default().with_supplementary(custom.clone()),
        );
        assert_eq!(settings.supplementary.len(), 2);
        assert!(Arc::ptr_eq(&settings.supplementary[0], &custom));
    }

    #[test]
    fn every_preset_records_mixins() {
        for preset in Preset::ALL {
            let settings = assemble(preset, None, PolicyOverrides::default());
            assert_eq!(
                settings.mixins.get::<PresetConfiguration>().unwrap().preset(),
                preset
            );
            assert!(settings.mixins.contains::<EventStubsBehavior>());
            assert!(settings.mixins.contains::<EventSubscriptions>());
            assert_eq!(settings.fallback.len(), if preset == Preset::Strict { 5 } else { 6 });
        }
    }

    #[test]
    fn preset_parsing() {
        assert_eq!("strict".parse::<Preset>().unwrap(), Preset::Strict);
        assert_eq!("RecursiveLoose".parse::<Preset>().unwrap(), Preset::RecursiveLoose);
        assert_eq!("call-original".parse::<Preset>().unwrap(), Preset::CallOriginal);
        assert!("lenient".parse::<Preset>().is_err());
    }

    #[test]
    fn preset_display_roundtrips() {
        for preset in Preset::ALL {
            assert_eq!(preset.to_string().parse::<Preset>().unwrap(), preset);
        }
    }
}
