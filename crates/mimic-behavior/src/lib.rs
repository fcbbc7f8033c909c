//! Mimic Behavior
//!
//! The interception-and-policy pipeline. A call reaching a substitute is
//! represented as an [`Invocation`]; the substitute's [`BehaviorChain`] walks
//! its supplementary units, then its fallback units, until one claims it.
//!
//! # Core Concepts
//!
//! - [`Invocation`]: Call record with immutable inputs and write-once outcome
//! - [`Behavior`]: Capability "inspect and optionally claim a call"
//! - [`BehaviorChain`]: First-claim-wins dispatch over two ordered lists
//! - [`RecursiveMockingBehavior`]: Builds and remembers nested substitutes
//! - [`ReturnRules`]: Value-synthesis rules for arrays, maps and sequences
//! - [`Preset`] / [`assemble`]: Turns a preset plus overrides into settings
//! - [`MockMixin`]: Per-substitute state (chain, mixins, dependents)
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_behavior::{assemble, PolicyOverrides, Preset};
//!
//! let settings = assemble(Preset::Strict, None, PolicyOverrides::default());
//! assert_eq!(settings.supplementary.len(), 1);
//! assert_eq!(settings.fallback.len(), 5);
//! ```

#![warn(unreachable_pub)]

mod behavior;
mod error;
mod invocation;
mod mixin;
mod policy;
mod return_rules;

pub mod behaviors;

pub use behavior::{Behavior, BehaviorChain, Dispatch};
pub use behaviors::{
    CallOriginalBehavior, CallOriginalObjectMethodsBehavior, CollectionContents,
    CollectionStubsBehavior, EventStubsBehavior, EventSubscriptions, ExecuteConstructorBehavior,
    MockCollection, PropertyStubsBehavior, RecursiveMockingBehavior, RecursiveMode,
    StaticConstructorMockBehavior, StrictBehavior,
};
pub use error::{BehaviorError, ConstructionError};
pub use invocation::Invocation;
pub use mixin::{MixinSet, MockFactory, MockMixin};
pub use policy::{
    assemble, InterceptorFilter, MockCreationSettings, PolicyOverrides, Preset,
    PresetConfiguration, PresetParseError,
};
pub use return_rules::{
    ArrayReturnRule, MapReturnRule, ReturnRule, ReturnRules, SequenceReturnRule,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
