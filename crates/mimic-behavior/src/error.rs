//! Error types for the behavior pipeline
//!
//! - [`ConstructionError`]: a substitute could not be generated or instantiated
//! - [`BehaviorError`]: a behavior unit rejected a call

/// A requested substitute cannot be generated or instantiated
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    /// Type cannot be derived from or intercepted
    #[error("type '{type_name}' cannot be intercepted: {reason}")]
    NotInterceptable {
        /// Name of the type
        type_name: String,
        /// Why it was refused
        reason: String,
    },

    /// No constructor accepts the supplied arguments
    #[error("no constructor of '{type_name}' accepts {arity} argument(s)")]
    ConstructorBinding {
        /// Name of the type
        type_name: String,
        /// Number of supplied arguments
        arity: usize,
    },

    /// Object already carries a mixin
    #[error("object {object} is already a substitute")]
    AlreadyMocked {
        /// Identity of the object
        object: String,
    },

    /// Type generation failed
    #[error("type generation failed: {0}")]
    Generation(String),

    /// The factory backing a substitute has been dropped
    #[error("the mock repository backing this substitute is gone")]
    RepositoryDropped,
}

impl ConstructionError {
    /// Create a not-interceptable error for `type_name`
    pub fn not_interceptable(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotInterceptable {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Failure raised while a behavior unit processes a call
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    /// Strict policy rejected an unarranged call
    #[error("strict substitute received an unarranged call: {call}")]
    PolicyViolation {
        /// The rejected call, as `Type.Member(args)`
        call: String,
    },

    /// Nested construction failed in a unit that does not decline on failure
    #[error("construction failed: {0}")]
    Construction(#[from] ConstructionError),
}

impl BehaviorError {
    /// Whether a strict policy rejected the call
    #[inline]
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::PolicyViolation { .. })
    }
}
