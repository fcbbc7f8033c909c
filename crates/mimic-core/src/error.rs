//! Error types for the mock repository
//!
//! [`MockError`] is what callers of the repository see. Its variants follow
//! the three failure families of the engine:
//! - construction failures (recoverable inside the behavior chain)
//! - policy violations (terminal by design)
//! - type cache / namespace configuration failures (terminal to the request)

use crate::config::ConfigError;
use mimic_behavior::{BehaviorError, ConstructionError};
use mimic_proxy::ProxyError;

/// Main mock error type
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Substitute could not be generated or instantiated
    #[error("construction failed: {0}")]
    Construction(#[from] ConstructionError),

    /// Strict policy rejected an unarranged call
    #[error("strict substitute received an unarranged call: {call}")]
    PolicyViolation {
        /// The rejected call, as `Type.Member(args)`
        call: String,
    },

    /// A call asked for the original implementation of an abstract member
    #[error("no original implementation is available for {member}")]
    NoOriginalImplementation {
        /// The member, as `Type.Member`
        member: String,
    },

    /// Member lookup by name failed
    #[error("type '{type_name}' has no member '{member}'")]
    MemberNotFound {
        /// Name of the type
        type_name: String,
        /// Name of the missing member
        member: String,
    },

    /// Type cache or namespace failure
    #[error("type cache error: {0}")]
    Proxy(#[from] ProxyError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl MockError {
    /// Whether the failure can be absorbed by falling through the chain
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Construction(_))
    }

    /// Whether a strict policy rejected the call
    #[inline]
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::PolicyViolation { .. })
    }
}

impl From<BehaviorError> for MockError {
    fn from(err: BehaviorError) -> Self {
        match err {
            BehaviorError::PolicyViolation { call } => Self::PolicyViolation { call },
            BehaviorError::Construction(inner) => Self::Construction(inner),
        }
    }
}

/// Fold a type generation failure into a construction failure
pub(crate) fn construction_from_proxy(err: ProxyError) -> ConstructionError {
    match err {
        ProxyError::NotInterceptable { type_name, reason } => {
            ConstructionError::NotInterceptable { type_name, reason }
        }
        other => ConstructionError::Generation(other.to_string()),
    }
}
