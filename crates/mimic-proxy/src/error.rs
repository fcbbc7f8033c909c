//! Error types for type generation and the type cache

use std::path::PathBuf;

/// Type generation, namespace and persistence failures
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The signed namespace was requested but is disabled
    #[error("the signed module is disabled for this scope")]
    SignedModuleDisabled,

    /// A persisted module carries no key to type-name table
    #[error("module '{module}' does not contain any cache information for generated types")]
    MissingCacheMappings {
        /// Module name
        module: String,
    },

    /// `save` cannot pick between two generated namespaces
    #[error("both a signed and an unsigned module have been generated")]
    BothModulesGenerated,

    /// The requested namespace was never materialized
    #[error("no {} module has been generated", namespace_label(.signed))]
    NoModuleGenerated {
        /// Whether the signed namespace was asked for
        signed: bool,
    },

    /// Base type cannot be derived from
    #[error("type '{type_name}' cannot be proxied: {reason}")]
    NotInterceptable {
        /// Name of the type
        type_name: String,
        /// Why it was refused
        reason: String,
    },

    /// Persisted module content does not match its checksum
    #[error("checksum mismatch for module '{module}': expected {expected}, found {actual}")]
    ChecksumMismatch {
        /// Module name
        module: String,
        /// Checksum recorded in the file
        expected: String,
        /// Checksum of the content read
        actual: String,
    },

    /// A type named in a persisted definition is unknown
    #[error("type '{0}' cannot be resolved")]
    UnresolvedType(String),

    /// Malformed checksum text
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// File system failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn namespace_label(signed: &bool) -> &'static str {
    if *signed {
        "signed"
    } else {
        "unsigned"
    }
}

impl ProxyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a scope configuration problem rather than a bad input
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::SignedModuleDisabled | Self::MissingCacheMappings { .. } | Self::BothModulesGenerated
        )
    }
}
