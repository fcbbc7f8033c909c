//! Mimic Core
//!
//! The mock repository. Builds substitutes from a preset plus overrides,
//! wraps external objects, intercepts static members, and hosts the
//! interception boundary that turns a dispatched [`Invocation`] into a
//! result.
//!
//! # Core Concepts
//!
//! - [`MocksRepository`]: Substitute construction and the `invoke` boundary
//! - [`MockOptions`]: Per-request preset, arguments, overrides and extras
//! - [`MockConfig`]: Repository configuration (TOML)
//! - [`ArrangementSource`]: Hook for the arrangement front end
//! - [`MockError`]: Unified error type
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_core::{MockOptions, MocksRepository, Preset};
//! use mimic_reflect::{int_type, TypeInfo};
//!
//! let service = TypeInfo::interface("IService")
//!     .method("Count", int_type(), |m| m)
//!     .build();
//!
//! let repo = MocksRepository::new();
//! let mock = repo.create(&service, MockOptions::preset(Preset::Strict))?;
//! assert!(repo.invoke_member(&mock, "Count", vec![]).unwrap_err().is_policy_violation());
//! ```
//!
//! [`Invocation`]: mimic_behavior::Invocation

#![warn(unreachable_pub)]

mod arrangement;
mod config;
mod error;
mod options;
mod repository;

pub use arrangement::{ArrangedOutcome, ArrangementSource};
pub use config::{ConfigError, MockConfig};
pub use error::MockError;
pub use options::MockOptions;
pub use repository::{CallContext, MocksRepository};

pub use mimic_behavior::{Preset, RecursiveMode};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
