//! Mimic Proxy
//!
//! Generation and caching of substitute types.
//!
//! # Core Concepts
//!
//! - [`CacheKey`]: Structural descriptor of a requested substitute shape
//! - [`ModuleScope`]: Owns the signed and unsigned namespaces and the type cache
//! - [`ProxyModule`]: One namespace; defines generated types
//! - [`NamingScope`]: Hands out unique type names
//! - [`ProxyTypeGenerator`]: Get-or-build over the cache, one generation per key
//! - [`PersistedModule`]: Saved namespace with its key to type-name table
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_proxy::{ModuleScope, ProxyRequest, ProxyTypeGenerator};
//! use std::sync::Arc;
//!
//! let generator = ProxyTypeGenerator::new(Arc::new(ModuleScope::new()));
//! let first = generator.get_or_build(&ProxyRequest::new(&service))?;
//! let second = generator.get_or_build(&ProxyRequest::new(&service))?;
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

#![warn(unreachable_pub)]

mod cache_key;
mod checksum;
mod error;
mod generator;
mod module;
mod naming;
mod persist;
mod scope;

pub use cache_key::CacheKey;
pub use checksum::ModuleChecksum;
pub use error::ProxyError;
pub use generator::{ProxyRequest, ProxyTypeGenerator};
pub use module::{ProxyModule, TypeDefinition};
pub use naming::NamingScope;
pub use persist::{CacheMapping, PersistedModule};
pub use scope::{ModuleScope, ScopeOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
