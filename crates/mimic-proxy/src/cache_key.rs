//! Structural cache key

use mimic_reflect::TypeInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Shape of a requested substitute type
///
/// Equality and hashing are structural: interface and attribute order does
/// not matter, and no reference to a generated type is involved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    base: String,
    interfaces: BTreeSet<String>,
    attributes: BTreeSet<String>,
    filter: Option<String>,
}

impl CacheKey {
    /// Key for a plain substitute of `base`
    #[must_use]
    pub fn new(base: &TypeInfo) -> Self {
        Self::named(base.name())
    }

    /// Key for a substitute of the type named `base`
    #[must_use]
    pub fn named(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            interfaces: BTreeSet::new(),
            attributes: BTreeSet::new(),
            filter: None,
        }
    }

    /// Add an implemented interface
    #[must_use]
    pub fn with_interface(mut self, interface: &TypeInfo) -> Self {
        self.interfaces.insert(interface.name().to_string());
        self
    }

    /// Add an attribute tag
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.insert(attribute.into());
        self
    }

    /// Identity of the member-interception filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Name of the mocked type
    #[inline]
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Additional interface names, sorted
    #[inline]
    #[must_use]
    pub fn interfaces(&self) -> &BTreeSet<String> {
        &self.interfaces
    }

    /// Attribute tags, sorted
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    /// Interceptor filter name, if any
    #[inline]
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        if !self.interfaces.is_empty() {
            let list: Vec<&str> = self.interfaces.iter().map(String::as_str).collect();
            write!(f, " + [{}]", list.join(", "))?;
        }
        if !self.attributes.is_empty() {
            let list: Vec<&str> = self.attributes.iter().map(String::as_str).collect();
            write!(f, " @[{}]", list.join(", "))?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " | {filter}")?;
        }
        Ok(())
    }
}
