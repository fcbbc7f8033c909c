//! Get-or-build for substitute types

use crate::cache_key::CacheKey;
use crate::error::ProxyError;
use crate::scope::ModuleScope;
use mimic_reflect::TypeRef;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shape of a substitute type to obtain
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    base: TypeRef,
    interfaces: Vec<TypeRef>,
    attributes: Vec<String>,
    filter: Option<String>,
}

impl ProxyRequest {
    /// Request for a substitute type of `base`
    #[must_use]
    pub fn new(base: &TypeRef) -> Self {
        Self {
            base: base.clone(),
            interfaces: Vec::new(),
            attributes: Vec::new(),
            filter: None,
        }
    }

    /// Also implement `interface`
    #[must_use]
    pub fn with_interface(mut self, interface: &TypeRef) -> Self {
        if !self.interfaces.iter().any(|i| i.name() == interface.name()) {
            self.interfaces.push(interface.clone());
        }
        self
    }

    /// Also implement each of `interfaces`
    #[must_use]
    pub fn with_interfaces<'a>(self, interfaces: impl IntoIterator<Item = &'a TypeRef>) -> Self {
        interfaces
            .into_iter()
            .fold(self, |request, interface| request.with_interface(interface))
    }

    /// Tag the generated type with `attribute`
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute);
        }
        self
    }

    /// Name of the interceptor filter the type is generated for
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Type being substituted
    #[inline]
    #[must_use]
    pub fn base(&self) -> &TypeRef {
        &self.base
    }

    /// Structural key of this request
    #[must_use]
    pub fn key(&self) -> CacheKey {
        let key = self
            .interfaces
            .iter()
            .fold(CacheKey::new(&self.base), |key, i| key.with_interface(i));
        let key = self
            .attributes
            .iter()
            .fold(key, |key, a| key.with_attribute(a.clone()));
        match &self.filter {
            Some(filter) => key.with_filter(filter.clone()),
            None => key,
        }
    }

    fn validate(&self) -> Result<(), ProxyError> {
        if !self.base.is_interceptable() {
            return Err(ProxyError::NotInterceptable {
                type_name: self.base.name().to_string(),
                reason: "type is sealed or not a class or interface".to_string(),
            });
        }
        if let Some(bad) = self.interfaces.iter().find(|i| !i.is_interface()) {
            return Err(ProxyError::NotInterceptable {
                type_name: bad.name().to_string(),
                reason: "additional types must be interfaces".to_string(),
            });
        }
        Ok(())
    }
}

/// Produces substitute types, generating each distinct shape once
#[derive(Debug)]
pub struct ProxyTypeGenerator {
    scope: Arc<ModuleScope>,
    generations: AtomicUsize,
}

impl ProxyTypeGenerator {
    /// Generator caching into `scope`
    #[must_use]
    pub fn new(scope: Arc<ModuleScope>) -> Self {
        Self {
            scope,
            generations: AtomicUsize::new(0),
        }
    }

    /// Scope generated types are cached in
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Arc<ModuleScope> {
        &self.scope
    }

    /// Number of types this generator has emitted
    #[must_use]
    pub fn generation_count(&self) -> usize {
        self.generations.load(Ordering::Acquire)
    }

    /// Cached type for `request`'s shape, generating it on first request
    ///
    /// # Errors
    /// Returns [`ProxyError::NotInterceptable`] for sealed bases or
    /// non-interface extras, and namespace errors from the scope
    pub fn get_or_build(&self, request: &ProxyRequest) -> Result<TypeRef, ProxyError> {
        request.validate()?;
        let key = request.key();
        self.scope.get_or_generate(&key, || self.generate(request))
    }

    fn generate(&self, request: &ProxyRequest) -> Result<TypeRef, ProxyError> {
        let base = &request.base;
        let name = self
            .scope
            .naming_scope()
            .get_unique_name(&format!("{}Proxy", base.name()));
        let extra: Vec<TypeRef> = request
            .interfaces
            .iter()
            .filter(|i| !i.is_assignable_from(base))
            .cloned()
            .collect();
        let ty = self
            .scope
            .define_type(&name, base, &extra, &request.attributes)?;
        self.generations.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(ty = %name, base = %base.name(), "generated substitute type");
        Ok(ty)
    }
}
