//! Generation scope and type cache
//!
//! A [`ModuleScope`] owns two namespaces, "signed" and "unsigned", each
//! created on first use behind a gate so concurrent first requests observe a
//! single namespace. It also owns the structural type cache mapping
//! [`CacheKey`]s to completed generated types.

use crate::cache_key::CacheKey;
use crate::error::ProxyError;
use crate::module::ProxyModule;
use crate::naming::NamingScope;
use mimic_reflect::TypeRef;
use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default file name of the signed namespace
pub const DEFAULT_SIGNED_MODULE_NAME: &str = "mimic.dynamic.signed.json";

/// Default file name of the unsigned namespace
pub const DEFAULT_UNSIGNED_MODULE_NAME: &str = "mimic.dynamic.json";

/// Construction options for a [`ModuleScope`]
#[derive(Debug, Clone)]
pub struct ScopeOptions {
    /// Whether namespaces can be saved to disk
    pub save_generated_code: bool,

    /// Refuse to materialize the signed namespace
    pub disable_signed_module: bool,

    /// Name of the signed namespace
    pub signed_module_name: String,
    /// Name of the unsigned namespace
    pub unsigned_module_name: String,

    /// Directory saved modules are written to (current directory if absent)
    pub directory: Option<PathBuf>,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            save_generated_code: false,
            disable_signed_module: false,
            signed_module_name: DEFAULT_SIGNED_MODULE_NAME.to_string(),
            unsigned_module_name: DEFAULT_UNSIGNED_MODULE_NAME.to_string(),
            directory: None,
        }
    }
}

impl ScopeOptions {
    /// Allow saving generated modules
    #[must_use]
    pub fn with_save_generated_code(mut self, save: bool) -> Self {
        self.save_generated_code = save;
        self
    }

    /// Make requests for the signed namespace fail
    #[must_use]
    pub fn with_signed_module_disabled(mut self, disabled: bool) -> Self {
        self.disable_signed_module = disabled;
        self
    }

    /// Directory modules are saved to
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Names of the signed and unsigned namespaces
    #[must_use]
    pub fn with_module_names(mut self, signed: impl Into<String>, unsigned: impl Into<String>) -> Self {
        self.signed_module_name = signed.into();
        self.unsigned_module_name = unsigned.into();
        self
    }
}

/// Owner of the generation namespaces and the type cache
#[derive(Debug)]
pub struct ModuleScope {
    options: ScopeOptions,
    naming: NamingScope,
    module_gate: Mutex<()>,
    signed: RwLock<Option<Arc<ProxyModule>>>,
    unsigned: RwLock<Option<Arc<ProxyModule>>>,
    type_cache: RwLock<HashMap<CacheKey, TypeRef>>,
}

impl Default for ModuleScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleScope {
    /// Scope with default options (nothing saved, signed namespace allowed)
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ScopeOptions::default())
    }

    /// Scope using `options`
    #[must_use]
    pub fn with_options(options: ScopeOptions) -> Self {
        Self {
            options,
            naming: NamingScope::new(),
            module_gate: Mutex::new(()),
            signed: RwLock::new(None),
            unsigned: RwLock::new(None),
            type_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Options the scope was built with
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ScopeOptions {
        &self.options
    }

    /// Names already handed out to generated types
    #[inline]
    #[must_use]
    pub fn naming_scope(&self) -> &NamingScope {
        &self.naming
    }

    /// Cached type for `key`
    #[must_use]
    pub fn get_from_cache(&self, key: &CacheKey) -> Option<TypeRef> {
        self.type_cache.read().get(key).cloned()
    }

    /// Insert or overwrite the cached type for `key`
    pub fn register_in_cache(&self, key: CacheKey, ty: TypeRef) {
        tracing::trace!(%key, ty = %ty.name(), "registered in type cache");
        self.type_cache.write().insert(key, ty);
    }

    /// Cached type for `key`, generating it at most once
    ///
    /// Readers never block each other; the generating caller holds the
    /// upgradable lock so concurrent requests for any key wait for it and
    /// then observe its result.
    ///
    /// # Errors
    /// Propagates generation failures; nothing is cached on failure
    pub fn get_or_generate<F>(&self, key: &CacheKey, generate: F) -> Result<TypeRef, ProxyError>
    where
        F: FnOnce() -> Result<TypeRef, ProxyError>,
    {
        if let Some(ty) = self.get_from_cache(key) {
            tracing::trace!(%key, "type cache hit");
            return Ok(ty);
        }

        let cache = self.type_cache.upgradable_read();
        if let Some(ty) = cache.get(key) {
            return Ok(ty.clone());
        }
        tracing::debug!(%key, "type cache miss, generating");
        let ty = generate()?;
        let mut cache = RwLockUpgradableReadGuard::upgrade(cache);
        cache.insert(key.clone(), ty.clone());
        Ok(ty)
    }

    /// Number of cached types
    #[must_use]
    pub fn cached_types(&self) -> usize {
        self.type_cache.read().len()
    }

    pub(crate) fn cache_entries(&self) -> Vec<(CacheKey, TypeRef)> {
        self.type_cache
            .read()
            .iter()
            .map(|(k, t)| (k.clone(), t.clone()))
            .collect()
    }

    /// The signed namespace, if it has been created
    #[must_use]
    pub fn signed_module(&self) -> Option<Arc<ProxyModule>> {
        self.signed.read().clone()
    }

    /// The unsigned namespace, if it has been created
    #[must_use]
    pub fn unsigned_module(&self) -> Option<Arc<ProxyModule>> {
        self.unsigned.read().clone()
    }

    /// Namespace of the requested kind, created on first use
    ///
    /// # Errors
    /// Returns [`ProxyError::SignedModuleDisabled`] when asking for the signed
    /// namespace of a scope that disables it
    pub fn obtain_module(&self, signed: bool) -> Result<Arc<ProxyModule>, ProxyError> {
        if signed && self.options.disable_signed_module {
            return Err(ProxyError::SignedModuleDisabled);
        }
        let slot = if signed { &self.signed } else { &self.unsigned };
        if let Some(module) = slot.read().clone() {
            return Ok(module);
        }

        let _gate = self.module_gate.lock();
        if let Some(module) = slot.read().clone() {
            return Ok(module);
        }
        let name = if signed {
            &self.options.signed_module_name
        } else {
            &self.options.unsigned_module_name
        };
        let module = Arc::new(ProxyModule::new(name.clone(), signed));
        *slot.write() = Some(module.clone());
        tracing::debug!(module = %name, signed, "created generation module");
        Ok(module)
    }

    /// Define a generated type in the signed namespace
    ///
    /// # Errors
    /// Returns [`ProxyError::SignedModuleDisabled`] when the scope disables the
    /// signed namespace
    pub fn define_type(
        &self,
        name: &str,
        base: &TypeRef,
        interfaces: &[TypeRef],
        attributes: &[String],
    ) -> Result<TypeRef, ProxyError> {
        let module = self.obtain_module(true)?;
        Ok(module.define_type(name, base, interfaces, attributes))
    }

    /// Path a module named `name` is saved to
    #[must_use]
    pub fn module_path(&self, name: &str) -> PathBuf {
        self.options
            .directory
            .as_deref()
            .unwrap_or_else(|| Path::new("."))
            .join(name)
    }
}
