//! Module persistence
//!
//! A saved namespace is a JSON document holding the definitions of its
//! generated types, the cache key to type-name table and a Blake3 checksum
//! over both. Reloading it primes the type cache of another scope.

use crate::cache_key::CacheKey;
use crate::checksum::ModuleChecksum;
use crate::error::ProxyError;
use crate::module::TypeDefinition;
use crate::scope::ModuleScope;
use mimic_reflect::{TypeRef, TypeResolver};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One cache key to generated type-name entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMapping {
    /// Structural key of the request
    pub key: CacheKey,
    /// Generated type answering it
    pub type_name: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    name: &'a str,
    signed: bool,
    types: &'a [TypeDefinition],
    cache_mappings: &'a [CacheMapping],
}

/// A saved namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedModule {
    /// Namespace name
    pub name: String,
    /// Whether the namespace is the signed one
    pub signed: bool,
    /// Types defined in the namespace
    pub types: Vec<TypeDefinition>,
    /// Cache entries pointing into `types`
    #[serde(default)]
    pub cache_mappings: Vec<CacheMapping>,
    /// Hex checksum over the fields above
    pub checksum: String,
}

impl PersistedModule {
    /// Assemble a module and stamp its checksum
    ///
    /// # Errors
    /// Returns error if the payload cannot be serialized
    pub fn new(
        name: impl Into<String>,
        signed: bool,
        types: Vec<TypeDefinition>,
        cache_mappings: Vec<CacheMapping>,
    ) -> Result<Self, ProxyError> {
        let mut module = Self {
            name: name.into(),
            signed,
            types,
            cache_mappings,
            checksum: String::new(),
        };
        module.checksum = module.compute_checksum()?.to_string();
        Ok(module)
    }

    /// Checksum of the current content
    ///
    /// # Errors
    /// Returns error if the payload cannot be serialized
    pub fn compute_checksum(&self) -> Result<ModuleChecksum, ProxyError> {
        ModuleChecksum::of_serializable(&Payload {
            name: &self.name,
            signed: self.signed,
            types: &self.types,
            cache_mappings: &self.cache_mappings,
        })
    }

    /// Check content against the stored checksum
    ///
    /// # Errors
    /// Returns [`ProxyError::ChecksumMismatch`] if they differ
    pub fn verify(&self) -> Result<(), ProxyError> {
        let actual = self.compute_checksum()?;
        let expected: ModuleChecksum = self.checksum.parse()?;
        if actual != expected {
            return Err(ProxyError::ChecksumMismatch {
                module: self.name.clone(),
                expected: expected.short(),
                actual: actual.short(),
            });
        }
        Ok(())
    }

    /// Read a module from `path`
    ///
    /// # Errors
    /// I/O or decoding failures
    pub fn read_from(path: &Path) -> Result<Self, ProxyError> {
        let text = fs::read_to_string(path).map_err(|e| ProxyError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the module to `path`, replacing any existing file
    ///
    /// # Errors
    /// I/O or encoding failures
    pub fn write_to(&self, path: &Path) -> Result<(), ProxyError> {
        let json = serde_json::to_string_pretty(self)?;
        if path.exists() {
            fs::remove_file(path).map_err(|e| ProxyError::io(path, e))?;
        }
        fs::write(path, json).map_err(|e| ProxyError::io(path, e))
    }
}

impl ModuleScope {
    /// Persistable snapshot of one namespace
    ///
    /// Only cache entries whose type lives in that namespace are included.
    ///
    /// # Errors
    /// Returns [`ProxyError::NoModuleGenerated`] if the namespace was never created
    pub fn snapshot_module(&self, signed: bool) -> Result<PersistedModule, ProxyError> {
        let module = if signed {
            self.signed_module()
        } else {
            self.unsigned_module()
        }
        .ok_or(ProxyError::NoModuleGenerated { signed })?;

        let mut cache_mappings: Vec<CacheMapping> = self
            .cache_entries()
            .into_iter()
            .filter(|(_, ty)| module.contains(ty))
            .map(|(key, ty)| CacheMapping {
                key,
                type_name: ty.name().to_string(),
            })
            .collect();
        cache_mappings.sort_by(|a, b| a.key.cmp(&b.key));

        PersistedModule::new(module.name(), signed, module.definitions(), cache_mappings)
    }

    /// Save one namespace to the scope's directory
    ///
    /// Returns `None` when the scope does not save generated code.
    ///
    /// # Errors
    /// Missing namespace, I/O or encoding failures
    pub fn save_module(&self, signed: bool) -> Result<Option<PathBuf>, ProxyError> {
        if !self.options().save_generated_code {
            return Ok(None);
        }
        let snapshot = self.snapshot_module(signed)?;
        let path = self.module_path(&snapshot.name);
        snapshot.write_to(&path)?;
        tracing::info!(
            path = %path.display(),
            types = snapshot.types.len(),
            mappings = snapshot.cache_mappings.len(),
            "saved generated module"
        );
        Ok(Some(path))
    }

    /// Save whichever namespace was generated
    ///
    /// # Errors
    /// Returns [`ProxyError::BothModulesGenerated`] if both exist
    pub fn save(&self) -> Result<Option<PathBuf>, ProxyError> {
        if !self.options().save_generated_code {
            return Ok(None);
        }
        match (self.signed_module().is_some(), self.unsigned_module().is_some()) {
            (true, true) => Err(ProxyError::BothModulesGenerated),
            (true, false) => self.save_module(true),
            (false, true) => self.save_module(false),
            (false, false) => Ok(None),
        }
    }

    /// Prime the type cache from a saved namespace
    ///
    /// Mappings whose type cannot be rebuilt are skipped. Returns the number
    /// of cache entries registered.
    ///
    /// # Errors
    /// Returns [`ProxyError::MissingCacheMappings`] for a module without a
    /// mapping table and [`ProxyError::ChecksumMismatch`] for altered content
    pub fn load_into_cache(
        &self,
        module: &PersistedModule,
        resolver: &dyn TypeResolver,
    ) -> Result<usize, ProxyError> {
        if module.cache_mappings.is_empty() {
            return Err(ProxyError::MissingCacheMappings {
                module: module.name.clone(),
            });
        }
        module.verify()?;

        let mut built: HashMap<&str, TypeRef> = HashMap::new();
        let mut loaded = 0;
        for mapping in &module.cache_mappings {
            let name = mapping.type_name.as_str();
            let ty = if let Some(ty) = built.get(name) {
                ty.clone()
            } else {
                let Some(definition) = module.types.iter().find(|d| d.name == name) else {
                    tracing::warn!(ty = name, "mapping names an undefined type, skipping");
                    continue;
                };
                match definition.build(resolver) {
                    Ok(ty) => {
                        self.naming_scope().reserve(name);
                        built.insert(name, ty.clone());
                        ty
                    }
                    Err(err) => {
                        tracing::warn!(ty = name, error = %err, "cannot rebuild type, skipping");
                        continue;
                    }
                }
            };
            self.register_in_cache(mapping.key.clone(), ty);
            loaded += 1;
        }

        tracing::info!(module = %module.name, loaded, "loaded module into type cache");
        Ok(loaded)
    }

    /// Read a saved namespace from `path` and prime the cache from it
    ///
    /// # Errors
    /// Same as [`ModuleScope::load_into_cache`], plus I/O and decoding failures
    pub fn load_file_into_cache(
        &self,
        path: &Path,
        resolver: &dyn TypeResolver,
    ) -> Result<usize, ProxyError> {
        let module = PersistedModule::read_from(path)?;
        self.load_into_cache(&module, resolver)
    }
}
