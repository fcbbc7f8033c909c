//! Type lookup by name

use crate::types::{
    bool_type, char_type, float_type, int_type, object_type, string_type, void_type, TypeRef,
};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Resolves type names back to descriptors (used when reloading persisted
/// generated types)
pub trait TypeResolver: Send + Sync {
    /// Descriptor registered under `name`
    fn resolve(&self, name: &str) -> Option<TypeRef>;
}

/// Name-keyed set of known types, pre-populated with the built-ins
#[derive(Debug)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, TypeRef>>,
}

impl TypeRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        let registry = Self {
            types: RwLock::new(HashMap::new()),
        };
        for ty in [
            void_type(),
            bool_type(),
            int_type(),
            float_type(),
            char_type(),
            string_type(),
            object_type(),
        ] {
            registry.register(ty);
        }
        registry
    }

    /// Register `ty` under its name, replacing any previous entry
    pub fn register(&self, ty: &TypeRef) {
        self.types.write().insert(ty.name().to_string(), ty.clone());
    }

    /// Type registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.types.read().get(name).cloned()
    }

    /// Whether a type is registered under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Whether no type is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, name: &str) -> Option<TypeRef> {
        self.get(name)
    }
}
