//! Generation namespaces

use crate::error::ProxyError;
use mimic_reflect::{TypeInfo, TypeRef, TypeResolver};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Serializable description of a generated type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Generated type name
    pub name: String,
    /// Name of the mocked type
    pub base: String,
    /// Additional interfaces, by name
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Attribute tags
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl TypeDefinition {
    /// Materialize the type, resolving base and interfaces through `resolver`
    ///
    /// # Errors
    /// Returns [`ProxyError::UnresolvedType`] if a referenced type is unknown
    pub fn build(&self, resolver: &dyn TypeResolver) -> Result<TypeRef, ProxyError> {
        let resolve = |name: &str| {
            resolver
                .resolve(name)
                .ok_or_else(|| ProxyError::UnresolvedType(name.to_string()))
        };
        let base = resolve(&self.base)?;
        let mut builder = TypeInfo::proxy(self.name.clone(), &base);
        for interface in &self.interfaces {
            builder = builder.implements(&resolve(interface)?);
        }
        for attribute in &self.attributes {
            builder = builder.attribute(attribute.clone());
        }
        Ok(builder.build())
    }
}

/// One generation namespace
///
/// Defines generated types directly; caching by shape happens one level up
/// in [`crate::ModuleScope`].
#[derive(Debug)]
pub struct ProxyModule {
    name: String,
    signed: bool,
    types: RwLock<Vec<(TypeDefinition, TypeRef)>>,
}

impl ProxyModule {
    pub(crate) fn new(name: impl Into<String>, signed: bool) -> Self {
        Self {
            name: name.into(),
            signed,
            types: RwLock::new(Vec::new()),
        }
    }

    /// Namespace name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the signed namespace
    #[inline]
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Define a generated type deriving from `base`
    #[must_use]
    pub fn define_type(
        &self,
        name: &str,
        base: &TypeRef,
        interfaces: &[TypeRef],
        attributes: &[String],
    ) -> TypeRef {
        let mut builder = TypeInfo::proxy(name, base);
        for interface in interfaces {
            builder = builder.implements(interface);
        }
        for attribute in attributes {
            builder = builder.attribute(attribute.clone());
        }
        let ty = builder.build();
        let definition = TypeDefinition {
            name: name.to_string(),
            base: base.name().to_string(),
            interfaces: interfaces.iter().map(|i| i.name().to_string()).collect(),
            attributes: attributes.to_vec(),
        };
        self.types.write().push((definition, ty.clone()));
        tracing::trace!(module = %self.name, ty = name, "defined type");
        ty
    }

    /// Whether `ty` was defined in this module
    #[must_use]
    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.types
            .read()
            .iter()
            .any(|(_, defined)| std::sync::Arc::ptr_eq(defined, ty))
    }

    /// Generated type named `name`
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<TypeRef> {
        self.types
            .read()
            .iter()
            .find(|(definition, _)| definition.name == name)
            .map(|(_, ty)| ty.clone())
    }

    /// Definitions of every type defined so far
    #[must_use]
    pub fn definitions(&self) -> Vec<TypeDefinition> {
        self.types.read().iter().map(|(d, _)| d.clone()).collect()
    }

    /// Number of defined types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Whether no type was defined yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_reflect::{int_type, TypeRegistry};

    #[test]
    fn define_records_definition() {
        let module = ProxyModule::new("test", true);
        let service = TypeInfo::interface("IService")
            .method("Get", int_type(), |m| m)
            .build();
        let disposable = TypeInfo::interface("IDisposable").build();

        let ty = module.define_type(
            "IServiceProxy",
            &service,
            &[disposable.clone()],
            &["Serializable".to_string()],
        );

        assert!(ty.is_proxy());
        assert!(service.is_assignable_from(&ty));
        assert!(disposable.is_assignable_from(&ty));
        assert!(module.contains(&ty));
        assert_eq!(ty.unproxied().name(), "IService");
        assert_eq!(
            module.definitions(),
            vec![TypeDefinition {
                name: "IServiceProxy".into(),
                base: "IService".into(),
                interfaces: vec!["IDisposable".into()],
                attributes: vec!["Serializable".into()],
            }]
        );
    }

    #[test]
    fn definition_rebuilds_through_registry() {
        let registry = TypeRegistry::new();
        let service = TypeInfo::interface("IService").build();
        registry.register(&service);

        let definition = TypeDefinition {
            name: "IServiceProxy".into(),
            base: "IService".into(),
            interfaces: Vec::new(),
            attributes: Vec::new(),
        };
        let ty = definition.build(&registry).unwrap();
        assert!(service.is_assignable_from(&ty));

        let missing = TypeDefinition {
            base: "IMissing".into(),
            ..definition
        };
        assert!(matches!(
            missing.build(&registry),
            Err(ProxyError::UnresolvedType(name)) if name == "IMissing"
        ));
    }
}
