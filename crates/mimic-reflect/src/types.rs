//! Type descriptors
//!
//! Provides [`TypeInfo`], the shape a substitute is requested for, and
//! [`TypeInfoBuilder`] for declaring types together with their members.

use crate::member::{MemberBuilder, MemberKind, MemberRef, ReturnSlot};
use crate::object::ObjectRef;
use crate::value::Value;
use once_cell::sync::Lazy;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Shared handle to a type descriptor
pub type TypeRef = Arc<TypeInfo>;

/// Name of the root type every class derives from
pub(crate) const OBJECT_TYPE_NAME: &str = "Object";

/// Built-in value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Boolean
    Bool,

    /// 64-bit signed integer
    Int,

    /// 64-bit float
    Float,

    /// Unicode scalar
    Char,
}

/// Structural kind of a type
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// No value (`void` return)
    Void,

    /// Value type
    Primitive(Primitive),

    /// Textual string (reference type, sealed)
    String,

    /// Array of `element` with `rank` dimensions
    Array {
        /// Element type
        element: TypeRef,
        /// Number of dimensions (>= 1)
        rank: usize,
    },

    /// Class (may be abstract or sealed)
    Class,

    /// Interface (all members abstract)
    Interface,
}

/// Generic collection capability a type exposes
///
/// Stands in for implementing a generic collection interface: a type with a
/// `Map` capability can be read and written through its indexer.
#[derive(Debug, Clone)]
pub enum Capability {
    /// Keyed map (`key -> value`)
    Map {
        /// Key type
        key: TypeRef,
        /// Value type
        value: TypeRef,
    },

    /// Enumerable sequence of `item`
    Sequence {
        /// Item type
        item: TypeRef,
    },
}

/// Type descriptor
///
/// Immutable once built. Members keep a weak back-reference to their
/// declaring type, so a member may return its own declaring type without
/// creating a reference cycle.
pub struct TypeInfo {
    name: String,
    kind: TypeKind,
    base: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    capabilities: Vec<Capability>,
    members: Vec<MemberRef>,
    attributes: Vec<String>,
    sealed: bool,
    is_abstract: bool,
    proxy: bool,
}

impl TypeInfo {
    /// Start declaring a class
    #[must_use]
    pub fn class(name: impl Into<String>) -> TypeInfoBuilder {
        TypeInfoBuilder::new(name.into(), TypeKind::Class).with_base(object_type())
    }

    /// Start declaring an interface
    #[must_use]
    pub fn interface(name: impl Into<String>) -> TypeInfoBuilder {
        TypeInfoBuilder::new(name.into(), TypeKind::Interface)
    }

    /// Start declaring a generated proxy type deriving from `base`
    #[must_use]
    pub fn proxy(name: impl Into<String>, base: &TypeRef) -> TypeInfoBuilder {
        let mut builder = TypeInfoBuilder::new(name.into(), TypeKind::Class);
        if base.is_interface() {
            builder = builder.with_base(object_type()).implements(base);
        } else {
            builder = builder.with_base(base);
        }
        builder.proxy = true;
        builder
    }

    /// Array type of `element` with `rank` dimensions
    #[must_use]
    pub fn array_of(element: &TypeRef, rank: usize) -> TypeRef {
        let rank = rank.max(1);
        let commas = ",".repeat(rank - 1);
        TypeInfoBuilder::new(
            format!("{}[{commas}]", element.name()),
            TypeKind::Array {
                element: element.clone(),
                rank,
            },
        )
        .with_base(object_type())
        .sealed()
        .build()
    }

    /// Type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Direct base type
    #[inline]
    #[must_use]
    pub fn base(&self) -> Option<&TypeRef> {
        self.base.as_ref()
    }

    /// Directly implemented interfaces
    #[inline]
    #[must_use]
    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    /// Directly declared capabilities
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Members declared on this type (not inherited ones)
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[MemberRef] {
        &self.members
    }

    /// Type-level annotations
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Whether the type cannot be derived from
    #[inline]
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Whether the class is abstract
    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether the type is an interface
    #[inline]
    #[must_use]
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    /// Whether this type was generated as a substitute type
    #[inline]
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.proxy
    }

    /// Whether this is the `void` type
    #[inline]
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    /// Whether this is the built-in string type
    #[inline]
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.kind, TypeKind::String)
    }

    /// Whether the type is an array of any rank
    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    /// Primitive, copied by value
    #[inline]
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    /// Reference type: neither void nor a value type
    #[inline]
    #[must_use]
    pub fn is_reference_type(&self) -> bool {
        !self.is_void() && !self.is_value_type()
    }

    /// Whether a substitute can derive from this type
    ///
    /// Sealed classes, arrays, strings and value types cannot be intercepted.
    #[must_use]
    pub fn is_interceptable(&self) -> bool {
        match self.kind {
            TypeKind::Interface => true,
            TypeKind::Class => !self.sealed,
            _ => false,
        }
    }

    /// Array element type and rank
    #[must_use]
    pub fn array_shape(&self) -> Option<(&TypeRef, usize)> {
        match &self.kind {
            TypeKind::Array { element, rank } => Some((element, *rank)),
            _ => None,
        }
    }

    /// Base chain, nearest first (excludes `self`)
    #[must_use]
    pub fn ancestors(&self) -> Vec<TypeRef> {
        let mut chain = Vec::new();
        let mut current = self.base.clone();
        while let Some(ty) = current {
            current = ty.base.clone();
            chain.push(ty);
        }
        chain
    }

    /// Whether this type is, inherits from, or implements the type named `name`
    #[must_use]
    pub fn derives_from(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }
        if self.interfaces.iter().any(|i| i.derives_from(name)) {
            return true;
        }
        self.base.as_ref().is_some_and(|b| b.derives_from(name))
    }

    /// Whether a value of type `other` can be used where `self` is expected
    #[must_use]
    pub fn is_assignable_from(&self, other: &TypeInfo) -> bool {
        if self.name == OBJECT_TYPE_NAME {
            return !other.is_void();
        }
        other.derives_from(&self.name)
    }

    /// Key/value types if this type implements a keyed-map capability
    #[must_use]
    pub fn implementation_of_map(&self) -> Option<(TypeRef, TypeRef)> {
        self.find_capability(&|cap: &Capability| match cap {
            Capability::Map { key, value } => Some((key.clone(), value.clone())),
            Capability::Sequence { .. } => None,
        })
    }

    /// Item type if this type implements a sequence capability
    #[must_use]
    pub fn implementation_of_sequence(&self) -> Option<TypeRef> {
        self.find_capability(&|cap: &Capability| match cap {
            Capability::Sequence { item } => Some(item.clone()),
            Capability::Map { .. } => None,
        })
    }

    fn find_capability<T>(&self, pick: &dyn Fn(&Capability) -> Option<T>) -> Option<T> {
        self.capabilities
            .iter()
            .find_map(pick)
            .or_else(|| self.interfaces.iter().find_map(|i| i.find_capability(pick)))
            .or_else(|| self.base.as_ref().and_then(|b| b.find_capability(pick)))
    }

    /// Find a member by name on this type, its bases, then its interfaces
    #[must_use]
    pub fn find_member(&self, name: &str) -> Option<MemberRef> {
        self.members
            .iter()
            .find(|m| m.name() == name)
            .cloned()
            .or_else(|| self.base.as_ref().and_then(|b| b.find_member(name)))
            .or_else(|| self.interfaces.iter().find_map(|i| i.find_member(name)))
    }

    /// Resolve the member that actually runs when `member` is called on an
    /// instance of this type
    ///
    /// Walks this type and its bases for the first non-abstract member with
    /// the same name, kind and arity. Falls back to `member` itself.
    #[must_use]
    pub fn concrete_implementer(&self, member: &MemberRef) -> MemberRef {
        let matches = |m: &&MemberRef| {
            m.name() == member.name()
                && m.kind() == member.kind()
                && m.params().len() == member.params().len()
                && !m.is_abstract()
        };
        if let Some(found) = self.members.iter().find(matches) {
            return found.clone();
        }
        self.ancestors()
            .iter()
            .find_map(|ty| ty.members.iter().find(matches).cloned())
            .unwrap_or_else(|| member.clone())
    }

    /// Constructors declared on this type
    pub fn constructors(&self) -> impl Iterator<Item = &MemberRef> {
        self.members
            .iter()
            .filter(|m| m.kind() == MemberKind::Constructor)
    }

    /// Static constructor declared on this type, if any
    #[must_use]
    pub fn static_constructor(&self) -> Option<MemberRef> {
        self.members
            .iter()
            .find(|m| m.kind() == MemberKind::StaticConstructor)
            .cloned()
    }

    /// Type a proxy stands in for (the type itself for non-proxies)
    #[must_use]
    pub fn unproxied(self: &Arc<Self>) -> TypeRef {
        let mut current = self.clone();
        while current.proxy {
            let next = current
                .base
                .as_ref()
                .filter(|b| b.name != OBJECT_TYPE_NAME)
                .or_else(|| current.interfaces.first())
                .cloned();
            match next {
                Some(ty) => current = ty,
                None => break,
            }
        }
        current
    }

    /// Zero value of this type
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self.kind {
            TypeKind::Primitive(Primitive::Bool) => Value::Bool(false),
            TypeKind::Primitive(Primitive::Int) => Value::Int(0),
            TypeKind::Primitive(Primitive::Float) => Value::Float(0.0),
            TypeKind::Primitive(Primitive::Char) => Value::Char('\0'),
            _ => Value::Null,
        }
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Builder for [`TypeInfo`]
pub struct TypeInfoBuilder {
    name: String,
    kind: TypeKind,
    base: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    capabilities: Vec<Capability>,
    members: Vec<MemberBuilder>,
    attributes: Vec<String>,
    sealed: bool,
    is_abstract: bool,
    proxy: bool,
}

impl TypeInfoBuilder {
    fn new(name: String, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            base: None,
            interfaces: Vec::new(),
            capabilities: Vec::new(),
            members: Vec::new(),
            attributes: Vec::new(),
            sealed: false,
            is_abstract: false,
            proxy: false,
        }
    }

    /// Set the base type
    #[must_use]
    pub fn with_base(mut self, base: &TypeRef) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Add an implemented interface
    #[must_use]
    pub fn implements(mut self, interface: &TypeRef) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Add a collection capability
    #[must_use]
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Add a type-level annotation
    #[must_use]
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Forbid derivation
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    /// Mark the class abstract
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare a method returning `returns`
    #[must_use]
    pub fn method<F>(mut self, name: &str, returns: &TypeRef, configure: F) -> Self
    where
        F: FnOnce(MemberBuilder) -> MemberBuilder,
    {
        let member = MemberBuilder::new(name, MemberKind::Method, ReturnSlot::Type(returns.clone()));
        self.members.push(configure(member));
        self
    }

    /// Declare a method returning nothing
    #[must_use]
    pub fn void_method<F>(self, name: &str, configure: F) -> Self
    where
        F: FnOnce(MemberBuilder) -> MemberBuilder,
    {
        self.method(name, void_type(), configure)
    }

    /// Declare a method returning the type being declared
    #[must_use]
    pub fn method_returning_self<F>(mut self, name: &str, configure: F) -> Self
    where
        F: FnOnce(MemberBuilder) -> MemberBuilder,
    {
        let member = MemberBuilder::new(name, MemberKind::Method, ReturnSlot::Declaring);
        self.members.push(configure(member));
        self
    }

    /// Declare a read/write property
    ///
    /// On classes the accessors are backed by an instance field of the same
    /// name; on interfaces they are abstract.
    #[must_use]
    pub fn property(mut self, name: &str, ty: &TypeRef) -> Self {
        let getter = MemberBuilder::new(
            &format!("get_{name}"),
            MemberKind::PropertyGet,
            ReturnSlot::Type(ty.clone()),
        );
        let setter = MemberBuilder::new(
            &format!("set_{name}"),
            MemberKind::PropertySet,
            ReturnSlot::Type(void_type().clone()),
        )
        .param(ty);

        if self.is_interface_builder() {
            self.members.push(getter);
            self.members.push(setter);
            return self;
        }

        let field = name.to_string();
        let fallback = ty.default_value();
        self.members.push(getter.original(move |instance, _| {
            instance
                .and_then(|o| o.field(&field))
                .unwrap_or_else(|| fallback.clone())
        }));
        let field = name.to_string();
        self.members.push(setter.original(move |instance, args| {
            if let (Some(o), Some(v)) = (instance, args.first()) {
                o.set_field(&field, v.clone());
            }
            Value::Null
        }));
        self
    }

    /// Declare a property whose getter returns the type being declared
    #[must_use]
    pub fn property_returning_self(mut self, name: &str) -> Self {
        self.members.push(MemberBuilder::new(
            &format!("get_{name}"),
            MemberKind::PropertyGet,
            ReturnSlot::Declaring,
        ));
        self
    }

    /// Declare an event (subscribe/unsubscribe accessors)
    #[must_use]
    pub fn event(mut self, name: &str) -> Self {
        let interface = self.is_interface_builder();
        for (prefix, kind) in [("add", MemberKind::EventAdd), ("remove", MemberKind::EventRemove)] {
            let mut accessor = MemberBuilder::new(
                &format!("{prefix}_{name}"),
                kind,
                ReturnSlot::Type(void_type().clone()),
            )
            .param(object_type());
            if !interface {
                accessor = accessor.original(|_, _| Value::Null);
            }
            self.members.push(accessor);
        }
        self
    }

    /// Declare an abstract indexer (`this[key]`)
    #[must_use]
    pub fn indexer(mut self, key: &TypeRef, value: &TypeRef) -> Self {
        self.members.push(
            MemberBuilder::new("get_Item", MemberKind::IndexerGet, ReturnSlot::Type(value.clone()))
                .param(key),
        );
        self.members.push(
            MemberBuilder::new(
                "set_Item",
                MemberKind::IndexerSet,
                ReturnSlot::Type(void_type().clone()),
            )
            .param(key)
            .param(value),
        );
        self
    }

    /// Declare an instance constructor
    #[must_use]
    pub fn constructor<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(MemberBuilder) -> MemberBuilder,
    {
        let ctor = MemberBuilder::new(
            ".ctor",
            MemberKind::Constructor,
            ReturnSlot::Type(void_type().clone()),
        )
        .original(|_, _| Value::Null);
        self.members.push(configure(ctor));
        self
    }

    /// Declare the static constructor (type initializer)
    #[must_use]
    pub fn static_constructor<F>(mut self, original: F) -> Self
    where
        F: Fn(Option<&ObjectRef>, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.members.push(
            MemberBuilder::new(
                ".cctor",
                MemberKind::StaticConstructor,
                ReturnSlot::Type(void_type().clone()),
            )
            .static_member()
            .original(original),
        );
        self
    }

    fn is_interface_builder(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    /// Finish the type
    #[must_use]
    pub fn build(self) -> TypeRef {
        let Self {
            name,
            kind,
            base,
            interfaces,
            capabilities,
            members,
            attributes,
            sealed,
            is_abstract,
            proxy,
        } = self;
        let interface = matches!(kind, TypeKind::Interface);

        Arc::new_cyclic(|weak| {
            let members: Vec<MemberRef> = members
                .into_iter()
                .map(|m| Arc::new(m.finish(weak.clone(), &name, interface)))
                .collect();
            let is_abstract =
                is_abstract || interface || members.iter().any(|m| m.is_abstract() && !m.is_static());
            TypeInfo {
                name,
                kind,
                base,
                interfaces,
                capabilities,
                members,
                attributes,
                sealed,
                is_abstract,
                proxy,
            }
        })
    }
}

fn primitive(name: &str, kind: TypeKind) -> TypeRef {
    TypeInfoBuilder::new(name.to_string(), kind).sealed().build()
}

static VOID: Lazy<TypeRef> = Lazy::new(|| primitive("Void", TypeKind::Void));
static BOOL: Lazy<TypeRef> = Lazy::new(|| primitive("Bool", TypeKind::Primitive(Primitive::Bool)));
static INT: Lazy<TypeRef> = Lazy::new(|| primitive("Int", TypeKind::Primitive(Primitive::Int)));
static FLOAT: Lazy<TypeRef> =
    Lazy::new(|| primitive("Float", TypeKind::Primitive(Primitive::Float)));
static CHAR: Lazy<TypeRef> = Lazy::new(|| primitive("Char", TypeKind::Primitive(Primitive::Char)));

static STRING: Lazy<TypeRef> = Lazy::new(|| {
    TypeInfoBuilder::new("String".to_string(), TypeKind::String)
        .with_base(object_type())
        .sealed()
        .build()
});

// Object-identity members; every class reaches these through its base chain.
static OBJECT: Lazy<TypeRef> = Lazy::new(|| {
    TypeInfoBuilder::new(OBJECT_TYPE_NAME.to_string(), TypeKind::Class)
        .method("Equals", &BOOL, |m| {
            m.param(&OBJECT_PARAM).original(|instance, args| {
                let same = match (instance, args.first()) {
                    (Some(this), Some(Value::Object(other))) => Arc::ptr_eq(this, other),
                    _ => false,
                };
                Value::Bool(same)
            })
        })
        .method("GetHashCode", &INT, |m| {
            m.original(|instance, _| {
                Value::Int(instance.map_or(0, |o| i64::try_from(o.id().value()).unwrap_or(i64::MAX)))
            })
        })
        .method("ToString", &STRING_NAME_ONLY, |m| {
            m.original(|instance, _| {
                instance.map_or(Value::Null, |o| Value::from(o.unproxied_type().name()))
            })
        })
        .constructor(|c| c)
        .build()
});

// `Equals` and `ToString` are declared while `Object` itself is being built,
// so their signatures use detached descriptors carrying the same names.
static OBJECT_PARAM: Lazy<TypeRef> = Lazy::new(|| {
    TypeInfoBuilder::new(OBJECT_TYPE_NAME.to_string(), TypeKind::Class).build()
});

static STRING_NAME_ONLY: Lazy<TypeRef> =
    Lazy::new(|| TypeInfoBuilder::new("String".to_string(), TypeKind::String).sealed().build());

/// The `void` type
#[must_use]
pub fn void_type() -> &'static TypeRef {
    &VOID
}

/// Built-in `bool`
#[must_use]
pub fn bool_type() -> &'static TypeRef {
    &BOOL
}

/// Built-in 64-bit integer
#[must_use]
pub fn int_type() -> &'static TypeRef {
    &INT
}

/// Built-in 64-bit float
#[must_use]
pub fn float_type() -> &'static TypeRef {
    &FLOAT
}

/// Built-in `char`
#[must_use]
pub fn char_type() -> &'static TypeRef {
    &CHAR
}

/// The textual string type
#[must_use]
pub fn string_type() -> &'static TypeRef {
    &STRING
}

/// The root type
#[must_use]
pub fn object_type() -> &'static TypeRef {
    &OBJECT
}
