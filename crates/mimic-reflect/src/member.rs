//! Member descriptors
//!
//! A [`MemberInfo`] is anything a call can target: methods, property and
//! indexer accessors, event accessors and constructors.

use crate::object::ObjectRef;
use crate::types::{object_type, void_type, TypeInfo, TypeRef, OBJECT_TYPE_NAME};
use crate::value::Value;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Shared handle to a member descriptor
pub type MemberRef = Arc<MemberInfo>;

/// Original implementation of a member
///
/// Receives the target instance (absent for static members) and the argument list.
pub type OriginalFn = Arc<dyn Fn(Option<&ObjectRef>, &[Value]) -> Value + Send + Sync>;

static NEXT_MEMBER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique member identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(u64);

impl MemberId {
    fn next() -> Self {
        Self(NEXT_MEMBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl Display for MemberId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// What kind of member a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Ordinary method
    Method,

    /// Property getter (`get_X`)
    PropertyGet,

    /// Property setter (`set_X`)
    PropertySet,

    /// Indexer read (`get_Item`)
    IndexerGet,

    /// Indexer write (`set_Item`)
    IndexerSet,

    /// Event subscription (`add_X`)
    EventAdd,

    /// Event unsubscription (`remove_X`)
    EventRemove,

    /// Instance constructor
    Constructor,

    /// Type initializer
    StaticConstructor,
}

impl MemberKind {
    /// Property getter or setter
    #[inline]
    #[must_use]
    pub fn is_property_accessor(self) -> bool {
        matches!(self, Self::PropertyGet | Self::PropertySet)
    }

    /// Event add or remove accessor
    #[inline]
    #[must_use]
    pub fn is_event_accessor(self) -> bool {
        matches!(self, Self::EventAdd | Self::EventRemove)
    }

    /// Instance or static constructor
    #[inline]
    #[must_use]
    pub fn is_constructor(self) -> bool {
        matches!(self, Self::Constructor | Self::StaticConstructor)
    }
}

#[derive(Clone)]
pub(crate) enum ReturnSlot {
    /// A concrete type
    Type(TypeRef),
    /// The type declaring the member
    Declaring,
}

/// Builder for a member, finished by [`crate::TypeInfoBuilder::build`]
pub struct MemberBuilder {
    name: String,
    kind: MemberKind,
    returns: ReturnSlot,
    params: Vec<TypeRef>,
    is_abstract: bool,
    is_static: bool,
    original: Option<OriginalFn>,
}

impl MemberBuilder {
    pub(crate) fn new(name: &str, kind: MemberKind, returns: ReturnSlot) -> Self {
        Self {
            name: name.to_string(),
            kind,
            returns,
            params: Vec::new(),
            is_abstract: false,
            is_static: false,
            original: None,
        }
    }

    /// Append a parameter
    #[must_use]
    pub fn param(mut self, ty: &TypeRef) -> Self {
        self.params.push(ty.clone());
        self
    }

    /// Set the original implementation
    #[must_use]
    pub fn original<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&ObjectRef>, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.original = Some(Arc::new(f));
        self
    }

    /// Mark abstract (drops any original implementation)
    #[must_use]
    pub fn abstract_member(mut self) -> Self {
        self.is_abstract = true;
        self.original = None;
        self
    }

    /// Make the member static
    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub(crate) fn finish(
        self,
        declaring: Weak<TypeInfo>,
        declaring_name: &str,
        interface: bool,
    ) -> MemberInfo {
        let is_abstract = interface || self.is_abstract || self.original.is_none();
        MemberInfo {
            id: MemberId::next(),
            name: self.name,
            kind: self.kind,
            declaring,
            declaring_name: declaring_name.to_string(),
            returns: self.returns,
            params: self.params,
            is_abstract,
            is_static: self.is_static,
            original: if interface { None } else { self.original },
        }
    }
}

/// Member descriptor
pub struct MemberInfo {
    id: MemberId,
    name: String,
    kind: MemberKind,
    declaring: Weak<TypeInfo>,
    declaring_name: String,
    returns: ReturnSlot,
    params: Vec<TypeRef>,
    is_abstract: bool,
    is_static: bool,
    original: Option<OriginalFn>,
}

impl MemberInfo {
    /// Process-unique id
    #[inline]
    #[must_use]
    pub fn id(&self) -> MemberId {
        self.id
    }

    /// Member name; accessors carry their `get_`/`set_`/`add_`/`remove_` prefix
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method, accessor or constructor
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Declaring type, if it is still alive
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeRef> {
        self.declaring.upgrade()
    }

    /// Name of the declaring type, kept even after the type is dropped
    #[inline]
    #[must_use]
    pub fn declaring_type_name(&self) -> &str {
        &self.declaring_name
    }

    /// Return type (`void` for accessors and constructors)
    #[must_use]
    pub fn return_type(&self) -> TypeRef {
        match &self.returns {
            ReturnSlot::Type(ty) => ty.clone(),
            ReturnSlot::Declaring => self
                .declaring
                .upgrade()
                .unwrap_or_else(|| object_type().clone()),
        }
    }

    /// Whether the member returns nothing
    #[must_use]
    pub fn returns_void(&self) -> bool {
        match &self.returns {
            ReturnSlot::Type(ty) => ty.is_void(),
            ReturnSlot::Declaring => false,
        }
    }

    /// Parameter types
    #[inline]
    #[must_use]
    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    /// Whether the member has no implementation to call
    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether the member belongs to the type rather than an instance
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether an original implementation is attached
    #[inline]
    #[must_use]
    pub fn has_original(&self) -> bool {
        self.original.is_some()
    }

    /// Run the original implementation; `None` when there is none
    #[must_use]
    pub fn call_original(&self, instance: Option<&ObjectRef>, args: &[Value]) -> Option<Value> {
        self.original.as_ref().map(|f| f(instance, args))
    }

    /// Whether `args` fit this member's parameter list
    #[must_use]
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| arg.is_instance_of(param))
    }

    /// Property name for property accessors (`get_Name` -> `Name`)
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        match self.kind {
            MemberKind::PropertyGet => self.name.strip_prefix("get_"),
            MemberKind::PropertySet => self.name.strip_prefix("set_"),
            _ => None,
        }
    }

    /// Event name for event accessors (`add_Changed` -> `Changed`)
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        match self.kind {
            MemberKind::EventAdd => self.name.strip_prefix("add_"),
            MemberKind::EventRemove => self.name.strip_prefix("remove_"),
            _ => None,
        }
    }

    /// Whether this is one of the root type's identity members
    /// (`Equals`, `GetHashCode`, `ToString`)
    #[must_use]
    pub fn is_object_identity_member(&self) -> bool {
        self.declaring_name == OBJECT_TYPE_NAME
            && matches!(self.name.as_str(), "Equals" | "GetHashCode" | "ToString")
    }

    /// A `void` member usable as a stand-in signature in tests and tools
    #[must_use]
    pub fn detached(name: &str, kind: MemberKind) -> MemberRef {
        Arc::new(MemberInfo {
            id: MemberId::next(),
            name: name.to_string(),
            kind,
            declaring: Weak::new(),
            declaring_name: String::new(),
            returns: ReturnSlot::Type(void_type().clone()),
            params: Vec::new(),
            is_abstract: true,
            is_static: false,
            original: None,
        })
    }
}

impl PartialEq for MemberInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MemberInfo {}

impl Hash for MemberInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for MemberInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_name, self.name)
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("declaring", &self.declaring_name)
            .field("abstract", &self.is_abstract)
            .finish()
    }
}
