//! Identity-bearing instances
//!
//! An [`Object`] is the runtime stand-in for an instance of some [`TypeInfo`].
//! Substitutes are objects with a mock mixin attached; the mixin type lives in
//! a higher crate, so it is stored type-erased and recovered by downcasting.

use crate::types::{TypeInfo, TypeRef};
use crate::value::Value;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Shared handle to an object
pub type ObjectRef = Arc<Object>;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique object identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Raw id
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime instance
pub struct Object {
    id: ObjectId,
    ty: TypeRef,
    fields: RwLock<HashMap<String, Value>>,
    mixin: OnceCell<Arc<dyn Any + Send + Sync>>,
}

impl Object {
    /// Allocate a fresh instance of `ty`
    #[must_use]
    pub fn new(ty: TypeRef) -> ObjectRef {
        Arc::new(Self {
            id: ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)),
            ty,
            fields: RwLock::new(HashMap::new()),
            mixin: OnceCell::new(),
        })
    }

    /// Identity of the object
    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Runtime type (the generated type for substitutes)
    #[inline]
    #[must_use]
    pub fn type_info(&self) -> &TypeRef {
        &self.ty
    }

    /// Type this instance stands in for
    #[must_use]
    pub fn unproxied_type(&self) -> TypeRef {
        self.ty.unproxied()
    }

    /// Whether the instance is (or derives from) `ty`
    #[must_use]
    pub fn is_instance_of(&self, ty: &TypeInfo) -> bool {
        ty.is_assignable_from(&self.ty)
    }

    /// Read an instance field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.read().get(name).cloned()
    }

    /// Write an instance field
    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.write().insert(name.to_string(), value);
    }

    /// Attach the mock mixin; fails if one is already attached
    pub fn attach_mixin<M: Any + Send + Sync>(&self, mixin: Arc<M>) -> bool {
        self.mixin.set(mixin).is_ok()
    }

    /// Attached mixin, if it is of type `M`
    #[must_use]
    pub fn mixin<M: Any + Send + Sync>(&self) -> Option<Arc<M>> {
        self.mixin.get().cloned()?.downcast::<M>().ok()
    }

    /// Whether any mixin has been attached
    #[inline]
    #[must_use]
    pub fn has_mixin(&self) -> bool {
        self.mixin.get().is_some()
    }

    /// Non-owning handle to `this`
    #[must_use]
    pub fn downgrade(this: &ObjectRef) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(this))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("type", &self.ty.name())
            .field("mocked", &self.has_mixin())
            .finish()
    }
}

/// Non-owning reference to an [`Object`]
#[derive(Debug, Clone)]
pub struct WeakObjectRef(Weak<Object>);

impl WeakObjectRef {
    /// Strong handle, if the object is still alive
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade()
    }

    /// Whether the object is still referenced somewhere
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Whether this refers to `object` (false once collected)
    #[must_use]
    pub fn refers_to(&self, object: &ObjectRef) -> bool {
        self.is_alive() && std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(object))
    }
}
