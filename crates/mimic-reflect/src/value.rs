//! Runtime values flowing through intercepted calls

use crate::object::ObjectRef;
use crate::types::{Primitive, TypeInfo, TypeKind, TypeRef};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Array value with a fixed shape
#[derive(Debug, Clone)]
pub struct ArrayValue {
    element: TypeRef,
    lengths: Vec<usize>,
    items: Arc<[Value]>,
}

impl ArrayValue {
    /// Zero-length array of `element` with `rank` dimensions
    #[must_use]
    pub fn empty(element: &TypeRef, rank: usize) -> Self {
        Self {
            element: element.clone(),
            lengths: vec![0; rank.max(1)],
            items: Arc::from(Vec::new()),
        }
    }

    /// One-dimensional array holding `items`
    #[must_use]
    pub fn from_items(element: &TypeRef, items: Vec<Value>) -> Self {
        Self {
            element: element.clone(),
            lengths: vec![items.len()],
            items: Arc::from(items),
        }
    }

    /// Type of the elements
    #[inline]
    #[must_use]
    pub fn element_type(&self) -> &TypeRef {
        &self.element
    }

    /// Number of dimensions
    #[inline]
    #[must_use]
    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    /// Length along each dimension
    #[inline]
    #[must_use]
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Total element count
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array has no elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Elements in row-major order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        self.element.name() == other.element.name()
            && self.lengths == other.lengths
            && self.items == other.items
    }
}

/// A value passed to or returned from an intercepted call
///
/// Objects compare by identity; everything else compares structurally.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Null reference / no value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Character
    Char(char),
    /// Immutable string
    Str(Arc<str>),
    /// Array of any rank
    Array(ArrayValue),
    /// Reference to an object, compared by identity
    Object(ObjectRef),
}

impl Value {
    /// Whether this is [`Value::Null`]
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Referenced object, if this is an object value
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Integer payload
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean payload
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Array payload
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Whether this value can be used where `ty` is expected
    #[must_use]
    pub fn is_instance_of(&self, ty: &TypeInfo) -> bool {
        match (self, ty.kind()) {
            (Self::Null, _) => ty.is_reference_type(),
            (Self::Bool(_), TypeKind::Primitive(Primitive::Bool))
            | (Self::Int(_), TypeKind::Primitive(Primitive::Int))
            | (Self::Float(_), TypeKind::Primitive(Primitive::Float))
            | (Self::Char(_), TypeKind::Primitive(Primitive::Char))
            | (Self::Str(_), TypeKind::String) => true,
            (Self::Array(a), TypeKind::Array { element, rank }) => {
                a.rank() == *rank && element.is_assignable_from(a.element_type())
            }
            (Self::Object(o), _) => ty.is_assignable_from(o.type_info()),
            (_, TypeKind::Class) => ty.name() == "Object",
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Char(c) => write!(f, "'{c}'"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Array(a) => write!(f, "{}[{}]", a.element_type(), a.len()),
            Self::Object(o) => write!(f, "{}{}", o.unproxied_type(), o.id()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Self::Object(o)
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Self::Array(a)
    }
}
