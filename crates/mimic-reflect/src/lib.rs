//! Mimic Reflect
//!
//! The introspection layer shared by every other mimic crate. Substitutes are
//! built over an explicit object model instead of host-language reflection.
//!
//! # Core Concepts
//!
//! - [`TypeInfo`]: Descriptor of a type (kind, base, interfaces, capabilities, members)
//! - [`MemberInfo`]: Descriptor of a callable member with an optional original implementation
//! - [`Value`]: Runtime value passed through intercepted calls
//! - [`Object`]: Identity-bearing instance that a mock mixin can be attached to
//! - [`ArrangeMarker`]: Marks that an arrangement body is being evaluated on this thread
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_reflect::{int_type, Object, TypeInfo, Value};
//!
//! let counter = TypeInfo::class("Counter")
//!     .method("Next", int_type(), |m| m.original(|_, _| Value::Int(1)))
//!     .build();
//!
//! let instance = Object::new(counter.clone());
//! let member = counter.find_member("Next").unwrap();
//! assert_eq!(member.call_original(Some(&instance), &[]), Some(Value::Int(1)));
//! ```

#![warn(unreachable_pub)]

mod arrange_context;
mod member;
mod object;
mod registry;
mod types;
mod value;

pub use arrange_context::{innermost_arrange_caller, is_within_arrangement, ArrangeMarker};
pub use member::{MemberBuilder, MemberId, MemberInfo, MemberKind, MemberRef, OriginalFn};
pub use object::{Object, ObjectId, ObjectRef, WeakObjectRef};
pub use registry::{TypeRegistry, TypeResolver};
pub use types::{
    bool_type, char_type, float_type, int_type, object_type, string_type, void_type, Capability,
    Primitive, TypeInfo, TypeInfoBuilder, TypeKind, TypeRef,
};
pub use value::{ArrayValue, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
