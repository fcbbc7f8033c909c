//! Call record
//!
//! An [`Invocation`] carries the inputs of one intercepted call (instance,
//! member, arguments) and the outcome slots behavior units fill in. Inputs
//! never change after construction; each outcome slot is write-once.

use crate::mixin::MockMixin;
use mimic_reflect::{MemberRef, ObjectRef, Value};
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// One intercepted call flowing through a behavior chain
#[derive(Debug)]
pub struct Invocation {
    instance: Option<ObjectRef>,
    method: MemberRef,
    target: MemberRef,
    args: SmallVec<[Value; 4]>,
    mixin: Option<Arc<MockMixin>>,

    decided: bool,
    return_value: Option<Value>,
    call_original: Option<bool>,
    user_provided: bool,

    in_arrange: bool,
    recording: bool,
}

impl Invocation {
    /// Record a call of `method` on `instance`
    ///
    /// The target is resolved to the member that actually runs on the
    /// instance's runtime type.
    #[must_use]
    pub fn new(
        instance: Option<ObjectRef>,
        method: MemberRef,
        args: impl IntoIterator<Item = Value>,
    ) -> Self {
        let target = instance
            .as_ref()
            .map_or_else(|| method.clone(), |obj| obj.type_info().concrete_implementer(&method));
        Self {
            instance,
            method,
            target,
            args: args.into_iter().collect(),
            mixin: None,
            decided: false,
            return_value: None,
            call_original: None,
            user_provided: false,
            in_arrange: false,
            recording: false,
        }
    }

    /// Attach the mixin of the substitute receiving the call
    #[must_use]
    pub fn with_mixin(mut self, mixin: Arc<MockMixin>) -> Self {
        self.mixin = Some(mixin);
        self
    }

    /// Mark the call as happening while an arrangement is being defined
    #[must_use]
    pub fn in_arrange(mut self, yes: bool) -> Self {
        self.in_arrange = yes;
        self
    }

    /// Mark the call as being recorded by the arrangement front end
    #[must_use]
    pub fn recording(mut self, yes: bool) -> Self {
        self.recording = yes;
        self
    }

    /// Target instance; `None` for static members
    #[inline]
    #[must_use]
    pub fn instance(&self) -> Option<&ObjectRef> {
        self.instance.as_ref()
    }

    /// Member the caller named
    #[inline]
    #[must_use]
    pub fn method(&self) -> &MemberRef {
        &self.method
    }

    /// Member that actually runs on the instance
    #[inline]
    #[must_use]
    pub fn target(&self) -> &MemberRef {
        &self.target
    }

    /// Call arguments
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// State of the substitute receiving the call
    #[inline]
    #[must_use]
    pub fn mixin(&self) -> Option<&Arc<MockMixin>> {
        self.mixin.as_ref()
    }

    /// Whether the call happens while an arrangement is evaluated
    #[inline]
    #[must_use]
    pub fn is_in_arrange(&self) -> bool {
        self.in_arrange
    }

    /// Whether the call is recorded for later assertion
    #[inline]
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Whether some unit (or an arrangement) has claimed the call
    #[inline]
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.decided
    }

    /// Value decided by a unit, if any
    #[inline]
    #[must_use]
    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Whether a return value was decided
    #[inline]
    #[must_use]
    pub fn is_return_value_set(&self) -> bool {
        self.return_value.is_some()
    }

    /// Whether the original implementation should run
    #[inline]
    #[must_use]
    pub fn should_call_original(&self) -> bool {
        self.call_original.unwrap_or(false)
    }

    /// Whether a user arrangement supplied the outcome
    #[inline]
    #[must_use]
    pub fn is_user_provided(&self) -> bool {
        self.user_provided
    }

    /// Set the return value; returns `false` if one was already set
    pub fn set_return_value(&mut self, value: Value) -> bool {
        if self.return_value.is_some() {
            tracing::debug!(call = %self, "return value already set, ignoring");
            return false;
        }
        self.return_value = Some(value);
        true
    }

    /// Set whether the original runs; returns `false` if already decided
    pub fn set_call_original(&mut self, call_original: bool) -> bool {
        if self.call_original.is_some() {
            return false;
        }
        self.call_original = Some(call_original);
        true
    }

    /// Mark the outcome as coming from a user arrangement
    pub fn mark_user_provided(&mut self) {
        self.user_provided = true;
    }

    /// Mark the call as claimed; the chain stops here
    pub fn decide(&mut self) {
        self.decided = true;
    }

    /// Claim the call with `value` as its result
    pub fn claim_with_value(&mut self, value: Value) {
        self.set_call_original(false);
        self.set_return_value(value);
        self.decide();
    }

    /// Claim the call, choosing whether the original runs
    pub fn claim_original(&mut self, call_original: bool) {
        self.set_call_original(call_original);
        self.decide();
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let type_name = self
            .instance
            .as_ref()
            .map_or_else(|| self.method.declaring_type_name().to_string(), |obj| {
                obj.unproxied_type().name().to_string()
            });
        write!(f, "{type_name}.{}(", self.method.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}
