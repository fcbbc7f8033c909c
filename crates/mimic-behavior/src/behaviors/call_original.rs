//! Units that route calls to the original implementation

use crate::behavior::Behavior;
use crate::error::BehaviorError;
use crate::invocation::Invocation;

/// Runs the original implementation of every call it sees
///
/// With `skip_abstract`, calls whose target has no implementation are left
/// for later units.
#[derive(Debug, Clone, Copy)]
pub struct CallOriginalBehavior {
    skip_abstract: bool,
}

impl CallOriginalBehavior {
    /// With `skip_abstract`, abstract members are left to later units
    #[inline]
    #[must_use]
    pub fn new(skip_abstract: bool) -> Self {
        Self { skip_abstract }
    }
}

impl Behavior for CallOriginalBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        if self.skip_abstract && invocation.target().is_abstract() {
            return Ok(());
        }
        if invocation.target().kind().is_constructor() {
            return Ok(());
        }
        invocation.claim_original(true);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "call_original"
    }

    fn describe(&self) -> String {
        if self.skip_abstract {
            "call_original(skip_abstract)".to_string()
        } else {
            self.name().to_string()
        }
    }
}

/// Runs the root type's `Equals`, `GetHashCode` and `ToString` unless the
/// substitute's type overrides them
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOriginalObjectMethodsBehavior;

impl Behavior for CallOriginalObjectMethodsBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        if invocation.target().is_object_identity_member() {
            invocation.claim_original(true);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "call_original_object_methods"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_reflect::{int_type, object_type, string_type, Object, TypeInfo, Value};

    #[test]
    fn skips_abstract_targets() {
        let ty = TypeInfo::class("Repo")
            .method("Count", int_type(), |m| m.original(|_, _| Value::Int(3)))
            .method("Name", string_type(), |m| m.abstract_member())
            .build();
        let obj = Object::new(ty.clone());
        let unit = CallOriginalBehavior::new(true);

        let mut count = Invocation::new(Some(obj.clone()), ty.find_member("Count").unwrap(), []);
        unit.process(&mut count).unwrap();
        assert!(count.should_call_original());

        let mut name = Invocation::new(Some(obj), ty.find_member("Name").unwrap(), []);
        unit.process(&mut name).unwrap();
        assert!(!name.is_decided());
    }

    #[test]
    fn identity_members_run_unless_overridden() {
        let plain = TypeInfo::class("Plain").build();
        let custom = TypeInfo::class("Custom")
            .method("ToString", string_type(), |m| m.original(|_, _| Value::from("custom")))
            .build();
        let to_string = object_type().find_member("ToString").unwrap();
        let unit = CallOriginalObjectMethodsBehavior;

        let mut inv = Invocation::new(Some(Object::new(plain)), to_string.clone(), []);
        unit.process(&mut inv).unwrap();
        assert!(inv.should_call_original());

        let mut inv = Invocation::new(Some(Object::new(custom)), to_string, []);
        unit.process(&mut inv).unwrap();
        assert!(!inv.is_decided());
    }
}
