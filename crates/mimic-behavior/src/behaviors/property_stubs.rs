//! Property state stubs

use crate::behavior::Behavior;
use crate::error::BehaviorError;
use crate::invocation::Invocation;
use mimic_reflect::{MemberKind, ObjectId, Value};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Remembers values written through property setters and returns them from
/// the matching getter
///
/// Getters of properties never written decline the call.
#[derive(Debug, Default)]
pub struct PropertyStubsBehavior {
    values: Mutex<HashMap<(Option<ObjectId>, String), Value>>,
}

impl PropertyStubsBehavior {
    /// Unit with no stored values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value last written to `property` on `instance`
    #[must_use]
    pub fn stored(&self, instance: Option<ObjectId>, property: &str) -> Option<Value> {
        self.values
            .lock()
            .get(&(instance, property.to_string()))
            .cloned()
    }
}

impl Behavior for PropertyStubsBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        if invocation.is_recording() {
            return Ok(());
        }
        let method = invocation.method().clone();
        let Some(property) = method.property_name() else {
            return Ok(());
        };
        let key = (invocation.instance().map(|o| o.id()), property.to_string());

        match method.kind() {
            MemberKind::PropertySet => {
                let value = invocation.args().last().cloned().unwrap_or_default();
                self.values.lock().insert(key, value);
                invocation.mark_user_provided();
                invocation.claim_original(false);
            }
            MemberKind::PropertyGet => {
                let stored = self.values.lock().get(&key).cloned();
                if let Some(value) = stored {
                    invocation.mark_user_provided();
                    invocation.claim_with_value(value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "property_stubs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_reflect::{int_type, Object, TypeInfo};

    #[test]
    fn setter_feeds_getter() {
        let ty = TypeInfo::interface("IAccount")
            .property("Balance", int_type())
            .build();
        let obj = Object::new(ty.clone());
        let get = ty.find_member("get_Balance").unwrap();
        let set = ty.find_member("set_Balance").unwrap();
        let unit = PropertyStubsBehavior::new();

        let mut read = Invocation::new(Some(obj.clone()), get.clone(), []);
        unit.process(&mut read).unwrap();
        assert!(!read.is_decided());

        let mut write = Invocation::new(Some(obj.clone()), set, [Value::Int(42)]);
        unit.process(&mut write).unwrap();
        assert!(write.is_decided());

        let mut read = Invocation::new(Some(obj.clone()), get, []);
        unit.process(&mut read).unwrap();
        assert_eq!(read.return_value(), Some(&Value::Int(42)));
        assert_eq!(unit.stored(Some(obj.id()), "Balance"), Some(Value::Int(42)));
    }

    #[test]
    fn instances_do_not_share_state() {
        let ty = TypeInfo::interface("IAccount")
            .property("Balance", int_type())
            .build();
        let a = Object::new(ty.clone());
        let b = Object::new(ty.clone());
        let unit = PropertyStubsBehavior::new();

        let mut write = Invocation::new(
            Some(a),
            ty.find_member("set_Balance").unwrap(),
            [Value::Int(1)],
        );
        unit.process(&mut write).unwrap();

        let mut read = Invocation::new(Some(b), ty.find_member("get_Balance").unwrap(), []);
        unit.process(&mut read).unwrap();
        assert!(!read.is_decided());
    }
}
