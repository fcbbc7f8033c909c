//! Event subscription stubs

use crate::behavior::Behavior;
use crate::error::BehaviorError;
use crate::invocation::Invocation;
use mimic_reflect::{MemberKind, ObjectId, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type SubscriptionKey = (Option<ObjectId>, String);

/// Handlers subscribed to each event of each substitute
#[derive(Debug, Default)]
pub struct EventSubscriptions {
    handlers: Mutex<HashMap<SubscriptionKey, Vec<Value>>>,
}

impl EventSubscriptions {
    /// Handlers currently subscribed to `event` on `instance`
    #[must_use]
    pub fn handlers(&self, instance: Option<ObjectId>, event: &str) -> Vec<Value> {
        self.handlers
            .lock()
            .get(&(instance, event.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Handlers currently attached to `event` on `instance` (`None` for statics)
    #[must_use]
    pub fn subscriber_count(&self, instance: Option<ObjectId>, event: &str) -> usize {
        self.handlers
            .lock()
            .get(&(instance, event.to_string()))
            .map_or(0, Vec::len)
    }

    fn subscribe(&self, key: SubscriptionKey, handler: Value) {
        self.handlers.lock().entry(key).or_default().push(handler);
    }

    fn unsubscribe(&self, key: &SubscriptionKey, handler: &Value) {
        let mut handlers = self.handlers.lock();
        if let Some(list) = handlers.get_mut(key) {
            if let Some(pos) = list.iter().rposition(|h| h == handler) {
                list.remove(pos);
            }
        }
    }
}

/// Records `add_X` / `remove_X` calls instead of running them
#[derive(Debug, Default)]
pub struct EventStubsBehavior {
    subscriptions: Arc<EventSubscriptions>,
}

impl EventStubsBehavior {
    /// Unit with an empty subscription table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscription table, shared with the substitute's mixins
    #[inline]
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<EventSubscriptions> {
        &self.subscriptions
    }
}

impl Behavior for EventStubsBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        if invocation.is_recording() {
            return Ok(());
        }
        let method = invocation.method();
        let Some(event) = method.event_name() else {
            return Ok(());
        };
        let key = (invocation.instance().map(|o| o.id()), event.to_string());
        let handler = invocation.args().first().cloned().unwrap_or_default();

        match method.kind() {
            MemberKind::EventAdd => self.subscriptions.subscribe(key, handler),
            MemberKind::EventRemove => self.subscriptions.unsubscribe(&key, &handler),
            _ => return Ok(()),
        }
        invocation.claim_original(false);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "event_stubs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_reflect::{Object, TypeInfo};

    #[test]
    fn add_and_remove_are_tracked_per_instance() {
        let ty = TypeInfo::interface("INotify").event("Changed").build();
        let add = ty.find_member("add_Changed").unwrap();
        let remove = ty.find_member("remove_Changed").unwrap();
        let a = Object::new(ty.clone());
        let b = Object::new(ty);
        let unit = EventStubsBehavior::new();

        let mut inv = Invocation::new(Some(a.clone()), add.clone(), [Value::from("h1")]);
        unit.process(&mut inv).unwrap();
        assert!(inv.is_decided());
        assert!(!inv.should_call_original());

        let mut inv = Invocation::new(Some(b.clone()), add, [Value::from("h2")]);
        unit.process(&mut inv).unwrap();

        let subs = unit.subscriptions();
        assert_eq!(subs.handlers(Some(a.id()), "Changed"), vec![Value::from("h1")]);
        assert_eq!(subs.subscriber_count(Some(b.id()), "Changed"), 1);

        let mut inv = Invocation::new(Some(a.clone()), remove, [Value::from("h1")]);
        unit.process(&mut inv).unwrap();
        assert_eq!(subs.subscriber_count(Some(a.id()), "Changed"), 0);
    }

    #[test]
    fn ignores_other_members() {
        let ty = TypeInfo::interface("IThing")
            .void_method("Run", |m| m)
            .build();
        let mut inv = Invocation::new(None, ty.find_member("Run").unwrap(), []);
        EventStubsBehavior::new().process(&mut inv).unwrap();
        assert!(!inv.is_decided());
    }
}
