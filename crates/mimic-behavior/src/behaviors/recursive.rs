//! Recursive construction
//!
//! Answers reference-typed members with nested substitutes (or synthesized
//! containers) and remembers them per owning instance, so repeated calls on
//! the same instance observe the same object.

use crate::behavior::Behavior;
use crate::error::BehaviorError;
use crate::invocation::Invocation;
use crate::mixin::MockMixin;
use mimic_reflect::{
    innermost_arrange_caller, MemberId, MemberInfo, Object, ObjectRef, TypeRef, Value,
    WeakObjectRef,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

/// When the unit fabricates values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecursiveMode {
    /// Only while an arrangement is being defined
    OnlyDuringAnalysis,

    /// Containers from the value-synthesis rules; nested substitutes only
    /// while an arrangement is being defined
    ReturnDefault,

    /// Always
    ReturnMock,
}

impl RecursiveMode {
    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnlyDuringAnalysis => "only_during_analysis",
            Self::ReturnDefault => "return_default",
            Self::ReturnMock => "return_mock",
        }
    }
}

impl fmt::Display for RecursiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value remembered for one owner
///
/// Objects produced for a live owner are held weakly: the owner's dependent
/// list is what keeps them alive.
#[derive(Debug)]
enum CachedValue {
    Held(Value),
    Object(WeakObjectRef),
}

#[derive(Debug)]
struct CacheEntry {
    owner: Option<WeakObjectRef>,
    value: CachedValue,
}

impl CacheEntry {
    fn new(owner: Option<&ObjectRef>, value: &Value) -> Self {
        let cached = match (owner, value) {
            (Some(_), Value::Object(object)) => CachedValue::Object(Object::downgrade(object)),
            _ => CachedValue::Held(value.clone()),
        };
        Self {
            owner: owner.map(Object::downgrade),
            value: cached,
        }
    }

    fn is_live(&self) -> bool {
        let owner_alive = self.owner.as_ref().map_or(true, WeakObjectRef::is_alive);
        let value_alive = match &self.value {
            CachedValue::Held(_) => true,
            CachedValue::Object(weak) => weak.is_alive(),
        };
        owner_alive && value_alive
    }

    fn belongs_to(&self, owner: Option<&ObjectRef>) -> bool {
        match (&self.owner, owner) {
            (None, None) => true,
            (Some(weak), Some(object)) => weak.refers_to(object),
            _ => false,
        }
    }

    fn value(&self) -> Option<Value> {
        match &self.value {
            CachedValue::Held(value) => Some(value.clone()),
            CachedValue::Object(weak) => weak.upgrade().map(Value::Object),
        }
    }
}

/// Produces and remembers nested substitutes for reference-typed members
///
/// The cache is keyed by target member and guarded by a mutex that is never
/// held while a nested substitute is being built. Two threads racing on the
/// same member and owner may both build one; the first to store wins and the
/// other result is discarded.
#[derive(Debug)]
pub struct RecursiveMockingBehavior {
    mode: RecursiveMode,
    cache: Mutex<HashMap<MemberId, Vec<CacheEntry>>>,
}

impl RecursiveMockingBehavior {
    /// Unit with an empty cache
    #[must_use]
    pub fn new(mode: RecursiveMode) -> Self {
        Self {
            mode,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// When values are fabricated
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RecursiveMode {
        self.mode
    }

    /// Live cache entries for `member`, pruning dead ones first
    #[must_use]
    pub fn cached_entries(&self, member: &MemberInfo) -> usize {
        let mut cache = self.cache.lock();
        match cache.get_mut(&member.id()) {
            Some(list) => {
                list.retain(CacheEntry::is_live);
                list.len()
            }
            None => 0,
        }
    }

    fn lookup(&self, member: MemberId, owner: Option<&ObjectRef>) -> Option<Value> {
        let mut cache = self.cache.lock();
        let list = cache.get_mut(&member)?;
        list.retain(CacheEntry::is_live);
        let found = list
            .iter()
            .find(|entry| entry.belongs_to(owner))
            .and_then(CacheEntry::value);
        if list.is_empty() {
            cache.remove(&member);
        }
        found
    }

    /// Store `value` unless another thread got there first; returns the
    /// stored value and whether it is the one passed in
    fn remember(&self, member: MemberId, owner: Option<&ObjectRef>, value: Value) -> (Value, bool) {
        let mut cache = self.cache.lock();
        let list = cache.entry(member).or_default();
        list.retain(CacheEntry::is_live);
        if let Some(existing) = list
            .iter()
            .find(|entry| entry.belongs_to(owner))
            .and_then(CacheEntry::value)
        {
            return (existing, false);
        }
        list.push(CacheEntry::new(owner, &value));
        (value, true)
    }

    /// Whether the innermost arrangement body was declared by code of the
    /// type that declares the intercepted member
    fn within_own_arrangement(invocation: &Invocation) -> bool {
        let Some(caller) = innermost_arrange_caller() else {
            return false;
        };
        let Some(declaring) = invocation.method().declaring_type() else {
            return false;
        };
        declaring.is_assignable_from(&caller)
    }

    fn build_nested(invocation: &Invocation, mixin: &MockMixin, ty: &TypeRef) -> Option<Value> {
        if let Some(value) = mixin.return_rules().create_value(ty, mixin) {
            return Some(value);
        }
        if invocation.is_in_arrange() && Self::within_own_arrangement(invocation) {
            return None;
        }
        if ty.is_string() {
            return Some(Value::from(""));
        }
        let Some(factory) = mixin.factory() else {
            tracing::debug!(call = %invocation, "no factory for nested substitute");
            return None;
        };
        match factory.create_similar(mixin, ty) {
            Ok(object) => Some(Value::Object(object)),
            Err(err) => {
                tracing::debug!(call = %invocation, error = %err, "nested construction declined");
                None
            }
        }
    }
}

impl Behavior for RecursiveMockingBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        let ret = invocation.method().return_type();
        if ret.is_void() || ret.is_value_type() {
            return Ok(());
        }
        let Some(mixin) = invocation.mixin().cloned() else {
            return Ok(());
        };
        let owner = invocation.instance().cloned();
        let member = invocation.target().id();

        let value = if let Some(cached) = self.lookup(member, owner.as_ref()) {
            cached
        } else {
            let in_arrange = invocation.is_in_arrange();
            let mandatory = in_arrange || self.mode == RecursiveMode::ReturnMock;
            let produced = if mandatory {
                Self::build_nested(invocation, &mixin, &ret)
            } else if self.mode == RecursiveMode::ReturnDefault {
                mixin.return_rules().create_value(&ret, &mixin)
            } else {
                None
            };
            let Some(produced) = produced else {
                return Ok(());
            };

            let (value, fresh) = self.remember(member, owner.as_ref(), produced);
            if fresh {
                if let Value::Object(nested) = &value {
                    mixin.add_dependent(nested.clone());
                }
                tracing::debug!(call = %invocation, mode = %self.mode, "produced nested value");
            }
            value
        };

        invocation.mark_user_provided();
        invocation.claim_with_value(value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recursive_mocking"
    }

    fn describe(&self) -> String {
        format!("recursive_mocking({})", self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstructionError;
    use crate::mixin::MockFactory;
    use crate::policy::{assemble, PolicyOverrides, Preset};
    use crate::return_rules::ReturnRules;
    use mimic_reflect::{int_type, string_type, ArrangeMarker, TypeInfo};
    use std::sync::{Arc, Weak};

    struct TestFactory {
        rules: Arc<ReturnRules>,
    }

    impl MockFactory for TestFactory {
        fn create_similar(
            &self,
            parent: &MockMixin,
            ty: &TypeRef,
        ) -> Result<ObjectRef, ConstructionError> {
            if !ty.is_interceptable() {
                return Err(ConstructionError::not_interceptable(ty.name(), "sealed"));
            }
            let settings = assemble(parent.preset(), None, PolicyOverrides::default());
            let (object, _) = MockMixin::new(ty.clone(), settings, self.rules.clone()).instantiate(ty)?;
            Ok(object)
        }
    }

    struct Fixture {
        _factory: Arc<dyn MockFactory>,
        weak: Weak<dyn MockFactory>,
        rules: Arc<ReturnRules>,
        engine: TypeRef,
        car: TypeRef,
    }

    impl Fixture {
        fn new() -> Self {
            let rules = Arc::new(ReturnRules::with_defaults());
            let factory: Arc<dyn MockFactory> = Arc::new(TestFactory {
                rules: rules.clone(),
            });
            let weak = Arc::downgrade(&factory);
            let engine = TypeInfo::interface("IEngine")
                .method("Power", int_type(), |m| m)
                .build();
            let sealed = TypeInfo::class("Plate").sealed().build();
            let car = TypeInfo::interface("ICar")
                .method("Engine", &engine, |m| m)
                .method("Plate", &sealed, |m| m)
                .method("Name", string_type(), |m| m)
                .method("Tags", &TypeInfo::array_of(string_type(), 1), |m| m)
                .build();
            Self {
                _factory: factory,
                weak,
                rules,
                engine,
                car,
            }
        }

        fn substitute(&self, preset: Preset) -> (ObjectRef, Arc<MockMixin>) {
            let settings = assemble(preset, None, PolicyOverrides::default());
            MockMixin::new(self.car.clone(), settings, self.rules.clone())
                .with_factory(self.weak.clone())
                .instantiate(&self.car)
                .unwrap()
        }

        fn call(&self, object: &ObjectRef, mixin: &Arc<MockMixin>, member: &str) -> Invocation {
            Invocation::new(Some(object.clone()), self.car.find_member(member).unwrap(), [])
                .with_mixin(mixin.clone())
        }
    }

    #[test]
    fn return_mock_is_reference_stable() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::RecursiveLoose);
        let unit = RecursiveMockingBehavior::new(RecursiveMode::ReturnMock);

        let mut first = fx.call(&car, &mixin, "Engine");
        unit.process(&mut first).unwrap();
        let mut second = fx.call(&car, &mixin, "Engine");
        unit.process(&mut second).unwrap();

        let a = first.return_value().unwrap().as_object().unwrap().clone();
        let b = second.return_value().unwrap().as_object().unwrap().clone();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_instance_of(&fx.engine));
        assert!(first.is_user_provided());
        assert!(!first.should_call_original());
        assert_eq!(mixin.dependents().len(), 1);
    }

    #[test]
    fn owners_get_distinct_nested_values() {
        let fx = Fixture::new();
        let (car_a, mixin_a) = fx.substitute(Preset::RecursiveLoose);
        let (car_b, mixin_b) = fx.substitute(Preset::RecursiveLoose);
        let unit = RecursiveMockingBehavior::new(RecursiveMode::ReturnMock);

        let mut a = fx.call(&car_a, &mixin_a, "Engine");
        unit.process(&mut a).unwrap();
        let mut b = fx.call(&car_b, &mixin_b, "Engine");
        unit.process(&mut b).unwrap();

        assert_ne!(a.return_value(), b.return_value());
        assert_eq!(unit.cached_entries(fx.car.find_member("Engine").unwrap().as_ref()), 2);
    }

    #[test]
    fn return_default_declines_plain_references() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::Loose);
        let unit = RecursiveMockingBehavior::new(RecursiveMode::ReturnDefault);

        let mut engine = fx.call(&car, &mixin, "Engine");
        unit.process(&mut engine).unwrap();
        assert!(!engine.is_decided());

        let mut tags = fx.call(&car, &mixin, "Tags");
        unit.process(&mut tags).unwrap();
        let tags = tags.return_value().unwrap().as_array().unwrap();
        assert!(tags.is_empty());
        assert_eq!(tags.rank(), 1);
    }

    #[test]
    fn return_default_builds_mocks_during_arrangement() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::Loose);
        let unit = RecursiveMockingBehavior::new(RecursiveMode::ReturnDefault);

        let mut engine = fx.call(&car, &mixin, "Engine").in_arrange(true);
        unit.process(&mut engine).unwrap();
        assert!(engine.return_value().unwrap().as_object().is_some());
    }

    #[test]
    fn only_during_analysis_ignores_real_calls() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::Strict);
        let unit = RecursiveMockingBehavior::new(RecursiveMode::OnlyDuringAnalysis);

        let mut real = fx.call(&car, &mixin, "Engine");
        unit.process(&mut real).unwrap();
        assert!(!real.is_decided());

        let mut analysed = fx.call(&car, &mixin, "Engine").in_arrange(true);
        unit.process(&mut analysed).unwrap();
        assert!(analysed.is_decided());
    }

    #[test]
    fn strings_become_empty() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::RecursiveLoose);
        let mut name = fx.call(&car, &mixin, "Name");
        RecursiveMockingBehavior::new(RecursiveMode::ReturnMock)
            .process(&mut name)
            .unwrap();
        assert_eq!(name.return_value(), Some(&Value::from("")));
    }

    #[test]
    fn failed_construction_declines() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::RecursiveLoose);
        let mut plate = fx.call(&car, &mixin, "Plate");
        RecursiveMockingBehavior::new(RecursiveMode::ReturnMock)
            .process(&mut plate)
            .unwrap();
        assert!(!plate.is_decided());
        assert!(mixin.dependents().is_empty());
    }

    #[test]
    fn value_types_are_ignored() {
        let fx = Fixture::new();
        let settings = assemble(Preset::RecursiveLoose, None, PolicyOverrides::default());
        let (engine, mixin) = MockMixin::new(fx.engine.clone(), settings, fx.rules.clone())
            .instantiate(&fx.engine)
            .unwrap();
        let mut power = Invocation::new(Some(engine), fx.engine.find_member("Power").unwrap(), [])
            .with_mixin(mixin);
        RecursiveMockingBehavior::new(RecursiveMode::ReturnMock)
            .process(&mut power)
            .unwrap();
        assert!(!power.is_decided());
    }

    #[test]
    fn declines_inside_own_arrangement_body() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::RecursiveLoose);
        let unit = RecursiveMockingBehavior::new(RecursiveMode::ReturnMock);

        let _marker = ArrangeMarker::enter(&fx.car);
        let mut engine = fx.call(&car, &mixin, "Engine").in_arrange(true);
        unit.process(&mut engine).unwrap();
        assert!(!engine.is_decided());
    }

    #[test]
    fn containers_are_synthesized_inside_own_arrangement_body() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::RecursiveLoose);
        let unit = RecursiveMockingBehavior::new(RecursiveMode::ReturnMock);

        let _marker = ArrangeMarker::enter(&fx.car);
        let mut tags = fx.call(&car, &mixin, "Tags").in_arrange(true);
        unit.process(&mut tags).unwrap();
        let tags = tags.return_value().unwrap().as_array().unwrap();
        assert!(tags.is_empty());
        assert_eq!(tags.rank(), 1);

        let mut name = fx.call(&car, &mixin, "Name").in_arrange(true);
        unit.process(&mut name).unwrap();
        assert!(!name.is_decided());
    }

    #[test]
    fn arrangement_by_a_base_type_still_builds_nested() {
        let fx = Fixture::new();
        let (car, mixin) = fx.substitute(Preset::RecursiveLoose);
        let unit = RecursiveMockingBehavior::new(RecursiveMode::ReturnMock);

        // ICar is not assignable from its base, so the body is not ICar's own.
        let _marker = ArrangeMarker::enter(&mimic_reflect::object_type());
        let mut engine = fx.call(&car, &mixin, "Engine").in_arrange(true);
        unit.process(&mut engine).unwrap();
        assert!(engine.return_value().unwrap().as_object().is_some());
    }

    #[test]
    fn dead_owner_is_pruned() {
        let fx = Fixture::new();
        let unit = RecursiveMockingBehavior::new(RecursiveMode::ReturnMock);
        let engine_member = fx.car.find_member("Engine").unwrap();

        let nested = {
            let (car, mixin) = fx.substitute(Preset::RecursiveLoose);
            let mut call = fx.call(&car, &mixin, "Engine");
            unit.process(&mut call).unwrap();
            Object::downgrade(call.return_value().unwrap().as_object().unwrap())
        };

        assert!(!nested.is_alive());
        assert_eq!(unit.cached_entries(&engine_member), 0);
    }
}
