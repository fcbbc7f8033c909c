//! Per-substitute state
//!
//! Every substitute carries a [`MockMixin`]: its behavior chain, its
//! registered mixins, constructor flags, the nested substitutes it owns and a
//! back-reference to the factory that made it.

use crate::behavior::BehaviorChain;
use crate::error::ConstructionError;
use crate::policy::{InterceptorFilter, MockCreationSettings, Preset, PresetConfiguration};
use crate::return_rules::ReturnRules;
use indexmap::IndexMap;
use mimic_reflect::{MemberInfo, Object, ObjectId, ObjectRef, TypeRef, Value};
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

/// Creates substitutes on behalf of behavior units
///
/// Implemented by the repository; units reach it through the owning
/// substitute's mixin.
pub trait MockFactory: Send + Sync {
    /// Create a substitute of `ty` configured like `parent`
    ///
    /// # Errors
    /// Returns [`ConstructionError`] if `ty` cannot be substituted
    fn create_similar(&self, parent: &MockMixin, ty: &TypeRef) -> Result<ObjectRef, ConstructionError>;
}

/// Extra state objects keyed by their type
#[derive(Clone, Default)]
pub struct MixinSet {
    entries: IndexMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl MixinSet {
    /// Empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mixin`, replacing any earlier one of the same type
    pub fn insert<T: Any + Send + Sync>(&mut self, mixin: Arc<T>) {
        self.entries.insert(TypeId::of::<T>(), mixin);
    }

    /// Mixin of type `T`, if present
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()?
            .downcast::<T>()
            .ok()
    }

    /// Whether a mixin of type `T` is present
    #[inline]
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Add every entry of `other` not already present
    pub fn merge(&mut self, other: &MixinSet) {
        for (id, mixin) in &other.entries {
            self.entries.entry(*id).or_insert_with(|| mixin.clone());
        }
    }

    /// Number of mixins
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no mixins
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MixinSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixinSet").field("len", &self.entries.len()).finish()
    }
}

/// State attached to every substitute
pub struct MockMixin {
    mocked_type: TypeRef,
    chain: BehaviorChain,
    mixins: MixinSet,
    constructor_args: Option<Vec<Value>>,
    mock_constructor_call: bool,
    mock_static_constructor: bool,
    interceptor_filter: Option<InterceptorFilter>,
    dependents: Mutex<Vec<ObjectRef>>,
    factory: Option<Weak<dyn MockFactory>>,
    return_rules: Arc<ReturnRules>,
}

impl MockMixin {
    /// Build the mixin for a substitute of `mocked_type`
    #[must_use]
    pub fn new(mocked_type: TypeRef, settings: MockCreationSettings, return_rules: Arc<ReturnRules>) -> Self {
        let MockCreationSettings {
            args,
            mock_constructor_call,
            supplementary,
            fallback,
            mut mixins,
            preset,
            interceptor_filter,
            ..
        } = settings;
        if !mixins.contains::<PresetConfiguration>() {
            mixins.insert(Arc::new(PresetConfiguration::new(preset)));
        }
        Self {
            mocked_type,
            chain: BehaviorChain::new(supplementary, fallback),
            mixins,
            constructor_args: args,
            mock_constructor_call,
            mock_static_constructor: false,
            interceptor_filter,
            dependents: Mutex::new(Vec::new()),
            factory: None,
            return_rules,
        }
    }

    /// Set the factory used for nested construction
    #[must_use]
    pub fn with_factory(mut self, factory: Weak<dyn MockFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Suppress (`true`) or run (`false`) the type's static constructor
    #[must_use]
    pub fn with_static_constructor_mocked(mut self, mocked: bool) -> Self {
        self.mock_static_constructor = mocked;
        self
    }

    /// Allocate an instance of `runtime_type` carrying this mixin
    ///
    /// # Errors
    /// Returns [`ConstructionError::AlreadyMocked`] if attaching fails
    pub fn instantiate(self, runtime_type: &TypeRef) -> Result<(ObjectRef, Arc<MockMixin>), ConstructionError> {
        let object = Object::new(runtime_type.clone());
        let mixin = Arc::new(self);
        Self::attach(&object, mixin.clone())?;
        Ok((object, mixin))
    }

    /// Attach `mixin` to an existing object
    ///
    /// # Errors
    /// Returns [`ConstructionError::AlreadyMocked`] if the object already has one
    pub fn attach(object: &ObjectRef, mixin: Arc<MockMixin>) -> Result<(), ConstructionError> {
        if object.attach_mixin(mixin) {
            Ok(())
        } else {
            Err(ConstructionError::AlreadyMocked {
                object: object.id().to_string(),
            })
        }
    }

    /// Mixin of `object`, if it is a substitute
    #[must_use]
    pub fn of(object: &ObjectRef) -> Option<Arc<MockMixin>> {
        object.mixin::<MockMixin>()
    }

    /// Type this substitute stands in for
    #[inline]
    #[must_use]
    pub fn mocked_type(&self) -> &TypeRef {
        &self.mocked_type
    }

    /// Units deciding calls to this substitute
    #[inline]
    #[must_use]
    pub fn chain(&self) -> &BehaviorChain {
        &self.chain
    }

    /// Mixins attached at creation
    #[inline]
    #[must_use]
    pub fn mixins(&self) -> &MixinSet {
        &self.mixins
    }

    /// Registered mixin of type `T`
    #[must_use]
    pub fn mixin<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.mixins.get::<T>()
    }

    /// Preset recorded for this substitute
    #[must_use]
    pub fn preset(&self) -> Preset {
        self.mixins
            .get::<PresetConfiguration>()
            .map_or_else(Preset::default, |config| config.preset())
    }

    /// Arguments the substitute was created with; `None` if none were supplied
    #[inline]
    #[must_use]
    pub fn constructor_args(&self) -> Option<&[Value]> {
        self.constructor_args.as_deref()
    }

    /// Whether the instance constructor is suppressed
    #[inline]
    #[must_use]
    pub fn is_constructor_mocked(&self) -> bool {
        self.mock_constructor_call
    }

    /// Whether the static constructor is suppressed
    #[inline]
    #[must_use]
    pub fn is_static_constructor_mocked(&self) -> bool {
        self.mock_static_constructor
    }

    /// Filter restricting interception, if any
    #[inline]
    #[must_use]
    pub fn interceptor_filter(&self) -> Option<&InterceptorFilter> {
        self.interceptor_filter.as_ref()
    }

    /// Whether calls to `member` go through the chain
    #[must_use]
    pub fn intercepts(&self, member: &MemberInfo) -> bool {
        self.interceptor_filter
            .as_ref()
            .map_or(true, |filter| filter.allows(member))
    }

    /// Factory for nested construction, if it is still alive
    #[must_use]
    pub fn factory(&self) -> Option<Arc<dyn MockFactory>> {
        self.factory.as_ref()?.upgrade()
    }

    /// Weak factory handle (for creating sibling substitutes)
    #[must_use]
    pub fn factory_handle(&self) -> Option<Weak<dyn MockFactory>> {
        self.factory.clone()
    }

    /// Value-synthesis rules shared with the creating repository
    #[inline]
    #[must_use]
    pub fn return_rules(&self) -> &Arc<ReturnRules> {
        &self.return_rules
    }

    /// Record `object` as owned by this substitute
    pub fn add_dependent(&self, object: ObjectRef) {
        self.dependents.lock().push(object);
    }

    /// Directly owned nested substitutes
    #[must_use]
    pub fn dependents(&self) -> Vec<ObjectRef> {
        self.dependents.lock().clone()
    }

    /// Every substitute reachable through dependents, depth first
    #[must_use]
    pub fn walk_dependents(&self) -> Vec<ObjectRef> {
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<ObjectRef> = self.dependents().into_iter().rev().collect();
        while let Some(object) = stack.pop() {
            if !seen.insert(object.id()) {
                continue;
            }
            if let Some(mixin) = Self::of(&object) {
                stack.extend(mixin.dependents().into_iter().rev());
            }
            out.push(object);
        }
        out
    }
}

impl fmt::Debug for MockMixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockMixin")
            .field("mocked_type", &self.mocked_type.name())
            .field("chain", &self.chain.describe())
            .field("mock_constructor_call", &self.mock_constructor_call)
            .field("mock_static_constructor", &self.mock_static_constructor)
            .field("dependents", &self.dependents.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{assemble, PolicyOverrides};
    use mimic_reflect::TypeInfo;

    #[derive(Debug)]
    struct Tag(&'static str);

    fn mixin_for(ty: &TypeRef, preset: Preset) -> MockMixin {
        let settings = assemble(preset, None, PolicyOverrides::default());
        MockMixin::new(ty.clone(), settings, Arc::new(ReturnRules::with_defaults()))
    }

    #[test]
    fn mixin_set_by_type() {
        let mut set = MixinSet::new();
        set.insert(Arc::new(Tag("a")));
        set.insert(Arc::new(Tag("b")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get::<Tag>().unwrap().0, "b");
        assert!(set.get::<String>().is_none());
    }

    #[test]
    fn merge_keeps_existing() {
        let mut left = MixinSet::new();
        left.insert(Arc::new(Tag("left")));
        let mut right = MixinSet::new();
        right.insert(Arc::new(Tag("right")));
        right.insert(Arc::new(7_u32));

        left.merge(&right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.get::<Tag>().unwrap().0, "left");
    }

    #[test]
    fn preset_is_recorded() {
        let ty = TypeInfo::interface("IService").build();
        let mixin = mixin_for(&ty, Preset::Strict);
        assert_eq!(mixin.preset(), Preset::Strict);
        assert!(mixin.factory().is_none());
    }

    #[test]
    fn attach_only_once() {
        let ty = TypeInfo::interface("IService").build();
        let (object, _) = mixin_for(&ty, Preset::Loose).instantiate(&ty).unwrap();
        let again = Arc::new(mixin_for(&ty, Preset::Loose));
        assert!(matches!(
            MockMixin::attach(&object, again),
            Err(ConstructionError::AlreadyMocked { .. })
        ));
        assert!(MockMixin::of(&object).is_some());
    }

    #[test]
    fn walk_dependents_is_transitive() {
        let ty = TypeInfo::interface("INode").build();
        let (root, root_mixin) = mixin_for(&ty, Preset::Loose).instantiate(&ty).unwrap();
        let (child, child_mixin) = mixin_for(&ty, Preset::Loose).instantiate(&ty).unwrap();
        let (grandchild, _) = mixin_for(&ty, Preset::Loose).instantiate(&ty).unwrap();

        root_mixin.add_dependent(child.clone());
        root_mixin.add_dependent(grandchild.clone());
        child_mixin.add_dependent(grandchild.clone());

        let walked: Vec<_> = root_mixin.walk_dependents().iter().map(|o| o.id()).collect();
        assert_eq!(walked, vec![child.id(), grandchild.id()]);
        drop(root);
    }
}
