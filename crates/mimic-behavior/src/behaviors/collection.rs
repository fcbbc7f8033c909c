//! Stub-tracked collections
//!
//! Containers returned for map- and sequence-typed members are substitutes
//! themselves. Their indexer, `Add`, `Remove`, `Count` and friends are
//! answered by [`CollectionStubsBehavior`] against a [`CollectionContents`]
//! store, so values written through them can be read back later.

use crate::behavior::Behavior;
use crate::error::BehaviorError;
use crate::invocation::Invocation;
use crate::mixin::{MixinSet, MockMixin};
use crate::policy::{assemble, PolicyOverrides};
use mimic_reflect::{ArrayValue, MemberKind, ObjectRef, TypeRef, Value};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
enum Store {
    Map(Vec<(Value, Value)>),
    Sequence(Vec<Value>),
}

/// Backing storage of a stub-tracked collection
#[derive(Debug)]
pub struct CollectionContents {
    key_type: TypeRef,
    value_type: TypeRef,
    store: Mutex<Store>,
}

impl CollectionContents {
    /// Empty keyed map
    #[must_use]
    pub fn map(key: &TypeRef, value: &TypeRef) -> Self {
        Self {
            key_type: key.clone(),
            value_type: value.clone(),
            store: Mutex::new(Store::Map(Vec::new())),
        }
    }

    /// Empty sequence
    #[must_use]
    pub fn sequence(item: &TypeRef) -> Self {
        Self {
            key_type: item.clone(),
            value_type: item.clone(),
            store: Mutex::new(Store::Sequence(Vec::new())),
        }
    }

    /// Whether entries are key/value pairs
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(*self.store.lock(), Store::Map(_))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        match &*self.store.lock() {
            Store::Map(entries) => entries.len(),
            Store::Sequence(items) => items.len(),
        }
    }

    /// Whether nothing was added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value stored under `key` (maps) or at index `key` (sequences)
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<Value> {
        match &*self.store.lock() {
            Store::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()),
            Store::Sequence(items) => {
                let index = usize::try_from(key.as_int()?).ok()?;
                items.get(index).cloned()
            }
        }
    }

    /// Insert or replace; for sequences `key` must be an existing index
    pub fn set(&self, key: Value, value: Value) -> bool {
        match &mut *self.store.lock() {
            Store::Map(entries) => {
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key, value)),
                }
                true
            }
            Store::Sequence(items) => {
                let slot = key
                    .as_int()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| items.get_mut(i));
                match slot {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Append to a sequence, or insert a key/value pair into a map
    pub fn add(&self, args: &[Value]) {
        let mut store = self.store.lock();
        match &mut *store {
            Store::Map(entries) => {
                let key = args.first().cloned().unwrap_or_default();
                let value = args.get(1).cloned().unwrap_or_default();
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key, value)),
                }
            }
            Store::Sequence(items) => items.push(args.first().cloned().unwrap_or_default()),
        }
    }

    /// Remove a key (maps) or the first equal item (sequences)
    pub fn remove(&self, key: &Value) -> bool {
        match &mut *self.store.lock() {
            Store::Map(entries) => {
                let before = entries.len();
                entries.retain(|(k, _)| k != key);
                entries.len() != before
            }
            Store::Sequence(items) => match items.iter().position(|item| item == key) {
                Some(pos) => {
                    items.remove(pos);
                    true
                }
                None => false,
            },
        }
    }

    /// Whether `key` is a key (maps) or an item (sequences)
    #[must_use]
    pub fn contains(&self, key: &Value) -> bool {
        match &*self.store.lock() {
            Store::Map(entries) => entries.iter().any(|(k, _)| k == key),
            Store::Sequence(items) => items.contains(key),
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        match &mut *self.store.lock() {
            Store::Map(entries) => entries.clear(),
            Store::Sequence(items) => items.clear(),
        }
    }

    /// Keys of a map, or the items of a sequence
    #[must_use]
    pub fn keys(&self) -> Vec<Value> {
        match &*self.store.lock() {
            Store::Map(entries) => entries.iter().map(|(k, _)| k.clone()).collect(),
            Store::Sequence(items) => items.clone(),
        }
    }

    /// Values of a map, or the items of a sequence
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        match &*self.store.lock() {
            Store::Map(entries) => entries.iter().map(|(_, v)| v.clone()).collect(),
            Store::Sequence(items) => items.clone(),
        }
    }
}

/// Answers collection members of a stub-tracked collection
#[derive(Debug)]
pub struct CollectionStubsBehavior {
    contents: Arc<CollectionContents>,
}

impl CollectionStubsBehavior {
    /// Unit backed by `contents`
    #[must_use]
    pub fn new(contents: Arc<CollectionContents>) -> Self {
        Self { contents }
    }

    /// Shared storage
    #[inline]
    #[must_use]
    pub fn contents(&self) -> &Arc<CollectionContents> {
        &self.contents
    }

    fn finish(invocation: &mut Invocation, value: Value) {
        invocation.mark_user_provided();
        if invocation.method().returns_void() {
            invocation.claim_original(false);
        } else {
            invocation.claim_with_value(value);
        }
    }
}

impl Behavior for CollectionStubsBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        if invocation.is_recording() {
            return Ok(());
        }
        let args: Vec<Value> = invocation.args().to_vec();
        let first = args.first().cloned().unwrap_or_default();
        let contents = &self.contents;

        let result = match invocation.method().kind() {
            MemberKind::IndexerGet => contents.get(&first),
            MemberKind::IndexerSet => {
                let value = args.get(1).cloned().unwrap_or_default();
                contents.set(first, value).then_some(Value::Null)
            }
            _ => match invocation.method().name() {
                "get_Count" | "Count" => {
                    Some(Value::Int(i64::try_from(contents.len()).unwrap_or(i64::MAX)))
                }
                "Add" => {
                    contents.add(&args);
                    Some(Value::Bool(true))
                }
                "Remove" => Some(Value::Bool(contents.remove(&first))),
                "ContainsKey" | "Contains" => Some(Value::Bool(contents.contains(&first))),
                "Clear" => {
                    contents.clear();
                    Some(Value::Null)
                }
                "get_Keys" | "Keys" => Some(Value::Array(ArrayValue::from_items(
                    &contents.key_type,
                    contents.keys(),
                ))),
                "get_Values" | "Values" | "ToArray" | "GetEnumerator" => Some(Value::Array(
                    ArrayValue::from_items(&contents.value_type, contents.values()),
                )),
                _ => None,
            },
        };

        if let Some(value) = result {
            Self::finish(invocation, value);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collection_stubs"
    }
}

/// Factory for stub-tracked collections
#[derive(Debug, Clone, Copy)]
pub struct MockCollection;

impl MockCollection {
    /// Empty map substitute of `ty` configured like `owner`
    #[must_use]
    pub fn create_map(ty: &TypeRef, key: &TypeRef, value: &TypeRef, owner: &MockMixin) -> Option<Value> {
        Self::create(ty, CollectionContents::map(key, value), owner)
    }

    /// Empty sequence substitute of `ty` configured like `owner`
    #[must_use]
    pub fn create_sequence(ty: &TypeRef, item: &TypeRef, owner: &MockMixin) -> Option<Value> {
        Self::create(ty, CollectionContents::sequence(item), owner)
    }

    /// Storage behind a collection substitute
    #[must_use]
    pub fn contents(object: &ObjectRef) -> Option<Arc<CollectionContents>> {
        MockMixin::of(object)?.mixin::<CollectionContents>()
    }

    fn create(ty: &TypeRef, contents: CollectionContents, owner: &MockMixin) -> Option<Value> {
        let contents = Arc::new(contents);
        let mut mixins = MixinSet::new();
        mixins.insert(contents.clone());

        let overrides = PolicyOverrides::default()
            .with_mock_constructor_call(true)
            .with_supplementary(Arc::new(CollectionStubsBehavior::new(contents)))
            .with_mixins(mixins);
        let settings = assemble(owner.preset(), None, overrides);

        let mut mixin = MockMixin::new(ty.clone(), settings, owner.return_rules().clone());
        if let Some(factory) = owner.factory_handle() {
            mixin = mixin.with_factory(factory);
        }
        match mixin.instantiate(ty) {
            Ok((object, _)) => Some(Value::Object(object)),
            Err(err) => {
                tracing::debug!(ty = %ty, error = %err, "collection substitute failed");
                None
            }
        }
    }
}
