//! Mock repository
//!
//! [`MocksRepository`] owns the generation scope, the value-synthesis rules
//! and the static-interception table. It builds substitutes, acts as the
//! [`MockFactory`] for nested construction, and hosts the interception
//! boundary: every call to a substitute goes through [`MocksRepository::invoke`].

use crate::arrangement::{self, ArrangementSource};
use crate::config::MockConfig;
use crate::error::{construction_from_proxy, MockError};
use crate::options::MockOptions;
use dashmap::DashMap;
use mimic_behavior::{
    assemble, ConstructionError, Invocation, MockCreationSettings, MockFactory, MockMixin,
    PolicyOverrides, Preset, ReturnRules,
};
use mimic_proxy::{ModuleScope, ProxyRequest, ProxyTypeGenerator};
use mimic_reflect::{
    is_within_arrangement, ArrangeMarker, MemberRef, ObjectRef, TypeRef, TypeRegistry, Value,
};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// Flags describing the context of one intercepted call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    /// An arrangement body is being evaluated
    pub in_arrange: bool,

    /// The call is being recorded for later assertion
    pub recording: bool,
}

impl CallContext {
    /// Context of the current thread
    #[must_use]
    pub fn current() -> Self {
        Self {
            in_arrange: is_within_arrangement(),
            recording: false,
        }
    }

    /// Mark the call as made while arranging
    #[inline]
    #[must_use]
    pub fn with_in_arrange(mut self, in_arrange: bool) -> Self {
        self.in_arrange = in_arrange;
        self
    }

    /// Mark the call as recorded
    #[inline]
    #[must_use]
    pub fn with_recording(mut self, recording: bool) -> Self {
        self.recording = recording;
        self
    }
}

/// Builds substitutes and intercepts calls to them
pub struct MocksRepository {
    me: Weak<MocksRepository>,
    config: MockConfig,
    generator: ProxyTypeGenerator,
    return_rules: Arc<ReturnRules>,
    types: TypeRegistry,
    statics: DashMap<String, Arc<MockMixin>>,
    arrangements: RwLock<Option<Arc<dyn ArrangementSource>>>,
}

impl MocksRepository {
    /// Repository with default configuration
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_config(MockConfig::default())
    }

    /// Repository using `config`
    #[must_use]
    pub fn with_config(config: MockConfig) -> Arc<Self> {
        let scope = Arc::new(ModuleScope::with_options(config.scope_options()));
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            generator: ProxyTypeGenerator::new(scope),
            return_rules: Arc::new(ReturnRules::with_defaults()),
            types: TypeRegistry::new(),
            statics: DashMap::new(),
            arrangements: RwLock::new(None),
            config,
        })
    }

    /// Configuration the repository was built with
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Shared value-synthesis rules; rules registered here apply to every
    /// substitute built afterwards
    #[inline]
    #[must_use]
    pub fn return_rules(&self) -> &Arc<ReturnRules> {
        &self.return_rules
    }

    /// Generated-type cache
    #[inline]
    #[must_use]
    pub fn generator(&self) -> &ProxyTypeGenerator {
        &self.generator
    }

    /// Generation namespaces and the structural type cache
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Arc<ModuleScope> {
        self.generator.scope()
    }

    /// Make `ty` resolvable when reloading saved modules
    pub fn register_type(&self, ty: &TypeRef) {
        self.types.register(ty);
    }

    /// Install the arrangement front end
    pub fn set_arrangement_source(&self, source: Arc<dyn ArrangementSource>) {
        *self.arrangements.write() = Some(source);
    }

    /// Remove the arrangement front end
    pub fn clear_arrangement_source(&self) {
        *self.arrangements.write() = None;
    }

    fn factory_handle(&self) -> Weak<dyn MockFactory> {
        let handle: Weak<dyn MockFactory> = self.me.clone();
        handle
    }

    fn preset_or_default(&self, options: &MockOptions) -> Preset {
        options.preset.unwrap_or(self.config.default_preset)
    }

    fn settings_for(preset: Preset, options: MockOptions) -> MockCreationSettings {
        let MockOptions {
            args,
            overrides,
            interfaces,
            attributes,
            filter,
            ..
        } = options;
        let mut settings = assemble(preset, args, overrides).with_interfaces(interfaces);
        for attribute in attributes {
            settings = settings.with_attribute(attribute);
        }
        match filter {
            Some(filter) => settings.with_interceptor_filter(filter),
            None => settings,
        }
    }

    /// Create a substitute of `ty`
    ///
    /// # Errors
    /// Returns [`MockError::Construction`] when the type cannot be generated,
    /// no constructor accepts the arguments, or the generation namespace is
    /// unavailable
    pub fn create(&self, ty: &TypeRef, options: MockOptions) -> Result<ObjectRef, MockError> {
        let preset = self.preset_or_default(&options);
        let settings = Self::settings_for(preset, options);
        self.create_from_settings(ty, settings)
    }

    /// Create a substitute from fully assembled settings
    ///
    /// # Errors
    /// Same as [`MocksRepository::create`]
    pub fn create_from_settings(
        &self,
        ty: &TypeRef,
        settings: MockCreationSettings,
    ) -> Result<ObjectRef, MockError> {
        let mut request = ProxyRequest::new(ty).with_interfaces(&settings.additional_interfaces);
        for attribute in &settings.additional_attributes {
            request = request.with_attribute(attribute.clone());
        }
        if let Some(filter) = &settings.interceptor_filter {
            request = request.with_filter(filter.name());
        }

        let runtime_type = self
            .generator
            .get_or_build(&request)
            .map_err(construction_from_proxy)?;
        self.types.register(ty);
        for interface in &settings.additional_interfaces {
            self.types.register(interface);
        }

        let args = settings.args.clone().unwrap_or_default();
        let constructor = bind_constructor(ty, &args, settings.mock_constructor_call)?;
        let preset = settings.preset;

        let (object, mixin) = MockMixin::new(ty.clone(), settings, self.return_rules.clone())
            .with_factory(self.factory_handle())
            .instantiate(&runtime_type)?;

        if let Some(constructor) = constructor {
            let mut invocation =
                Invocation::new(Some(object.clone()), constructor, args).with_mixin(mixin.clone());
            mixin.chain().dispatch(&mut invocation)?;
            if invocation.should_call_original() {
                run_constructor(&invocation);
            }
        }

        tracing::debug!(
            ty = %ty,
            runtime_type = %runtime_type,
            %preset,
            object = %object.id(),
            "created substitute"
        );
        Ok(object)
    }

    /// Turn an externally created object into a substitute of `ty`
    ///
    /// No type is generated and no constructor runs; the returned mixin is
    /// attached to `object`, so calls routed through [`MocksRepository::invoke`]
    /// reach its chain.
    ///
    /// # Errors
    /// Returns [`ConstructionError::AlreadyMocked`] if `object` is already a substitute
    pub fn create_external_mock_mixin(
        &self,
        object: &ObjectRef,
        ty: &TypeRef,
        options: MockOptions,
    ) -> Result<Arc<MockMixin>, MockError> {
        let preset = self.preset_or_default(&options);
        let mut settings = Self::settings_for(preset, options);
        settings.mock_constructor_call = true;

        let mixin = Arc::new(
            MockMixin::new(ty.clone(), settings, self.return_rules.clone())
                .with_factory(self.factory_handle()),
        );
        MockMixin::attach(object, mixin.clone())?;
        self.types.register(ty);

        tracing::debug!(ty = %ty, object = %object.id(), %preset, "wrapped external object");
        Ok(mixin)
    }

    /// Route calls to the static members of `ty` through a behavior chain
    ///
    /// The type's static constructor is offered to the chain right away and
    /// runs unless it is suppressed (the default).
    ///
    /// # Errors
    /// Propagates failures raised by the chain while handling the static constructor
    pub fn intercept_statics(
        &self,
        ty: &TypeRef,
        options: MockOptions,
    ) -> Result<Arc<MockMixin>, MockError> {
        let preset = self.preset_or_default(&options);
        let mock_static_constructor = options.mock_static_constructor.unwrap_or(true);
        let mut settings = Self::settings_for(preset, options);
        settings.mock_constructor_call = true;

        let mixin = Arc::new(
            MockMixin::new(ty.clone(), settings, self.return_rules.clone())
                .with_factory(self.factory_handle())
                .with_static_constructor_mocked(mock_static_constructor),
        );
        if self
            .statics
            .insert(ty.name().to_string(), mixin.clone())
            .is_some()
        {
            tracing::debug!(ty = %ty, "replaced static interception");
        }
        self.types.register(ty);

        if let Some(cctor) = ty.static_constructor() {
            let mut invocation = Invocation::new(None, cctor, Vec::new()).with_mixin(mixin.clone());
            mixin.chain().dispatch(&mut invocation)?;
            if invocation.should_call_original() {
                run_constructor(&invocation);
            }
        }

        tracing::debug!(ty = %ty, %preset, mock_static_constructor, "intercepting statics");
        Ok(mixin)
    }

    /// Mixin handling the static members of the type named `type_name`
    #[must_use]
    pub fn static_mixin(&self, type_name: &str) -> Option<Arc<MockMixin>> {
        self.statics.get(type_name).map(|entry| entry.value().clone())
    }

    /// Stop intercepting the static members of `type_name`
    pub fn release_statics(&self, type_name: &str) -> bool {
        self.statics.remove(type_name).is_some()
    }

    /// Concrete instance of an abstract type whose implemented members run
    /// their originals and whose constructor executes
    ///
    /// # Errors
    /// Same as [`MocksRepository::create`]
    pub fn implement_abstract_type(&self, ty: &TypeRef) -> Result<ObjectRef, MockError> {
        let settings = assemble(
            Preset::CallOriginal,
            None,
            PolicyOverrides::default().with_mock_constructor_call(false),
        );
        self.create_from_settings(ty, settings)
    }

    /// Evaluate `body` as an arrangement declared by `caller`
    pub fn arrange<R>(&self, caller: &TypeRef, body: impl FnOnce() -> R) -> R {
        let _marker = ArrangeMarker::enter(caller);
        body()
    }

    /// Intercept a call of `member` on `instance`
    ///
    /// # Errors
    /// Policy violations raised by the chain, and
    /// [`MockError::NoOriginalImplementation`] when the decided outcome needs an
    /// original that does not exist
    pub fn invoke(
        &self,
        instance: &ObjectRef,
        member: &MemberRef,
        args: Vec<Value>,
    ) -> Result<Value, MockError> {
        self.invoke_with(Some(instance), member, args, CallContext::current())
    }

    /// Intercept a call of the member named `name` on `instance`
    ///
    /// # Errors
    /// [`MockError::MemberNotFound`] plus everything [`MocksRepository::invoke`] returns
    pub fn invoke_member(
        &self,
        instance: &ObjectRef,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, MockError> {
        let ty = instance.type_info();
        let member = ty.find_member(name).ok_or_else(|| MockError::MemberNotFound {
            type_name: instance.unproxied_type().name().to_string(),
            member: name.to_string(),
        })?;
        self.invoke(instance, &member, args)
    }

    /// Intercept a call of the static member named `name` on `ty`
    ///
    /// # Errors
    /// Same as [`MocksRepository::invoke_member`]
    pub fn invoke_static(
        &self,
        ty: &TypeRef,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, MockError> {
        let member = ty.find_member(name).ok_or_else(|| MockError::MemberNotFound {
            type_name: ty.name().to_string(),
            member: name.to_string(),
        })?;
        self.invoke_with(None, &member, args, CallContext::current())
    }

    /// Read property `name` through its getter
    ///
    /// # Errors
    /// Same as [`MocksRepository::invoke_member`]
    pub fn get_property(&self, instance: &ObjectRef, name: &str) -> Result<Value, MockError> {
        self.invoke_member(instance, &format!("get_{name}"), Vec::new())
    }

    /// Write property `name` through its setter
    ///
    /// # Errors
    /// Same as [`MocksRepository::invoke_member`]
    pub fn set_property(
        &self,
        instance: &ObjectRef,
        name: &str,
        value: Value,
    ) -> Result<(), MockError> {
        self.invoke_member(instance, &format!("set_{name}"), vec![value])
            .map(|_| ())
    }

    /// Intercept a call with explicit context flags
    ///
    /// # Errors
    /// Same as [`MocksRepository::invoke`]
    pub fn invoke_with(
        &self,
        instance: Option<&ObjectRef>,
        member: &MemberRef,
        args: Vec<Value>,
        context: CallContext,
    ) -> Result<Value, MockError> {
        let mixin = match instance {
            Some(object) => MockMixin::of(object),
            None => member
                .declaring_type()
                .and_then(|ty| self.static_mixin(ty.name())),
        };

        let mut invocation = Invocation::new(instance.cloned(), member.clone(), args)
            .in_arrange(context.in_arrange)
            .recording(context.recording);

        let Some(mixin) = mixin else {
            return run_original(&invocation);
        };
        if !mixin.intercepts(member) {
            tracing::trace!(call = %invocation, "member excluded by interceptor filter");
            return run_original(&invocation);
        }
        invocation = invocation.with_mixin(mixin.clone());

        let source = self.arrangements.read().clone();
        if let Some(outcome) = source.and_then(|s| s.find(&invocation)) {
            tracing::trace!(call = %invocation, ?outcome, "arranged");
            arrangement::apply(&mut invocation, outcome);
        }

        mixin.chain().dispatch(&mut invocation)?;

        if invocation.should_call_original() {
            return run_original(&invocation);
        }
        if let Some(value) = invocation.return_value() {
            return Ok(value.clone());
        }
        Ok(member.return_type().default_value())
    }

    /// Write generated namespaces to disk
    ///
    /// Returns the written path, or `None` when saving is disabled.
    ///
    /// # Errors
    /// Returns [`MockError::Proxy`] if both namespaces were generated, none
    /// was, or writing fails
    pub fn save_generated(&self) -> Result<Option<PathBuf>, MockError> {
        Ok(self.scope().save()?)
    }

    /// Prime the type cache from a saved namespace
    ///
    /// Types the saved module refers to must have been registered (creating
    /// a substitute registers its type).
    ///
    /// # Errors
    /// Returns [`MockError::Proxy`] for unreadable, altered or mapping-less artifacts
    pub fn load_generated(&self, path: &Path) -> Result<usize, MockError> {
        Ok(self.scope().load_file_into_cache(path, &self.types)?)
    }
}

impl std::fmt::Debug for MocksRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MocksRepository")
            .field("default_preset", &self.config.default_preset)
            .field("cached_types", &self.scope().cached_types())
            .field("statics", &self.statics.len())
            .finish_non_exhaustive()
    }
}

impl MockFactory for MocksRepository {
    fn create_similar(
        &self,
        parent: &MockMixin,
        ty: &TypeRef,
    ) -> Result<ObjectRef, ConstructionError> {
        let mut settings = assemble(parent.preset(), None, PolicyOverrides::default());
        settings.mock_constructor_call = true;
        self.create_from_settings(ty, settings).map_err(|err| match err {
            MockError::Construction(inner) => inner,
            other => ConstructionError::Generation(other.to_string()),
        })
    }
}

fn run_original(invocation: &Invocation) -> Result<Value, MockError> {
    let target = invocation.target();
    target
        .call_original(invocation.instance(), invocation.args())
        .ok_or_else(|| MockError::NoOriginalImplementation {
            member: target.to_string(),
        })
}

/// Run the constructor body, if it has one; returns whether a body ran
fn run_constructor(invocation: &Invocation) -> bool {
    let target = invocation.target();
    let ran = target
        .call_original(invocation.instance(), invocation.args())
        .is_some();
    if !ran {
        tracing::debug!(constructor = %target, "constructor has no body to run");
    }
    ran
}

/// Constructor of `ty` (or its nearest ancestor declaring one) accepting `args`
///
/// A suppressed constructor called without arguments needs no binding.
fn bind_constructor(
    ty: &TypeRef,
    args: &[Value],
    mock_constructor_call: bool,
) -> Result<Option<MemberRef>, ConstructionError> {
    let binding_error = || ConstructionError::ConstructorBinding {
        type_name: ty.name().to_string(),
        arity: args.len(),
    };
    if ty.is_interface() {
        return if args.is_empty() {
            Ok(None)
        } else {
            Err(binding_error())
        };
    }

    let candidates: Vec<MemberRef> = std::iter::once(ty.clone())
        .chain(ty.ancestors())
        .map(|t| t.constructors().cloned().collect::<Vec<_>>())
        .find(|ctors| !ctors.is_empty())
        .unwrap_or_default();

    match candidates.into_iter().find(|ctor| ctor.accepts(args)) {
        Some(ctor) => Ok(Some(ctor)),
        None if args.is_empty() && mock_constructor_call => Ok(None),
        None => Err(binding_error()),
    }
}
