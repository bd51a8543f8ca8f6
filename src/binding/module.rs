// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Binding modules: explicit registration tables of step definitions and
//! hooks, optionally auto-discovered via [`inventory`].

use std::{collections::HashMap, sync::Arc};

use derive_more::with_trait::Debug;

use crate::convert::ParamType;

use super::{
    HookFn, HookType, KeywordType, Location, StepFn, StepPattern,
    DEFAULT_HOOK_PRIORITY,
};

/// Identifier of a [`BindingModule`]. Modules are deduplicated by it.
pub type ModuleId = &'static str;

/// Shared handle to a [`BindingModule`].
pub type ModuleRef = Arc<dyn BindingModule>;

/// Unit of binding discovery: something that declares step definitions and
/// hooks.
pub trait BindingModule: Send + Sync + 'static {
    /// Returns the identity of this module.
    fn id(&self) -> ModuleId;

    /// Declares all the bindings of this module.
    fn declare(&self, bindings: &mut Declarations);
}

impl<M: BindingModule + ?Sized> BindingModule for &'static M {
    fn id(&self) -> ModuleId {
        (**self).id()
    }

    fn declare(&self, bindings: &mut Declarations) {
        (**self).declare(bindings);
    }
}

/// [`BindingModule`] backed by a plain declaration [`fn`].
#[derive(Clone, Copy, Debug)]
pub struct FnModule {
    /// Identity of this module.
    id: ModuleId,

    /// Declaration [`fn`].
    #[debug("{declare:p}")]
    declare: fn(&mut Declarations),
}

impl FnModule {
    /// Creates a new [`FnModule`].
    #[must_use]
    pub const fn new(id: ModuleId, declare: fn(&mut Declarations)) -> Self {
        Self { id, declare }
    }

    /// Wraps this [`FnModule`] into a [`ModuleRef`].
    #[must_use]
    pub fn into_ref(self) -> ModuleRef {
        Arc::new(self)
    }
}

impl BindingModule for FnModule {
    fn id(&self) -> ModuleId {
        self.id
    }

    fn declare(&self, bindings: &mut Declarations) {
        (self.declare)(bindings);
    }
}

/// Trigger a [`HookDeclaration`] is declared for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Trigger {
    /// Statically known [`HookType`].
    Typed(HookType),

    /// Trigger named by a string, validated on [`Registry`] build.
    ///
    /// [`Registry`]: super::Registry
    Named(&'static str),
}

/// Step definition as declared by a [`BindingModule`].
#[derive(Clone, Debug)]
pub struct StepDeclaration {
    /// Keyword type the step definition is registered under.
    pub keyword: KeywordType,

    /// Pattern the step text is matched against.
    pub pattern: StepPattern,

    /// Step [`fn`].
    #[debug("{fun:p}")]
    pub fun: StepFn,

    /// Declared parameter types, if any.
    ///
    /// [`None`] passes every argument through unconverted.
    pub params: Option<Vec<ParamType>>,

    /// [`Location`] of the [`StepDeclaration::fun`].
    pub location: Option<Location>,
}

impl StepDeclaration {
    /// Declares the parameter types of this step definition.
    pub fn params(
        &mut self,
        params: impl IntoIterator<Item = ParamType>,
    ) -> &mut Self {
        self.params = Some(params.into_iter().collect());
        self
    }

    /// Sets the [`Location`] of this step definition.
    pub fn at(&mut self, location: Location) -> &mut Self {
        self.location = Some(location);
        self
    }
}

/// Hook as declared by a [`BindingModule`].
#[derive(Clone, Debug)]
pub struct HookDeclaration {
    /// Lifecycle boundary of the hook.
    pub trigger: Trigger,

    /// Hook [`fn`].
    #[debug("{fun:p}")]
    pub fun: HookFn,

    /// Lower runs first.
    pub priority: i32,

    /// Tags restricting the hook.
    pub tags: Vec<&'static str>,

    /// [`Location`] of the [`HookDeclaration::fun`].
    pub location: Option<Location>,
}

impl HookDeclaration {
    /// Sets the priority of this hook.
    pub fn priority(&mut self, priority: i32) -> &mut Self {
        self.priority = priority;
        self
    }

    /// Restricts this hook to features/scenarios having any of the `tags`.
    pub fn tags(
        &mut self,
        tags: impl IntoIterator<Item = &'static str>,
    ) -> &mut Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Sets the [`Location`] of this hook.
    pub fn at(&mut self, location: Location) -> &mut Self {
        self.location = Some(location);
        self
    }
}

/// Registration table filled by [`BindingModule::declare()`].
#[derive(Clone, Debug, Default)]
pub struct Declarations {
    /// Declared step definitions, in declaration order.
    pub steps: Vec<StepDeclaration>,

    /// Declared hooks, in declaration order.
    pub hooks: Vec<HookDeclaration>,
}

impl Declarations {
    /// Creates an empty [`Declarations`] table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the [`Declarations`] of the given `module`.
    #[must_use]
    pub fn of(module: &dyn BindingModule) -> Self {
        let mut out = Self::new();
        module.declare(&mut out);
        out
    }

    /// Declares a step definition of the given [`KeywordType`].
    pub fn step(
        &mut self,
        keyword: KeywordType,
        pattern: impl Into<StepPattern>,
        fun: StepFn,
    ) -> &mut StepDeclaration {
        self.steps.push(StepDeclaration {
            keyword,
            pattern: pattern.into(),
            fun,
            params: None,
            location: None,
        });
        self.steps.last_mut().unwrap_or_else(|| unreachable!("just pushed"))
    }

    /// Declares a [Given] step definition.
    ///
    /// [Given]: https://cucumber.io/docs/gherkin/reference#given
    pub fn given(
        &mut self,
        pattern: impl Into<StepPattern>,
        fun: StepFn,
    ) -> &mut StepDeclaration {
        self.step(KeywordType::Given, pattern, fun)
    }

    /// Declares a [When] step definition.
    ///
    /// [When]: https://cucumber.io/docs/gherkin/reference#when
    pub fn when(
        &mut self,
        pattern: impl Into<StepPattern>,
        fun: StepFn,
    ) -> &mut StepDeclaration {
        self.step(KeywordType::When, pattern, fun)
    }

    /// Declares a [Then] step definition.
    ///
    /// [Then]: https://cucumber.io/docs/gherkin/reference#then
    pub fn then(
        &mut self,
        pattern: impl Into<StepPattern>,
        fun: StepFn,
    ) -> &mut StepDeclaration {
        self.step(KeywordType::Then, pattern, fun)
    }

    /// Declares a step definition matching steps of any keyword type.
    pub fn any(
        &mut self,
        pattern: impl Into<StepPattern>,
        fun: StepFn,
    ) -> &mut StepDeclaration {
        self.step(KeywordType::Any, pattern, fun)
    }

    /// Declares a hook for the given [`HookType`].
    pub fn hook(&mut self, ty: HookType, fun: HookFn) -> &mut HookDeclaration {
        self.push_hook(Trigger::Typed(ty), fun)
    }

    /// Declares a hook for a trigger given by name (`"before_scenario"`,
    /// `"AfterFeature"`, etc).
    ///
    /// Unknown names fail the [`Registry`] build.
    ///
    /// [`Registry`]: super::Registry
    pub fn hook_named(
        &mut self,
        trigger: &'static str,
        fun: HookFn,
    ) -> &mut HookDeclaration {
        self.push_hook(Trigger::Named(trigger), fun)
    }

    fn push_hook(&mut self, trigger: Trigger, fun: HookFn) -> &mut HookDeclaration {
        self.hooks.push(HookDeclaration {
            trigger,
            fun,
            priority: DEFAULT_HOOK_PRIORITY,
            tags: Vec::new(),
            location: None,
        });
        self.hooks.last_mut().unwrap_or_else(|| unreachable!("just pushed"))
    }
}

impl From<&'static str> for StepPattern {
    fn from(re: &'static str) -> Self {
        Self::Regex(re)
    }
}

/// Process-wide registration of a [`BindingModule`], collected by
/// [`inventory`].
#[derive(Clone, Copy)]
pub struct ModuleRegistration {
    module: &'static dyn BindingModule,
}

impl ModuleRegistration {
    /// Creates a new [`ModuleRegistration`].
    #[must_use]
    pub const fn new(module: &'static dyn BindingModule) -> Self {
        Self { module }
    }

    /// Returns the registered [`BindingModule`].
    #[must_use]
    pub fn module(&self) -> ModuleRef {
        Arc::new(self.module)
    }
}

inventory::collect!(ModuleRegistration);

/// Registers a [`BindingModule`] process-wide, making it visible to
/// [`discovered()`] and [`InventoryLoader`].
///
/// ```rust
/// # use cucumber_engine::binding::Declarations;
/// fn declare(_: &mut Declarations) {}
///
/// cucumber_engine::submit_module!("my_steps", declare);
/// ```
#[macro_export]
macro_rules! submit_module {
    ($id:expr, $declare:path $(,)?) => {
        const _: () = {
            static MODULE: $crate::binding::FnModule =
                $crate::binding::FnModule::new($id, $declare);

            $crate::private::inventory::submit! {
                $crate::binding::ModuleRegistration::new(&MODULE)
            }
        };
    };
}

/// Returns all the [`BindingModule`]s registered with [`submit_module!`].
///
/// [`submit_module!`]: crate::submit_module
#[must_use]
pub fn discovered() -> Vec<ModuleRef> {
    inventory::iter::<ModuleRegistration>
        .into_iter()
        .map(ModuleRegistration::module)
        .collect()
}

/// Resolver of [`BindingModule`]s by their identifiers, used for additional
/// step modules listed in the configuration.
pub trait ModuleLoader: Send + Sync {
    /// Loads the [`BindingModule`] identified by `id`, if known.
    fn load(&self, id: &str) -> Option<ModuleRef>;
}

/// [`ModuleLoader`] searching the [`submit_module!`] registrations.
///
/// [`submit_module!`]: crate::submit_module
#[derive(Clone, Copy, Debug, Default)]
pub struct InventoryLoader;

impl ModuleLoader for InventoryLoader {
    fn load(&self, id: &str) -> Option<ModuleRef> {
        inventory::iter::<ModuleRegistration>
            .into_iter()
            .find(|reg| reg.module.id() == id)
            .map(ModuleRegistration::module)
    }
}

/// [`ModuleLoader`] backed by an explicit table.
#[derive(Clone, Default)]
pub struct StaticLoader {
    modules: HashMap<ModuleId, ModuleRef>,
}

impl StaticLoader {
    /// Creates an empty [`StaticLoader`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the given `module` to this [`StaticLoader`].
    #[must_use]
    pub fn with(mut self, module: ModuleRef) -> Self {
        _ = self.modules.insert(module.id(), module);
        self
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, id: &str) -> Option<ModuleRef> {
        self.modules.get(id).cloned()
    }
}
