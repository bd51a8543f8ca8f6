// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`RunnerPool`] managing one [`Runner`] per worker.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use derive_more::with_trait::Debug;
use futures::lock::Mutex as AsyncMutex;
use once_cell::sync::OnceCell;

use super::{RunHookGate, Runner, WorkerId};
use crate::{
    binding::{
        DiscoveryError, DiscoveryIssue, InventoryLoader, ModuleLoader,
        ModuleRef, Registry,
    },
    config::Configuration,
    context::{DependencyScope, ScopeLevel},
    convert::{DefaultConverter, ValueConverter},
    engine::{EngineState, ExecutionEngine},
    error::EngineError,
    resolver::Resolver,
};

/// [`Runner`] handed out by a [`RunnerPool`].
///
/// Only its own worker is supposed to lock it. The lock is asynchronous, as
/// it's held across the whole lifecycle call.
pub type SharedRunner = Arc<AsyncMutex<Runner>>;

/// Binding modules a [`RunnerPool`] is initialized with.
#[derive(Clone, Default)]
struct ModuleSet {
    /// Modules taking precedence on overrides.
    primary: Vec<ModuleRef>,

    /// Modules given explicitly or listed in the [`Configuration`].
    additional: Vec<ModuleRef>,
}

/// Manager of [`Runner`]s, keyed strictly by [`WorkerId`].
///
/// The [`Registry`] is built once, on the first [`RunnerPool::get_runner()`]
/// call, even if several workers race for it. Every [`Runner`] gets a fresh
/// dependency scope, a child of the pool's global one.
#[derive(Debug)]
pub struct RunnerPool {
    /// Configuration shared by every [`Runner`].
    config: Arc<Configuration>,

    /// Process-wide dependency scope.
    global: Arc<DependencyScope>,

    /// Loader of the additional modules listed in the [`Configuration`].
    #[debug(ignore)]
    loader: Arc<dyn ModuleLoader>,

    /// Strategy of converting step arguments.
    converter: Arc<dyn ValueConverter>,

    /// Modules set by [`RunnerPool::initialize()`].
    #[debug(ignore)]
    modules: OnceCell<ModuleSet>,

    /// Registry built out of the [`RunnerPool::modules`].
    registry: OnceCell<Arc<Registry>>,

    /// Gate of test run hooks, shared by every [`Runner`].
    gate: Arc<RunHookGate>,

    /// [`Runner`]s created so far.
    #[debug(
        "{} runner(s)",
        runners.lock().unwrap_or_else(PoisonError::into_inner).len(),
    )]
    runners: Mutex<HashMap<WorkerId, SharedRunner>>,
}

impl RunnerPool {
    /// Creates a new uninitialized [`RunnerPool`].
    ///
    /// Additional modules listed in the `config` are looked up with the
    /// [`InventoryLoader`].
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self {
            config: Arc::new(config),
            global: DependencyScope::root(),
            loader: Arc::new(InventoryLoader),
            converter: Arc::new(DefaultConverter),
            modules: OnceCell::new(),
            registry: OnceCell::new(),
            gate: Arc::new(RunHookGate::deferred()),
            runners: Mutex::default(),
        }
    }

    /// Replaces the [`ModuleLoader`] of additional modules.
    #[must_use]
    pub fn with_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Replaces the [`ValueConverter`] of step arguments.
    #[must_use]
    pub fn with_converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    /// Returns the shared [`Configuration`].
    #[must_use]
    pub const fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// Returns the process-wide dependency scope.
    #[must_use]
    pub const fn global_scope(&self) -> &Arc<DependencyScope> {
        &self.global
    }

    /// Returns the [`Registry`], if built already.
    #[must_use]
    pub fn registry(&self) -> Option<&Arc<Registry>> {
        self.registry.get()
    }

    /// Returns the gate of test run hooks.
    #[must_use]
    pub const fn gate(&self) -> &Arc<RunHookGate> {
        &self.gate
    }

    /// Initializes this [`RunnerPool`] with the `primary` modules and the
    /// `additional` ones, merged with those listed in the [`Configuration`].
    ///
    /// Modules are deduplicated by identity, and `primary` ones win pattern
    /// overrides, regardless of the order they're given in.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Discovery`] if an additional module listed in the
    ///   [`Configuration`] can't be loaded.
    /// - [`EngineError::AlreadyInitialized`] if called more than once.
    pub fn initialize(
        &self,
        primary: impl IntoIterator<Item = ModuleRef>,
        additional: impl IntoIterator<Item = ModuleRef>,
    ) -> Result<(), EngineError> {
        let mut issues = Vec::new();
        let mut additional = additional.into_iter().collect::<Vec<_>>();
        for id in &self.config.additional_step_modules {
            match self.loader.load(id) {
                Some(m) => additional.push(m),
                None => issues.push(DiscoveryIssue::UnknownModule { id: id.clone() }),
            }
        }
        if !issues.is_empty() {
            return Err(DiscoveryError { issues }.into());
        }

        let set = ModuleSet { primary: primary.into_iter().collect(), additional };
        tracing::debug!(
            primary = set.primary.len(),
            additional = set.additional.len(),
            "runner pool initialized",
        );
        self.modules
            .set(set)
            .map_err(|_| EngineError::AlreadyInitialized)
    }

    /// Returns the [`Runner`] of the calling thread's worker.
    ///
    /// # Errors
    ///
    /// See [`RunnerPool::get_runner()`].
    pub fn current_runner(&self) -> Result<SharedRunner, EngineError> {
        self.get_runner(WorkerId::current())
    }

    /// Returns the [`Runner`] of the given `worker`, creating it on first
    /// use.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotInitialized`] if [`RunnerPool::initialize()`]
    ///   wasn't called.
    /// - [`EngineError::Discovery`] if the [`Registry`] fails to build.
    pub fn get_runner(&self, worker: WorkerId) -> Result<SharedRunner, EngineError> {
        let modules = self.modules.get().ok_or(EngineError::NotInitialized)?;
        let registry = self.registry.get_or_try_init(|| {
            tracing::debug!("building binding registry");
            Registry::build_with(&modules.primary, &modules.additional)
                .map(Arc::new)
        })?;

        let mut runners =
            self.runners.lock().unwrap_or_else(PoisonError::into_inner);
        let runner = runners.entry(worker).or_insert_with(|| {
            tracing::debug!(%worker, "creating runner");
            Arc::new(AsyncMutex::new(self.create_runner(worker, registry)))
        });
        Ok(Arc::clone(runner))
    }

    /// Returns the number of [`Runner`]s created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Indicates whether no [`Runner`] has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tears down every [`Runner`]: aborts live scenarios and features, and
    /// ends their runs. `AfterTestRun` hooks fire once afterwards, when no
    /// runner has an active run anymore.
    ///
    /// Runners are dropped afterwards, so the next
    /// [`RunnerPool::get_runner()`] call creates a fresh one.
    ///
    /// # Errors
    ///
    /// If a [`Runner`] fails to tear down.
    pub async fn finish(&self) -> Result<(), EngineError> {
        let runners = self
            .runners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect::<Vec<_>>();

        let mut last = None;
        for (worker, shared) in runners {
            let mut runner = shared.lock().await;
            if !matches!(
                runner.state(),
                EngineState::Idle | EngineState::RunActive,
            ) {
                tracing::debug!(%worker, "aborting unfinished runner");
                match runner.abort().await {
                    Ok(()) | Err(EngineError::Cancelled) => {}
                    Err(e) => return Err(e),
                }
            }
            if runner.state() == EngineState::RunActive {
                runner.on_test_run_end().await?;
            }
            drop(runner);
            last = Some(shared);
        }

        if let Some(runner) = last {
            let mut runner = runner.lock().await;
            let mut run = self.gate.lock().await;
            runner.fire_after_test_run(&mut run).await;
        }
        Ok(())
    }

    fn create_runner(&self, worker: WorkerId, registry: &Arc<Registry>) -> Runner {
        let scope = self.global.child(ScopeLevel::Runner);
        let resolver =
            Resolver::with_converter(Arc::clone(registry), Arc::clone(&self.converter));
        let engine = ExecutionEngine::for_runner(
            worker,
            resolver,
            Arc::clone(&self.config),
            &scope,
            Arc::clone(&self.gate),
        );
        Runner::new(worker, engine, scope)
    }
}
