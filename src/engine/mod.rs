// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution Engine: the lifecycle state machine driving hooks and steps of
//! a single runner.

mod hooks;
mod step;

use std::sync::Arc;

use derive_more::with_trait::Display;

use crate::{
    binding::{HookType, Registry},
    config::Configuration,
    context::{
        ContextStack, DependencyScope, FeatureContext, FeatureInfo,
        ScenarioContext, ScenarioInfo, ScopeLevel,
    },
    convert::ValueConverter,
    error::{EngineError, InvalidLifecycleState},
    outcome::ScenarioStatus,
    resolver::Resolver,
    runner::{RunHookGate, RunState, WorkerId},
    tracer::Tracer,
};

/// State of an [`ExecutionEngine`].
///
/// ```text
/// Idle -> RunActive -> FeatureActive -> ScenarioActive <-> StepExecuting
///                                             |
/// Idle <- RunActive <- FeatureActive <--------+
/// ```
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum EngineState {
    /// No run started yet, or the run has ended.
    #[default]
    Idle,

    /// Run started, no feature is executing.
    RunActive,

    /// Feature started, no scenario is executing.
    FeatureActive,

    /// Scenario started, no step is executing.
    ScenarioActive,

    /// Step is being executed.
    StepExecuting,
}

/// Engine executing features, scenarios and steps of a single runner.
///
/// Lifecycle operations must be called in order:
/// [`on_test_run_start()`], then for each feature
/// [`on_feature_start()`], then for each scenario
/// [`on_scenario_start()`], [`step()`]s, [`on_after_last_step()`] and
/// [`on_scenario_end()`], then [`on_feature_end()`], and finally
/// [`on_test_run_end()`]. Anything else fails with
/// [`InvalidLifecycleState`].
///
/// [`on_after_last_step()`]: Self::on_after_last_step
/// [`on_feature_end()`]: Self::on_feature_end
/// [`on_feature_start()`]: Self::on_feature_start
/// [`on_scenario_end()`]: Self::on_scenario_end
/// [`on_scenario_start()`]: Self::on_scenario_start
/// [`on_test_run_end()`]: Self::on_test_run_end
/// [`on_test_run_start()`]: Self::on_test_run_start
/// [`step()`]: Self::step
#[derive(Debug)]
pub struct ExecutionEngine {
    /// Current state.
    state: EngineState,

    /// Resolver of step texts.
    resolver: Resolver,

    /// Shared configuration.
    config: Arc<Configuration>,

    /// Live contexts.
    contexts: ContextStack,

    /// Test tracer of this engine's runner.
    tracer: Arc<Tracer>,

    /// Gate firing test run hooks once for all the engines sharing it.
    gate: Arc<RunHookGate>,
}

impl ExecutionEngine {
    /// Creates a standalone [`ExecutionEngine`] with its own dependency scope
    /// and test run hook gate.
    #[must_use]
    pub fn new(registry: Arc<Registry>, config: Arc<Configuration>) -> Self {
        Self::for_runner(
            WorkerId::current(),
            Resolver::new(registry),
            config,
            &DependencyScope::root().child(ScopeLevel::Runner),
            Arc::default(),
        )
    }

    /// Creates an [`ExecutionEngine`] bound to the `scope` of a runner.
    pub(crate) fn for_runner(
        worker: WorkerId,
        resolver: Resolver,
        config: Arc<Configuration>,
        scope: &Arc<DependencyScope>,
        gate: Arc<RunHookGate>,
    ) -> Self {
        let tracer = scope.register(Tracer::new(worker));
        Self {
            state: EngineState::Idle,
            resolver,
            config,
            contexts: ContextStack::new(Arc::clone(scope)),
            tracer,
            gate,
        }
    }

    /// Replaces the [`ValueConverter`] of step arguments.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.resolver =
            Resolver::with_converter(Arc::clone(self.resolver.registry()), converter);
        self
    }

    /// Returns the current [`EngineState`].
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Returns the live contexts.
    #[must_use]
    pub const fn contexts(&self) -> &ContextStack {
        &self.contexts
    }

    /// Returns the live mutable contexts.
    pub fn contexts_mut(&mut self) -> &mut ContextStack {
        &mut self.contexts
    }

    /// Returns the [`Registry`] steps are resolved against.
    #[must_use]
    pub const fn registry(&self) -> &Arc<Registry> {
        self.resolver.registry()
    }

    /// Returns the [`Configuration`] of this engine.
    #[must_use]
    pub const fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// Returns the test [`Tracer`] of this engine.
    #[must_use]
    pub const fn tracer(&self) -> &Arc<Tracer> {
        &self.tracer
    }

    /// Starts the test run.
    ///
    /// `BeforeTestRun` hooks fire only for the first engine sharing the
    /// run hook gate. Their failure blocks every feature of every such
    /// engine.
    ///
    /// # Errors
    ///
    /// If the run has started already.
    pub async fn on_test_run_start(&mut self) -> Result<(), EngineError> {
        self.expect_state("on_test_run_start", &[EngineState::Idle])?;

        let gate = Arc::clone(&self.gate);
        let mut run = gate.lock().await;
        run.active += 1;
        if !run.started {
            run.started = true;
            tracing::debug!(worker = %self.tracer.worker(), "test run started");
            run.before_error =
                self.fire_hooks(HookType::BeforeTestRun, &[]).await.err();
        }
        self.contexts.run_mut().set_error(run.before_error.clone());
        drop(run);

        self.state = EngineState::RunActive;
        Ok(())
    }

    /// Starts a feature.
    ///
    /// If the feature declares no language, the configured one is assumed.
    ///
    /// # Errors
    ///
    /// If the run hasn't started, or another feature is still running.
    pub async fn on_feature_start(
        &mut self,
        mut info: FeatureInfo,
    ) -> Result<(), EngineError> {
        self.expect_state("on_feature_start", &[EngineState::RunActive])?;

        if info.language.is_none() {
            info.language = Some(self.config.language.clone());
        }
        tracing::debug!(
            worker = %self.tracer.worker(),
            feature = %info.title,
            "feature started",
        );
        let tags = info.tags.clone();
        let blocked = self.contexts.push_feature(info)?.error().is_some();
        self.state = EngineState::FeatureActive;

        if !blocked {
            if let Err(e) = self.fire_hooks(HookType::BeforeFeature, &tags).await {
                self.contexts.feature_mut()?.set_error(e);
            }
        }
        Ok(())
    }

    /// Starts a scenario of the current feature.
    ///
    /// # Errors
    ///
    /// If no feature is running, or another scenario is still running.
    pub async fn on_scenario_start(
        &mut self,
        info: ScenarioInfo,
    ) -> Result<(), EngineError> {
        self.expect_state("on_scenario_start", &[EngineState::FeatureActive])?;

        tracing::debug!(
            worker = %self.tracer.worker(),
            scenario = %info.title,
            "scenario started",
        );
        let blocked = self.contexts.push_scenario(info)?.is_blocked();
        self.state = EngineState::ScenarioActive;

        if !blocked {
            let tags = self.scope_tags();
            if let Err(e) = self.fire_hooks(HookType::BeforeScenario, &tags).await {
                self.contexts.scenario_mut()?.set_hook_error(e);
            }
        }
        Ok(())
    }

    /// Finishes the steps of the current scenario, returning its status.
    ///
    /// # Errors
    ///
    /// If no scenario is running.
    pub async fn on_after_last_step(&mut self) -> Result<ScenarioStatus, EngineError> {
        self.expect_state("on_after_last_step", &[EngineState::ScenarioActive])?;

        let status = self.contexts.scenario()?.status();
        if status.is_error(self.config.missing_or_pending_as_error) {
            tracing::warn!(
                worker = %self.tracer.worker(),
                %status,
                "scenario didn't pass",
            );
        } else {
            tracing::debug!(
                worker = %self.tracer.worker(),
                %status,
                "scenario finished",
            );
        }
        Ok(status)
    }

    /// Ends the current scenario, returning its context.
    ///
    /// `AfterScenario` hooks always fire, and the scenario context is always
    /// released, even if the scenario failed or a step was interrupted.
    ///
    /// # Errors
    ///
    /// If no scenario is running.
    pub async fn on_scenario_end(&mut self) -> Result<ScenarioContext, EngineError> {
        self.expect_state(
            "on_scenario_end",
            &[EngineState::ScenarioActive, EngineState::StepExecuting],
        )?;

        let tags = self.scope_tags();
        let after = self.fire_hooks(HookType::AfterScenario, &tags).await;
        let mut scenario = self.contexts.pop_scenario()?;
        if let Err(e) = after {
            scenario.set_hook_error(e);
        }
        scenario.set_current_error(None);
        self.state = EngineState::FeatureActive;

        tracing::debug!(
            worker = %self.tracer.worker(),
            scenario = %scenario.info().title,
            "scenario ended",
        );
        Ok(scenario)
    }

    /// Ends the current feature, returning its context.
    ///
    /// # Errors
    ///
    /// If no feature is running, or its scenario hasn't ended.
    pub async fn on_feature_end(&mut self) -> Result<FeatureContext, EngineError> {
        self.expect_state("on_feature_end", &[EngineState::FeatureActive])?;

        let tags = self.scope_tags();
        let after = self.fire_hooks(HookType::AfterFeature, &tags).await;
        let mut feature = self.contexts.pop_feature()?;
        if let Err(e) = after {
            feature.set_error(e);
        }
        self.state = EngineState::RunActive;

        tracing::debug!(
            worker = %self.tracer.worker(),
            feature = %feature.info().title,
            "feature ended",
        );
        Ok(feature)
    }

    /// Ends the test run of this engine.
    ///
    /// `AfterTestRun` hooks fire once the last engine sharing a standalone
    /// run hook gate ends its run. A [deferred] gate leaves them to
    /// [`RunnerPool::finish()`].
    ///
    /// # Errors
    ///
    /// If the run hasn't started, or a feature is still running.
    ///
    /// [deferred]: RunHookGate::deferred
    /// [`RunnerPool::finish()`]: crate::RunnerPool::finish
    pub async fn on_test_run_end(&mut self) -> Result<(), EngineError> {
        self.expect_state("on_test_run_end", &[EngineState::RunActive])?;

        let gate = Arc::clone(&self.gate);
        let mut run = gate.lock().await;
        run.active = run.active.saturating_sub(1);
        if run.active == 0 && !gate.defers_end() {
            self.fire_after_test_run(&mut run).await;
        }
        drop(run);

        self.state = EngineState::Idle;
        Ok(())
    }

    /// Fires `AfterTestRun` hooks, unless they have fired already or the run
    /// has never started.
    pub(crate) async fn fire_after_test_run(&mut self, run: &mut RunState) {
        if !run.started || run.finished {
            return;
        }
        run.finished = true;
        if let Err(e) = self.fire_hooks(HookType::AfterTestRun, &[]).await {
            self.contexts.run_mut().set_error(Some(e));
        }
        tracing::debug!(worker = %self.tracer.worker(), "test run ended");
    }

    /// Aborts the execution, tearing down the live scenario and feature with
    /// their `After*` hooks.
    ///
    /// The run itself stays active, so the engine may execute further
    /// features.
    ///
    /// # Errors
    ///
    /// Always: [`EngineError::Cancelled`] once the teardown is complete.
    pub async fn abort(&mut self) -> Result<(), EngineError> {
        tracing::warn!(
            worker = %self.tracer.worker(),
            state = %self.state,
            "aborting",
        );

        if matches!(
            self.state,
            EngineState::ScenarioActive | EngineState::StepExecuting,
        ) {
            self.contexts.scenario_mut()?.abort();
            _ = self.on_scenario_end().await?;
        }
        if self.state == EngineState::FeatureActive {
            _ = self.on_feature_end().await?;
        }
        Err(EngineError::Cancelled)
    }

    /// Checks the current state is one of the `allowed` ones.
    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[EngineState],
    ) -> Result<(), InvalidLifecycleState> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(InvalidLifecycleState::new(operation, self.state))
        }
    }

    /// Returns the tags of the live feature and scenario.
    fn scope_tags(&self) -> Vec<String> {
        let feature = self.contexts.feature().ok().map(|f| &f.info().tags);
        let scenario = self.contexts.scenario().ok().map(|s| &s.info().tags);
        feature
            .into_iter()
            .chain(scenario)
            .flatten()
            .cloned()
            .collect()
    }
}
