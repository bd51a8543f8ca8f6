// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`ContextStack`] of the nested run, feature and scenario contexts.

use std::{any::Any, sync::Arc};

use super::{
    DependencyScope, FeatureContext, FeatureInfo, RunContext, ScenarioContext,
    ScenarioInfo, ScopeLevel,
};
use crate::{engine::EngineState, error::InvalidLifecycleState};

/// Nested contexts of a single runner, handed to every binding.
///
/// A [`ScenarioContext`] may only live inside a [`FeatureContext`], and at
/// most one of each is live at any time.
#[derive(Debug)]
pub struct ContextStack {
    /// Context of the whole run.
    run: RunContext,

    /// Context of the current feature, if any.
    feature: Option<FeatureContext>,

    /// Context of the current scenario, if any.
    scenario: Option<ScenarioContext>,
}

impl ContextStack {
    /// Creates a new [`ContextStack`] with only a [`RunContext`] bound to the
    /// runner's `scope`.
    #[must_use]
    pub fn new(scope: Arc<DependencyScope>) -> Self {
        Self { run: RunContext::new(scope), feature: None, scenario: None }
    }

    /// Returns the state implied by the live contexts.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        if self.scenario.is_some() {
            EngineState::ScenarioActive
        } else if self.feature.is_some() {
            EngineState::FeatureActive
        } else {
            EngineState::RunActive
        }
    }

    /// Returns the [`RunContext`].
    #[must_use]
    pub const fn run(&self) -> &RunContext {
        &self.run
    }

    /// Returns the mutable [`RunContext`].
    pub fn run_mut(&mut self) -> &mut RunContext {
        &mut self.run
    }

    /// Returns the live [`FeatureContext`].
    ///
    /// # Errors
    ///
    /// If no feature is running.
    pub fn feature(&self) -> Result<&FeatureContext, InvalidLifecycleState> {
        let state = self.state();
        self.feature
            .as_ref()
            .ok_or(InvalidLifecycleState::new("feature", state))
    }

    /// Returns the live mutable [`FeatureContext`].
    ///
    /// # Errors
    ///
    /// If no feature is running.
    pub fn feature_mut(
        &mut self,
    ) -> Result<&mut FeatureContext, InvalidLifecycleState> {
        let state = self.state();
        self.feature
            .as_mut()
            .ok_or(InvalidLifecycleState::new("feature_mut", state))
    }

    /// Returns the live [`ScenarioContext`].
    ///
    /// # Errors
    ///
    /// If no scenario is running.
    pub fn scenario(&self) -> Result<&ScenarioContext, InvalidLifecycleState> {
        let state = self.state();
        self.scenario
            .as_ref()
            .ok_or(InvalidLifecycleState::new("scenario", state))
    }

    /// Returns the live mutable [`ScenarioContext`].
    ///
    /// # Errors
    ///
    /// If no scenario is running.
    pub fn scenario_mut(
        &mut self,
    ) -> Result<&mut ScenarioContext, InvalidLifecycleState> {
        let state = self.state();
        self.scenario
            .as_mut()
            .ok_or(InvalidLifecycleState::new("scenario_mut", state))
    }

    /// Returns the innermost live dependency scope.
    #[must_use]
    pub fn scope(&self) -> &Arc<DependencyScope> {
        self.scenario.as_ref().map_or_else(
            || self.feature.as_ref().map_or(self.run.scope(), |f| f.scope()),
            ScenarioContext::scope,
        )
    }

    /// Resolves an instance of `T` from the innermost live dependency scope,
    /// creating it there if none is visible.
    #[must_use]
    pub fn resolve<T: Any + Default + Send + Sync>(&self) -> Arc<T> {
        self.scope().resolve()
    }

    /// Enters a new feature.
    ///
    /// A failure recorded on the [`RunContext`] is inherited, so the
    /// feature's scenarios won't execute steps.
    pub(crate) fn push_feature(
        &mut self,
        info: FeatureInfo,
    ) -> Result<&mut FeatureContext, InvalidLifecycleState> {
        if self.feature.is_some() {
            return Err(InvalidLifecycleState::new("push_feature", self.state()));
        }
        let mut feature =
            FeatureContext::new(info, self.run.scope().child(ScopeLevel::Feature));
        if let Some(e) = self.run.error() {
            feature.set_error(e.clone());
        }
        Ok(self.feature.insert(feature))
    }

    /// Leaves the current feature.
    pub(crate) fn pop_feature(
        &mut self,
    ) -> Result<FeatureContext, InvalidLifecycleState> {
        if self.scenario.is_some() {
            return Err(InvalidLifecycleState::new("pop_feature", self.state()));
        }
        let state = self.state();
        self.feature
            .take()
            .ok_or(InvalidLifecycleState::new("pop_feature", state))
    }

    /// Enters a new scenario of the current feature.
    ///
    /// A failure recorded on the [`FeatureContext`] is inherited, so the
    /// scenario won't execute steps.
    pub(crate) fn push_scenario(
        &mut self,
        info: ScenarioInfo,
    ) -> Result<&mut ScenarioContext, InvalidLifecycleState> {
        let state = self.state();
        let feature = match (&self.feature, &self.scenario) {
            (Some(f), None) => f,
            _ => return Err(InvalidLifecycleState::new("push_scenario", state)),
        };
        let mut scenario =
            ScenarioContext::new(info, feature.scope().child(ScopeLevel::Scenario));
        if let Some(e) = feature.error() {
            scenario.set_hook_error(e.clone());
        }
        Ok(self.scenario.insert(scenario))
    }

    /// Leaves the current scenario.
    pub(crate) fn pop_scenario(
        &mut self,
    ) -> Result<ScenarioContext, InvalidLifecycleState> {
        let state = self.state();
        self.scenario
            .take()
            .ok_or(InvalidLifecycleState::new("pop_scenario", state))
    }
}
