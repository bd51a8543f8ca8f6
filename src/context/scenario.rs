// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`ScenarioContext`] living for the duration of a single scenario.

use std::sync::Arc;

use derive_more::with_trait::{Debug, Deref, DerefMut};

use super::{DependencyScope, ScenarioInfo, Store};
use crate::{
    binding::KeywordType,
    outcome::{ScenarioStatus, StepError, StepRecord},
};

/// State of the scenario being executed.
///
/// Reset for every scenario, so nothing stored here leaks into the next
/// one.
#[derive(Debug, Deref, DerefMut)]
pub struct ScenarioContext {
    /// Description of the scenario.
    info: ScenarioInfo,

    /// Child of the feature's scope.
    scope: Arc<DependencyScope>,

    /// Key/value state of the scenario.
    #[deref]
    #[deref_mut]
    store: Store,

    /// Log of the executed steps, in execution order.
    steps: Vec<StepRecord>,

    /// Error of the step being finished, visible to `AfterStep` hooks.
    current_error: Option<StepError>,

    /// Failure of a hook guarding this scenario.
    hook_error: Option<StepError>,

    /// Keyword type of the last primary step.
    last_keyword: Option<KeywordType>,

    /// Whether the scenario was aborted before completion.
    aborted: bool,
}

impl ScenarioContext {
    pub(crate) fn new(info: ScenarioInfo, scope: Arc<DependencyScope>) -> Self {
        Self {
            info,
            scope,
            store: Store::new(),
            steps: Vec::new(),
            current_error: None,
            hook_error: None,
            last_keyword: None,
            aborted: false,
        }
    }

    /// Returns the description of the scenario.
    #[must_use]
    pub const fn info(&self) -> &ScenarioInfo {
        &self.info
    }

    /// Returns the dependency scope of the scenario.
    #[must_use]
    pub const fn scope(&self) -> &Arc<DependencyScope> {
        &self.scope
    }

    /// Returns the key/value state of the scenario.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the mutable key/value state of the scenario.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Returns the log of the steps executed so far.
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Returns the error of the step being finished, if it failed.
    ///
    /// Set only while `AfterStep` hooks run.
    #[must_use]
    pub const fn current_error(&self) -> Option<&StepError> {
        self.current_error.as_ref()
    }

    /// Returns the failure of a hook guarding this scenario, if any.
    #[must_use]
    pub const fn hook_error(&self) -> Option<&StepError> {
        self.hook_error.as_ref()
    }

    /// Indicates whether the remaining steps can't run at all, regardless of
    /// the step policy.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.hook_error.is_some() || self.aborted
    }

    /// Indicates whether a recorded step stops further steps under the
    /// strict step policy.
    #[must_use]
    pub fn has_blocking_outcome(&self) -> bool {
        self.steps.iter().any(|s| s.outcome.blocks_scenario())
    }

    /// Computes the overall [`ScenarioStatus`] out of the step log.
    #[must_use]
    pub fn status(&self) -> ScenarioStatus {
        let base = if self.hook_error.is_some() {
            ScenarioStatus::TestError
        } else if self.aborted && self.steps.is_empty() {
            ScenarioStatus::Skipped
        } else {
            ScenarioStatus::Ok
        };
        self.steps
            .iter()
            .map(|s| ScenarioStatus::of(&s.outcome))
            .fold(base, ScenarioStatus::max)
    }

    /// Returns the keyword type of the last primary step, if any.
    #[must_use]
    pub const fn last_keyword(&self) -> Option<KeywordType> {
        self.last_keyword
    }

    pub(crate) fn record(&mut self, record: StepRecord) {
        if !matches!(record.keyword_type, KeywordType::Any) {
            self.last_keyword = Some(record.keyword_type);
        }
        self.steps.push(record);
    }

    pub(crate) fn set_current_error(&mut self, error: Option<StepError>) {
        self.current_error = error;
    }

    pub(crate) fn set_hook_error(&mut self, error: StepError) {
        _ = self.hook_error.get_or_insert(error);
    }

    pub(crate) fn abort(&mut self) {
        self.aborted = true;
    }
}
