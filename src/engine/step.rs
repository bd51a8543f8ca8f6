// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution of a single step.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Instant};

use futures::FutureExt as _;

use super::{EngineState, ExecutionEngine};
use crate::{
    binding::{HookType, KeywordType, StepFn, StepKeyword},
    config::StepPolicy,
    convert::{Arguments, Table},
    error::EngineError,
    outcome::{StepError, StepFailure, StepOutcome, StepRecord},
    resolver::{Resolution, ResolvedStep, StepQuery},
};

impl ExecutionEngine {
    /// Executes a step of the current scenario, returning its outcome.
    ///
    /// `And`/`But` steps are matched under the keyword type of the preceding
    /// primary step.
    ///
    /// Failed, pending, undefined and ambiguous steps are recorded on the
    /// scenario and returned as [`StepOutcome`]s, never as errors.
    ///
    /// # Errors
    ///
    /// If no scenario is running.
    pub async fn step(
        &mut self,
        keyword: StepKeyword,
        text: &str,
        doc_string: Option<&str>,
        table: Option<&Table>,
    ) -> Result<StepOutcome, EngineError> {
        self.execute(None, keyword, text, doc_string, table).await
    }

    /// Executes a step of the current scenario, matching it under the given
    /// [`KeywordType`] rather than inferring one from the `keyword`.
    ///
    /// # Errors
    ///
    /// If no scenario is running.
    pub async fn step_as(
        &mut self,
        keyword_type: KeywordType,
        keyword: StepKeyword,
        text: &str,
        doc_string: Option<&str>,
        table: Option<&Table>,
    ) -> Result<StepOutcome, EngineError> {
        self.execute(Some(keyword_type), keyword, text, doc_string, table)
            .await
    }

    async fn execute(
        &mut self,
        keyword_type: Option<KeywordType>,
        keyword: StepKeyword,
        text: &str,
        doc_string: Option<&str>,
        table: Option<&Table>,
    ) -> Result<StepOutcome, EngineError> {
        self.expect_state("step", &[EngineState::ScenarioActive])?;

        let started = Instant::now();
        let scenario = self.contexts.scenario()?;
        let keyword_type =
            keyword_type.unwrap_or_else(|| keyword.resolve(scenario.last_keyword()));
        let skip = scenario.is_blocked()
            || (self.config.step_policy == StepPolicy::Strict
                && scenario.has_blocking_outcome());
        self.tracer.step_started(keyword, text);

        let outcome = if skip {
            StepOutcome::Skipped
        } else {
            self.state = EngineState::StepExecuting;
            let query = StepQuery { keyword, keyword_type, text, doc_string, table };
            let outcome = self.resolve_and_run(query).await?;
            self.state = EngineState::ScenarioActive;
            outcome
        };

        let record = StepRecord {
            keyword,
            keyword_type,
            text: text.to_owned(),
            outcome: outcome.clone(),
            duration: started.elapsed(),
        };
        self.tracer.step_finished(&record);
        self.contexts.scenario_mut()?.record(record);
        Ok(outcome)
    }

    /// Resolves the step and, if exactly one binding matches, invokes it
    /// wrapped into `BeforeStep`/`AfterStep` hooks.
    async fn resolve_and_run(
        &mut self,
        query: StepQuery<'_>,
    ) -> Result<StepOutcome, EngineError> {
        let (fun, arguments) = match self.resolver.resolve(query) {
            Ok(Resolution::Resolved(ResolvedStep { binding, arguments })) => {
                (binding.fun, arguments)
            }
            Ok(Resolution::Undefined) => return Ok(StepOutcome::Undefined),
            Ok(Resolution::Ambiguous(e)) => return Ok(StepOutcome::Ambiguous(e)),
            Err(e) => {
                return Ok(StepOutcome::Failed(StepError::ArgumentConversion(e)));
            }
        };

        let tags = self.scope_tags();
        let mut outcome = match self.fire_hooks(HookType::BeforeStep, &tags).await {
            Ok(()) => self.invoke(fun, arguments).await,
            Err(e) => StepOutcome::Failed(e),
        };

        let error = match &outcome {
            StepOutcome::Failed(e) => Some(e.clone()),
            _ => None,
        };
        self.contexts.scenario_mut()?.set_current_error(error);
        let after = self.fire_hooks(HookType::AfterStep, &tags).await;
        self.contexts.scenario_mut()?.set_current_error(None);

        if let Err(e) = after {
            if !matches!(outcome, StepOutcome::Failed(_)) {
                outcome = StepOutcome::Failed(e);
            }
        }
        Ok(outcome)
    }

    /// Invokes the step [`fn`], awaiting its completion and catching panics.
    async fn invoke(&mut self, fun: StepFn, arguments: Arguments) -> StepOutcome {
        let contexts = &mut self.contexts;
        let result = AssertUnwindSafe(async move { fun(contexts, arguments).await })
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => StepOutcome::Passed,
            Ok(Err(StepFailure::Pending)) => StepOutcome::Pending,
            Ok(Err(StepFailure::Failed(e))) => {
                StepOutcome::Failed(StepError::Failed(Arc::new(e)))
            }
            Err(panic) => StepOutcome::Failed(StepError::from_panic(&*panic)),
        }
    }
}
