// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reference host adapter replaying parsed [`gherkin::Feature`]s through an
//! [`ExecutionEngine`].

use std::iter;

use crate::{
    binding::StepKeyword,
    context::{FeatureContext, FeatureInfo, ScenarioContext, ScenarioInfo},
    convert::Table,
    engine::ExecutionEngine,
    error::EngineError,
    outcome::ScenarioStatus,
};

/// Executed scenario.
#[derive(Debug)]
pub struct ScenarioRun {
    /// Overall status of the scenario.
    pub status: ScenarioStatus,

    /// Context of the scenario, holding its step log.
    pub context: ScenarioContext,
}

/// Executed feature.
#[derive(Debug)]
pub struct FeatureRun {
    /// Context of the feature.
    pub context: FeatureContext,

    /// Executed scenarios, in declaration order, [`gherkin::Rule`]s
    /// flattened.
    pub scenarios: Vec<ScenarioRun>,
}

impl FeatureRun {
    /// Indicates whether every scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.context.error().is_none()
            && self.scenarios.iter().all(|s| s.status.is_ok())
    }
}

/// Executes the `feature` on the `engine`, whose test run has to be started
/// already.
///
/// Backgrounds run before every scenario of their feature or rule, and
/// [Scenario Outline]s are expanded into a scenario per [Examples] row.
///
/// # Errors
///
/// On lifecycle contract violations only. Failing steps are reported in the
/// returned [`FeatureRun`].
///
/// [Examples]: https://cucumber.io/docs/gherkin/reference#examples
/// [Scenario Outline]: https://cucumber.io/docs/gherkin/reference#scenario-outline
pub async fn run_feature(
    engine: &mut ExecutionEngine,
    feature: &gherkin::Feature,
) -> Result<FeatureRun, EngineError> {
    engine.on_feature_start(FeatureInfo::from(feature)).await?;

    let top = feature.scenarios.iter().map(|s| (None, s));
    let ruled = feature
        .rules
        .iter()
        .flat_map(|r| r.scenarios.iter().map(move |s| (Some(r), s)));

    let mut scenarios = Vec::new();
    for (rule, scenario) in top.chain(ruled) {
        let background = feature
            .background
            .iter()
            .chain(rule.and_then(|r| r.background.as_ref()))
            .flat_map(|b| &b.steps)
            .collect::<Vec<_>>();

        for expanded in expand_outline(scenario) {
            let info = ScenarioInfo::from(&expanded)
                .inherit_tags(rule.iter().flat_map(|r| r.tags.iter().cloned()));
            let steps = background.iter().copied().chain(&expanded.steps);
            scenarios.push(run_scenario(engine, info, steps).await?);
        }
    }

    let context = engine.on_feature_end().await?;
    Ok(FeatureRun { context, scenarios })
}

/// Executes a single scenario made of the given `steps`.
///
/// The scenario is always ended, so its context is released even if a step
/// violates the lifecycle.
async fn run_scenario<'s>(
    engine: &mut ExecutionEngine,
    info: ScenarioInfo,
    steps: impl Iterator<Item = &'s gherkin::Step>,
) -> Result<ScenarioRun, EngineError> {
    engine.on_scenario_start(info).await?;

    let mut executed = Ok(());
    for step in steps {
        let table = step.table.as_ref().map(Table::from);
        if let Err(e) = engine
            .step(
                keyword_of(step),
                &step.value,
                step.docstring.as_deref(),
                table.as_ref(),
            )
            .await
        {
            executed = Err(e);
            break;
        }
    }

    let status = engine.on_after_last_step().await;
    let context = engine.on_scenario_end().await?;
    executed?;
    Ok(ScenarioRun { status: status?, context })
}

/// Returns the [`StepKeyword`] the `step` is written with.
fn keyword_of(step: &gherkin::Step) -> StepKeyword {
    match step.keyword.trim() {
        "And" => StepKeyword::And,
        "But" => StepKeyword::But,
        _ => step.ty.into(),
    }
}

/// Expands a [Scenario Outline] into a scenario per [Examples] row,
/// substituting `<placeholder>`s in names, steps, doc strings and tables.
///
/// Regular scenarios are returned as is.
///
/// [Examples]: https://cucumber.io/docs/gherkin/reference#examples
/// [Scenario Outline]: https://cucumber.io/docs/gherkin/reference#scenario-outline
fn expand_outline(scenario: &gherkin::Scenario) -> Vec<gherkin::Scenario> {
    if scenario.examples.is_empty() {
        return vec![scenario.clone()];
    }

    scenario
        .examples
        .iter()
        .filter_map(|ex| {
            let (header, rows) = ex.table.as_ref()?.rows.split_first()?;
            Some(rows.iter().map(move |row| (header, row, ex)))
        })
        .flatten()
        .map(|(header, row, examples)| {
            let substitute = |text: &mut String| {
                for (name, value) in header.iter().zip(row) {
                    *text = text.replace(&format!("<{name}>"), value);
                }
            };

            let mut expanded = scenario.clone();
            expanded.examples.clear();
            expanded.tags.extend(examples.tags.iter().cloned());
            substitute(&mut expanded.name);
            for step in &mut expanded.steps {
                let cells = step
                    .table
                    .iter_mut()
                    .flat_map(|t| t.rows.iter_mut().flatten());
                for text in iter::once(&mut step.value)
                    .chain(step.docstring.as_mut())
                    .chain(cells)
                {
                    substitute(text);
                }
            }
            expanded
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTLINE: &str = "\
Feature: Hungry
  Scenario Outline: eating <eat>
    Given there are <start> cucumbers
    When I eat <eat> cucumbers
    Then I should have <left> cucumbers
      | left   |
      | <left> |

    Examples:
      | start | eat | left |
      |    12 |   5 |    7 |
      |    20 |   4 |   16 |
";

    #[test]
    fn expands_outlines() {
        let feature =
            gherkin::Feature::parse(OUTLINE, gherkin::GherkinEnv::default())
                .unwrap();

        let expanded = expand_outline(&feature.scenarios[0]);

        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].name, "eating 5");
        assert_eq!(expanded[0].steps[0].value, "there are 12 cucumbers");
        assert_eq!(expanded[1].steps[2].value, "I should have 16 cucumbers");
        assert_eq!(
            expanded[1].steps[2].table.as_ref().unwrap().rows[1],
            ["16"],
        );
        assert!(expanded.iter().all(|s| s.examples.is_empty()));
    }

    #[test]
    fn detects_conjunctions() {
        let feature = gherkin::Feature::parse(
            "Feature: F\n  Scenario: S\n    Given a\n    And b\n    But c\n",
            gherkin::GherkinEnv::default(),
        )
        .unwrap();
        let steps = &feature.scenarios[0].steps;

        assert_eq!(keyword_of(&steps[0]), StepKeyword::Given);
        assert_eq!(keyword_of(&steps[1]), StepKeyword::And);
        assert_eq!(keyword_of(&steps[2]), StepKeyword::But);
    }
}
