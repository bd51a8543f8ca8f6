use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use cucumber_engine::{
    binding::{Declarations, FnModule, HookType, KeywordType, Registry},
    context::{FeatureInfo, ScenarioInfo},
    convert::{Arguments, ParamType, Table},
    outcome::{StepError, StepOutcome},
    pending, Configuration, ContextStack, EngineError, EngineState,
    ExecutionEngine, ScenarioStatus, StepKeyword, StepPolicy, StepResult,
};
use futures::{future::LocalBoxFuture, FutureExt as _};

fn engine(
    declarations: fn(&mut Declarations),
    config: Configuration,
) -> ExecutionEngine {
    let module = FnModule::new("lifecycle", declarations).into_ref();
    let registry = Registry::build(&[module]).unwrap();
    ExecutionEngine::new(Arc::new(registry), Arc::new(config))
}

async fn start(engine: &mut ExecutionEngine, tags: &[&str]) {
    engine.on_test_run_start().await.unwrap();
    engine
        .on_feature_start(FeatureInfo::new("Eating"))
        .await
        .unwrap();
    engine
        .on_scenario_start(ScenarioInfo::new("Eat").tags(tags.iter().copied()))
        .await
        .unwrap();
}

fn log(ctx: &mut ContextStack, entry: &str) {
    ctx.run_mut()
        .get_or_default::<Vec<String>>("log")
        .push(entry.to_owned());
}

fn logged(engine: &ExecutionEngine) -> Vec<String> {
    engine
        .contexts()
        .run()
        .get::<Vec<String>>("log")
        .cloned()
        .unwrap_or_default()
}

macro_rules! logging_hook {
    ($name:ident, $entry:literal) => {
        fn $name(ctx: &mut ContextStack) -> LocalBoxFuture<'_, StepResult> {
            async move {
                log(ctx, $entry);
                Ok(())
            }
            .boxed_local()
        }
    };
}

macro_rules! logging_step {
    ($name:ident, $entry:literal) => {
        fn $name(
            ctx: &mut ContextStack,
            _: Arguments,
        ) -> LocalBoxFuture<'_, StepResult> {
            async move {
                log(ctx, $entry);
                Ok(())
            }
            .boxed_local()
        }
    };
}

logging_step!(passing, "step");
logging_step!(eat_when, "when");
logging_step!(eat_then, "then");

fn failing(_: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
    async { Err(anyhow::anyhow!("not hungry").into()) }.boxed_local()
}

fn exploding(_: &mut ContextStack, args: Arguments) -> LocalBoxFuture<'_, StepResult> {
    async move {
        assert!(!args.is_empty(), "boom");
        Ok(())
    }
    .boxed_local()
}

fn unfinished(ctx: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
    async move {
        ctx.scenario_mut()?.set("before", true);
        pending()?;
        ctx.scenario_mut()?.set("after", true);
        Ok(())
    }
    .boxed_local()
}

fn counting(ctx: &mut ContextStack, args: Arguments) -> LocalBoxFuture<'_, StepResult> {
    async move {
        let count: i64 = args.get(0)?;
        let table: Table = args.get(1)?;
        ctx.scenario_mut()?.set("count", count);
        ctx.scenario_mut()?.set("rows", table.rows().len());
        Ok(())
    }
    .boxed_local()
}

fn declare(steps: &mut Declarations) {
    _ = steps.given("I am hungry", passing);
    _ = steps.when("I eat", eat_when);
    _ = steps.then("I eat", eat_then);
    _ = steps.when("I fail", failing);
    _ = steps.when("it explodes", exploding);
    _ = steps.when("I am not done yet", unfinished);
    _ = steps
        .given(r"I have (\d+) cucumbers:", counting)
        .params([ParamType::Int, ParamType::Table]);
}

#[tokio::test]
async fn undefined_step_is_recorded_not_thrown() {
    let mut engine = engine(declare, Configuration::default());
    start(&mut engine, &[]).await;

    let outcome = engine
        .step(StepKeyword::Given, "I am full", None, None)
        .await
        .unwrap();

    assert!(matches!(outcome, StepOutcome::Undefined));
    assert_eq!(
        engine.on_after_last_step().await.unwrap(),
        ScenarioStatus::UndefinedStep,
    );
}

static AMBIGUOUS_CALLS: AtomicUsize = AtomicUsize::new(0);

fn ambiguous_one(_: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
    async {
        _ = AMBIGUOUS_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    .boxed_local()
}

fn ambiguous_two(_: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
    async {
        _ = AMBIGUOUS_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    .boxed_local()
}

#[tokio::test]
async fn ambiguous_step_invokes_no_candidate() {
    let mut engine = engine(
        |steps| {
            _ = steps.given(r"I have \d+ cucumbers", ambiguous_one);
            _ = steps.any(r"I have (\d+) cucumbers", ambiguous_two);
        },
        Configuration::default(),
    );
    start(&mut engine, &[]).await;

    let outcome = engine
        .step(StepKeyword::Given, "I have 5 cucumbers", None, None)
        .await
        .unwrap();

    let StepOutcome::Ambiguous(err) = outcome else {
        panic!("expected an ambiguous outcome, got {outcome:?}");
    };
    assert_eq!(err.possible_matches.len(), 2);
    assert_eq!(AMBIGUOUS_CALLS.load(Ordering::SeqCst), 0);
    assert_eq!(
        engine.on_after_last_step().await.unwrap(),
        ScenarioStatus::BindingError,
    );
}

#[tokio::test]
async fn pending_short_circuits_the_binding() {
    let mut engine = engine(declare, Configuration::default());
    start(&mut engine, &[]).await;

    let outcome = engine
        .step(StepKeyword::When, "I am not done yet", None, None)
        .await
        .unwrap();
    assert!(matches!(outcome, StepOutcome::Pending));

    let scenario = engine.contexts().scenario().unwrap();
    assert_eq!(scenario.get::<bool>("before"), Some(&true));
    assert!(!scenario.contains_key("after"));

    let next = engine
        .step(StepKeyword::Then, "I eat", None, None)
        .await
        .unwrap();
    assert!(matches!(next, StepOutcome::Skipped));

    let status = engine.on_after_last_step().await.unwrap();
    assert_eq!(status, ScenarioStatus::StepDefinitionPending);
    assert!(!status.is_error(false));
    assert!(status.is_error(true));
}

#[tokio::test]
async fn step_outside_scenario_violates_lifecycle() {
    let mut engine = engine(declare, Configuration::default());

    let err = engine
        .step(StepKeyword::Given, "I am hungry", None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidLifecycleState(e)
            if e.operation == "step" && e.state == EngineState::Idle,
    ));

    engine.on_test_run_start().await.unwrap();
    engine.on_feature_start(FeatureInfo::new("Eating")).await.unwrap();

    let err = engine
        .step(StepKeyword::Given, "I am hungry", None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidLifecycleState(e)
            if e.state == EngineState::FeatureActive,
    ));
    assert!(engine.on_feature_start(FeatureInfo::new("Nested")).await.is_err());
    assert!(engine.on_test_run_end().await.is_err());
}

static SCENARIO_ENDS: AtomicUsize = AtomicUsize::new(0);

fn count_scenario_end(_: &mut ContextStack) -> LocalBoxFuture<'_, StepResult> {
    async {
        _ = SCENARIO_ENDS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    .boxed_local()
}

#[tokio::test]
async fn teardown_runs_once_after_panic() {
    let mut engine = engine(
        |steps| {
            declare(steps);
            _ = steps.hook(HookType::AfterScenario, count_scenario_end);
        },
        Configuration::default(),
    );
    start(&mut engine, &[]).await;

    let outcome = engine
        .step(StepKeyword::When, "it explodes", None, None)
        .await
        .unwrap();
    let StepOutcome::Failed(StepError::Panic(msg)) = &outcome else {
        panic!("expected a panic, got {outcome:?}");
    };
    assert_eq!(msg, "boom");

    let ended = engine.on_scenario_end().await.unwrap();
    assert_eq!(SCENARIO_ENDS.load(Ordering::SeqCst), 1);
    assert_eq!(ended.status(), ScenarioStatus::TestError);
    assert_eq!(ended.steps().len(), 1);
    assert_eq!(engine.state(), EngineState::FeatureActive);
    assert!(engine.contexts().scenario().is_err());

    assert!(engine.on_scenario_end().await.is_err());
    assert_eq!(SCENARIO_ENDS.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn strict_policy_skips_after_failure() {
    let mut engine = engine(declare, Configuration::default());
    start(&mut engine, &[]).await;

    let failed = engine
        .step(StepKeyword::When, "I fail", None, None)
        .await
        .unwrap();
    let skipped = engine
        .step(StepKeyword::Then, "I eat", None, None)
        .await
        .unwrap();

    assert!(matches!(failed, StepOutcome::Failed(StepError::Failed(_))));
    assert_eq!(failed.to_string(), "Failed: not hungry");
    assert!(matches!(skipped, StepOutcome::Skipped));
    assert!(logged(&engine).is_empty());
    assert_eq!(
        engine.on_after_last_step().await.unwrap(),
        ScenarioStatus::TestError,
    );
}

#[tokio::test]
async fn lenient_policy_keeps_going() {
    let config = Configuration::default().step_policy(StepPolicy::Lenient);
    let mut engine = engine(declare, config);
    start(&mut engine, &[]).await;

    _ = engine
        .step(StepKeyword::When, "I fail", None, None)
        .await
        .unwrap();
    _ = engine
        .step(StepKeyword::Given, "I am fine", None, None)
        .await
        .unwrap();
    let passed = engine
        .step(StepKeyword::Then, "I eat", None, None)
        .await
        .unwrap();

    assert!(matches!(passed, StepOutcome::Passed));
    assert_eq!(logged(&engine), ["then"]);
    assert_eq!(
        engine.on_after_last_step().await.unwrap(),
        ScenarioStatus::TestError,
    );
}

#[tokio::test]
async fn conjunctions_inherit_keyword_type() {
    let mut engine = engine(declare, Configuration::default());
    start(&mut engine, &[]).await;

    for keyword in [StepKeyword::When, StepKeyword::And, StepKeyword::But] {
        let outcome = engine.step(keyword, "I eat", None, None).await.unwrap();
        assert!(matches!(outcome, StepOutcome::Passed));
    }
    let outcome = engine
        .step_as(KeywordType::Then, StepKeyword::And, "I eat", None, None)
        .await
        .unwrap();
    assert!(matches!(outcome, StepOutcome::Passed));

    assert_eq!(logged(&engine), ["when", "when", "when", "then"]);
    let types = engine
        .contexts()
        .scenario()
        .unwrap()
        .steps()
        .iter()
        .map(|s| s.keyword_type)
        .collect::<Vec<_>>();
    assert_eq!(
        types,
        [KeywordType::When, KeywordType::When, KeywordType::When, KeywordType::Then],
    );
}

#[tokio::test]
async fn converts_captures_and_tables() {
    let mut engine = engine(declare, Configuration::default());
    start(&mut engine, &[]).await;
    let table = Table::new([["kind"], ["pickled"], ["fresh"]]);

    let outcome = engine
        .step(StepKeyword::Given, "I have 12 cucumbers:", None, Some(&table))
        .await
        .unwrap();
    assert!(matches!(outcome, StepOutcome::Passed));

    let scenario = engine.contexts().scenario().unwrap();
    assert_eq!(scenario.get::<i64>("count"), Some(&12));
    assert_eq!(scenario.get::<usize>("rows"), Some(&2));

    let outcome = engine
        .step(StepKeyword::Given, "I have 12 cucumbers:", None, None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        StepOutcome::Failed(StepError::ArgumentConversion(_)),
    ));
}

logging_hook!(before_run, "before run");
logging_hook!(after_run, "after run");
logging_hook!(before_feature, "before feature");
logging_hook!(after_feature, "after feature");
logging_hook!(before_scenario_a, "before scenario a");
logging_hook!(before_scenario_a2, "before scenario a2");
logging_hook!(before_scenario_b, "before scenario b");
logging_hook!(before_scenario_c, "before scenario c");
logging_hook!(before_db, "before db");
logging_hook!(after_scenario, "after scenario");
logging_hook!(before_step, "before step");

fn after_step(ctx: &mut ContextStack) -> LocalBoxFuture<'_, StepResult> {
    async move {
        let failed = ctx.scenario()?.current_error().is_some();
        log(ctx, if failed { "after failed step" } else { "after step" });
        Ok(())
    }
    .boxed_local()
}

fn declare_hooks(steps: &mut Declarations) {
    declare(steps);
    _ = steps.hook(HookType::AfterTestRun, after_run);
    _ = steps.hook(HookType::BeforeTestRun, before_run);
    _ = steps.hook_named("before_feature", before_feature);
    _ = steps.hook_named("AfterFeature", after_feature);
    _ = steps.hook(HookType::BeforeScenario, before_scenario_c);
    _ = steps.hook(HookType::BeforeScenario, before_scenario_b).priority(20);
    _ = steps.hook(HookType::BeforeScenario, before_scenario_a).priority(10);
    _ = steps.hook(HookType::BeforeScenario, before_scenario_a2).priority(10);
    _ = steps
        .hook(HookType::BeforeScenario, before_db)
        .priority(1)
        .tags(["@db"]);
    _ = steps.hook(HookType::AfterScenario, after_scenario);
    _ = steps.hook(HookType::BeforeStep, before_step);
    _ = steps.hook(HookType::AfterStep, after_step);
}

#[tokio::test]
async fn hooks_fire_in_lifecycle_and_priority_order() {
    let mut engine = engine(declare_hooks, Configuration::default());
    start(&mut engine, &[]).await;

    _ = engine
        .step(StepKeyword::Given, "I am hungry", None, None)
        .await
        .unwrap();
    _ = engine
        .step(StepKeyword::When, "I fail", None, None)
        .await
        .unwrap();
    _ = engine.on_after_last_step().await.unwrap();
    _ = engine.on_scenario_end().await.unwrap();
    _ = engine.on_feature_end().await.unwrap();
    engine.on_test_run_end().await.unwrap();

    assert_eq!(
        logged(&engine),
        [
            "before run",
            "before feature",
            "before scenario a",
            "before scenario a2",
            "before scenario b",
            "before scenario c",
            "before step",
            "step",
            "after step",
            "before step",
            "after failed step",
            "after scenario",
            "after feature",
            "after run",
        ],
    );
    assert_eq!(engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn tagged_hooks_fire_only_for_matching_scopes() {
    let mut engine = engine(declare_hooks, Configuration::default());
    start(&mut engine, &["db"]).await;

    assert_eq!(
        logged(&engine)[2..4],
        ["before db".to_owned(), "before scenario a".to_owned()],
    );
}

fn failing_hook(_: &mut ContextStack) -> LocalBoxFuture<'_, StepResult> {
    async { Err(anyhow::anyhow!("no database").into()) }.boxed_local()
}

#[tokio::test]
async fn failing_before_hook_blocks_scenario() {
    let config = Configuration::default().step_policy(StepPolicy::Lenient);
    let mut engine = engine(
        |steps| {
            declare(steps);
            _ = steps.hook(HookType::BeforeScenario, failing_hook);
            _ = steps.hook(HookType::BeforeScenario, before_scenario_b);
            _ = steps.hook(HookType::AfterScenario, after_scenario);
        },
        config,
    );
    start(&mut engine, &[]).await;

    let outcome = engine
        .step(StepKeyword::Given, "I am hungry", None, None)
        .await
        .unwrap();
    assert!(matches!(outcome, StepOutcome::Skipped));
    assert_eq!(
        engine.on_after_last_step().await.unwrap(),
        ScenarioStatus::TestError,
    );

    let ended = engine.on_scenario_end().await.unwrap();
    assert!(matches!(
        ended.hook_error(),
        Some(StepError::Hook { ty: HookType::BeforeScenario, .. }),
    ));
    assert_eq!(logged(&engine), ["after scenario"]);
}

#[tokio::test]
async fn abort_tears_down_before_cancelling() {
    let mut engine = engine(declare_hooks, Configuration::default());
    start(&mut engine, &[]).await;

    let err = engine.abort().await.unwrap_err();

    assert!(matches!(err, EngineError::Cancelled));
    assert_eq!(engine.state(), EngineState::RunActive);
    assert!(logged(&engine).ends_with(&[
        "after scenario".to_owned(),
        "after feature".to_owned(),
    ]));

    engine.on_feature_start(FeatureInfo::new("Next")).await.unwrap();
    assert_eq!(
        engine.contexts().feature().unwrap().info().language.as_deref(),
        Some("en"),
    );
}

fn hanging(_: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
    futures::future::pending().boxed_local()
}

fn declare_hanging(steps: &mut Declarations) {
    _ = steps.given("I wait forever", hanging);
    _ = steps.hook(HookType::AfterScenario, after_scenario);
    _ = steps.hook(HookType::AfterFeature, after_feature);
}

#[tokio::test]
async fn abort_after_dropped_step_tears_down() {
    let mut engine = engine(declare_hanging, Configuration::default());
    start(&mut engine, &[]).await;

    let step = engine
        .step(StepKeyword::Given, "I wait forever", None, None)
        .now_or_never();
    assert!(step.is_none());
    assert_eq!(engine.state(), EngineState::StepExecuting);

    let err = engine.abort().await.unwrap_err();

    assert!(matches!(err, EngineError::Cancelled));
    assert_eq!(engine.state(), EngineState::RunActive);
    assert_eq!(logged(&engine), ["after scenario", "after feature"]);
}
