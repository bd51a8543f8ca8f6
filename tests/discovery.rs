use cucumber_engine::{
    binding::{
        self, Declarations, DiscoveryIssue, FnModule, InventoryLoader,
        KeywordType, ModuleLoader as _, ModuleRef, Registry,
    },
    context::ContextStack,
    convert::Arguments,
    BindingModule as _, Configuration, EngineError, RunnerPool, StepResult,
    WorkerId,
};
use futures::{future::LocalBoxFuture, FutureExt as _};

fn noop(_: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
    async { Ok(()) }.boxed_local()
}

fn noop_hook(_: &mut ContextStack) -> LocalBoxFuture<'_, StepResult> {
    async { Ok(()) }.boxed_local()
}

fn discovered_steps(steps: &mut Declarations) {
    _ = steps.given("a discovered step", noop);
}

cucumber_engine::submit_module!("discovered_steps", discovered_steps);

fn primary_steps(steps: &mut Declarations) {
    _ = steps.given(r"I have (\d+) cucumbers", noop);
    _ = steps.given(r"I have (\d+) .*", noop);
    _ = steps.any("I wait", noop);
}

fn broken_steps(steps: &mut Declarations) {
    _ = steps.given("(unclosed", noop);
    _ = steps.when("fine", noop);
    _ = steps.then("also [broken", noop);
    _ = steps.hook_named("before_everything", noop_hook);
    _ = steps.hook_named("after_scenario", noop_hook);
}

fn module(id: &'static str, declare: fn(&mut Declarations)) -> ModuleRef {
    FnModule::new(id, declare).into_ref()
}

#[test]
fn submitted_modules_are_discovered() {
    assert!(binding::discovered()
        .iter()
        .any(|m| m.id() == "discovered_steps"));
    assert_eq!(
        InventoryLoader.load("discovered_steps").map(|m| m.id()),
        Some("discovered_steps"),
    );
    assert!(InventoryLoader.load("undeclared").is_none());
}

#[tokio::test]
async fn configured_modules_are_loaded_from_inventory() {
    let config =
        Configuration::default().additional_step_module("discovered_steps");
    let pool = RunnerPool::new(config);
    pool.initialize([module("primary", primary_steps)], []).unwrap();

    let runner = pool.get_runner(WorkerId(0)).unwrap();
    let runner = runner.lock().await;

    assert_eq!(runner.modules(), ["primary", "discovered_steps"]);
    assert!(runner
        .registry()
        .find(KeywordType::Given, "a discovered step")
        .unwrap()
        .is_some());
}

#[test]
fn every_issue_is_reported() {
    let err = Registry::build(&[module("broken", broken_steps)]).unwrap_err();

    assert_eq!(err.issues.len(), 3, "{err}");
    assert!(matches!(
        &err.issues[0],
        DiscoveryIssue::InvalidPattern { module: "broken", pattern, .. }
            if pattern == "(unclosed",
    ));
    assert!(matches!(
        &err.issues[1],
        DiscoveryIssue::InvalidPattern { pattern, .. } if pattern == "also [broken",
    ));
    assert_eq!(
        err.issues[2],
        DiscoveryIssue::UnknownHookTrigger {
            module: "broken",
            trigger: "before_everything".into(),
        },
    );
    assert!(err.to_string().starts_with("3 binding discovery error(s):"));
}

#[test]
fn discovery_failure_surfaces_on_every_runner_request() {
    let pool = RunnerPool::new(Configuration::default());
    pool.initialize([module("primary", primary_steps)], [module("broken", broken_steps)])
        .unwrap();

    for worker in [WorkerId(0), WorkerId(1)] {
        assert!(matches!(
            pool.get_runner(worker),
            Err(EngineError::Discovery(e)) if e.issues.len() == 3,
        ));
    }
    assert!(pool.registry().is_none());
    assert!(pool.is_empty());
}

#[test]
fn resolution_is_deterministic() {
    let modules = [module("primary", primary_steps)];
    let one = Registry::build(&modules).unwrap();
    let two = Registry::build(&modules).unwrap();

    let text = "I have 5 cucumbers";
    let first = one.find(KeywordType::Given, text).unwrap_err();
    let second = two.find(KeywordType::Given, text).unwrap_err();
    assert_eq!(first.possible_matches, second.possible_matches);
    assert_eq!(first.to_string(), second.to_string());

    for registry in [&one, &two] {
        let found = registry.find(KeywordType::Then, "I wait").unwrap().unwrap();
        assert_eq!(found.binding.pattern.as_str(), "I wait");
        assert!(registry.find(KeywordType::When, "I have").unwrap().is_none());
    }
}
