// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step execution engine for [Cucumber]-style BDD test runs.
//!
//! Given parsed features, the engine resolves every step text into exactly
//! one previously registered binding and invokes it, while keeping layered
//! run, feature and scenario state that bindings read and mutate.
//!
//! - [`binding`]: declaring step definitions and hooks in
//!   [`BindingModule`]s, and indexing them in a [`Registry`]
//! - [`resolver`]: resolving a step into its only binding and converted
//!   arguments
//! - [`context`]: scoped state and dependency scopes handed to bindings
//! - [`engine`]: the lifecycle state machine executing hooks and steps
//! - [`runner`]: one isolated [`Runner`] per concurrent worker, managed by
//!   a [`RunnerPool`]
//! - [`driver`]: replaying [`gherkin`] features through an engine
//!
//! # Example
//!
//! ```rust
//! use cucumber_engine::{
//!     binding::Declarations, context::{FeatureInfo, ScenarioInfo},
//!     convert::Arguments, outcome::{StepOutcome, StepResult},
//!     Configuration, ContextStack, RunnerPool, StepKeyword,
//! };
//! use futures::{executor::block_on, future::LocalBoxFuture, FutureExt as _};
//!
//! fn have(ctx: &mut ContextStack, args: Arguments) -> LocalBoxFuture<'_, StepResult> {
//!     async move {
//!         let count: i64 = args.get(0)?;
//!         ctx.scenario_mut()?.set("cucumbers", count);
//!         Ok(())
//!     }
//!     .boxed_local()
//! }
//!
//! fn declare(steps: &mut Declarations) {
//!     _ = steps
//!         .given(r"I have (\d+) cucumbers", have)
//!         .params([cucumber_engine::convert::ParamType::Int]);
//! }
//!
//! let pool = RunnerPool::new(Configuration::default());
//! pool.initialize(
//!     [cucumber_engine::binding::FnModule::new("cukes", declare).into_ref()],
//!     [],
//! )?;
//!
//! let runner = pool.current_runner()?;
//! block_on(async {
//!     let mut runner = runner.lock().await;
//!     runner.on_test_run_start().await?;
//!     runner.on_feature_start(FeatureInfo::new("Eating")).await?;
//!     runner.on_scenario_start(ScenarioInfo::new("Eat")).await?;
//!
//!     let outcome = runner
//!         .step(StepKeyword::Given, "I have 5 cucumbers", None, None)
//!         .await?;
//!     assert!(matches!(outcome, StepOutcome::Passed));
//!
//!     assert!(runner.on_after_last_step().await?.is_ok());
//!     _ = runner.on_scenario_end().await?;
//!     _ = runner.on_feature_end().await?;
//!     runner.on_test_run_end().await?;
//!     drop(runner);
//!
//!     // Fires `AfterTestRun` hooks once every runner has ended its run.
//!     pool.finish().await
//! })?;
//! # Ok::<_, cucumber_engine::EngineError>(())
//! ```
//!
//! [Cucumber]: https://cucumber.io

#![deny(nonstandard_style, trivial_casts, trivial_numeric_casts)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    future_incompatible,
    let_underscore_drop,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unused,
    unused_results
)]

pub mod binding;
pub mod config;
pub mod context;
pub mod convert;
pub mod driver;
pub mod engine;
pub mod error;
pub mod outcome;
#[doc(hidden)]
pub mod private;
pub mod resolver;
pub mod runner;
pub mod tracer;

#[doc(inline)]
pub use self::{
    binding::{
        BindingModule, Declarations, FnModule, HookType, KeywordType,
        Registry, StepKeyword,
    },
    config::{Configuration, StepPolicy},
    context::{ContextStack, FeatureContext, ScenarioContext},
    engine::{EngineState, ExecutionEngine},
    error::{EngineError, InvalidLifecycleState},
    outcome::{pending, ScenarioStatus, StepOutcome, StepResult},
    runner::{Runner, RunnerPool, WorkerId},
    tracer::{init_tracing, Tracer},
};
