// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`tracing`] integration: the per-runner [`Tracer`] and a global
//! subscriber installer.

use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _,
    Layer as _,
};

use crate::{
    binding::{HookType, StepKeyword},
    outcome::{StepError, StepOutcome, StepRecord},
    runner::WorkerId,
};

/// Test tracer of a single runner.
///
/// Registered into the runner's dependency scope, so bindings may resolve it
/// too. Emits structured [`tracing`] events tagged with the worker.
#[derive(Debug)]
pub struct Tracer {
    /// Worker owning the runner.
    worker: WorkerId,
}

impl Tracer {
    /// Creates a new [`Tracer`] of the given `worker`.
    #[must_use]
    pub const fn new(worker: WorkerId) -> Self {
        Self { worker }
    }

    /// Returns the worker this [`Tracer`] belongs to.
    #[must_use]
    pub const fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Traces the start of a step.
    pub fn step_started(&self, keyword: StepKeyword, text: &str) {
        tracing::debug!(worker = %self.worker, %keyword, text, "step started");
    }

    /// Traces a finished step.
    pub fn step_finished(&self, record: &StepRecord) {
        let StepRecord { keyword, text, outcome, duration, .. } = record;
        match outcome {
            StepOutcome::Passed => tracing::info!(
                worker = %self.worker,
                %keyword,
                %text,
                ?duration,
                "step passed",
            ),
            StepOutcome::Skipped => tracing::info!(
                worker = %self.worker,
                %keyword,
                %text,
                "step skipped",
            ),
            StepOutcome::Pending => tracing::warn!(
                worker = %self.worker,
                %keyword,
                %text,
                ?duration,
                "step is pending",
            ),
            StepOutcome::Undefined => tracing::warn!(
                worker = %self.worker,
                %keyword,
                %text,
                "no binding matches step",
            ),
            StepOutcome::Ambiguous(e) => tracing::warn!(
                worker = %self.worker,
                %keyword,
                %text,
                error = %e,
                "step is ambiguous",
            ),
            StepOutcome::Failed(e) => tracing::warn!(
                worker = %self.worker,
                %keyword,
                %text,
                ?duration,
                error = %e,
                "step failed",
            ),
        }
    }

    /// Traces a failed hook.
    pub fn hook_failed(&self, ty: HookType, error: &StepError) {
        tracing::warn!(
            worker = %self.worker,
            hook = %ty,
            %error,
            "hook failed",
        );
    }
}

/// Installs a global [`fmt`] subscriber, filtered at [`LevelFilter::INFO`].
///
/// Does nothing if a global subscriber is installed already.
///
/// [`fmt`]: tracing_subscriber::fmt
pub fn init_tracing() {
    _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(LevelFilter::INFO))
        .try_init();
}
