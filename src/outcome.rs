// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Outcomes of executing steps and scenarios.

use std::{any::Any, sync::Arc, time::Duration};

use derive_more::with_trait::{Display, Error, From};

use crate::{
    binding::{AmbiguousMatchError, HookType, KeywordType, StepKeyword},
    convert::ConversionError,
};

/// Early exit of a step or hook [`fn`] other than success.
///
/// Any error convertible into an [`anyhow::Error`] turns into
/// [`StepFailure::Failed`] with the `?` operator.
#[derive(Debug)]
pub enum StepFailure {
    /// Step is recognized but intentionally not implemented yet.
    Pending,

    /// Step failed.
    Failed(anyhow::Error),
}

impl<E: Into<anyhow::Error>> From<E> for StepFailure {
    fn from(err: E) -> Self {
        Self::Failed(err.into())
    }
}

/// Result of a step or hook [`fn`].
pub type StepResult = Result<(), StepFailure>;

/// Marks the current step as pending, skipping the rest of its body.
///
/// ```rust
/// # use cucumber_engine::outcome::{pending, StepResult};
/// fn body() -> StepResult {
///     pending()?;
///     unreachable!("never executed");
/// }
/// assert!(body().is_err());
/// ```
///
/// # Errors
///
/// Always, with [`StepFailure::Pending`].
pub fn pending() -> StepResult {
    Err(StepFailure::Pending)
}

/// Error recorded for a failed step or hook.
#[derive(Clone, Debug, Display, Error, From)]
pub enum StepError {
    /// Step [`fn`] returned an error.
    #[display("{_0:#}")]
    #[from(ignore)]
    Failed(#[error(not(source))] Arc<anyhow::Error>),

    /// Step [`fn`] panicked.
    #[display("Step panicked: {_0}")]
    #[from(ignore)]
    Panic(#[error(not(source))] String),

    /// Step arguments couldn't be converted into the declared types.
    #[display("{_0}")]
    ArgumentConversion(ArgumentConversionError),

    /// Hook guarding this scope failed.
    #[display("{ty} hook failed: {error}")]
    #[from(ignore)]
    Hook {
        /// Type of the failed hook.
        ty: HookType,

        /// Failure of the hook.
        error: Box<StepError>,
    },
}

impl StepError {
    /// Converts a [`catch_unwind()`] payload into a [`StepError::Panic`].
    ///
    /// [`catch_unwind()`]: std::panic::catch_unwind
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(&s) = payload.downcast_ref::<&str>() {
            s.to_owned()
        } else {
            "(Could not resolve panic payload)".to_owned()
        };
        Self::Panic(msg)
    }
}

/// Error of converting the arguments of a resolved step.
#[derive(Clone, Debug, Display, Error, From, PartialEq)]
pub enum ArgumentConversionError {
    /// Single argument failed to convert.
    #[display("{_0}")]
    Conversion(ConversionError),

    /// Number of arguments differs from the number of declared parameters.
    #[display("step provides {provided} argument(s), binding declares {declared}")]
    #[from(ignore)]
    CountMismatch {
        /// Arguments the step provides.
        provided: usize,

        /// Parameters the binding declares.
        declared: usize,
    },
}

/// Terminal outcome of a single step.
#[derive(Clone, Debug, Display)]
pub enum StepOutcome {
    /// Binding completed successfully.
    Passed,

    /// Binding, a step hook or argument conversion failed.
    #[display("Failed: {_0}")]
    Failed(StepError),

    /// Binding marked the step as not implemented yet.
    Pending,

    /// Step wasn't executed, because an earlier one didn't pass.
    Skipped,

    /// No binding matches the step.
    Undefined,

    /// Several bindings match the step. None of them was invoked.
    #[display("Ambiguous: {_0}")]
    Ambiguous(AmbiguousMatchError),
}

impl StepOutcome {
    /// Indicates whether this outcome stops further steps of a scenario under
    /// the strict step policy.
    #[must_use]
    pub const fn blocks_scenario(&self) -> bool {
        matches!(
            self,
            Self::Failed(_) | Self::Pending | Self::Undefined | Self::Ambiguous(_),
        )
    }
}

/// Entry of a scenario's step log.
#[derive(Clone, Debug)]
pub struct StepRecord {
    /// Keyword the step was written with.
    pub keyword: StepKeyword,

    /// Keyword type the step was resolved with.
    pub keyword_type: KeywordType,

    /// Text of the step.
    pub text: String,

    /// Outcome of the step.
    pub outcome: StepOutcome,

    /// Time spent on the step, hooks included.
    pub duration: Duration,
}

/// Overall status of a scenario, derived from its step log.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum ScenarioStatus {
    /// Every step passed.
    #[default]
    Ok,

    /// At least one step is pending, and none failed.
    StepDefinitionPending,

    /// At least one step has no binding.
    UndefinedStep,

    /// At least one step matches several bindings.
    BindingError,

    /// A step or hook failed.
    TestError,

    /// Scenario was aborted before running any step.
    Skipped,
}

impl ScenarioStatus {
    /// Severity used to combine statuses: the highest one wins.
    const fn severity(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Skipped => 1,
            Self::StepDefinitionPending => 2,
            Self::UndefinedStep => 3,
            Self::BindingError => 4,
            Self::TestError => 5,
        }
    }

    /// Returns the more severe of the two statuses.
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    /// Status contributed by a single [`StepOutcome`].
    #[must_use]
    pub const fn of(outcome: &StepOutcome) -> Self {
        match outcome {
            StepOutcome::Passed | StepOutcome::Skipped => Self::Ok,
            StepOutcome::Pending => Self::StepDefinitionPending,
            StepOutcome::Undefined => Self::UndefinedStep,
            StepOutcome::Ambiguous(_) => Self::BindingError,
            StepOutcome::Failed(_) => Self::TestError,
        }
    }

    /// Indicates whether the scenario fully passed.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Indicates whether the scenario is broken, rather than merely
    /// incomplete.
    ///
    /// `missing_or_pending_as_error` decides about pending and undefined
    /// steps.
    #[must_use]
    pub const fn is_error(self, missing_or_pending_as_error: bool) -> bool {
        match self {
            Self::Ok | Self::Skipped => false,
            Self::StepDefinitionPending | Self::UndefinedStep => {
                missing_or_pending_as_error
            }
            Self::BindingError | Self::TestError => true,
        }
    }
}
