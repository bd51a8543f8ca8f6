// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors terminating a test run.
//!
//! Everything else (failed, pending, undefined or ambiguous steps) is
//! recorded as data on the scenario and never surfaces here.

use derive_more::with_trait::{Display, Error, From};

use crate::{binding::DiscoveryError, engine::EngineState};

/// Lifecycle operation called out of order.
///
/// This is a contract violation of the host driving the engine, not a test
/// failure.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("`{operation}` is not allowed in the `{state}` state")]
pub struct InvalidLifecycleState {
    /// Name of the rejected operation.
    pub operation: &'static str,

    /// State the operation was attempted in.
    pub state: EngineState,
}

impl InvalidLifecycleState {
    /// Creates a new [`InvalidLifecycleState`] error.
    #[must_use]
    pub const fn new(operation: &'static str, state: EngineState) -> Self {
        Self { operation, state }
    }
}

/// Fatal error of the engine or the runner pool.
#[derive(Clone, Debug, Display, Error, From)]
pub enum EngineError {
    /// Lifecycle operation called out of order.
    #[display("Invalid lifecycle state: {_0}")]
    InvalidLifecycleState(InvalidLifecycleState),

    /// Binding discovery failed.
    #[display("Discovery failed: {_0}")]
    Discovery(DiscoveryError),

    /// Runner requested before the pool was initialized.
    #[display("Runner pool is not initialized")]
    #[from(ignore)]
    NotInitialized,

    /// Runner pool initialized more than once.
    #[display("Runner pool is initialized already")]
    #[from(ignore)]
    AlreadyInitialized,

    /// Host aborted the run. Teardown already happened.
    #[display("Execution was cancelled")]
    #[from(ignore)]
    Cancelled,
}

/// Result type alias using [`EngineError`].
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_operation_and_state() {
        let err = EngineError::from(InvalidLifecycleState::new(
            "step",
            EngineState::FeatureActive,
        ));

        assert_eq!(
            err.to_string(),
            "Invalid lifecycle state: `step` is not allowed in the \
             `FeatureActive` state",
        );
    }
}
