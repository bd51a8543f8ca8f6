// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Gate firing test run hooks once per [`RunnerPool`].
//!
//! [`RunnerPool`]: super::RunnerPool

use derive_more::with_trait::Debug;
use futures::lock::{Mutex, MutexGuard};

use crate::outcome::StepError;

/// Gate shared by every engine of a pool, so `BeforeTestRun` hooks fire
/// for the first engine starting its run, and `AfterTestRun` ones exactly
/// once.
///
/// A standalone gate fires `AfterTestRun` hooks when its engine ends the run.
/// A [deferred](RunHookGate::deferred) one leaves them to its owner, as
/// engines of a pool are created lazily and another one may still start.
#[derive(Debug, Default)]
pub struct RunHookGate {
    /// State of the whole run.
    #[debug(ignore)]
    state: Mutex<RunState>,

    /// Whether `AfterTestRun` hooks are fired by the owner of this gate
    /// rather than by engines ending their runs.
    defers_end: bool,
}

/// State of the whole run, as seen by a [`RunHookGate`].
#[derive(Debug, Default)]
pub(crate) struct RunState {
    /// Whether `BeforeTestRun` hooks have fired.
    pub(crate) started: bool,

    /// Whether `AfterTestRun` hooks have fired.
    pub(crate) finished: bool,

    /// Number of engines with an active run.
    pub(crate) active: usize,

    /// Failure of the `BeforeTestRun` hooks, shared by every engine.
    pub(crate) before_error: Option<StepError>,
}

impl RunHookGate {
    /// Creates a new closed [`RunHookGate`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new closed [`RunHookGate`] whose engines never fire
    /// `AfterTestRun` hooks on their own.
    #[must_use]
    pub fn deferred() -> Self {
        Self { defers_end: true, ..Self::default() }
    }

    /// Indicates whether engines leave `AfterTestRun` hooks to the owner of
    /// this gate.
    #[must_use]
    pub const fn defers_end(&self) -> bool {
        self.defers_end
    }

    /// Locks the run state until the returned guard is dropped.
    ///
    /// Held while run hooks execute, so concurrent engines wait for them.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().await
    }

    /// Indicates whether `BeforeTestRun` hooks have fired.
    pub async fn has_started(&self) -> bool {
        self.state.lock().await.started
    }

    /// Indicates whether `AfterTestRun` hooks have fired.
    pub async fn has_finished(&self) -> bool {
        self.state.lock().await.finished
    }

    /// Returns the number of engines with an active run.
    pub async fn active(&self) -> usize {
        self.state.lock().await.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_run_state() {
        let gate = RunHookGate::new();
        assert!(!gate.has_started().await);

        {
            let mut state = gate.lock().await;
            state.started = true;
            state.active = 2;
        }

        assert!(gate.has_started().await);
        assert!(!gate.has_finished().await);
        assert_eq!(gate.active().await, 2);
        assert!(!gate.defers_end());
    }

    #[tokio::test]
    async fn deferred_gate_starts_closed() {
        let gate = RunHookGate::deferred();

        assert!(gate.defers_end());
        assert!(!gate.has_started().await);
        assert!(!gate.has_finished().await);
        assert_eq!(gate.active().await, 0);
    }
}
