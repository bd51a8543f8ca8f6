// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Process-lifetime [`RunContext`] of a single runner.

use std::sync::Arc;

use derive_more::with_trait::{Debug, Deref, DerefMut};

use super::{DependencyScope, Store};
use crate::outcome::StepError;

/// State shared by every feature and scenario executed by a runner.
#[derive(Debug, Deref, DerefMut)]
pub struct RunContext {
    /// Dependency scope of the runner.
    scope: Arc<DependencyScope>,

    /// Key/value state of the run.
    #[deref]
    #[deref_mut]
    store: Store,

    /// Failure of a `BeforeTestRun` hook, if any.
    error: Option<StepError>,
}

impl RunContext {
    /// Creates a new [`RunContext`] bound to the runner's `scope`.
    #[must_use]
    pub fn new(scope: Arc<DependencyScope>) -> Self {
        Self { scope, store: Store::new(), error: None }
    }

    /// Returns the dependency scope of the runner.
    #[must_use]
    pub const fn scope(&self) -> &Arc<DependencyScope> {
        &self.scope
    }

    /// Returns the key/value state of the run.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the mutable key/value state of the run.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Returns the failure of a `BeforeTestRun` hook, if any.
    ///
    /// While it's set, no feature of this run executes steps.
    #[must_use]
    pub const fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(&mut self, error: Option<StepError>) {
        self.error = error;
    }
}
