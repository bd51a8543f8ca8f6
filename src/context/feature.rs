// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`FeatureContext`] living for the duration of a single feature.

use std::sync::Arc;

use derive_more::with_trait::{Debug, Deref, DerefMut};

use super::{DependencyScope, FeatureInfo, Store};
use crate::outcome::StepError;

/// State of the feature being executed.
///
/// Everything stored here by a `BeforeFeature` hook or a background step is
/// visible to every scenario of the feature on the same runner.
#[derive(Debug, Deref, DerefMut)]
pub struct FeatureContext {
    /// Description of the feature.
    info: FeatureInfo,

    /// Child of the runner's scope.
    scope: Arc<DependencyScope>,

    /// Key/value state of the feature.
    #[deref]
    #[deref_mut]
    store: Store,

    /// Failure of a `BeforeFeature` (or `BeforeTestRun`) hook, if any.
    error: Option<StepError>,
}

impl FeatureContext {
    pub(crate) fn new(info: FeatureInfo, scope: Arc<DependencyScope>) -> Self {
        Self { info, scope, store: Store::new(), error: None }
    }

    /// Returns the description of the feature.
    #[must_use]
    pub const fn info(&self) -> &FeatureInfo {
        &self.info
    }

    /// Returns the dependency scope of the feature.
    #[must_use]
    pub const fn scope(&self) -> &Arc<DependencyScope> {
        &self.scope
    }

    /// Returns the key/value state of the feature.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the mutable key/value state of the feature.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Returns the error preventing the feature's scenarios from running
    /// steps, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(&mut self, error: StepError) {
        _ = self.error.get_or_insert(error);
    }
}
