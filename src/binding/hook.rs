// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lifecycle hooks.

use std::str::FromStr;

use derive_more::with_trait::{Debug, Display};

use super::{HookFn, Location, ModuleId};

/// Priority a [`Hook`] gets unless declared otherwise.
pub const DEFAULT_HOOK_PRIORITY: i32 = 10_000;

/// Lifecycle boundary a [`Hook`] is fired at.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum HookType {
    /// Once per process, before the first feature.
    BeforeTestRun,

    /// Once per process, after the last feature.
    AfterTestRun,

    /// Before every feature.
    BeforeFeature,

    /// After every feature.
    AfterFeature,

    /// Before every scenario.
    BeforeScenario,

    /// After every scenario.
    AfterScenario,

    /// Before every invoked step.
    BeforeStep,

    /// After every invoked step.
    AfterStep,
}

impl HookType {
    /// All the [`HookType`]s.
    pub const ALL: [Self; 8] = [
        Self::BeforeTestRun,
        Self::AfterTestRun,
        Self::BeforeFeature,
        Self::AfterFeature,
        Self::BeforeScenario,
        Self::AfterScenario,
        Self::BeforeStep,
        Self::AfterStep,
    ];

    /// Indicates whether this hook guards entry into its scope.
    #[must_use]
    pub const fn is_before(self) -> bool {
        matches!(
            self,
            Self::BeforeTestRun
                | Self::BeforeFeature
                | Self::BeforeScenario
                | Self::BeforeStep,
        )
    }
}

/// Error of parsing an unrecognized [`HookType`] name.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display("unknown hook trigger `{_0}`")]
pub struct UnknownTrigger(pub String);

impl std::error::Error for UnknownTrigger {}

impl FromStr for HookType {
    type Err = UnknownTrigger;

    /// Accepts both `BeforeScenario` and `before_scenario` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('_', "").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ty| ty.to_string().to_ascii_lowercase() == normalized)
            .ok_or_else(|| UnknownTrigger(s.to_owned()))
    }
}

/// Hook binding fired at a lifecycle boundary rather than matched against
/// step text.
#[derive(Clone, Debug)]
pub struct Hook {
    /// Boundary this [`Hook`] fires at.
    pub ty: HookType,

    /// Lower runs first.
    pub priority: i32,

    /// Tags restricting this [`Hook`]. Empty means unrestricted.
    pub tags: Vec<&'static str>,

    /// Hook [`fn`] itself.
    #[debug("{fun:p}")]
    pub fun: HookFn,

    /// [`Location`] of the [`Hook::fun`], if known.
    pub location: Option<Location>,

    /// Module this [`Hook`] was declared in.
    pub module: ModuleId,
}

impl Hook {
    /// Indicates whether this [`Hook`] applies to a scope carrying the
    /// given `tags`.
    ///
    /// Leading `@` is ignored on both sides.
    pub fn applies_to<'t, I>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = &'t str>,
    {
        if self.tags.is_empty() {
            return true;
        }
        let normalize = |t: &'t str| t.trim_start_matches('@');
        tags.into_iter().map(normalize).any(|tag| {
            self.tags.iter().any(|own| own.trim_start_matches('@') == tag)
        })
    }
}
