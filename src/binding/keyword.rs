// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step keywords and the keyword types [`Binding`]s are classified by.
//!
//! [`Binding`]: super::Binding

use derive_more::with_trait::Display;

/// Keyword a [Step] was written with in a feature file.
///
/// [Step]: https://cucumber.io/docs/gherkin/reference#steps
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum StepKeyword {
    /// [Given](https://cucumber.io/docs/gherkin/reference#given)
    Given,

    /// [When](https://cucumber.io/docs/gherkin/reference#when)
    When,

    /// [Then](https://cucumber.io/docs/gherkin/reference#then)
    Then,

    /// [And](https://cucumber.io/docs/gherkin/reference#and-but)
    And,

    /// [But](https://cucumber.io/docs/gherkin/reference#and-but)
    But,
}

impl StepKeyword {
    /// Returns the [`KeywordType`] of a primary keyword, or [`None`] for
    /// `And`/`But`, which continue the previous step's type.
    #[must_use]
    pub const fn primary(self) -> Option<KeywordType> {
        match self {
            Self::Given => Some(KeywordType::Given),
            Self::When => Some(KeywordType::When),
            Self::Then => Some(KeywordType::Then),
            Self::And | Self::But => None,
        }
    }

    /// Resolves this keyword into a concrete [`KeywordType`], using
    /// `previous` for `And`/`But`.
    ///
    /// A conjunction without a preceding primary step is treated as
    /// [`KeywordType::Given`].
    #[must_use]
    pub fn resolve(self, previous: Option<KeywordType>) -> KeywordType {
        self.primary()
            .or(previous)
            .unwrap_or(KeywordType::Given)
    }
}

impl From<gherkin::StepType> for StepKeyword {
    fn from(ty: gherkin::StepType) -> Self {
        match ty {
            gherkin::StepType::Given => Self::Given,
            gherkin::StepType::When => Self::When,
            gherkin::StepType::Then => Self::Then,
        }
    }
}

/// Classifier a [`Binding`] is registered under.
///
/// [`Binding`]: super::Binding
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum KeywordType {
    /// Matches only `Given` steps.
    Given,

    /// Matches only `When` steps.
    When,

    /// Matches only `Then` steps.
    Then,

    /// Wildcard matching steps of every type.
    #[display("*")]
    Any,
}

impl KeywordType {
    /// Indicates whether a [`Binding`] registered under this type may match
    /// a step of the `step` type.
    ///
    /// [`Binding`]: super::Binding
    #[must_use]
    pub fn accepts(self, step: Self) -> bool {
        self == Self::Any || step == Self::Any || self == step
    }
}
