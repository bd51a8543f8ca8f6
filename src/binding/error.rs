// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors of building and querying a [`Registry`].
//!
//! [`Registry`]: super::Registry

use std::fmt;

use derive_more::with_trait::{Display, Error};
use itertools::Itertools as _;

use super::{HashableRegex, Location, ModuleId};

/// Error of a step text matching multiple [`Binding`]s of a [`Registry`].
///
/// [`Binding`]: super::Binding
/// [`Registry`]: super::Registry
#[derive(Clone, Debug, Error)]
pub struct AmbiguousMatchError {
    /// Text of the step being matched.
    pub step: String,

    /// Patterns the step matches, sorted.
    pub possible_matches: Vec<(HashableRegex, Option<Location>)>,
}

impl AmbiguousMatchError {
    /// Creates a new [`AmbiguousMatchError`], sorting the `possible_matches`.
    #[must_use]
    pub fn new(
        step: impl Into<String>,
        possible_matches: impl IntoIterator<Item = (HashableRegex, Option<Location>)>,
    ) -> Self {
        Self {
            step: step.into(),
            possible_matches: possible_matches.into_iter().sorted().collect(),
        }
    }

    /// Returns an iterator over the patterns that matched.
    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.possible_matches.iter().map(|(re, _)| re.as_str())
    }
}

impl fmt::Display for AmbiguousMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` is ambiguous. Possible matches:", self.step)?;
        for (re, loc) in &self.possible_matches {
            write!(f, "\n{re}")?;
            if let Some(loc) = loc {
                write!(f, " --> {loc}")?;
            }
        }
        Ok(())
    }
}

/// Single problem found while discovering bindings.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum DiscoveryIssue {
    /// Step pattern doesn't compile.
    #[display("module `{module}`: invalid step pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Module declaring the pattern.
        module: ModuleId,

        /// Pattern as declared.
        pattern: String,

        /// Compiler's explanation.
        reason: String,
    },

    /// Hook declares a trigger point that doesn't exist.
    #[display("module `{module}`: unknown hook trigger `{trigger}`")]
    UnknownHookTrigger {
        /// Module declaring the hook.
        module: ModuleId,

        /// Trigger as declared.
        trigger: String,
    },

    /// Additional module identifier couldn't be loaded.
    #[display("unknown binding module `{id}`")]
    UnknownModule {
        /// Identifier that failed to load.
        id: String,
    },
}

/// Aggregated error of discovering bindings.
///
/// Holds every [`DiscoveryIssue`] found, not only the first one.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct DiscoveryError {
    /// All the issues found.
    pub issues: Vec<DiscoveryIssue>,
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} binding discovery error(s):", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}
