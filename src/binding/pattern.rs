// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step patterns and their compiled [`Regex`] form.

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use cucumber_expressions::Expression;
use derive_more::with_trait::{Debug, Deref, Display};
use regex::Regex;

/// Source form of a step pattern, as declared by a binding.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum StepPattern {
    /// Regular expression. Anchored to the whole step text on compilation.
    #[display("{_0}")]
    Regex(&'static str),

    /// [Cucumber Expression][0].
    ///
    /// [0]: https://github.com/cucumber/cucumber-expressions
    #[display("{_0}")]
    Expression(&'static str),
}

impl StepPattern {
    /// Returns the pattern text as it was declared.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Regex(s) | Self::Expression(s) => s,
        }
    }

    /// Compiles this [`StepPattern`] into a [`HashableRegex`].
    ///
    /// # Errors
    ///
    /// With a human-readable reason if the pattern is malformed.
    pub fn compile(&self) -> Result<HashableRegex, String> {
        match self {
            Self::Regex(re) => {
                let re = re.strip_prefix('^').unwrap_or(*re);
                let re = match re.strip_suffix('$') {
                    Some(body) if !ends_with_escape(body) => body,
                    _ => re,
                };
                Regex::new(&format!("^(?:{re})$"))
                    .map(HashableRegex)
                    .map_err(|e| e.to_string())
            }
            Self::Expression(expr) => Expression::regex(expr)
                .map(HashableRegex)
                .map_err(|e| e.to_string()),
        }
    }
}

/// Checks whether the character following `s` is escaped by it.
fn ends_with_escape(s: &str) -> bool {
    s.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// [`Regex`] wrapper implementing [`Eq`], [`Ord`] and [`Hash`] by its source
/// text.
#[derive(Clone, Debug, Deref, Display)]
pub struct HashableRegex(Regex);

impl From<Regex> for HashableRegex {
    fn from(re: Regex) -> Self {
        Self(re)
    }
}

impl Hash for HashableRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_str().hash(state);
    }
}

impl PartialEq for HashableRegex {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Eq for HashableRegex {}

impl PartialOrd for HashableRegex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HashableRegex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_str().cmp(other.0.as_str())
    }
}
