// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Source locations of binding declarations.

use derive_more::with_trait::{Debug, Display};

/// Location of a binding [`fn`] in the source code.
///
/// Usually filled in with the [`location!`] macro at the declaration site.
///
/// [`location!`]: crate::location
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{path}:{line}:{column}")]
pub struct Location {
    /// Path to the file where the binding [`fn`] is declared.
    pub path: &'static str,

    /// Line of the file where the binding [`fn`] is declared.
    pub line: u32,

    /// Column of the file where the binding [`fn`] is declared.
    pub column: u32,
}

impl Location {
    /// Creates a new [`Location`].
    #[must_use]
    pub const fn new(path: &'static str, line: u32, column: u32) -> Self {
        Self { path, line, column }
    }

    /// Returns the last component of the [`Location::path`].
    #[must_use]
    pub fn filename(&self) -> &'static str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(self.path)
    }
}

/// Expands into the [`Location`] of its invocation.
#[macro_export]
macro_rules! location {
    () => {
        $crate::binding::Location::new(file!(), line!(), column!())
    };
}
