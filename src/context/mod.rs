// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scoped state available to bindings.
//!
//! A runner owns a single [`ContextStack`]: one [`RunContext`] for its whole
//! lifetime, a [`FeatureContext`] per feature and a [`ScenarioContext`] per
//! scenario, each with its own [`DependencyScope`] nested into the previous
//! one.

mod feature;
mod info;
mod run;
mod scenario;
mod scope;
mod stack;
mod store;

pub use self::{
    feature::FeatureContext,
    info::{FeatureInfo, ScenarioInfo},
    run::RunContext,
    scenario::ScenarioContext,
    scope::{DependencyScope, ScopeLevel},
    stack::ContextStack,
    store::Store,
};
