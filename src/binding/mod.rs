// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step definitions, hooks and the [`Registry`] indexing them.
//!
//! - [`module`]: binding modules and their declaration tables
//! - [`registry`]: building and querying the [`Registry`]
//! - [`hook`]: lifecycle [`Hook`]s
//! - [`keyword`]: step keywords and keyword types
//! - [`pattern`]: step patterns and their compiled form
//! - [`location`]: source locations of declarations
//! - [`error`]: ambiguity and discovery errors

pub mod error;
pub mod hook;
pub mod keyword;
pub mod location;
pub mod module;
pub mod pattern;
pub mod registry;

use futures::future::LocalBoxFuture;

use crate::{context::ContextStack, convert::Arguments, outcome::StepResult};

pub use self::{
    error::{AmbiguousMatchError, DiscoveryError, DiscoveryIssue},
    hook::{Hook, HookType, UnknownTrigger, DEFAULT_HOOK_PRIORITY},
    keyword::{KeywordType, StepKeyword},
    location::Location,
    module::{
        discovered, BindingModule, Declarations, FnModule, HookDeclaration,
        InventoryLoader, ModuleId, ModuleLoader, ModuleRef,
        ModuleRegistration, StaticLoader, StepDeclaration, Trigger,
    },
    pattern::{HashableRegex, StepPattern},
    registry::{Binding, CaptureName, Match, Registry},
};

/// Step definition [`fn`].
///
/// Receives the live contexts and the converted arguments, and returns a
/// [`LocalBoxFuture`] the engine awaits before recording the outcome.
pub type StepFn =
    for<'a> fn(&'a mut ContextStack, Arguments) -> LocalBoxFuture<'a, StepResult>;

/// Hook [`fn`].
pub type HookFn =
    for<'a> fn(&'a mut ContextStack) -> LocalBoxFuture<'a, StepResult>;
