// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Registry`] of all the discovered [`Binding`]s and [`Hook`]s.

use std::{collections::HashSet, iter};

use derive_more::with_trait::Debug;
use itertools::Itertools as _;

use crate::convert::ParamType;

use super::{
    AmbiguousMatchError, DiscoveryError, DiscoveryIssue, HashableRegex, Hook,
    HookType, KeywordType, Location, ModuleId, ModuleRef, StepFn, StepPattern,
    Trigger,
};

/// Name of a capturing group inside a step pattern.
pub type CaptureName = Option<String>;

/// Compiled step definition.
#[derive(Clone, Debug)]
pub struct Binding {
    /// Keyword type this [`Binding`] is registered under.
    pub keyword: KeywordType,

    /// Pattern as declared.
    pub pattern: StepPattern,

    /// Compiled [`Binding::pattern`].
    pub regex: HashableRegex,

    /// Step [`fn`].
    #[debug("{fun:p}")]
    pub fun: StepFn,

    /// Declared parameter types, if any.
    pub params: Option<Vec<ParamType>>,

    /// [`Location`] of the [`Binding::fun`].
    pub location: Option<Location>,

    /// Module this [`Binding`] was declared in.
    pub module: ModuleId,
}

/// Single [`Binding`] matched by a step text.
#[derive(Clone, Debug)]
pub struct Match<'r> {
    /// Matched [`Binding`].
    pub binding: &'r Binding,

    /// Captures of the [`Binding::regex`]. The first one is the whole match.
    pub captures: Vec<(CaptureName, String)>,
}

impl Match<'_> {
    /// Returns the capturing group values, without the whole match.
    pub fn arguments(&self) -> impl Iterator<Item = &str> + '_ {
        self.captures.iter().skip(1).map(|(_, v)| v.as_str())
    }
}

/// Immutable index of the step definitions and hooks of a set of
/// [`BindingModule`]s.
///
/// Every step text has to match exactly 1 [`Binding`]. Matching several is
/// reported as an [`AmbiguousMatchError`] and is never resolved by
/// declaration order.
///
/// [`BindingModule`]: super::BindingModule
#[derive(Clone, Debug, Default)]
pub struct Registry {
    /// Identities of the modules this [`Registry`] was built from, in
    /// precedence order.
    modules: Vec<ModuleId>,

    /// Step definitions, in declaration order.
    steps: Vec<Binding>,

    /// Hooks of every [`HookType`], sorted by priority.
    hooks: Vec<(HookType, Vec<Hook>)>,
}

impl Registry {
    /// Builds a [`Registry`] out of the given `modules`.
    ///
    /// # Errors
    ///
    /// With every malformed pattern and unknown hook trigger found.
    pub fn build(modules: &[ModuleRef]) -> Result<Self, DiscoveryError> {
        Self::build_with(modules, &[])
    }

    /// Builds a [`Registry`] out of the `primary` modules merged with the
    /// `additional` ones.
    ///
    /// Modules are deduplicated by their identity. A step definition of an
    /// `additional` module is dropped if a `primary` module declares the same
    /// pattern for the same keyword type.
    ///
    /// # Errors
    ///
    /// With every malformed pattern and unknown hook trigger found.
    pub fn build_with(
        primary: &[ModuleRef],
        additional: &[ModuleRef],
    ) -> Result<Self, DiscoveryError> {
        let mut seen = HashSet::new();
        let tagged = primary
            .iter()
            .map(|m| (m, true))
            .chain(additional.iter().map(|m| (m, false)))
            .filter(|(m, _)| seen.insert(m.id()))
            .collect::<Vec<_>>();

        let mut issues = Vec::new();
        let mut steps = Vec::new();
        let mut hooks = Vec::new();
        let mut primary_patterns = HashSet::new();

        for &(module, is_primary) in &tagged {
            let id = module.id();
            let decls = super::Declarations::of(&**module);

            for decl in decls.steps {
                let key = (decl.keyword, decl.pattern.as_str());
                if is_primary {
                    _ = primary_patterns.insert(key);
                } else if primary_patterns.contains(&key) {
                    tracing::debug!(
                        module = id,
                        pattern = decl.pattern.as_str(),
                        "step definition overridden by a primary module",
                    );
                    continue;
                }

                match decl.pattern.compile() {
                    Ok(regex) => steps.push(Binding {
                        keyword: decl.keyword,
                        pattern: decl.pattern,
                        regex,
                        fun: decl.fun,
                        params: decl.params,
                        location: decl.location,
                        module: id,
                    }),
                    Err(reason) => issues.push(DiscoveryIssue::InvalidPattern {
                        module: id,
                        pattern: decl.pattern.as_str().to_owned(),
                        reason,
                    }),
                }
            }

            for decl in decls.hooks {
                let ty = match decl.trigger {
                    Trigger::Typed(ty) => ty,
                    Trigger::Named(name) => match name.parse() {
                        Ok(ty) => ty,
                        Err(_) => {
                            issues.push(DiscoveryIssue::UnknownHookTrigger {
                                module: id,
                                trigger: name.to_owned(),
                            });
                            continue;
                        }
                    },
                };
                hooks.push(Hook {
                    ty,
                    priority: decl.priority,
                    tags: decl.tags,
                    fun: decl.fun,
                    location: decl.location,
                    module: id,
                });
            }
        }

        if !issues.is_empty() {
            return Err(DiscoveryError { issues });
        }

        // `sorted_by_key()` is stable, so equal priorities keep their
        // declaration order.
        let hooks = HookType::ALL
            .into_iter()
            .map(|ty| {
                let of_type = hooks
                    .iter()
                    .filter(|h| h.ty == ty)
                    .cloned()
                    .sorted_by_key(|h| h.priority)
                    .collect();
                (ty, of_type)
            })
            .collect();

        let modules = tagged.iter().map(|(m, _)| m.id()).collect();
        Ok(Self { modules, steps, hooks })
    }

    /// Returns identities of the modules this [`Registry`] was built from.
    #[must_use]
    pub fn modules(&self) -> &[ModuleId] {
        &self.modules
    }

    /// Returns all the step definitions of this [`Registry`].
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.steps
    }

    /// Returns the [`Hook`]s of the given [`HookType`] in firing order.
    #[must_use]
    pub fn hooks(&self, ty: HookType) -> &[Hook] {
        self.hooks
            .iter()
            .find_map(|(t, hooks)| (*t == ty).then_some(hooks.as_slice()))
            .unwrap_or_default()
    }

    /// Returns every [`Binding`] of the `keyword` type matching the `text`.
    #[must_use]
    pub fn candidates(&self, keyword: KeywordType, text: &str) -> Vec<Match<'_>> {
        self.steps
            .iter()
            .filter(|b| b.keyword.accepts(keyword))
            .filter_map(|binding| {
                let re = &binding.regex;
                let mut locs = re.capture_locations();
                let whole = re.captures_read(&mut locs, text)?;
                #[allow(clippy::string_slice)] // indices come from `text`
                let captures = re
                    .capture_names()
                    .map(|n| n.map(str::to_owned))
                    .zip(iter::once(whole.as_str().to_owned()).chain(
                        (1..locs.len()).map(|i| {
                            locs.get(i).map_or("", |(s, e)| &text[s..e]).to_owned()
                        }),
                    ))
                    .collect();
                Some(Match { binding, captures })
            })
            .collect()
    }

    /// Returns the only [`Binding`] matching the `text`, if any.
    ///
    /// # Errors
    ///
    /// If the `text` matches more than one [`Binding`].
    pub fn find(
        &self,
        keyword: KeywordType,
        text: &str,
    ) -> Result<Option<Match<'_>>, AmbiguousMatchError> {
        let mut candidates = self.candidates(keyword, text);
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            _ => Err(AmbiguousMatchError::new(
                text,
                candidates
                    .into_iter()
                    .map(|m| (m.binding.regex.clone(), m.binding.location)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::{future::LocalBoxFuture, FutureExt as _};

    use super::*;
    use crate::{
        binding::{Declarations, FnModule},
        context::ContextStack,
        convert::Arguments,
        outcome::StepResult,
    };

    fn noop(_: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
        async { Ok(()) }.boxed_local()
    }

    fn other(_: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
        async { Ok(()) }.boxed_local()
    }

    fn noop_hook(_: &mut ContextStack) -> LocalBoxFuture<'_, StepResult> {
        async { Ok(()) }.boxed_local()
    }

    fn cukes(b: &mut Declarations) {
        _ = b.given(r"I have (?P<count>\d+) cucumbers", noop);
        _ = b.when(r"I eat (\d+)( slowly)?", noop);
        _ = b.any(r"I wait", noop);
        _ = b.hook(HookType::BeforeScenario, noop_hook).priority(20);
        _ = b.hook(HookType::BeforeScenario, noop_hook).priority(5);
        _ = b.hook(HookType::BeforeScenario, noop_hook).priority(20);
    }

    fn overlapping(b: &mut Declarations) {
        _ = b.given(r"I have (\d+) cucumbers", noop);
        _ = b.given(r"I have (\d+) .*", noop);
    }

    fn broken(b: &mut Declarations) {
        _ = b.given(r"I have (\d+ cucumbers", noop);
        _ = b.then(StepPattern::Expression("I see {int"), noop);
        _ = b.hook_named("before_lunch", noop_hook);
    }

    fn module(id: ModuleId, f: fn(&mut Declarations)) -> ModuleRef {
        FnModule::new(id, f).into_ref()
    }

    #[test]
    fn finds_single_match_with_captures() {
        let reg = Registry::build(&[module("cukes", cukes)]).unwrap();

        let m = reg
            .find(KeywordType::Given, "I have 5 cucumbers")
            .unwrap()
            .unwrap();
        assert_eq!(m.captures[0], (None, "I have 5 cucumbers".to_owned()));
        assert_eq!(m.captures[1], (Some("count".to_owned()), "5".to_owned()));
        assert_eq!(m.arguments().collect::<Vec<_>>(), ["5"]);
    }

    #[test]
    fn unmatched_optional_group_is_empty() {
        let reg = Registry::build(&[module("cukes", cukes)]).unwrap();

        let m = reg.find(KeywordType::When, "I eat 3").unwrap().unwrap();
        assert_eq!(m.arguments().collect::<Vec<_>>(), ["3", ""]);
    }

    #[test]
    fn respects_keyword_type() {
        let reg = Registry::build(&[module("cukes", cukes)]).unwrap();

        assert!(reg
            .find(KeywordType::Then, "I have 5 cucumbers")
            .unwrap()
            .is_none());
        assert!(reg.find(KeywordType::Then, "I wait").unwrap().is_some());
        assert!(reg.find(KeywordType::Given, "I wait").unwrap().is_some());
    }

    #[test]
    fn reports_every_ambiguous_candidate() {
        let reg = Registry::build(&[module("overlapping", overlapping)]).unwrap();

        let err = reg
            .find(KeywordType::Given, "I have 5 cucumbers")
            .unwrap_err();
        assert_eq!(err.possible_matches.len(), 2);
        assert_eq!(err.step, "I have 5 cucumbers");
    }

    #[test]
    fn aggregates_discovery_issues() {
        let err = Registry::build(&[module("broken", broken)]).unwrap_err();

        assert_eq!(err.issues.len(), 3);
        assert!(matches!(
            &err.issues[2],
            DiscoveryIssue::UnknownHookTrigger { trigger, .. }
                if trigger == "before_lunch",
        ));
    }

    #[test]
    fn hooks_sorted_by_priority_stably() {
        let reg = Registry::build(&[module("cukes", cukes)]).unwrap();

        let prios = reg
            .hooks(HookType::BeforeScenario)
            .iter()
            .map(|h| h.priority)
            .collect::<Vec<_>>();
        assert_eq!(prios, [5, 20, 20]);
        assert!(reg.hooks(HookType::AfterTestRun).is_empty());
    }

    #[test]
    fn deduplicates_modules_by_identity() {
        let m = module("cukes", cukes);
        let reg = Registry::build_with(&[m.clone(), m.clone()], &[m]).unwrap();

        assert_eq!(reg.modules(), ["cukes"]);
        assert_eq!(reg.bindings().len(), 3);
    }

    #[test]
    fn primary_overrides_additional_pattern() {
        fn primary(b: &mut Declarations) {
            _ = b.given(r"I have (\d+) cucumbers", noop);
        }
        fn extra(b: &mut Declarations) {
            _ = b.given(r"I have (\d+) cucumbers", other);
            _ = b.then(r"I have (\d+) cucumbers", other);
        }

        let reg = Registry::build_with(
            &[module("primary", primary)],
            &[module("extra", extra)],
        )
        .unwrap();

        assert_eq!(reg.modules(), ["primary", "extra"]);
        let m = reg
            .find(KeywordType::Given, "I have 2 cucumbers")
            .unwrap()
            .unwrap();
        assert_eq!(m.binding.module, "primary");
        assert_eq!(reg.bindings().len(), 2);
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let modules = [module("cukes", cukes), module("overlapping", overlapping)];
        let first = Registry::build(&modules).unwrap();
        let second = Registry::build(&modules).unwrap();

        for text in ["I have 5 cucumbers", "I eat 2 slowly", "I wait", "nope"] {
            let describe = |reg: &Registry| {
                reg.candidates(KeywordType::Given, text)
                    .into_iter()
                    .map(|m| (m.binding.pattern, m.captures))
                    .collect::<Vec<_>>()
            };
            assert_eq!(describe(&first), describe(&second), "for `{text}`");
        }
    }
}
