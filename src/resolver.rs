// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step Binding Resolver: picks the [`Binding`] of a step and converts its
//! arguments, without invoking anything.

use std::sync::Arc;

use crate::{
    binding::{AmbiguousMatchError, Binding, KeywordType, Registry, StepKeyword},
    convert::{
        Arguments, DefaultConverter, ParamType, RawArgument, Table,
        ValueConverter,
    },
    outcome::ArgumentConversionError,
};

/// Step to resolve.
#[derive(Clone, Copy, Debug)]
pub struct StepQuery<'s> {
    /// Keyword the step is written with.
    pub keyword: StepKeyword,

    /// Keyword type the step is matched under.
    pub keyword_type: KeywordType,

    /// Text of the step, without the keyword.
    pub text: &'s str,

    /// Multiline text argument, if any.
    pub doc_string: Option<&'s str>,

    /// Table argument, if any.
    pub table: Option<&'s Table>,
}

/// Step resolved into its [`Binding`] and converted [`Arguments`].
#[derive(Clone, Debug)]
pub struct ResolvedStep<'r> {
    /// The only [`Binding`] matching the step.
    pub binding: &'r Binding,

    /// Arguments to invoke the [`Binding::fun`] with.
    pub arguments: Arguments,
}

/// Outcome of resolving a step.
#[derive(Clone, Debug)]
pub enum Resolution<'r> {
    /// Exactly one [`Binding`] matches.
    Resolved(ResolvedStep<'r>),

    /// No [`Binding`] matches.
    Undefined,

    /// Several [`Binding`]s match.
    Ambiguous(AmbiguousMatchError),
}

/// Resolver of step texts against a [`Registry`].
#[derive(Clone, Debug)]
pub struct Resolver {
    /// Bindings to resolve against.
    registry: Arc<Registry>,

    /// Strategy of converting the arguments.
    converter: Arc<dyn ValueConverter>,
}

impl Resolver {
    /// Creates a new [`Resolver`] using the [`DefaultConverter`].
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_converter(registry, Arc::new(DefaultConverter))
    }

    /// Creates a new [`Resolver`] with a custom [`ValueConverter`].
    #[must_use]
    pub fn with_converter(
        registry: Arc<Registry>,
        converter: Arc<dyn ValueConverter>,
    ) -> Self {
        Self { registry, converter }
    }

    /// Returns the [`Registry`] this [`Resolver`] resolves against.
    #[must_use]
    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolves the `step` into its only [`Binding`].
    ///
    /// Arguments are the pattern captures in order, followed by the
    /// multiline text and the table, if present. If the [`Binding`] declares
    /// parameter types, each argument is converted into the respective one.
    /// Otherwise, every argument is passed as is.
    ///
    /// # Errors
    ///
    /// If the arguments can't be converted into the declared parameter
    /// types.
    pub fn resolve(
        &self,
        step: StepQuery<'_>,
    ) -> Result<Resolution<'_>, ArgumentConversionError> {
        let found = match self.registry.find(step.keyword_type, step.text) {
            Ok(Some(found)) => found,
            Ok(None) => {
                tracing::trace!(
                    keyword = %step.keyword,
                    text = step.text,
                    "no binding matches",
                );
                return Ok(Resolution::Undefined);
            }
            Err(e) => return Ok(Resolution::Ambiguous(e)),
        };

        let raw = found
            .arguments()
            .map(|s| RawArgument::Capture(s.to_owned()))
            .chain(step.doc_string.map(|s| RawArgument::DocString(s.to_owned())))
            .chain(step.table.cloned().map(RawArgument::Table))
            .collect::<Vec<_>>();

        let arguments = self.convert(raw, found.binding.params.as_deref())?;
        Ok(Resolution::Resolved(ResolvedStep {
            binding: found.binding,
            arguments,
        }))
    }

    /// Converts the `raw` arguments into the declared `params`, or into their
    /// natural types if nothing is declared.
    fn convert(
        &self,
        raw: Vec<RawArgument>,
        params: Option<&[ParamType]>,
    ) -> Result<Arguments, ArgumentConversionError> {
        let params = match params {
            Some(p) if p.len() != raw.len() => {
                return Err(ArgumentConversionError::CountMismatch {
                    provided: raw.len(),
                    declared: p.len(),
                });
            }
            Some(p) => p.to_vec(),
            None => raw.iter().map(RawArgument::natural_type).collect(),
        };
        raw.into_iter()
            .zip(params)
            .map(|(arg, ty)| self.converter.convert(arg, ty))
            .collect::<Result<Vec<_>, _>>()
            .map(Arguments::new)
            .map_err(ArgumentConversionError::from)
    }
}

#[cfg(test)]
mod tests {
    use futures::{future::LocalBoxFuture, FutureExt as _};

    use super::*;
    use crate::{
        binding::{Declarations, FnModule, StepPattern},
        context::ContextStack,
        convert::Value,
        outcome::StepResult,
    };

    fn noop(_: &mut ContextStack, _: Arguments) -> LocalBoxFuture<'_, StepResult> {
        async { Ok(()) }.boxed_local()
    }

    fn declare(b: &mut Declarations) {
        _ = b
            .given(r"I have (\d+) (\w+)", noop)
            .params([ParamType::Int, ParamType::String]);
        _ = b.when(StepPattern::Expression("I eat {int}"), noop);
        _ = b.then(r"the note says:", noop).params([ParamType::DocString]);
        _ = b.then(r"the table is", noop).params([ParamType::Int]);
        _ = b.any(r"it (?:is|was) (\w+)", noop);
        _ = b.any(r"it is (\w+)", noop);
    }

    fn resolver() -> Resolver {
        let module = FnModule::new("resolver", declare).into_ref();
        Resolver::new(Arc::new(Registry::build(&[module]).unwrap()))
    }

    fn query(ty: KeywordType, text: &str) -> StepQuery<'_> {
        StepQuery {
            keyword: StepKeyword::Given,
            keyword_type: ty,
            text,
            doc_string: None,
            table: None,
        }
    }

    #[test]
    fn converts_declared_params() {
        let resolver = resolver();
        let Resolution::Resolved(step) = resolver
            .resolve(query(KeywordType::Given, "I have 5 cucumbers"))
            .unwrap()
        else {
            panic!("expected a resolved step");
        };

        assert_eq!(step.arguments.get::<i64>(0), Ok(5));
        assert_eq!(step.arguments.get::<String>(1).as_deref(), Ok("cucumbers"));
    }

    #[test]
    fn undeclared_params_pass_through() {
        let resolver = resolver();
        let Resolution::Resolved(step) =
            resolver.resolve(query(KeywordType::When, "I eat 3")).unwrap()
        else {
            panic!("expected a resolved step");
        };

        assert_eq!(step.arguments.value(0), Some(&Value::String("3".into())));
    }

    #[test]
    fn appends_doc_string() {
        let resolver = resolver();
        let mut q = query(KeywordType::Then, "the note says:");
        q.doc_string = Some("eat more");

        let Resolution::Resolved(step) = resolver.resolve(q).unwrap() else {
            panic!("expected a resolved step");
        };
        assert_eq!(
            step.arguments.value(0),
            Some(&Value::DocString("eat more".into())),
        );
    }

    #[test]
    fn reports_conversion_failures() {
        let resolver = resolver();
        let table = Table::new([["a"], ["1"]]);
        let mut q = query(KeywordType::Then, "the table is");
        q.table = Some(&table);

        assert!(matches!(
            resolver.resolve(q),
            Err(ArgumentConversionError::Conversion(_)),
        ));
        assert!(matches!(
            resolver.resolve(query(KeywordType::Then, "the note says:")),
            Err(ArgumentConversionError::CountMismatch { provided: 0, declared: 1 }),
        ));
    }

    #[test]
    fn distinguishes_undefined_and_ambiguous() {
        let resolver = resolver();

        assert!(matches!(
            resolver.resolve(query(KeywordType::When, "I sleep")),
            Ok(Resolution::Undefined),
        ));
        let Ok(Resolution::Ambiguous(err)) =
            resolver.resolve(query(KeywordType::Then, "it is green"))
        else {
            panic!("expected an ambiguous step");
        };
        assert_eq!(err.possible_matches.len(), 2);
    }

    #[test]
    fn keyword_type_filters_bindings() {
        let resolver = resolver();

        assert!(matches!(
            resolver.resolve(query(KeywordType::Then, "I have 5 cucumbers")),
            Ok(Resolution::Undefined),
        ));
    }
}
