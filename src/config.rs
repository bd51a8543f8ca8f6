// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runtime [`Configuration`] of the engine.

use std::str::FromStr;

use derive_more::with_trait::Display;
use smart_default::SmartDefault;

/// Configuration shared read-only by every runner of a pool.
///
/// Can be embedded into a CLI with `#[command(flatten)]`.
#[derive(Clone, Debug, SmartDefault, clap::Args)]
#[group(skip)]
pub struct Configuration {
    /// Whether a failed, pending, undefined or ambiguous step skips the rest
    /// of its scenario.
    #[arg(
        long,
        value_name = "strict|lenient",
        default_value = "strict",
        global = true
    )]
    #[default(StepPolicy::Strict)]
    pub step_policy: StepPolicy,

    /// Identifier of an additional binding module to load. May be repeated.
    #[arg(
        long = "additional-step-module",
        value_name = "id",
        global = true
    )]
    pub additional_step_modules: Vec<String>,

    /// Language of features not declaring their own.
    #[arg(long, value_name = "code", default_value = "en", global = true)]
    #[default("en".to_owned())]
    pub language: String,

    /// Whether pending and undefined steps make a scenario erroneous, rather
    /// than merely incomplete.
    #[arg(
        long,
        value_name = "bool",
        default_value_t = true,
        action = clap::ArgAction::Set,
        global = true
    )]
    #[default(true)]
    pub missing_or_pending_as_error: bool,
}

impl Configuration {
    /// Sets the [`StepPolicy`].
    #[must_use]
    pub const fn step_policy(mut self, policy: StepPolicy) -> Self {
        self.step_policy = policy;
        self
    }

    /// Adds an additional binding module identifier.
    #[must_use]
    pub fn additional_step_module(mut self, id: impl Into<String>) -> Self {
        self.additional_step_modules.push(id.into());
        self
    }

    /// Sets the default feature language.
    #[must_use]
    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.language = code.into();
        self
    }

    /// Sets whether pending and undefined steps are errors.
    #[must_use]
    pub const fn missing_or_pending_as_error(mut self, yes: bool) -> Self {
        self.missing_or_pending_as_error = yes;
        self
    }
}

/// Policy of executing the steps following a failed one.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum StepPolicy {
    /// Record every following step as skipped.
    #[default]
    #[display("strict")]
    Strict,

    /// Keep resolving and invoking every step.
    #[display("lenient")]
    Lenient,
}

impl FromStr for StepPolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err("possible options: strict, lenient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;

    #[derive(Debug, clap::Parser)]
    struct Cli {
        #[command(flatten)]
        config: Configuration,
    }

    #[test]
    fn defaults_match_cli_defaults() {
        let parsed = Cli::try_parse_from(["test"]).unwrap().config;
        let default = Configuration::default();

        assert_eq!(parsed.step_policy, default.step_policy);
        assert_eq!(parsed.language, "en");
        assert_eq!(default.language, "en");
        assert!(parsed.missing_or_pending_as_error);
        assert!(default.missing_or_pending_as_error);
        assert!(parsed.additional_step_modules.is_empty());
    }

    #[test]
    fn parses_every_option() {
        let config = Cli::try_parse_from([
            "test",
            "--step-policy",
            "Lenient",
            "--additional-step-module",
            "billing",
            "--additional-step-module",
            "shipping",
            "--language",
            "de",
            "--missing-or-pending-as-error",
            "false",
        ])
        .unwrap()
        .config;

        assert_eq!(config.step_policy, StepPolicy::Lenient);
        assert_eq!(config.additional_step_modules, ["billing", "shipping"]);
        assert_eq!(config.language, "de");
        assert!(!config.missing_or_pending_as_error);
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["test", "--step-policy", "lax"]).is_err());
    }
}
