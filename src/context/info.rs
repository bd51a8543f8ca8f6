// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Immutable descriptions of features and scenarios.

/// Description of a [Feature].
///
/// [Feature]: https://cucumber.io/docs/gherkin/reference#feature
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FeatureInfo {
    /// Title of the feature.
    pub title: String,

    /// Language code the feature is written in, if declared.
    ///
    /// [`None`] falls back to the configured default.
    pub language: Option<String>,

    /// Tags of the feature, without the leading `@`.
    pub tags: Vec<String>,

    /// Free-form description of the feature.
    pub description: Option<String>,
}

impl FeatureInfo {
    /// Creates a new [`FeatureInfo`] with the given `title`.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }

    /// Sets the language of the feature.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the tags of the feature.
    #[must_use]
    pub fn tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags = normalize_tags(tags);
        self
    }

    /// Sets the description of the feature.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<&gherkin::Feature> for FeatureInfo {
    fn from(feature: &gherkin::Feature) -> Self {
        Self {
            title: feature.name.clone(),
            language: None,
            tags: normalize_tags(feature.tags.iter().cloned()),
            description: feature.description.clone(),
        }
    }
}

/// Description of a [Scenario].
///
/// [Scenario]: https://cucumber.io/docs/gherkin/reference#example
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScenarioInfo {
    /// Title of the scenario.
    pub title: String,

    /// Tags of the scenario, without the leading `@`.
    pub tags: Vec<String>,
}

impl ScenarioInfo {
    /// Creates a new [`ScenarioInfo`] with the given `title`.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), tags: Vec::new() }
    }

    /// Sets the tags of the scenario.
    #[must_use]
    pub fn tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags = normalize_tags(tags);
        self
    }

    /// Adds the tags inherited from an enclosing [Rule].
    ///
    /// [Rule]: https://cucumber.io/docs/gherkin/reference#rule
    #[must_use]
    pub fn inherit_tags<T: Into<String>>(
        mut self,
        tags: impl IntoIterator<Item = T>,
    ) -> Self {
        self.tags.extend(normalize_tags(tags));
        self
    }
}

impl From<&gherkin::Scenario> for ScenarioInfo {
    fn from(scenario: &gherkin::Scenario) -> Self {
        Self {
            title: scenario.name.clone(),
            tags: normalize_tags(scenario.tags.iter().cloned()),
        }
    }
}

fn normalize_tags<T: Into<String>>(tags: impl IntoIterator<Item = T>) -> Vec<String> {
    tags.into_iter()
        .map(|t| {
            let t = t.into();
            t.strip_prefix('@').map_or_else(|| t.clone(), str::to_owned)
        })
        .collect()
}
