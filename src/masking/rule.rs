// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Masking rules: a named detection pattern bound to a strategy and a priority

use regex::{Captures, Regex};

use super::strategy::{MaskingStrategy, SensitiveCategory};
use super::patterns;
use crate::error::MaskingError;

/// Compiled rule with metadata
#[derive(Debug, Clone)]
pub struct MaskingRule {
    name: String,
    pattern: Regex,
    strategy: MaskingStrategy,
    priority: i32,
}

impl MaskingRule {
    pub fn builder() -> MaskingRuleBuilder {
        MaskingRuleBuilder::default()
    }

    /// Default rule for a sensitive category
    pub fn for_category(category: SensitiveCategory) -> Result<Self, MaskingError> {
        let def = patterns::definition(category);
        Self::builder()
            .name(def.name)
            .pattern(def.pattern)
            .strategy(category.strategy())
            .priority(def.priority)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn strategy(&self) -> &MaskingStrategy {
        &self.strategy
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Replace every non-overlapping match, left to right
    ///
    /// Returns `None` when the pattern does not match so callers can keep
    /// borrowing the input.
    pub(crate) fn apply(&self, text: &str) -> Option<String> {
        let rewritten = self
            .pattern
            .replace_all(text, |caps: &Captures<'_>| self.strategy.mask(&caps[0]));
        match rewritten {
            std::borrow::Cow::Borrowed(_) => None,
            std::borrow::Cow::Owned(value) => Some(value),
        }
    }
}

/// Fluent builder for [`MaskingRule`]
#[derive(Debug, Default)]
pub struct MaskingRuleBuilder {
    name: Option<String>,
    pattern: Option<PatternSource>,
    strategy: Option<MaskingStrategy>,
    priority: i32,
}

#[derive(Debug)]
enum PatternSource {
    Source(String),
    Compiled(Regex),
}

impl MaskingRuleBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Detection pattern as a regular expression string, compiled by `build`
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(PatternSource::Source(pattern.into()));
        self
    }

    pub fn regex(mut self, regex: Regex) -> Self {
        self.pattern = Some(PatternSource::Compiled(regex));
        self
    }

    pub fn strategy(mut self, strategy: MaskingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn strategy_fn<F>(self, mask: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.strategy(MaskingStrategy::new(mask))
    }

    /// Higher priorities are applied first; defaults to 0
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self) -> Result<MaskingRule, MaskingError> {
        let name = self.name.ok_or(MaskingError::MissingField("name"))?;
        let pattern = self.pattern.ok_or(MaskingError::MissingField("pattern"))?;
        let strategy = self
            .strategy
            .ok_or(MaskingError::MissingField("strategy"))?;

        let pattern = match pattern {
            PatternSource::Compiled(regex) => regex,
            PatternSource::Source(source) => {
                Regex::new(&source).map_err(|source| MaskingError::InvalidPattern {
                    name: name.clone(),
                    source,
                })?
            }
        };

        Ok(MaskingRule {
            name,
            pattern,
            strategy,
            priority: self.priority,
        })
    }
}
