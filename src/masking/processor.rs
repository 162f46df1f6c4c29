// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Ordered chain of masking rules applied to text values
// Uses a RegexSet prefilter so text without sensitive data is never copied

use regex::RegexSet;
use std::borrow::Cow;

use super::rule::MaskingRule;
use super::strategy::SensitiveCategory;
use crate::error::MaskingError;

/// Applies every rule, highest priority first, to a text value
///
/// Each rule sees the output of the previous one. The rule list is fixed at
/// construction, so a processor can be shared between threads freely.
#[derive(Debug)]
pub struct MaskingProcessor {
    rules: Vec<MaskingRule>,
    prefilter: RegexSet,
}

impl MaskingProcessor {
    pub fn builder() -> MaskingProcessorBuilder {
        MaskingProcessorBuilder::default()
    }

    /// Processor with the built-in rules for every [`SensitiveCategory`]
    pub fn with_default_rules() -> Result<Self, MaskingError> {
        SensitiveCategory::ALL
            .iter()
            .try_fold(Self::builder(), |builder, category| {
                Ok(builder.add_rule(MaskingRule::for_category(*category)?))
            })?
            .build()
    }

    /// Rules in application order
    pub fn rules(&self) -> &[MaskingRule] {
        &self.rules
    }

    /// Mask sensitive data in `text`
    ///
    /// # Arguments
    /// * `text` - Text that may contain sensitive tokens
    ///
    /// # Returns
    /// The masked text, borrowed unchanged when no rule matches
    pub fn process<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if text.is_empty() || !self.prefilter.is_match(text) {
            // Zero-copy when no masking needed
            return Cow::Borrowed(text);
        }

        let mut result = Cow::Borrowed(text);
        for rule in &self.rules {
            if let Some(rewritten) = rule.apply(&result) {
                result = Cow::Owned(rewritten);
            }
        }
        result
    }
}

/// Collects rules and sorts them once on `build`
#[derive(Debug, Default)]
pub struct MaskingProcessorBuilder {
    rules: Vec<MaskingRule>,
}

impl MaskingProcessorBuilder {
    pub fn add_rule(mut self, rule: MaskingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn build(self) -> Result<MaskingProcessor, MaskingError> {
        let mut rules = self.rules;
        // Stable: equal priorities keep insertion order
        rules.sort_by(|a, b| b.priority().cmp(&a.priority()));

        // Handle empty rule set gracefully
        let prefilter = if rules.is_empty() {
            RegexSet::empty()
        } else {
            RegexSet::new(rules.iter().map(|rule| rule.pattern().as_str()))
                .map_err(MaskingError::RuleSet)?
        };

        Ok(MaskingProcessor { rules, prefilter })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::strategy::MaskingStrategy;

    fn default_processor() -> MaskingProcessor {
        MaskingProcessor::with_default_rules().unwrap()
    }

    #[test]
    fn test_rules_sorted_by_priority() {
        let processor = default_processor();
        let names: Vec<&str> = processor.rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec!["card-number", "tax-id", "phone-number", "national-id", "email"]
        );
    }

    #[test]
    fn test_empty_and_clean_text_borrowed() {
        let processor = default_processor();
        assert!(matches!(processor.process(""), Cow::Borrowed("")));

        let text = "Order created for customer";
        let result = processor.process(text);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, text);
    }

    #[test]
    fn test_mixed_message() {
        let processor = default_processor();
        let result = processor.process("DNI 12345678, card 1234567812345678, email a@b.com");
        assert_eq!(result, "DNI 12***78, card ***5678, email ***@b.com");
    }

    #[test]
    fn test_each_category() {
        let processor = default_processor();
        assert_eq!(processor.process("ruc 20123456789"), "ruc 201***789");
        assert_eq!(processor.process("tel 987654321"), "tel ***321");
        assert_eq!(processor.process("tel 9876543210"), "tel ***210");
        assert_eq!(
            processor.process("mail usuario@domain.com"),
            "mail u***@domain.com"
        );
    }

    #[test]
    fn test_adjacent_tokens_masked_independently() {
        let processor = default_processor();
        assert_eq!(
            processor.process("1234567812345678,12345678"),
            "***5678,12***78"
        );
    }

    #[test]
    fn test_idempotent() {
        let processor = default_processor();
        let once = processor
            .process("ids 12345678 20123456789 987654321 1234567812345678 jane.doe@mail.com")
            .into_owned();
        assert_eq!(processor.process(&once), once);
    }

    #[test]
    fn test_chain_feeds_previous_output() {
        let processor = MaskingProcessor::builder()
            .add_rule(
                MaskingRule::builder()
                    .name("second")
                    .pattern("B")
                    .strategy_fn(|_| "C".to_string())
                    .priority(1)
                    .build()
                    .unwrap(),
            )
            .add_rule(
                MaskingRule::builder()
                    .name("first")
                    .pattern("A")
                    .strategy_fn(|_| "B".to_string())
                    .priority(2)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert_eq!(processor.process("A"), "C");
    }

    #[test]
    fn test_empty_rule_set() {
        let processor = MaskingProcessor::builder().build().unwrap();
        assert_eq!(processor.process("12345678"), "12345678");
    }

    #[test]
    fn test_custom_rule_with_full_mask() {
        let processor = MaskingProcessor::builder()
            .add_rule(
                MaskingRule::builder()
                    .name("password")
                    .pattern(r"password=\S+")
                    .strategy(MaskingStrategy::full_mask())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert_eq!(processor.process("login password=hunter2 ok"), "login *** ok");
    }

    #[test]
    fn test_shared_across_threads() {
        let processor = std::sync::Arc::new(default_processor());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let processor = std::sync::Arc::clone(&processor);
                std::thread::spawn(move || {
                    processor
                        .process(&format!("worker {} card 1234567812345678", i))
                        .into_owned()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), format!("worker {} card ***5678", i));
        }
    }
}
