// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Rule-ordered PII masking
//
// - RegexSet prefilter so clean text is never copied
// - Copy-on-write strings through the whole rule chain
// - Shareable strategies so custom rules can plug in their own masking

pub mod patterns;
pub mod processor;
pub mod rule;
pub mod strategy;
pub mod uri;

pub use processor::{MaskingProcessor, MaskingProcessorBuilder};
pub use rule::{MaskingRule, MaskingRuleBuilder};
pub use strategy::{MaskingStrategy, SensitiveCategory, MASK};
pub use uri::mask_uri;
