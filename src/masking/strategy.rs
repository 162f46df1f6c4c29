// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Masking strategies for sensitive data categories

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque placeholder returned whenever a value cannot be partially masked
pub const MASK: &str = "***";

/// Categories of sensitive data recognised by the default rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveCategory {
    CardNumber,
    NationalId,
    TaxId,
    PhoneNumber,
    Email,
}

impl SensitiveCategory {
    /// All categories, in default priority order
    pub const ALL: [SensitiveCategory; 5] = [
        SensitiveCategory::CardNumber,
        SensitiveCategory::TaxId,
        SensitiveCategory::PhoneNumber,
        SensitiveCategory::NationalId,
        SensitiveCategory::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveCategory::CardNumber => "card_number",
            SensitiveCategory::NationalId => "national_id",
            SensitiveCategory::TaxId => "tax_id",
            SensitiveCategory::PhoneNumber => "phone_number",
            SensitiveCategory::Email => "email",
        }
    }

    /// Default masking function for this category
    pub fn strategy(&self) -> MaskingStrategy {
        match self {
            SensitiveCategory::CardNumber => MaskingStrategy::new(card_number),
            SensitiveCategory::NationalId => MaskingStrategy::new(national_id),
            SensitiveCategory::TaxId => MaskingStrategy::new(tax_id),
            SensitiveCategory::PhoneNumber => MaskingStrategy::new(phone_number),
            SensitiveCategory::Email => MaskingStrategy::new(email),
        }
    }
}

impl fmt::Display for SensitiveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shareable function mapping a matched token to its redacted form
#[derive(Clone)]
pub struct MaskingStrategy(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl MaskingStrategy {
    pub fn new<F>(mask: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(mask))
    }

    /// Replace the value with the opaque placeholder
    pub fn full_mask() -> Self {
        Self::new(full_mask)
    }

    pub fn mask(&self, value: &str) -> String {
        (self.0)(value)
    }
}

impl fmt::Debug for MaskingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MaskingStrategy(..)")
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Card number: show last 4 digits: ***3456
pub fn card_number(value: &str) -> String {
    if !is_digits(value, 16) {
        return MASK.to_string();
    }
    format!("{}{}", MASK, &value[12..])
}

/// Tax id (RUC): show first 3 and last 3 digits: 123***901
pub fn tax_id(value: &str) -> String {
    if !is_digits(value, 11) {
        return MASK.to_string();
    }
    format!("{}{}{}", &value[..3], MASK, &value[8..])
}

/// Phone number: show last 3 digits: ***321
pub fn phone_number(value: &str) -> String {
    if !(is_digits(value, 9) || is_digits(value, 10)) {
        return MASK.to_string();
    }
    format!("{}{}", MASK, &value[value.len() - 3..])
}

/// National id (DNI): show first 2 and last 2 digits: 12***78
pub fn national_id(value: &str) -> String {
    if !is_digits(value, 8) {
        return MASK.to_string();
    }
    format!("{}{}{}", &value[..2], MASK, &value[6..])
}

/// Email: keep the first character of long local parts: u***@domain.com
pub fn email(value: &str) -> String {
    let Some((local, domain)) = value.split_once('@') else {
        return MASK.to_string();
    };

    match (local.chars().next(), local.chars().count()) {
        (Some(first), count) if count > 2 => format!("{}{}@{}", first, MASK, domain),
        _ => format!("{}@{}", MASK, domain),
    }
}

pub fn full_mask(_value: &str) -> String {
    MASK.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_as_str() {
        assert_eq!(SensitiveCategory::CardNumber.as_str(), "card_number");
        assert_eq!(SensitiveCategory::TaxId.as_str(), "tax_id");
        assert_eq!(SensitiveCategory::Email.to_string(), "email");
    }

    #[test]
    fn test_card_number() {
        assert_eq!(card_number("1234567812345678"), "***5678");
        assert_eq!(card_number("123456781234567"), MASK);
        assert_eq!(card_number("12345678123456ab"), MASK);
    }

    #[test]
    fn test_tax_id() {
        assert_eq!(tax_id("12345678901"), "123***901");
        assert_eq!(tax_id("1234567890"), MASK);
    }

    #[test]
    fn test_phone_number() {
        assert_eq!(phone_number("987654321"), "***321");
        assert_eq!(phone_number("9876543210"), "***210");
        assert_eq!(phone_number("98765432"), MASK);
        assert_eq!(phone_number("98765432101"), MASK);
    }

    #[test]
    fn test_national_id() {
        assert_eq!(national_id("12345678"), "12***78");
        assert_eq!(national_id("1234567"), MASK);
    }

    #[test]
    fn test_email() {
        assert_eq!(email("ab@x.com"), "***@x.com");
        assert_eq!(email("abcdef@x.com"), "a***@x.com");
        assert_eq!(email("a@b.com"), "***@b.com");
        assert_eq!(email("@x.com"), "***@x.com");
        assert_eq!(email("not-an-email"), MASK);
    }

    #[test]
    fn test_strategy_for_category() {
        let strategy = SensitiveCategory::NationalId.strategy();
        assert_eq!(strategy.mask("87654321"), "87***21");
        assert_eq!(MaskingStrategy::full_mask().mask("anything"), MASK);
    }
}
