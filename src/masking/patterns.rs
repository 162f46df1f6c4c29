// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Default detection patterns for the built-in sensitive categories
//
// Digit patterns are anchored on word boundaries so a match always spans a
// complete token. Longer tokens get higher priorities so a 16-digit card
// number is never split up by a shorter rule first.

use super::strategy::SensitiveCategory;

/// Pattern definition for a category
#[derive(Debug, Clone, Copy)]
pub struct RuleDef {
    pub name: &'static str,
    pub pattern: &'static str,
    pub priority: i32,
}

static CARD_NUMBER: RuleDef = RuleDef {
    name: "card-number",
    pattern: r"\b[0-9]{16}\b",
    priority: 100,
};

// RUC
static TAX_ID: RuleDef = RuleDef {
    name: "tax-id",
    pattern: r"\b[0-9]{11}\b",
    priority: 90,
};

static PHONE_NUMBER: RuleDef = RuleDef {
    name: "phone-number",
    pattern: r"\b[0-9]{9,10}\b",
    priority: 80,
};

// DNI
static NATIONAL_ID: RuleDef = RuleDef {
    name: "national-id",
    pattern: r"\b[0-9]{8}\b",
    priority: 70,
};

static EMAIL: RuleDef = RuleDef {
    name: "email",
    pattern: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
    priority: 60,
};

/// Default definition for a category
pub fn definition(category: SensitiveCategory) -> &'static RuleDef {
    match category {
        SensitiveCategory::CardNumber => &CARD_NUMBER,
        SensitiveCategory::TaxId => &TAX_ID,
        SensitiveCategory::PhoneNumber => &PHONE_NUMBER,
        SensitiveCategory::NationalId => &NATIONAL_ID,
        SensitiveCategory::Email => &EMAIL,
    }
}
