// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Masking of sensitive path segments in request URIs
//
// Used for transaction naming, where the raw path would otherwise leak a
// national id or an email address into the APM backend.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

use super::strategy;

struct SegmentRule {
    pattern: Regex,
    mask: fn(&str) -> Option<String>,
}

static SEGMENT_RULES: Lazy<Vec<SegmentRule>> = Lazy::new(|| {
    let rules: [(&str, fn(&str) -> Option<String>); 4] = [
        (r"/dni/([0-9]{8})(?:/|\?|$)", |v| Some(strategy::national_id(v))),
        (r"/email/([^/?]+@[^/?]+)", |v| Some(strategy::email(v))),
        (r"/phone/([0-9]{9,10})(?:/|\?|$)", |v| Some(strategy::phone_number(v))),
        // Generic ids are only treated as sensitive when they look like a DNI
        (r"/id/([0-9]{8,})(?:/|\?|$)", |v| {
            (v.len() == 8).then(|| strategy::national_id(v))
        }),
    ];

    rules
        .into_iter()
        .filter_map(|(pattern, mask)| match Regex::new(pattern) {
            Ok(pattern) => Some(SegmentRule { pattern, mask }),
            Err(e) => {
                tracing::error!(
                    target: crate::DIAGNOSTICS_TARGET,
                    pattern = pattern,
                    error = %e,
                    "Failed to compile URI segment pattern"
                );
                None
            }
        })
        .collect()
});

/// Mask the first sensitive segment of each kind in a request URI
///
/// # Arguments
/// * `uri` - Request path, optionally with a query string
///
/// # Returns
/// The masked URI, borrowed unchanged when nothing sensitive was found
pub fn mask_uri(uri: &str) -> Cow<'_, str> {
    if uri.is_empty() {
        return Cow::Borrowed(uri);
    }

    let mut result = Cow::Borrowed(uri);
    for rule in SEGMENT_RULES.iter() {
        let replacement = rule
            .pattern
            .captures(&result)
            .and_then(|caps| caps.get(1))
            .and_then(|value| (rule.mask)(value.as_str()).map(|masked| (value.range(), masked)));

        if let Some((range, masked)) = replacement {
            let mut rewritten = String::with_capacity(result.len());
            rewritten.push_str(&result[..range.start]);
            rewritten.push_str(&masked);
            rewritten.push_str(&result[range.end..]);
            result = Cow::Owned(rewritten);
        }
    }
    result
}
