// ABOUTME: Scope string normalization, allow-list validation, and narrowing checks
// ABOUTME: Scopes are space-delimited per RFC 6749 section 3.3
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashSet;

/// Split a space-delimited scope string into entries
#[must_use]
pub fn parse_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_owned).collect()
}

/// Trimmed scope string, or `None` when empty
#[must_use]
pub fn normalize(scope: &str) -> Option<String> {
    let joined = parse_scopes(scope).join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Entries of `requested` that are not in the allow-list
#[must_use]
pub fn invalid_scopes(requested: &str, allowed: &[String]) -> Vec<String> {
    let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
    parse_scopes(requested)
        .into_iter()
        .filter(|s| !allowed.contains(s.as_str()))
        .collect()
}

/// Whether every entry of `requested` appears in `original`.
///
/// Used for refresh-grant narrowing: the new scope must be a subset of what
/// the original grant carried.
#[must_use]
pub fn is_subset(requested: &str, original: &str) -> bool {
    let original: HashSet<&str> = original.split_whitespace().collect();
    requested
        .split_whitespace()
        .all(|s| original.contains(s))
}
