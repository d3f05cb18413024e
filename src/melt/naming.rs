//! Column and table naming rules.

use once_cell::sync::Lazy;
use regex::Regex;

static ACRONYM_BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap()
});

static WORD_BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-z\d])([A-Z])").unwrap()
});

static INVALID_CHAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_]").unwrap()
});

/// `followerCountsByAssociationType` -> `follower_counts_by_association_type`
///
/// Acronym runs stay together: `URN` -> `urn`, `HTTPServer` -> `http_server`.
pub fn to_snake_case(name: &str) -> String {
    let name = ACRONYM_BOUNDARY_REGEX.replace_all(name, "${1}_${2}");
    let name = WORD_BOUNDARY_REGEX.replace_all(&name, "${1}_${2}");
    name.replace('-', "_").to_lowercase()
}

/// `AssociationType` -> `associationType`
pub fn to_lower_camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split a camelCase/PascalCase identifier into its words
pub fn camel_case_words(name: &str) -> Vec<String> {
    to_snake_case(name)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Canonical destination column name: snake_case, `[A-Za-z0-9_]` only,
/// no leading or trailing underscores
pub fn normalize_header(name: &str) -> String {
    let snake = to_snake_case(name);
    let cleaned = INVALID_CHAR_REGEX.replace_all(&snake, "_");
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        cleaned.into_owned()
    } else {
        trimmed.to_string()
    }
}
