//! Candidate ranking: system-component filter, substring ranking and
//! fuzzy similarity.
//!
//! Substring matches are ordered by how closely the name fits the query:
//!
//! ```text
//! exact name  <  name starts with query  <  name contains query
//! ```
//!
//! with ties broken by shorter name, then alphabetically. Fuzzy matches are
//! ordered by descending similarity ratio.

use std::cmp::Ordering;

use similar::TextDiff;

use crate::types::AppCandidate;

/// Whether `name` looks like a runtime, SDK or other system component.
pub fn is_system_app(name: &str, system_keywords: &[String]) -> bool {
    let lname = name.to_lowercase();
    system_keywords
        .iter()
        .any(|k| !k.is_empty() && lname.contains(k.as_str()))
}

/// Similarity ratio in `[0, 1]`: `2 * matching_chars / total_chars`.
///
/// Two empty strings are identical (ratio 1.0).
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

fn containment_rank(key: &str, query: &str) -> u8 {
    if key == query {
        0
    } else if key.starts_with(query) {
        1
    } else {
        2
    }
}

/// Candidates whose key contains `query`, best fit first.
///
/// `query` must already be normalized (lowercase, trimmed).
pub fn substring_matches<'a, I>(
    apps: I,
    query: &str,
    system_keywords: &[String],
) -> Vec<AppCandidate>
where
    I: IntoIterator<Item = &'a AppCandidate>,
{
    let mut matches: Vec<&AppCandidate> = apps
        .into_iter()
        .filter(|app| app.normalized_key.contains(query))
        .filter(|app| !is_system_app(&app.name, system_keywords))
        .collect();

    matches.sort_by(|a, b| {
        containment_rank(&a.normalized_key, query)
            .cmp(&containment_rank(&b.normalized_key, query))
            .then_with(|| a.normalized_key.len().cmp(&b.normalized_key.len()))
            .then_with(|| a.normalized_key.cmp(&b.normalized_key))
    });
    matches.into_iter().cloned().collect()
}

/// Candidates whose similarity to `query` is at least `threshold`,
/// highest score first.
pub fn fuzzy_matches<'a, I>(
    apps: I,
    query: &str,
    threshold: f64,
    system_keywords: &[String],
) -> Vec<(f64, AppCandidate)>
where
    I: IntoIterator<Item = &'a AppCandidate>,
{
    let mut scored: Vec<(f64, &AppCandidate)> = apps
        .into_iter()
        .filter(|app| !is_system_app(&app.name, system_keywords))
        .map(|app| (fuzzy_ratio(query, &app.normalized_key), app))
        .filter(|(score, _)| *score >= threshold)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.normalized_key.cmp(&b.normalized_key))
    });
    scored
        .into_iter()
        .map(|(score, app)| (score, app.clone()))
        .collect()
}

/// Human-friendly display form of an application name.
///
/// Strips a leading hex identifier (`"1a2b3c Foo"` → `"Foo"`), turns `.`
/// and `_` into spaces, collapses whitespace and title-cases each word.
pub fn clean_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let stripped = strip_hex_prefix(&lower);
    let spaced = stripped.replace(['.', '_'], " ");
    spaced
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A hex run counts as an identifier prefix only when it is at least four
/// characters, contains a digit and is a whole word.
fn strip_hex_prefix(lower: &str) -> &str {
    let run = lower
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_hexdigit())
        .count();
    if run < 4 {
        return lower;
    }
    let (prefix, rest) = lower.split_at(run);
    let whole_word = rest.is_empty() || rest.starts_with(char::is_whitespace);
    if whole_word && prefix.chars().any(|c| c.is_ascii_digit()) && !rest.trim().is_empty() {
        rest.trim_start()
    } else {
        lower
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
