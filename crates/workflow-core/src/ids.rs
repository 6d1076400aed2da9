//! Task identifiers of the form `YYMMDD-short-name`.
//!
//! The short name is derived from the title: lowercased, stripped of anything
//! but ASCII letters, digits, whitespace and hyphens, with short stop words
//! dropped, and cut to the first three words.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Short connectives dropped from slugs.
const STOP_WORDS: &[&str] = &[
    "de", "da", "do", "das", "dos", "a", "o", "as", "os", "e", "ou", "para", "com", "em", "no",
    "na",
];

/// Words kept in a slug.
const MAX_SLUG_WORDS: usize = 3;

static TASK_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}-[a-z0-9-]+$").expect("task id pattern is valid"));

/// Build the id for a task title created on `date`.
///
/// ```text
/// "Implementar PostRepository", 2025-01-15 => "250115-implementar-postrepository"
/// "Fix: Bug no loader"                      => "250115-fix-bug-loader"
/// ```
pub fn generate_task_id(title: &str, date: NaiveDate) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let significant: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| w.len() > 2 || !STOP_WORDS.contains(w))
        .collect();
    let chosen = if significant.is_empty() {
        &words
    } else {
        &significant
    };

    let slug = chosen
        .iter()
        .take(MAX_SLUG_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join("-");

    format!(
        "{:02}{:02}{:02}-{slug}",
        date.year().rem_euclid(100),
        date.month(),
        date.day()
    )
}

/// Build an id that `is_taken` rejects for none of its candidates.
///
/// Tries the plain id first, then appends `-1`, `-2`, ... until a free one is
/// found.
pub fn generate_unique_task_id<F>(title: &str, date: NaiveDate, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let base = generate_task_id(title, date);
    if !is_taken(base.as_str()) {
        return base;
    }
    (1u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !is_taken(candidate.as_str()))
        .unwrap_or(base)
}

/// Whether `id` has the `YYMMDD-slug` shape.
pub fn is_valid_task_id(id: &str) -> bool {
    TASK_ID_PATTERN.is_match(id)
}

/// The creation date encoded in an id (years are taken as 20YY).
pub fn extract_date_from_task_id(id: &str) -> Option<NaiveDate> {
    if !is_valid_task_id(id) {
        return None;
    }
    let yy: i32 = id.get(0..2)?.parse().ok()?;
    let mm: u32 = id.get(2..4)?.parse().ok()?;
    let dd: u32 = id.get(4..6)?.parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + yy, mm, dd)
}
