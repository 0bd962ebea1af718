use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use uuid::Uuid;

static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_]").unwrap());
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9+#. -]").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lowercases a skill or tag and strips anything that is not part of a technology name.
pub fn sanitize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let s = UNDERSCORES.replace_all(&lowered, " ");
    let s = DISALLOWED.replace_all(&s, "");

    SPACES.replace_all(s.trim(), " ").into_owned()
}

/// Sanitizes, deduplicates, and drops empties while keeping first-seen order.
pub fn sanitize_list(items: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();

    items
        .iter()
        .map(|item| sanitize(item))
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}
