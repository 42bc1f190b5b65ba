//! Rules for the derived topic fields
//!
//! Every storage engine routes its topic/edge writes through these helpers so
//! that `has_content` and `parent_slugs` agree with the stored content and
//! edge rows after each operation commits.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A topic has content when either representation is non-empty.
pub fn has_content(content_html: Option<&str>, content_text: Option<&str>) -> bool {
    content_html.is_some_and(|s| !s.is_empty()) || content_text.is_some_and(|s| !s.is_empty())
}

/// Append `parent` unless already present. Returns whether the list changed.
pub fn attach_parent(parent_slugs: &mut Vec<String>, parent: &str) -> bool {
    if parent_slugs.iter().any(|p| p == parent) {
        return false;
    }
    parent_slugs.push(parent.to_string());
    true
}

/// Remove every occurrence of `parent`. Returns whether the list changed.
pub fn detach_parent(parent_slugs: &mut Vec<String>, parent: &str) -> bool {
    let before = parent_slugs.len();
    parent_slugs.retain(|p| p != parent);
    parent_slugs.len() != before
}

/// Group `(parent, child)` pairs by child, keeping first-seen edge order and
/// dropping repeats.
pub fn parent_slugs_from_edges<'a, I>(edges: I) -> HashMap<String, Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut by_child: HashMap<String, Vec<String>> = HashMap::new();
    for (parent, child) in edges {
        attach_parent(by_child.entry(child.to_string()).or_default(), parent);
    }
    by_child
}

/// Filter raw seed edges down to the ones an import may keep: no self-loops,
/// no repeats, both endpoints known.
pub fn importable_edges<'a>(
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
    known_slugs: &HashSet<&str>,
) -> Vec<(&'a str, &'a str)> {
    let mut seen = HashSet::new();
    edges
        .into_iter()
        .filter(|(parent, child)| {
            parent != child
                && known_slugs.contains(parent)
                && known_slugs.contains(child)
                && seen.insert((*parent, *child))
        })
        .collect()
}

/// Keep the first row for each key, in input order. Seed courses are keyed
/// by course id and seed topics by slug.
pub fn first_by_key<'a, T, K, F>(rows: &'a [T], key: F) -> Vec<&'a T>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    let mut seen = HashSet::new();
    rows.iter().filter(|row| seen.insert(key(*row))).collect()
}
