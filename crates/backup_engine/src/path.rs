use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::tree::PageRecord;

pub const MAX_SEGMENT_CHARS: usize = 100;
pub const DEFAULT_ARCHIVE_PREFIX: &str = "notion-backup";

/// Filesystem-safe folder name for a page title.
pub fn sanitize_path_segment(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_forbidden(c) { '-' } else { c })
        .collect();

    let mut compacted = String::with_capacity(replaced.len());
    let mut prev: Option<char> = None;
    for c in replaced.chars() {
        let c = if c.is_whitespace() { ' ' } else { c };
        if (c == ' ' || c == '-') && prev == Some(c) {
            continue;
        }
        compacted.push(c);
        prev = Some(c);
    }

    let trimmed = compacted.trim().trim_matches('-').trim();
    let truncated: String = trimmed.chars().take(MAX_SEGMENT_CHARS).collect();
    if truncated.chars().all(|c| c == '.') {
        "untitled".to_string()
    } else {
        truncated
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}

/// Sanitized root-to-page titles for `page_id`, walking the flat corpus by
/// parent id. Empty when the id is not part of the corpus.
pub fn path_for(page_id: &str, corpus: &[PageRecord]) -> Vec<String> {
    let index: HashMap<&str, &PageRecord> =
        corpus.iter().map(|page| (page.id.as_str(), page)).collect();

    let mut segments = Vec::new();
    let mut visited = HashSet::new();
    let mut current = index.get(page_id).copied();
    while let Some(page) = current {
        if !visited.insert(page.id.as_str()) {
            break;
        }
        segments.push(sanitize_path_segment(&page.title));
        current = page
            .parent
            .resolvable_id()
            .and_then(|parent_id| index.get(parent_id).copied());
    }
    segments.reverse();
    segments
}

/// `<prefix>-<YYYY-MM-DDTHH-MM-SS>.zip` for the given UTC instant.
pub fn backup_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}-{}.zip", now.format("%Y-%m-%dT%H-%M-%S"))
}
