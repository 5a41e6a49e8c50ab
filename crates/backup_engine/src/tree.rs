//! Flat page listing to hierarchy.
//!
//! Nodes never point at their parent; anything that needs to walk upward goes
//! through the flat corpus by id (see [`crate::path_for`]).

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::path::sanitize_path_segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    Root,
    Page,
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub kind: ParentKind,
    pub id: Option<String>,
}

impl ParentRef {
    pub fn root() -> Self {
        Self {
            kind: ParentKind::Root,
            id: None,
        }
    }

    pub fn page(id: impl Into<String>) -> Self {
        Self {
            kind: ParentKind::Page,
            id: Some(id.into()),
        }
    }

    pub fn container(id: impl Into<String>) -> Self {
        Self {
            kind: ParentKind::Container,
            id: Some(id.into()),
        }
    }

    /// Parent id worth resolving, `None` for root parents.
    pub(crate) fn resolvable_id(&self) -> Option<&str> {
        match self.kind {
            ParentKind::Root => None,
            ParentKind::Page | ParentKind::Container => self.id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageIcon {
    Emoji(String),
    External(String),
}

/// One item of the remote hierarchy as returned by the directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: String,
    pub title: String,
    pub parent: ParentRef,
    pub last_edited: String,
    pub is_container: bool,
    pub icon: Option<PageIcon>,
}

impl PageRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, parent: ParentRef) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            parent,
            last_edited: String::new(),
            is_container: false,
            icon: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
    pub record: PageRecord,
    pub children: Vec<PageNode>,
}

impl PageNode {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }
}

/// Build the page forest from a flat listing.
///
/// A record attaches to its parent when the parent id is present in the
/// listing, otherwise it becomes a root. Siblings are ordered by title.
pub fn build_tree(records: &[PageRecord]) -> Vec<PageNode> {
    let mut index: HashMap<&str, &PageRecord> = HashMap::with_capacity(records.len());
    for record in records {
        index.insert(record.id.as_str(), record);
    }

    let mut children_of: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut root_ids: Vec<&str> = Vec::new();
    for record in records {
        match record.parent.resolvable_id() {
            Some(parent_id) if index.contains_key(parent_id) => {
                children_of
                    .entry(parent_id)
                    .or_default()
                    .push(record.id.as_str());
            }
            _ => root_ids.push(record.id.as_str()),
        }
    }

    let mut unattached = index;
    let mut roots: Vec<PageNode> = root_ids
        .into_iter()
        .filter_map(|id| materialize(id, &mut unattached, &children_of))
        .collect();

    // Records whose parent chain loops back on itself never reach a root.
    for record in records {
        if let Some(node) = materialize(record.id.as_str(), &mut unattached, &children_of) {
            roots.push(node);
        }
    }

    sort_nodes(&mut roots);
    roots
}

fn materialize<'a>(
    id: &'a str,
    unattached: &mut HashMap<&'a str, &'a PageRecord>,
    children_of: &HashMap<&'a str, Vec<&'a str>>,
) -> Option<PageNode> {
    let record = unattached.remove(id)?;
    let mut children = Vec::new();
    if let Some(ids) = children_of.get(id) {
        for &child in ids {
            if let Some(node) = materialize(child, unattached, children_of) {
                children.push(node);
            }
        }
    }
    Some(PageNode {
        record: record.clone(),
        children,
    })
}

fn sort_nodes(nodes: &mut [PageNode]) {
    nodes.sort_by(|a, b| compare_titles(a.title(), b.title()));
    for node in nodes.iter_mut() {
        sort_nodes(&mut node.children);
    }
}

/// Case-insensitive title order with a byte-wise tiebreak.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Pre-order walk yielding every node with its sanitized root-to-node path.
pub fn flatten_with_paths(roots: &[PageNode]) -> Vec<(&PageNode, Vec<String>)> {
    let mut out = Vec::new();
    flatten_into(roots, &[], &mut out);
    out
}

fn flatten_into<'a>(
    nodes: &'a [PageNode],
    parent_path: &[String],
    out: &mut Vec<(&'a PageNode, Vec<String>)>,
) {
    for node in nodes {
        let mut path = parent_path.to_vec();
        path.push(sanitize_path_segment(node.title()));
        out.push((node, path.clone()));
        flatten_into(&node.children, &path, out);
    }
}

pub fn descendant_ids(node: &PageNode) -> Vec<String> {
    let mut ids = Vec::new();
    for child in &node.children {
        ids.push(child.record.id.clone());
        ids.extend(descendant_ids(child));
    }
    ids
}

pub fn find_node<'a>(roots: &'a [PageNode], id: &str) -> Option<&'a PageNode> {
    roots.iter().find_map(|node| {
        if node.id() == id {
            Some(node)
        } else {
            find_node(&node.children, id)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_sort_case_insensitively() {
        let records = vec![
            PageRecord::new("1", "beta", ParentRef::root()),
            PageRecord::new("2", "Alpha", ParentRef::root()),
            PageRecord::new("3", "alpha", ParentRef::root()),
        ];
        let roots = build_tree(&records);
        let titles: Vec<_> = roots.iter().map(PageNode::title).collect();
        assert_eq!(titles, vec!["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn mutual_parents_are_kept_as_roots() {
        let records = vec![
            PageRecord::new("a", "A", ParentRef::page("b")),
            PageRecord::new("b", "B", ParentRef::page("a")),
        ];
        let roots = build_tree(&records);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id(), "a");
        assert_eq!(roots[0].children.len(), 1);
        assert_eq!(roots[0].children[0].id(), "b");
        assert!(roots[0].children[0].children.is_empty());
    }
}
