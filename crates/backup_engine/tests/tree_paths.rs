use std::collections::HashSet;

use backup_engine::{
    backup_filename, build_tree, descendant_ids, find_node, flatten_with_paths, path_for,
    sanitize_path_segment, PageNode, PageRecord, ParentRef,
};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

fn corpus() -> Vec<PageRecord> {
    vec![
        PageRecord::new("root", "Handbook", ParentRef::root()),
        PageRecord::new("eng", "engineering", ParentRef::page("root")),
        PageRecord::new("ops", "Operations", ParentRef::page("root")),
        PageRecord::new("oncall", "On-call: rota", ParentRef::page("ops")),
        PageRecord::new("orphan", "Lost", ParentRef::page("deleted-parent")),
        PageRecord::new("row", "Row", ParentRef::container("db-not-listed")),
    ]
}

fn collect_ids(nodes: &[PageNode], out: &mut Vec<String>) {
    for node in nodes {
        out.push(node.id().to_string());
        collect_ids(&node.children, out);
    }
}

#[test]
fn every_record_appears_exactly_once() {
    let records = corpus();
    let roots = build_tree(&records);

    let mut ids = Vec::new();
    collect_ids(&roots, &mut ids);
    assert_eq!(ids.len(), records.len());
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), records.len());
}

#[test]
fn unresolved_parents_become_roots_sorted_by_title() {
    let roots = build_tree(&corpus());
    let titles: Vec<&str> = roots.iter().map(PageNode::title).collect();
    assert_eq!(titles, vec!["Handbook", "Lost", "Row"]);

    let handbook = &roots[0];
    let children: Vec<&str> = handbook.children.iter().map(PageNode::title).collect();
    assert_eq!(children, vec!["engineering", "Operations"]);
}

#[test]
fn empty_listing_yields_empty_forest() {
    assert!(build_tree(&[]).is_empty());
}

#[test]
fn tree_helpers_walk_depth_first() {
    let roots = build_tree(&corpus());

    let ops = find_node(&roots, "ops").expect("ops node");
    assert_eq!(descendant_ids(ops), vec!["oncall".to_string()]);
    assert_eq!(descendant_ids(&roots[0]), vec!["eng", "ops", "oncall"]);
    assert!(find_node(&roots, "missing").is_none());

    let flattened = flatten_with_paths(&roots);
    let (node, path) = flattened
        .iter()
        .find(|(node, _)| node.id() == "oncall")
        .expect("oncall flattened");
    assert_eq!(node.title(), "On-call: rota");
    assert_eq!(path, &vec!["Handbook", "Operations", "On-call- rota"]);
}

#[test]
fn path_walks_to_the_root() {
    let records = corpus();
    assert_eq!(
        path_for("oncall", &records),
        vec!["Handbook", "Operations", "On-call- rota"]
    );
    assert_eq!(path_for("orphan", &records), vec!["Lost"]);
    assert!(path_for("nope", &records).is_empty());
}

#[test]
fn path_stops_on_parent_loops() {
    let records = vec![
        PageRecord::new("a", "A", ParentRef::page("b")),
        PageRecord::new("b", "B", ParentRef::page("a")),
    ];
    assert_eq!(path_for("a", &records), vec!["B", "A"]);
}

#[test]
fn sanitize_handles_reserved_characters_and_length() {
    assert_eq!(sanitize_path_segment("a/b:c"), "a-b-c");
    assert_eq!(sanitize_path_segment("   "), "untitled");
    assert_eq!(sanitize_path_segment(""), "untitled");
    assert_eq!(sanitize_path_segment("<<a>>"), "a");
    assert_eq!(sanitize_path_segment("many   spaces\tand\nbreaks"), "many spaces and breaks");
    assert_eq!(sanitize_path_segment(&"x".repeat(150)).chars().count(), 100);
    assert_eq!(sanitize_path_segment("file<>:\"/\\|?*name"), "file-name");
}

#[test]
fn dot_only_titles_cannot_climb_out_of_the_archive() {
    assert_eq!(sanitize_path_segment(".."), "untitled");
    assert_eq!(sanitize_path_segment("."), "untitled");
    assert_eq!(sanitize_path_segment(" ... "), "untitled");
    assert_eq!(sanitize_path_segment("../etc"), "..-etc");
    assert_eq!(sanitize_path_segment("v1.2"), "v1.2");
}

#[test]
fn backup_filename_uses_utc_timestamp() {
    let at = Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
    assert_eq!(
        backup_filename("notion-backup", at),
        "notion-backup-2026-03-09T14-05-07.zip"
    );
}
