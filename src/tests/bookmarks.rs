use crate::bookmarks::{BookmarkTree, RootKind};
use crate::errors::AppError;

use super::{export_json, tree};

#[test]
pub fn test_count_per_root() {
    let tree = tree(&["a", "b"], &[], &["c"]);
    let count = tree.count();

    assert_eq!(count.len(), 3);
    assert_eq!(count.get(RootKind::BookmarkBar), Some(2));
    assert_eq!(count.get(RootKind::Synced), Some(0));
    assert_eq!(count.get(RootKind::Other), Some(1));
    assert_eq!(count.total(), 3);

    assert_eq!(count.by_name("Bookmarks bar"), Some(2));
    assert_eq!(
        count.to_string(),
        "- Bookmarks bar (2)\n- Other bookmarks (1)\n- Mobile bookmarks (0)\n"
    );
}

#[test]
pub fn test_total_matches_leaves() {
    let tree = tree(&["a", "b", "c", "d"], &["e", "f"], &["g"]);
    assert_eq!(tree.count().total(), 7);
    assert_eq!(tree.entries().count(), 7);
}

#[test]
pub fn test_entries_follow_root_order() {
    let tree = tree(&["a"], &["b"], &["c"]);
    let names = tree.entries().map(|e| e.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["a", "b", "c"]);

    let tree = super::tree(&["a1", "a2"], &["b1"], &["c1", "c2"]);
    let names = tree.entries().map(|e| e.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["a1", "a2", "b1", "c1", "c2"]);
}

#[test]
pub fn test_parse_is_idempotent() {
    let bytes = export_json(&["a", "b"], &["c"], &[]);
    let first = BookmarkTree::parse(bytes.as_bytes()).unwrap();
    let second = BookmarkTree::parse(bytes.as_bytes()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.checksum, "0f1e2d3c4b5a69788796a5b4c3d2e1f0");
    assert_eq!(first.version, 1);
    assert_eq!(first.roots.bookmark_bar.children[0].url, "https://example.com/a");
}

#[test]
pub fn test_invalid_documents() {
    assert!(matches!(
        BookmarkTree::parse(b"not json"),
        Err(AppError::InvalidDocument(_))
    ));

    let missing_synced = r#"{
        "checksum": "x",
        "version": 1,
        "roots": {
            "bookmark_bar": { "children": [] },
            "other": { "children": [] }
        }
    }"#;
    assert!(matches!(
        BookmarkTree::parse(missing_synced.as_bytes()),
        Err(AppError::InvalidDocument(_))
    ));

    assert!(matches!(
        BookmarkTree::parse(br#"{ "checksum": "x", "version": 1 }"#),
        Err(AppError::InvalidDocument(_))
    ));
}

#[test]
pub fn test_unknown_fields_and_nested_folders() {
    let export = r#"{
        "checksum": "x",
        "version": 1,
        "future_field": { "anything": true },
        "roots": {
            "bookmark_bar": {
                "name": "Bookmarks bar",
                "children": [
                    { "date_added": "0", "id": "1", "name": "leaf", "type": "url", "url": "https://a.example", "guid": "g-1" },
                    { "date_added": "0", "id": "2", "name": "nested", "type": "folder", "children": [
                        { "date_added": "0", "id": "3", "name": "deep", "type": "url", "url": "https://b.example" }
                    ] }
                ]
            },
            "other": { "name": "Other bookmarks", "children": [] },
            "synced": { "name": "Mobile bookmarks" },
            "sync_transaction_version": "5"
        }
    }"#;

    let tree = BookmarkTree::parse(export.as_bytes()).unwrap();
    let count = tree.count();

    // nested folders are a single child, never descended into
    assert_eq!(count.get(RootKind::BookmarkBar), Some(2));
    assert_eq!(count.get(RootKind::Synced), Some(0));
    assert_eq!(count.total(), 2);
    assert_eq!(tree.roots.sync_transaction_version.as_deref(), Some("5"));
    assert_eq!(tree.roots.bookmark_bar.children[1].kind, "folder");
}

#[test]
pub fn test_shared_root_names_keep_every_count() {
    let export = r#"{
        "roots": {
            "bookmark_bar": { "name": "Bookmarks", "children": [
                { "date_added": "0", "id": "1", "name": "a", "type": "url", "url": "https://a.example" }
            ] },
            "other": { "name": "Bookmarks", "children": [] },
            "synced": { "name": "Bookmarks", "children": [
                { "date_added": "0", "id": "2", "name": "b", "type": "url", "url": "https://b.example" },
                { "date_added": "0", "id": "3", "name": "c", "type": "url", "url": "https://c.example" }
            ] }
        }
    }"#;

    let count = BookmarkTree::parse(export.as_bytes()).unwrap().count();
    assert_eq!(count.len(), 3);
    assert_eq!(count.total(), 3);
    assert_eq!(count.get(RootKind::BookmarkBar), Some(1));
    // by name, the last root added wins
    assert_eq!(count.by_name("Bookmarks"), Some(2));
}

#[test]
pub fn test_indexable_projection() {
    let tree = tree(&["a"], &[], &[]);
    let entry = tree.entries().next().unwrap();

    assert_eq!(entry.meta_info["stars.id"], "star-a");

    let document = entry.to_indexable().unwrap();
    assert_eq!(document.date_added.to_rfc3339(), "2014-10-28T20:00:00+00:00");
    assert_eq!(document.meta_info["stars_id"], "star-a");
    assert_eq!(document.meta_info["stars_isSynced"], "true");
    assert!(document.meta_info.keys().all(|k| !k.contains('.')));

    let body = serde_json::to_value(&document).unwrap();
    assert_eq!(body["id"], "id-a");
    assert_eq!(body["type"], "url");
    assert_eq!(body["url"], "https://example.com/a");
    assert!(body["date_added"]
        .as_str()
        .unwrap()
        .starts_with("2014-10-28T20:00:00"));
}

#[test]
pub fn test_indexable_rejects_bad_timestamp() {
    let mut tree = tree(&["a"], &[], &[]);
    tree.roots.bookmark_bar.children[0].date_added = "abc".to_string();

    let entry = tree.entries().next().unwrap();
    assert!(matches!(
        entry.to_indexable(),
        Err(AppError::MalformedTimestamp { .. })
    ));
}

#[test]
pub fn test_load_from_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("Bookmarks");
    std::fs::write(&path, export_json(&["a"], &["b"], &["c"])).unwrap();

    let tree = BookmarkTree::load(&path).unwrap();
    assert_eq!(tree.count().total(), 3);

    assert!(matches!(
        BookmarkTree::load(&tmp.path().join("missing")),
        Err(AppError::IO(_))
    ));
}
