mod aliases;
mod bookmarks;

use serde_json::{json, Value};

use crate::bookmarks::BookmarkTree;

pub use memory_store::MemoryStore;

/// 2014-10-28T20:00:00Z
pub const DATE_ADDED: &str = "13059000000000000";

pub fn entry(name: &str) -> Value {
    json!({
        "date_added": DATE_ADDED,
        "id": format!("id-{name}"),
        "meta_info": { "stars.id": format!("star-{name}"), "stars.isSynced": "true" },
        "name": name,
        "sync_transaction_version": "1",
        "type": "url",
        "url": format!("https://example.com/{name}"),
    })
}

fn folder(name: &str, children: Vec<Value>) -> Value {
    json!({
        "children": children,
        "date_added": DATE_ADDED,
        "date_modified": "0",
        "id": format!("root-{name}"),
        "name": name,
        "type": "folder",
    })
}

pub fn export_json(bar: &[&str], synced: &[&str], other: &[&str]) -> String {
    let children = |names: &[&str]| names.iter().map(|n| entry(n)).collect::<Vec<_>>();
    json!({
        "checksum": "0f1e2d3c4b5a69788796a5b4c3d2e1f0",
        "version": 1,
        "roots": {
            "bookmark_bar": folder("Bookmarks bar", children(bar)),
            "other": folder("Other bookmarks", children(other)),
            "synced": folder("Mobile bookmarks", children(synced)),
        }
    })
    .to_string()
}

pub fn tree(bar: &[&str], synced: &[&str], other: &[&str]) -> BookmarkTree {
    BookmarkTree::parse(export_json(bar, synced, other).as_bytes()).unwrap()
}

/// Tree with `n` entries spread across the three roots.
pub fn tree_with(n: usize) -> BookmarkTree {
    let names = (0..n).map(|i| format!("b{i:02}")).collect::<Vec<_>>();
    let names = names.iter().map(String::as_str).collect::<Vec<_>>();
    let third = n / 3;
    tree(
        &names[..third],
        &names[third..2 * third],
        &names[2 * third..],
    )
}
