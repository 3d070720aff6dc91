use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, path::Path, path::PathBuf};

use crate::{errors::AppResult, timestamp::parse_timestamp};

/// Root of a browser bookmark export.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookmarkTree {
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub version: i64,
    pub roots: Roots,
}

/// The three top level folders every export carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Roots {
    pub bookmark_bar: Folder,
    pub other: Folder,
    pub synced: Folder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_transaction_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub children: Vec<Entry>,
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub date_modified: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// A bookmark leaf as found in the export.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta_info: BTreeMap<String, String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_transaction_version: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
}

/// Document body written to the store for one [`Entry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexableEntry {
    pub date_added: DateTime<Utc>,
    pub id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta_info: BTreeMap<String, String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_transaction_version: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl Entry {
    pub fn to_indexable(&self) -> AppResult<IndexableEntry> {
        Ok(IndexableEntry {
            date_added: parse_timestamp(&self.date_added)?,
            id: self.id.clone(),
            meta_info: self
                .meta_info
                .iter()
                .map(|(key, value)| (normalize_field_name(key), value.clone()))
                .collect(),
            name: self.name.clone(),
            sync_transaction_version: self.sync_transaction_version.clone(),
            kind: self.kind.clone(),
            url: self.url.clone(),
        })
    }
}

/// Search engines treat `.` in field names as object paths.
pub fn normalize_field_name(key: &str) -> String {
    key.replace('.', "_")
}

/// Position of a root folder inside the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    BookmarkBar,
    Other,
    Synced,
}

impl RootKind {
    /// Order in which entries are handed to indexing workers.
    pub const PUBLISH_ORDER: [RootKind; 3] =
        [RootKind::BookmarkBar, RootKind::Synced, RootKind::Other];

    pub fn key(&self) -> &'static str {
        match self {
            RootKind::BookmarkBar => "bookmark_bar",
            RootKind::Other => "other",
            RootKind::Synced => "synced",
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl BookmarkTree {
    pub fn parse(bytes: &[u8]) -> AppResult<Self> {
        let tree = serde_json::from_slice::<BookmarkTree>(bytes)?;
        Ok(tree)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        log::debug!("reading bookmarks from {}", path.display());
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    pub fn root(&self, kind: RootKind) -> &Folder {
        match kind {
            RootKind::BookmarkBar => &self.roots.bookmark_bar,
            RootKind::Other => &self.roots.other,
            RootKind::Synced => &self.roots.synced,
        }
    }

    /// Direct children of every root, bar first, then synced, then other.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        RootKind::PUBLISH_ORDER
            .into_iter()
            .flat_map(move |kind| self.root(kind).children.iter())
    }

    /// Shallow per-root counts. Nested folders count as a single child.
    pub fn count(&self) -> CountResult {
        let mut result = CountResult::default();
        for kind in [RootKind::BookmarkBar, RootKind::Other, RootKind::Synced] {
            let folder = self.root(kind);
            result.add(kind, &folder.name, folder.children.len());
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderCount {
    pub root: RootKind,
    pub name: String,
    pub count: usize,
}

/// Entry counts keyed by root position, in construction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountResult {
    folders: Vec<FolderCount>,
}

impl CountResult {
    pub fn add(&mut self, root: RootKind, name: &str, count: usize) {
        match self.folders.iter_mut().find(|f| f.root == root) {
            Some(existing) => {
                existing.name = name.to_string();
                existing.count = count;
            }
            None => self.folders.push(FolderCount {
                root,
                name: name.to_string(),
                count,
            }),
        }
    }

    pub fn get(&self, root: RootKind) -> Option<usize> {
        self.folders.iter().find(|f| f.root == root).map(|f| f.count)
    }

    /// Looks a count up by display name. When several roots share the name
    /// the last one added wins.
    pub fn by_name(&self, name: &str) -> Option<usize> {
        self.folders
            .iter()
            .rev()
            .find(|f| f.name == name)
            .map(|f| f.count)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn total(&self) -> usize {
        self.folders.iter().map(|f| f.count).sum()
    }
}

impl fmt::Display for CountResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for folder in &self.folders {
            let name = if folder.name.is_empty() {
                folder.root.key()
            } else {
                folder.name.as_str()
            };
            writeln!(f, "- {name} ({})", folder.count)?;
        }
        Ok(())
    }
}

/// Best guess at where the local browser keeps its bookmark export.
pub fn default_bookmarks_path() -> Option<PathBuf> {
    let home = homedir::my_home().ok().flatten()?;

    let profile = if cfg!(target_os = "macos") {
        home.join("Library/Application Support/Google/Chrome/Default")
    } else if cfg!(target_os = "windows") {
        home.join("AppData/Local/Google/Chrome/User Data/Default")
    } else {
        home.join(".config/google-chrome/Default")
    };

    Some(profile.join("Bookmarks"))
}
