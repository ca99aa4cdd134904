//! Content tree: folders holding nested folders and assets.
//!
//! Older documents keep sub-folders in a separate `folders` list next to
//! `children`. [`normalize`] folds that list into `children` so the rest of
//! the service only ever sees one ordered list per folder.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Deepest folder nesting accepted from callers or disk.
pub const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Asset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    /// Legacy sub-folder list, consumed by [`normalize`]. Kept as raw JSON:
    /// entries that are not folder nodes are dropped rather than rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folders: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn folder(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
            children: Some(children),
            folders: None,
            extra: Map::new(),
        }
    }

    pub fn asset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Asset,
            children: None,
            folders: None,
            extra: Map::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Levels of nesting below and including this node. Measured on
    /// normalized trees, so only `children` counts.
    pub fn depth(&self) -> usize {
        let nested = self
            .children()
            .iter()
            .map(Node::depth)
            .max()
            .unwrap_or(0);
        nested + 1
    }

    /// Walk `path` through folder children by name, first match wins.
    pub fn folder_at_mut(&mut self, path: &[String]) -> Option<&mut Node> {
        let mut current = self;
        for segment in path {
            current = current
                .children
                .as_mut()?
                .iter_mut()
                .find(|c| c.is_folder() && c.name == *segment)?;
        }
        current.is_folder().then_some(current)
    }
}

/// Merge the legacy `folders` list into `children`, recursively.
///
/// Only folder entries survive the merge, and a folder whose name is already
/// present is dropped along with its subtree. Entries that are not nodes at
/// all (a bare string, an unknown type) are skipped, as is a `folders` value
/// that is not a list. Running it twice is the same as running it once.
pub fn normalize(node: &mut Node) {
    if let Some(Value::Array(legacy)) = node.folders.take() {
        let children = node.children.get_or_insert_with(Vec::new);
        let mut seen: HashSet<String> = children
            .iter()
            .filter(|c| c.is_folder())
            .map(|c| c.name.clone())
            .collect();

        let entries = legacy
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<Node>(entry).ok());
        for entry in entries {
            if entry.is_folder() && seen.insert(entry.name.clone()) {
                children.push(entry);
            }
        }
    }

    if let Some(children) = node.children.as_mut() {
        for child in children.iter_mut() {
            if child.is_folder() {
                normalize(child);
            } else {
                // assets never hold folders
                child.folders = None;
            }
        }
    }
}

/// `assets.json`: either one root node or a map of named roots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeDocument {
    Root(Node),
    Named(BTreeMap<String, Node>),
}

impl Default for TreeDocument {
    fn default() -> Self {
        TreeDocument::Named(BTreeMap::new())
    }
}

impl TreeDocument {
    pub fn roots(&self) -> Vec<&Node> {
        match self {
            TreeDocument::Root(node) => vec![node],
            TreeDocument::Named(roots) => roots.values().collect(),
        }
    }

    /// A single-root document matches any requested name or none; a named
    /// document needs the name.
    pub fn root_mut(&mut self, name: Option<&str>) -> Result<&mut Node> {
        match self {
            TreeDocument::Root(node) => match name {
                Some(name) if name != node.name => {
                    Err(AppError::NotFound(format!("tree root '{}'", name)))
                }
                _ => Ok(node),
            },
            TreeDocument::Named(roots) => {
                let name = name.ok_or_else(|| {
                    AppError::MalformedInput("document has named roots, a root name is required".into())
                })?;
                roots
                    .get_mut(name)
                    .ok_or_else(|| AppError::NotFound(format!("tree root '{}'", name)))
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for root in self.roots() {
            let depth = root.depth();
            if depth > MAX_TREE_DEPTH {
                return Err(AppError::MalformedInput(format!(
                    "tree under '{}' is {} levels deep, limit is {}",
                    root.name, depth, MAX_TREE_DEPTH
                )));
            }
        }
        Ok(())
    }
}

pub fn normalize_document(doc: &mut TreeDocument) {
    match doc {
        TreeDocument::Root(node) => normalize(node),
        TreeDocument::Named(roots) => roots.values_mut().for_each(normalize),
    }
}

/// Append `node` to the folder at `path` under `root`. Sibling names are
/// not checked here; the next normalization pass does not dedupe children
/// either, only legacy folders.
pub fn insert(doc: &mut TreeDocument, root: Option<&str>, path: &[String], node: Node) -> Result<()> {
    let folder = folder_mut(doc, root, path)?;
    folder.children.get_or_insert_with(Vec::new).push(node);
    Ok(())
}

/// Remove the first child called `name` from the folder at `path`.
pub fn remove(doc: &mut TreeDocument, root: Option<&str>, path: &[String], name: &str) -> Result<Node> {
    let folder = folder_mut(doc, root, path)?;
    let children = folder.children.get_or_insert_with(Vec::new);
    let position = children
        .iter()
        .position(|c| c.name == name)
        .ok_or_else(|| AppError::NotFound(format!("node '{}' under /{}", name, path.join("/"))))?;
    Ok(children.remove(position))
}

fn folder_mut<'a>(doc: &'a mut TreeDocument, root: Option<&str>, path: &[String]) -> Result<&'a mut Node> {
    doc.root_mut(root)?
        .folder_at_mut(path)
        .ok_or_else(|| AppError::NotFound(format!("folder /{}", path.join("/"))))
}
