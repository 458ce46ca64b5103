//! In-memory VFS implementation.
//!
//! The default backing store for sessions and tests. The tree is a
//! `BTreeMap` keyed by normalized absolute path, so children of a directory
//! are a contiguous key range.

use std::borrow::Cow;
use std::collections::BTreeMap;

use decoy_types::error::{DecoyError, Result};

use crate::{EntryKind, Vfs, VfsEntry, VfsMetadata};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

impl Node {
    fn metadata(&self) -> VfsMetadata {
        match self {
            Node::File(data) => VfsMetadata {
                kind: EntryKind::File,
                size: data.len() as u64,
            },
            Node::Dir => VfsMetadata {
                kind: EntryKind::Directory,
                size: 0,
            },
        }
    }
}

/// A fully in-memory virtual file system.
#[derive(Debug, Clone)]
pub struct MemoryVfs {
    nodes: BTreeMap<String, Node>,
}

impl MemoryVfs {
    /// Create a filesystem containing only `/`.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self { nodes }
    }

    /// Create a filesystem with the given directories (and their parents).
    pub fn with_dirs<'a>(dirs: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut vfs = Self::new();
        for dir in dirs {
            vfs.mkdir(dir)?;
        }
        Ok(vfs)
    }

    /// Number of files and directories, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root directory cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn children_prefix(path: &str) -> Cow<'_, str> {
        if path == "/" {
            Cow::Borrowed("/")
        } else {
            Cow::Owned(format!("{path}/"))
        }
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Already in normal form: leading `/`, no empty, `.` or `..` components.
fn is_normalized(path: &str) -> bool {
    path == "/"
        || (path.starts_with('/')
            && path[1..]
                .split('/')
                .all(|part| !matches!(part, "" | "." | "..")))
}

/// Ensure a leading `/`, collapse repeated slashes, drop a trailing one and
/// resolve `.` and `..`. `..` at the root stays at the root.
fn normalize(path: &str) -> Cow<'_, str> {
    if is_normalized(path) {
        return Cow::Borrowed(path);
    }
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }
    Cow::Owned(format!("/{}", parts.join("/")))
}

/// Parent of a normalized path. The root is its own parent.
fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

impl Vfs for MemoryVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir) => {},
            Some(Node::File(_)) => {
                return Err(DecoyError::Vfs(format!("not a directory: {path}")));
            },
            None => return Err(DecoyError::not_found("readdir", path.into_owned())),
        }

        let prefix = Self::children_prefix(&path);
        let entries = self
            .nodes
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(&*prefix))
            .filter_map(|(key, node)| {
                let rest = &key[prefix.len()..];
                if rest.is_empty() || rest.contains('/') {
                    return None;
                }
                let meta = node.metadata();
                Some(VfsEntry {
                    name: rest.to_string(),
                    kind: meta.kind,
                    size: meta.size,
                })
            })
            .collect();
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(DecoyError::Vfs(format!("is a directory: {path}"))),
            None => Err(DecoyError::not_found("open", path.into_owned())),
        }
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let path = normalize(path);
        match self.nodes.get(parent(&path)) {
            Some(Node::Dir) => {},
            Some(Node::File(_)) => {
                return Err(DecoyError::Vfs(format!(
                    "not a directory: {}",
                    parent(&path)
                )));
            },
            None => return Err(DecoyError::not_found("open", parent(&path).to_string())),
        }
        if let Some(Node::Dir) = self.nodes.get(path.as_ref()) {
            return Err(DecoyError::Vfs(format!("is a directory: {path}")));
        }
        self.nodes
            .insert(path.into_owned(), Node::File(data.to_vec()));
        Ok(())
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let path = normalize(path);
        self.nodes
            .get(path.as_ref())
            .map(Node::metadata)
            .ok_or_else(|| DecoyError::not_found("stat", path.into_owned()))
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir) => return Ok(()),
            Some(Node::File(_)) => {
                return Err(DecoyError::Vfs(format!("file exists: {path}")));
            },
            None => {},
        }
        let par = parent(&path).to_string();
        if !self.nodes.contains_key(&par) {
            self.mkdir(&par)?;
        }
        self.nodes.insert(path.into_owned(), Node::Dir);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if path == "/" {
            return Err(DecoyError::Vfs("cannot remove root".to_string()));
        }
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir) => {
                let prefix = Self::children_prefix(&path);
                let has_children = self
                    .nodes
                    .range(prefix.to_string()..)
                    .next()
                    .is_some_and(|(k, _)| k.starts_with(&*prefix));
                if has_children {
                    return Err(DecoyError::Vfs(format!("directory not empty: {path}")));
                }
            },
            Some(Node::File(_)) => {},
            None => return Err(DecoyError::not_found("remove", path.into_owned())),
        }
        self.nodes.remove(path.as_ref());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(normalize(path).as_ref())
    }
}
