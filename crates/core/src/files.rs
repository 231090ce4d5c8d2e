// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory file argument tree.
//!
//! Commands with file arguments receive one of these; the HTTP layer maps
//! it to and from a multipart body. Paths use `/` separators.

use crate::error::Error;

/// A node in a hierarchical file argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileNode {
    File { name: String, content: Vec<u8> },
    Directory { name: String, children: Vec<FileNode> },
}

impl FileNode {
    pub fn file(name: &str, content: impl Into<Vec<u8>>) -> Self {
        FileNode::File { name: name.to_string(), content: content.into() }
    }

    pub fn directory(name: &str, children: Vec<FileNode>) -> Self {
        FileNode::Directory { name: name.to_string(), children }
    }

    pub fn name(&self) -> &str {
        match self {
            FileNode::File { name, .. } | FileNode::Directory { name, .. } => name,
        }
    }

    /// Depth-first listing as `(path, content)`; directories carry `None`.
    pub fn entries(&self) -> Vec<(String, Option<&[u8]>)> {
        let mut out = Vec::new();
        self.collect("", &mut out);
        out
    }

    fn collect<'a>(&'a self, prefix: &str, out: &mut Vec<(String, Option<&'a [u8]>)>) {
        let path = if prefix.is_empty() {
            self.name().to_string()
        } else {
            format!("{prefix}/{}", self.name())
        };
        match self {
            FileNode::File { content, .. } => out.push((path, Some(content))),
            FileNode::Directory { children, .. } => {
                out.push((path.clone(), None));
                for child in children {
                    child.collect(&path, out);
                }
            }
        }
    }

    /// Find a file by its `/`-separated path relative to this node.
    pub fn find(&self, path: &str) -> Option<&FileNode> {
        let mut node = self;
        let mut parts = path.split('/');
        if parts.next()? != node.name() {
            return None;
        }
        for part in parts {
            match node {
                FileNode::Directory { children, .. } => {
                    node = children.iter().find(|c| c.name() == part)?;
                }
                FileNode::File { .. } => return None,
            }
        }
        Some(node)
    }
}

/// Rebuilds a [`FileNode`] tree from `(path, content)` entries, the inverse
/// of [`FileNode::entries`]. Intermediate directories are created on demand.
#[derive(Default)]
pub struct FileTreeBuilder {
    children: Vec<FileNode>,
}

impl FileTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, content: Option<Vec<u8>>) -> Result<(), Error> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return Err(Error::client("empty file path in upload"));
        }
        insert_into(&mut self.children, &parts, content)
    }

    /// The assembled tree: the single root when exactly one was inserted,
    /// otherwise a synthetic directory wrapping all roots.
    pub fn build(mut self, wrapper_name: &str) -> Option<FileNode> {
        match self.children.len() {
            0 => None,
            1 => Some(self.children.remove(0)),
            _ => Some(FileNode::directory(wrapper_name, self.children)),
        }
    }
}

fn insert_into(
    children: &mut Vec<FileNode>,
    parts: &[&str],
    content: Option<Vec<u8>>,
) -> Result<(), Error> {
    let (head, rest) = (parts[0], &parts[1..]);
    if rest.is_empty() {
        return match content {
            Some(bytes) => {
                if children.iter().any(|c| c.name() == head) {
                    return Err(Error::client(format!("duplicate file entry: {head}")));
                }
                children.push(FileNode::file(head, bytes));
                Ok(())
            }
            None => {
                if !children.iter().any(|c| c.name() == head) {
                    children.push(FileNode::directory(head, Vec::new()));
                }
                Ok(())
            }
        };
    }
    let pos = match children.iter().position(|c| c.name() == head) {
        Some(i) => i,
        None => {
            children.push(FileNode::directory(head, Vec::new()));
            children.len() - 1
        }
    };
    match &mut children[pos] {
        FileNode::Directory { children, .. } => insert_into(children, rest, content),
        FileNode::File { .. } => {
            Err(Error::client(format!("file entry {head} used as a directory")))
        }
    }
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
