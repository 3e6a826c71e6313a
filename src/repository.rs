//! Repository descriptors produced by discovery.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a repository sits relative to the working root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryKind {
    Parent,
    ChildSubmodule,
    VendorRepo,
}

impl RepositoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::ChildSubmodule => "submodule",
            Self::VendorRepo => "vendor",
        }
    }
}

/// One repository the engine operates on.
///
/// Identity is `(kind, path)`; `name` is for display only.
#[derive(Debug, Clone, Serialize)]
pub struct Repository {
    pub name: String,
    /// Path relative to the working root (`.` for the parent).
    pub path: PathBuf,
    pub kind: RepositoryKind,
}

impl Repository {
    pub fn parent() -> Self {
        Self {
            name: "parent".to_string(),
            path: PathBuf::from("."),
            kind: RepositoryKind::Parent,
        }
    }

    pub fn child(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: RepositoryKind::ChildSubmodule,
        }
    }

    pub fn vendor(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: RepositoryKind::VendorRepo,
        }
    }

    pub fn is_parent(&self) -> bool {
        self.kind == RepositoryKind::Parent
    }

    /// Absolute working directory of this repository under `root`.
    pub fn dir(&self, root: &Path) -> PathBuf {
        if self.is_parent() {
            root.to_path_buf()
        } else {
            root.join(&self.path)
        }
    }

    /// Whether the repository has git metadata (`.git` dir, or file for submodules).
    pub fn has_git_metadata(&self, root: &Path) -> bool {
        self.dir(root).join(".git").exists()
    }
}

impl PartialEq for Repository {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.path == other.path
    }
}

impl Eq for Repository {}

impl std::hash::Hash for Repository {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.path.hash(state);
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
