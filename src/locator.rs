//! Repository discovery: parent, `.gitmodules` children and vendor repositories.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::repository::Repository;

/// Submodule manifest file name.
pub const MANIFEST_FILE: &str = ".gitmodules";

/// A `[submodule "name"]` section with its `path =` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleEntry {
    pub name: String,
    pub path: String,
}

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*\[submodule\s+"(.+)"\]\s*$"#).unwrap())
}

fn other_section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[.*\]\s*$").unwrap())
}

fn path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*path\s*=\s*(.+?)\s*$").unwrap())
}

/// Parse `.gitmodules` text into entries, preserving file order.
///
/// Sections without a `path =` line are dropped; a repeated `path =` replaces
/// the earlier one. Unrelated lines and sections are ignored.
pub fn parse_gitmodules(content: &str) -> Vec<SubmoduleEntry> {
    let mut entries = Vec::new();
    let mut current: Option<(String, Option<String>)> = None;

    for line in content.lines() {
        if let Some(caps) = section_re().captures(line) {
            if let Some((name, Some(path))) = current.take() {
                entries.push(SubmoduleEntry { name, path });
            }
            current = Some((caps[1].to_string(), None));
        } else if other_section_re().is_match(line) {
            if let Some((name, Some(path))) = current.take() {
                entries.push(SubmoduleEntry { name, path });
            }
        } else if let Some(caps) = path_re().captures(line) {
            if let Some((_, path)) = current.as_mut() {
                *path = Some(caps[1].to_string());
            }
        }
    }

    if let Some((name, Some(path))) = current {
        entries.push(SubmoduleEntry { name, path });
    }

    entries
}

/// The repository set of one working root, by kind.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub parent: Repository,
    pub children: Vec<Repository>,
    pub vendors: Vec<Repository>,
}

impl Discovery {
    /// Children (manifest order), then vendors (sorted), then the parent.
    pub fn children_first(&self) -> Vec<Repository> {
        self.children
            .iter()
            .chain(self.vendors.iter())
            .cloned()
            .chain(std::iter::once(self.parent.clone()))
            .collect()
    }

    /// Parent, then children in manifest order.
    pub fn parent_first(&self) -> Vec<Repository> {
        std::iter::once(self.parent.clone())
            .chain(self.children.iter().cloned())
            .collect()
    }
}

/// Finds the repositories managed from a working root.
#[derive(Debug)]
pub struct RepositoryLocator {
    root: PathBuf,
    vendor_dir: PathBuf,
}

impl RepositoryLocator {
    /// Create a locator for `root`, with vendor repos under `root/vendor_dir`.
    pub fn new(root: impl AsRef<Path>, vendor_dir: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            vendor_dir: vendor_dir.as_ref().to_path_buf(),
        }
    }

    /// Discover every repository. Never fails; absent sources yield nothing.
    pub fn discover(&self) -> Discovery {
        Discovery {
            parent: Repository::parent(),
            children: self.submodules(),
            vendors: self.vendor_repos(),
        }
    }

    /// Children declared in `.gitmodules`, in file order.
    pub fn submodules(&self) -> Vec<Repository> {
        let manifest = self.root.join(MANIFEST_FILE);
        let content = match std::fs::read_to_string(&manifest) {
            Ok(content) => content,
            Err(e) => {
                if manifest.exists() {
                    tracing::warn!(path = %manifest.display(), error = %e, "unreadable submodule manifest");
                }
                return Vec::new();
            }
        };

        parse_gitmodules(&content)
            .into_iter()
            .map(|entry| Repository::child(entry.name, entry.path))
            .collect()
    }

    /// Immediate subdirectories of the vendor root that hold a `.git` entry, sorted.
    pub fn vendor_repos(&self) -> Vec<Repository> {
        let vendor_root = self.root.join(&self.vendor_dir);
        if !vendor_root.is_dir() {
            return Vec::new();
        }

        let mut repos = Vec::new();
        for entry in WalkDir::new(&vendor_root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable vendor entry");
                    continue;
                }
            };

            if !entry.file_type().is_dir() || !entry.path().join(".git").exists() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let path = self.vendor_dir.join(&name);
            repos.push(Repository::vendor(name, path));
        }

        repos
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
