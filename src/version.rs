//! Version discovery, comparison and rewriting for `version.rb` declarations.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

/// A `MAJOR.MINOR.PATCH` version. Ordering is componentwise, major first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SemVerTriple {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVerTriple {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for SemVerTriple {
    type Err = String;

    /// Accepts exactly three dot-separated decimal components. Leading zeros
    /// are allowed; pre-release and build suffixes are rejected.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 3 {
            return Err(format!("Invalid version '{}': expected MAJOR.MINOR.PATCH", s));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("Invalid version '{}': '{}' is not a number", s, part));
            }
            *slot = part
                .parse()
                .map_err(|e| format!("Invalid version '{}': {}", s, e))?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for SemVerTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bVERSION\s*=\s*(?:"([^"\n]*)"|'([^'\n]*)')"#).unwrap()
    })
}

/// Locate the first `VERSION = "..."` value in `content`.
///
/// Returns the byte range of the quoted value (quotes excluded) and the value.
fn find_assignment(content: &str) -> Option<(std::ops::Range<usize>, &str)> {
    let caps = assignment_re().captures(content)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    Some((value.range(), value.as_str()))
}

/// Raw version string declared in `content`, if any.
pub fn declared_version(content: &str) -> Option<&str> {
    find_assignment(content).map(|(_, value)| value)
}

/// `content` with the first declared version replaced by `new_version`.
///
/// Everything outside the quoted value is kept byte for byte.
pub fn replace_version(content: &str, new_version: &SemVerTriple) -> Option<String> {
    let (range, _) = find_assignment(content)?;
    let mut updated = String::with_capacity(content.len() + 8);
    updated.push_str(&content[..range.start]);
    updated.push_str(&new_version.to_string());
    updated.push_str(&content[range.end..]);
    Some(updated)
}

/// Finds, reads and rewrites a repository's version declaration.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionInspector;

impl VersionInspector {
    /// Glob patterns searched under a repository, in priority order.
    const PATTERNS: [&'static str; 2] = ["lib/*/version.rb", "lib/**/version.rb"];

    pub fn new() -> Self {
        Self
    }

    /// First `version.rb` under `repo_dir/lib`, one level deep before recursive.
    pub fn find_version_file(&self, repo_dir: &Path) -> Option<PathBuf> {
        let base = glob::Pattern::escape(&repo_dir.to_string_lossy());

        for pattern in Self::PATTERNS {
            let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
            let paths = match glob::glob(&full) {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::warn!(pattern = %full, error = %e, "invalid version file pattern");
                    continue;
                }
            };

            if let Some(path) = paths.filter_map(|p| p.ok()).find(|p| p.is_file()) {
                return Some(path);
            }
        }

        None
    }

    /// Parse the version declared in `file`. Unreadable or unparsable is `None`.
    pub fn extract_version(&self, file: &Path) -> Option<SemVerTriple> {
        let content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "cannot read version file");
                return None;
            }
        };

        let raw = declared_version(&content)?;
        match raw.parse() {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::debug!(path = %file.display(), error = %e, "ignoring version");
                None
            }
        }
    }

    /// Version of the repository at `repo_dir`, if it declares one.
    pub fn version_of(&self, repo_dir: &Path) -> Option<(PathBuf, SemVerTriple)> {
        let file = self.find_version_file(repo_dir)?;
        let version = self.extract_version(&file)?;
        Some((file, version))
    }

    /// Rewrite the declared version in `file`. Returns `false` if the file has
    /// no declaration to rewrite.
    pub fn write_version(&self, file: &Path, new_version: &SemVerTriple) -> crate::Result<bool> {
        let content = std::fs::read_to_string(file)?;
        match replace_version(&content, new_version) {
            Some(updated) => {
                std::fs::write(file, updated)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A managed child's declared version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    pub repository_name: String,
    /// Repository path relative to the working root.
    pub path: PathBuf,
    /// The `version.rb` file the version was read from.
    pub file: PathBuf,
    pub version: SemVerTriple,
}

/// What sync-version intends to do with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    AlreadySatisfied,
    Bump { from: SemVerTriple },
}

/// Target version plus the action for every record.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub target_version: SemVerTriple,
    /// Name of the first repository declaring the target.
    pub source: String,
    pub entries: Vec<(VersionRecord, SyncAction)>,
}

impl SyncPlan {
    /// Highest version among `records`; ties keep the earliest record.
    pub fn highest(records: &[VersionRecord]) -> Option<&VersionRecord> {
        records.iter().fold(None, |best, record| match best {
            Some(b) if b.version >= record.version => Some(b),
            _ => Some(record),
        })
    }

    /// Plan a sync of every record to the highest version. `None` if empty.
    pub fn build(records: &[VersionRecord]) -> Option<Self> {
        let highest = Self::highest(records)?;
        let target_version = highest.version;

        let entries = records
            .iter()
            .map(|record| {
                let action = if record.version == target_version {
                    SyncAction::AlreadySatisfied
                } else {
                    SyncAction::Bump {
                        from: record.version,
                    }
                };
                (record.clone(), action)
            })
            .collect();

        Some(Self {
            target_version,
            source: highest.repository_name.clone(),
            entries,
        })
    }

    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, action)| matches!(action, SyncAction::Bump { .. }))
            .count()
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
