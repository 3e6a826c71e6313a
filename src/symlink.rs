//! Links shared steering documents from vendored Submoduler gems into the root.

use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Steering directory inside the root and inside each vendored gem.
pub const STEERING_DIR: &str = ".kiro/steering";

/// Vendored gems whose steering documents are linked.
const SOURCE_GEMS: [&str; 2] = ["submoduler_parent", "submoduler_child"];

/// What `build_symlinks` did, per file name.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SymlinkReport {
    pub target_dir: PathBuf,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// Regular files that were left alone.
    pub skipped: Vec<String>,
    pub broken: Vec<String>,
    pub missing_sources: Vec<PathBuf>,
    /// Markdown entries in the target directory afterwards.
    pub total: usize,
}

impl SymlinkReport {
    pub fn print(&self) {
        println!("\n{}", "=== Symlink Build Results ===".bright_white().bold());
        for source in &self.missing_sources {
            println!("{} Source directory not found: {}", "⚠".yellow(), source.display());
        }

        let groups = [
            ("✓".green(), "Created", &self.created),
            ("↻".cyan(), "Updated", &self.updated),
            ("⊘".yellow(), "Skipped (already exist)", &self.skipped),
            ("✗".red(), "Broken", &self.broken),
        ];
        for (icon, label, files) in groups {
            if files.is_empty() {
                continue;
            }
            println!("{} {}: {} file(s)", icon, label, files.len());
            for file in files.iter() {
                println!("  {}", file.dimmed());
            }
        }

        println!(
            "\n{} {}: {}",
            "Total symlinks in".cyan(),
            self.target_dir.display(),
            self.total
        );
    }
}

/// Link every `*.md` from the vendored gems' steering dirs into `root/.kiro/steering`.
#[cfg(unix)]
pub fn build_symlinks(root: &Path, vendor_dir: &Path) -> Result<SymlinkReport> {
    let target_dir = root.join(STEERING_DIR);
    std::fs::create_dir_all(&target_dir)?;

    let mut report = SymlinkReport {
        target_dir: PathBuf::from(STEERING_DIR),
        ..SymlinkReport::default()
    };

    for gem in SOURCE_GEMS {
        let source_rel = vendor_dir.join(gem).join(STEERING_DIR);
        let source_dir = root.join(&source_rel);
        if !source_dir.is_dir() {
            report.missing_sources.push(source_rel);
            continue;
        }

        for file_name in markdown_files(&source_dir)? {
            let target = target_dir.join(&file_name);
            // target sits two levels below root
            let link_to = Path::new("../..").join(&source_rel).join(&file_name);

            let existing = std::fs::symlink_metadata(&target).ok();
            match existing {
                Some(meta) if meta.file_type().is_symlink() => {
                    std::fs::remove_file(&target)?;
                    report.updated.push(file_name.clone());
                }
                Some(_) => {
                    report.skipped.push(file_name.clone());
                    continue;
                }
                None => report.created.push(file_name.clone()),
            }

            std::os::unix::fs::symlink(&link_to, &target)?;
        }
    }

    for file_name in markdown_files(&target_dir)? {
        let link = target_dir.join(&file_name);
        let is_link = std::fs::symlink_metadata(&link)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_link && !link.exists() {
            report.broken.push(file_name.clone());
        }
        report.total += 1;
    }

    Ok(report)
}

#[cfg(not(unix))]
pub fn build_symlinks(_root: &Path, _vendor_dir: &Path) -> Result<SymlinkReport> {
    Err(crate::error::Error::Usage(
        "symlink_build is only supported on unix platforms".to_string(),
    ))
}

/// Sorted names of `*.md` entries directly inside `dir`, dangling links included.
fn markdown_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "md") {
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn seed(root: &Path, gem: &str, files: &[&str]) {
        let dir = root.join("vendor").join(gem).join(STEERING_DIR);
        fs::create_dir_all(&dir).unwrap();
        for f in files {
            fs::write(dir.join(f), format!("# {f}")).unwrap();
        }
    }

    #[test]
    fn test_creates_relative_links() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "submoduler_parent", &["a.md", "notes.txt"]);
        seed(temp.path(), "submoduler_child", &["b.md"]);

        let report = build_symlinks(temp.path(), Path::new("vendor")).unwrap();
        assert_eq!(report.created, vec!["a.md", "b.md"]);
        assert_eq!(report.total, 2);

        let link = temp.path().join(STEERING_DIR).join("a.md");
        assert_eq!(
            fs::read_link(&link).unwrap(),
            PathBuf::from("../../vendor/submoduler_parent/.kiro/steering/a.md")
        );
        assert_eq!(fs::read_to_string(&link).unwrap(), "# a.md");
    }

    #[test]
    fn test_relink_and_keep_regular_files() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "submoduler_parent", &["a.md", "own.md"]);
        fs::create_dir_all(temp.path().join(STEERING_DIR)).unwrap();
        fs::write(temp.path().join(STEERING_DIR).join("own.md"), "mine").unwrap();

        build_symlinks(temp.path(), Path::new("vendor")).unwrap();
        let report = build_symlinks(temp.path(), Path::new("vendor")).unwrap();

        assert_eq!(report.updated, vec!["a.md"]);
        assert_eq!(report.skipped, vec!["own.md"]);
        assert_eq!(report.missing_sources.len(), 1);
        assert_eq!(
            fs::read_to_string(temp.path().join(STEERING_DIR).join("own.md")).unwrap(),
            "mine"
        );
    }

    #[test]
    fn test_reports_broken_links() {
        let temp = TempDir::new().unwrap();
        seed(temp.path(), "submoduler_parent", &["gone.md"]);
        build_symlinks(temp.path(), Path::new("vendor")).unwrap();
        fs::remove_dir_all(temp.path().join("vendor")).unwrap();

        let report = build_symlinks(temp.path(), Path::new("vendor")).unwrap();
        assert_eq!(report.broken, vec!["gone.md"]);
    }
}
