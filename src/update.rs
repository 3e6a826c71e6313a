//! Recursive update workflow: update every managed child, then commit and
//! push the root.
//!
//! A child is updated by running the same workflow with the child as root,
//! in-process, so the policy applies at any nesting depth.

use std::path::Path;

use crate::config::SubmodulerConfig;
use crate::error::{Error, Result};
use crate::locator::RepositoryLocator;
use crate::orchestrator::{missing_dir, Orchestrator};
use crate::outcome::{Bucket, CommandKind, Entry, OperationOutcome, ResultAggregator, RunReport};
use crate::repository::Repository;
use crate::runner::{CommandOutput, CommandRunner, Invocation};
use crate::version::SemVerTriple;

/// Nesting limit for recursive updates.
const MAX_DEPTH: usize = 16;

/// Parent-step test runner for repositories with `spec/` but no `test/`.
const RSPEC_COMMAND: &str = "bundle exec rspec";

/// Options for `update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Commit message; synthesised from versions when absent.
    pub message: Option<String>,
    /// Only update the child with this name or path.
    pub only: Option<String>,
    pub skip_parent: bool,
    /// Tag `v<version>` after a successful root update.
    pub release: bool,
    pub dry_run: bool,
}

/// Build the default commit message for a root update.
///
/// Clauses for unknown versions are left out; the trailing clause is always present.
pub fn synthesize_commit_message(
    parent: Option<SemVerTriple>,
    child: Option<SemVerTriple>,
) -> String {
    let mut parts = Vec::new();
    if let Some(v) = parent {
        parts.push(format!("Bump parent version to {}", v));
    }
    if let Some(v) = child {
        parts.push(format!("Bump child version to {}", v));
    }
    parts.push("update scripts".to_string());
    parts.join(". ")
}

/// Outcome of one level of the update workflow.
struct LevelRun {
    aggregator: ResultAggregator,
    success: bool,
}

impl<R: CommandRunner> Orchestrator<R> {
    /// Update children first, then the parent unless `skip_parent` is set.
    pub fn update(&self, options: &UpdateOptions) -> Result<RunReport> {
        if options.message.is_none() && !options.skip_parent {
            return Err(Error::Usage(
                "--message (-m) is required unless --skip-parent is specified".to_string(),
            ));
        }

        self.console.section("=== Parent Update Workflow ===");
        let run = self.update_at(&self.root, &self.config, options, 0, options.skip_parent);

        let mut report = RunReport::new(&run.aggregator, run.success);
        if options.dry_run {
            report = report.with_note("DRY RUN - no commits were created");
        }
        Ok(report)
    }

    fn update_at(
        &self,
        root: &Path,
        config: &SubmodulerConfig,
        options: &UpdateOptions,
        depth: usize,
        skip_parent: bool,
    ) -> LevelRun {
        let _span = tracing::debug_span!("update", depth, root = %root.display()).entered();
        let mut aggregator = ResultAggregator::new(CommandKind::Update);

        let children: Vec<Repository> = RepositoryLocator::new(root, &config.vendor_dir)
            .submodules()
            .into_iter()
            .filter(|child| match (&options.only, depth) {
                (Some(only), 0) => child.name == *only || child.path.as_path() == Path::new(only),
                _ => true,
            })
            .collect();

        if children.is_empty() {
            self.console.info("No submodules found to update.");
        } else {
            self.console
                .info(&format!("Found {} submodule(s) to update", children.len()));
        }

        let mut child_versions = Vec::new();
        for child in &children {
            self.console.section(&format!(
                "{} Updating: {} ({})",
                "─".repeat(4),
                child.name,
                child.path.display()
            ));
            let entry = self.update_child(root, child, options, depth);
            if entry.outcome == OperationOutcome::Succeeded {
                if let Some((_, version)) = self.versions.version_of(&child.dir(root)) {
                    child_versions.push(version);
                }
            }
            self.console.entry(&entry);
            aggregator.push(entry);
        }

        let parent = Repository::parent();
        if skip_parent {
            let entry = Entry::new(
                &parent,
                OperationOutcome::skipped("Skipping parent repository update"),
                "Skipping parent repository update",
            );
            self.console.entry(&entry);
            aggregator.push(entry);
        } else {
            self.console.section(&format!("{} Updating: Parent Repository", "─".repeat(4)));
            let highest_child = child_versions.into_iter().max();
            let entry = self
                .update_root(root, config, options, highest_child)
                .unwrap_or_else(|e| {
                    Entry::new(&parent, OperationOutcome::failed(e.to_string()), e.to_string())
                });
            self.console.entry(&entry);
            aggregator.push(entry);
        }

        let success = !aggregator.has_failures();
        LevelRun {
            aggregator,
            success,
        }
    }

    fn update_child(
        &self,
        root: &Path,
        child: &Repository,
        options: &UpdateOptions,
        depth: usize,
    ) -> Entry {
        let dir = child.dir(root);

        if !dir.is_dir() {
            return Entry::new(
                child,
                OperationOutcome::skipped(missing_dir(child)),
                missing_dir(child),
            );
        }
        if !child.has_git_metadata(root) {
            let reason = format!("Not a git repository: {}", child.path.display());
            return Entry::new(child, OperationOutcome::skipped(reason.clone()), reason);
        }
        if !SubmodulerConfig::is_managed(&dir) {
            return Entry::new(
                child,
                OperationOutcome::skipped("No .submoduler.ini found"),
                "No .submoduler.ini found, skipping",
            );
        }
        if depth + 1 > MAX_DEPTH {
            return Entry::new(
                child,
                OperationOutcome::failed("Submodule nesting too deep"),
                "Submodule nesting too deep",
            );
        }

        let child_config = SubmodulerConfig::load_lenient(&dir);
        let nested = self.update_at(&dir, &child_config, options, depth + 1, false);

        let details = nested.aggregator.summarize().lines();
        if nested.success {
            Entry::new(
                child,
                OperationOutcome::Succeeded,
                format!("Successfully updated {}", child.name),
            )
            .with_details(details)
        } else {
            let failed = nested.aggregator.names_in(Bucket::Failed).join(", ");
            Entry::new(
                child,
                OperationOutcome::failed(format!("Failed to update {} ({})", child.name, failed)),
                format!("Failed to update {}", child.name),
            )
            .with_details(details)
        }
    }

    /// Commit and push all changes in `root`.
    fn update_root(
        &self,
        root: &Path,
        config: &SubmodulerConfig,
        options: &UpdateOptions,
        highest_child: Option<SemVerTriple>,
    ) -> Result<Entry> {
        let parent = Repository::parent();

        let status = self.git(root, &["status", "--porcelain"])?;
        if !status.success {
            return Ok(Entry::new(
                &parent,
                OperationOutcome::failed("Error checking git status"),
                "Error checking git status",
            )
            .with_details(status.lines()));
        }
        if status.is_blank() {
            return Ok(Entry::new(
                &parent,
                OperationOutcome::AlreadySatisfied,
                "No changes in parent repository",
            ));
        }

        let parent_version = self.versions.version_of(root).map(|(_, v)| v);
        let message = options
            .message
            .clone()
            .unwrap_or_else(|| synthesize_commit_message(parent_version, highest_child));

        if options.dry_run {
            return Ok(Entry::new(
                &parent,
                OperationOutcome::Succeeded,
                format!("[DRY RUN] Would commit and push: {}", message),
            )
            .with_details(status.lines()));
        }

        let mut details = Vec::new();
        match self.run_parent_tests(root, config)? {
            Some(out) if out.success => details.push("Tests passed".to_string()),
            Some(_) => details.push("Tests failed, continuing".to_string()),
            None => details.push("No tests found".to_string()),
        }

        let add = self.git(root, &["add", "."])?;
        if !add.success {
            details.extend(add.lines());
            return Ok(Entry::new(
                &parent,
                OperationOutcome::failed("Failed to stage changes"),
                "Failed to stage changes",
            )
            .with_details(details));
        }

        let commit = self.git(root, &["commit", "-m", &message])?;
        if !commit.success {
            details.extend(commit.lines());
            return Ok(Entry::new(
                &parent,
                OperationOutcome::failed("Failed to commit changes"),
                "Failed to commit changes",
            )
            .with_details(details));
        }
        details.push(format!("Committed: {}", message));

        let push = self.git(root, &["push"])?;
        if !push.success {
            details.extend(push.lines());
            return Ok(Entry::new(
                &parent,
                OperationOutcome::failed("Failed to push changes"),
                "Failed to push changes",
            )
            .with_details(details));
        }
        details.push("Changes pushed".to_string());

        if options.release {
            match self.tag_release(root, parent_version) {
                Ok(lines) => details.extend(lines),
                Err(e) => details.push(format!("Release tagging failed: {}", e)),
            }
        }

        Ok(Entry::new(
            &parent,
            OperationOutcome::Succeeded,
            "Changes committed and pushed",
        )
        .with_details(details))
    }

    /// Run `test/` with the configured command, else `spec/` with rspec.
    fn run_parent_tests(
        &self,
        root: &Path,
        config: &SubmodulerConfig,
    ) -> Result<Option<CommandOutput>> {
        if let Some(out) = self.run_tests_in(root, &config.test_command)? {
            return Ok(Some(out));
        }
        if root.join("spec").is_dir() {
            return self.runner.run(root, &Invocation::shell(RSPEC_COMMAND)).map(Some);
        }
        Ok(None)
    }

    /// Create and push `v<version>`. Problems are reported, never fatal.
    fn tag_release(&self, root: &Path, version: Option<SemVerTriple>) -> Result<Vec<String>> {
        let Some(version) = version else {
            return Ok(vec!["No version file found, release tag skipped".to_string()]);
        };
        let tag = format!("v{}", version);

        let existing = self.git(root, &["tag", "--list", &tag])?;
        if existing.success && !existing.is_blank() {
            return Ok(vec![format!("Tag {} already exists", tag)]);
        }

        let created = self.git(root, &["tag", "-a", &tag, "-m", &format!("Release {}", tag)])?;
        if !created.success {
            return Ok(vec![format!("Failed to create tag {}", tag)]);
        }

        let pushed = self.git(root, &["push", "origin", &tag])?;
        Ok(if pushed.success {
            vec![format!("Released {}", tag)]
        } else {
            vec![format!("Created tag {} but failed to push it", tag)]
        })
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
