//! Drives per-repository git operations across the discovered repository set.
//!
//! Each command is a single pass over an ordered repository sequence. Every
//! visited repository yields exactly one [`Entry`]; a failure is recorded and
//! the pass continues, except where a command documents otherwise.

use std::path::{Path, PathBuf};

use crate::config::SubmodulerConfig;
use crate::error::{Error, Result};
use crate::locator::{Discovery, RepositoryLocator};
use crate::outcome::{CommandKind, Console, Entry, OperationOutcome, ResultAggregator, RunReport};
use crate::repository::{Repository, RepositoryKind};
use crate::runner::{CommandOutput, CommandRunner, Invocation};
use crate::version::VersionInspector;

/// Options for `push`.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub dry_run: bool,
}

/// Options for `test`.
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    pub parent_only: bool,
    pub children_only: bool,
    /// Restrict children to the one with this manifest name.
    pub submodule: Option<String>,
}

/// Options for `add_branch`.
#[derive(Debug, Clone, Default)]
pub struct BranchOptions {
    pub name: String,
    pub checkout: bool,
    pub dry_run: bool,
}

/// Runs commands against one working root.
pub struct Orchestrator<R: CommandRunner> {
    pub(crate) root: PathBuf,
    pub(crate) config: SubmodulerConfig,
    pub(crate) runner: R,
    pub(crate) versions: VersionInspector,
    pub(crate) console: Console,
}

pub(crate) fn heading(kind: RepositoryKind) -> &'static str {
    match kind {
        RepositoryKind::Parent => "Parent Repository:",
        RepositoryKind::ChildSubmodule => "Child Submodules:",
        RepositoryKind::VendorRepo => "Vendor Repositories:",
    }
}

pub(crate) fn missing_dir(repository: &Repository) -> String {
    format!("Directory does not exist: {}", repository.path.display())
}

impl<R: CommandRunner> Orchestrator<R> {
    /// Create an orchestrator for `root`. Progress output is off until
    /// [`with_console`](Self::with_console) is called.
    pub fn new(root: impl AsRef<Path>, config: SubmodulerConfig, runner: R) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
            runner,
            versions: VersionInspector::new(),
            console: Console::silent(),
        }
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn discover(&self) -> Discovery {
        RepositoryLocator::new(&self.root, &self.config.vendor_dir).discover()
    }

    pub(crate) fn git(&self, dir: &Path, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run(dir, &Invocation::git(args.iter().copied()))
    }

    /// Record `result` for `repository`, turning a runner error into `Failed`.
    fn settle(
        &self,
        aggregator: &mut ResultAggregator,
        repository: &Repository,
        result: Result<Entry>,
    ) -> OperationOutcome {
        let entry = result.unwrap_or_else(|e| {
            Entry::new(repository, OperationOutcome::failed(e.to_string()), e.to_string())
        });
        self.console.entry(&entry);
        let outcome = entry.outcome.clone();
        aggregator.push(entry);
        outcome
    }

    /// Print a section heading whenever the repository kind changes.
    fn announce(&self, last: &mut Option<RepositoryKind>, repository: &Repository) {
        if *last != Some(repository.kind) {
            self.console.section(heading(repository.kind));
            *last = Some(repository.kind);
        }
        self.console.repository(repository);
    }

    /// Report working-tree changes: children, vendors, then the parent.
    pub fn status(&self) -> Result<RunReport> {
        self.console.info("Checking repository status...");
        let mut aggregator = ResultAggregator::new(CommandKind::Status);
        let mut last = None;

        for repository in self.discover().children_first() {
            self.announce(&mut last, &repository);
            let result = self.status_one(&repository);
            self.settle(&mut aggregator, &repository, result);
        }

        let success = !aggregator.has_failures();
        Ok(RunReport::new(&aggregator, success))
    }

    fn status_one(&self, repository: &Repository) -> Result<Entry> {
        let dir = repository.dir(&self.root);
        if !dir.is_dir() {
            return Ok(Entry::new(
                repository,
                OperationOutcome::failed(missing_dir(repository)),
                missing_dir(repository),
            ));
        }

        let out = self.git(&dir, &["status", "--short"])?;
        let entry = if !out.success {
            Entry::new(
                repository,
                OperationOutcome::failed("Error checking git status"),
                "Error checking git status",
            )
            .with_details(out.lines())
        } else if out.is_blank() {
            Entry::new(
                repository,
                OperationOutcome::AlreadySatisfied,
                "Working tree is clean",
            )
        } else {
            Entry::new(
                repository,
                OperationOutcome::Succeeded,
                "Working tree has changes",
            )
            .with_details(out.lines())
        };
        Ok(entry)
    }

    /// Push children, vendors, then the parent.
    ///
    /// Child and vendor failures are recorded and skipped over; a failed
    /// parent push makes the whole command unsuccessful.
    pub fn push(&self, options: &PushOptions) -> Result<RunReport> {
        self.console
            .info("Pushing changes to parent and child repositories...");
        let mut aggregator = ResultAggregator::new(CommandKind::Push);
        let mut last = None;
        let mut parent_failed = false;

        for repository in self.discover().children_first() {
            self.announce(&mut last, &repository);
            let result = self.push_one(&repository, options);
            let outcome = self.settle(&mut aggregator, &repository, result);

            if repository.is_parent() && outcome.is_failure() {
                parent_failed = true;
            }
        }

        let report = RunReport::new(&aggregator, !parent_failed);
        Ok(match (parent_failed, options.dry_run) {
            (true, _) => report.with_note("Failed to push parent repository"),
            (false, true) => report.with_note("DRY RUN - nothing was pushed"),
            (false, false) => report.with_note("Push complete"),
        })
    }

    /// Commits on HEAD not yet on the upstream. No upstream counts as zero.
    pub(crate) fn ahead_count(&self, dir: &Path) -> Result<u64> {
        let out = self.git(dir, &["rev-list", "@{u}..HEAD", "--count"])?;
        if !out.success {
            return Ok(0);
        }
        Ok(out.output.trim().parse().unwrap_or(0))
    }

    fn push_one(&self, repository: &Repository, options: &PushOptions) -> Result<Entry> {
        let dir = repository.dir(&self.root);
        if !dir.is_dir() {
            return Ok(Entry::new(
                repository,
                OperationOutcome::skipped(missing_dir(repository)),
                format!("Not pushed: {}", missing_dir(repository)),
            ));
        }

        let ahead = self.ahead_count(&dir)?;
        if ahead == 0 {
            return Ok(Entry::new(
                repository,
                OperationOutcome::AlreadySatisfied,
                "No commits to push",
            ));
        }

        if options.dry_run {
            return Ok(Entry::new(
                repository,
                OperationOutcome::Succeeded,
                format!("[DRY RUN] Would push {} commit(s) to origin", ahead),
            ));
        }

        let out = self.git(&dir, &["push"])?;
        Ok(if out.success {
            Entry::new(
                repository,
                OperationOutcome::Succeeded,
                format!("Pushed {} commit(s)", ahead),
            )
        } else {
            Entry::new(repository, OperationOutcome::failed("Push failed"), "Push failed")
                .with_details(out.lines())
        })
    }

    /// Run the configured test command in the parent, then in each child.
    pub fn test(&self, options: &TestOptions) -> Result<RunReport> {
        if options.parent_only && options.children_only {
            return Err(Error::Usage(
                "--parent-only and --children-only are mutually exclusive".to_string(),
            ));
        }

        let discovery = self.discover();
        if let Some(name) = &options.submodule {
            if !discovery.children.iter().any(|c| &c.name == name) {
                return Err(Error::Usage(format!("Unknown submodule '{}'", name)));
            }
        }

        let targets: Vec<Repository> = discovery
            .parent_first()
            .into_iter()
            .filter(|r| {
                if r.is_parent() {
                    !options.children_only
                } else {
                    !options.parent_only
                        && options.submodule.as_deref().map_or(true, |n| r.name == n)
                }
            })
            .collect();

        self.console.info("Running tests...");
        let mut aggregator = ResultAggregator::new(CommandKind::Test);
        let mut last = None;

        for repository in &targets {
            self.announce(&mut last, repository);
            let result = self.test_one(repository);
            self.settle(&mut aggregator, repository, result);
        }

        let success = !aggregator.has_failures();
        Ok(RunReport::new(&aggregator, success))
    }

    /// Run `test_command` if `dir/test` exists. `None` when there is nothing to run.
    pub(crate) fn run_tests_in(&self, dir: &Path, test_command: &str) -> Result<Option<CommandOutput>> {
        if !dir.join("test").is_dir() {
            return Ok(None);
        }
        let out = self.runner.run(dir, &Invocation::shell(test_command))?;
        Ok(Some(out))
    }

    fn test_one(&self, repository: &Repository) -> Result<Entry> {
        let dir = repository.dir(&self.root);
        if !dir.is_dir() {
            return Ok(Entry::new(
                repository,
                OperationOutcome::failed(missing_dir(repository)),
                missing_dir(repository),
            ));
        }

        Ok(match self.run_tests_in(&dir, &self.config.test_command)? {
            None => Entry::new(
                repository,
                OperationOutcome::skipped("No test directory found"),
                "No test directory found",
            ),
            Some(out) if out.success => Entry::new(
                repository,
                OperationOutcome::Succeeded,
                "All tests passed",
            )
            .with_details(out.lines()),
            Some(out) => Entry::new(
                repository,
                OperationOutcome::failed("Some tests failed"),
                "Some tests failed",
            )
            .with_details(out.lines()),
        })
    }

    /// Create a branch in every child, vendor, and finally the parent.
    pub fn add_branch(&self, options: &BranchOptions) -> Result<RunReport> {
        let name = options.name.trim();
        if name.is_empty() {
            return Err(Error::Usage("Branch name is required".to_string()));
        }
        if name.starts_with('-') {
            return Err(Error::Usage(format!("Invalid branch name '{}'", name)));
        }

        self.console
            .info(&format!("Creating branch '{}' across all repositories...", name));
        let mut aggregator = ResultAggregator::new(CommandKind::AddBranch);
        let mut last = None;

        for repository in self.discover().children_first() {
            self.announce(&mut last, &repository);
            let result = self.branch_one(&repository, name, options);
            self.settle(&mut aggregator, &repository, result);
        }

        let success = !aggregator.has_failures();
        let mut report = RunReport::new(&aggregator, success);
        if options.dry_run {
            report = report.with_note("DRY RUN - no branches were created");
        } else if options.checkout && success {
            report = report.with_note(format!("All repositories are now on branch '{}'", name));
        }
        Ok(report)
    }

    fn branch_one(&self, repository: &Repository, name: &str, options: &BranchOptions) -> Result<Entry> {
        let dir = repository.dir(&self.root);
        if !dir.is_dir() {
            return Ok(Entry::new(
                repository,
                OperationOutcome::failed(missing_dir(repository)),
                missing_dir(repository),
            ));
        }

        let local = self.git(&dir, &["branch", "--list", name])?;
        if !local.success {
            return Ok(Entry::new(
                repository,
                OperationOutcome::failed("Unable to list branches"),
                "Unable to list branches",
            )
            .with_details(local.lines()));
        }

        if !local.is_blank() {
            let mut details = Vec::new();
            if options.checkout {
                details.push(self.checkout(&dir, name, options.dry_run)?);
            }
            return Ok(Entry::new(
                repository,
                OperationOutcome::AlreadySatisfied,
                "Branch already exists locally",
            )
            .with_details(details));
        }

        let remote_ref = format!("origin/{}", name);
        let remote = self.git(&dir, &["branch", "-r", "--list", &remote_ref])?;
        if remote.success && !remote.is_blank() {
            if options.dry_run {
                return Ok(Entry::new(
                    repository,
                    OperationOutcome::Succeeded,
                    "[DRY RUN] Would create tracking branch",
                ));
            }

            let out = self.git(&dir, &["checkout", "-b", name, "--track", &remote_ref])?;
            return Ok(if out.success {
                Entry::new(
                    repository,
                    OperationOutcome::Succeeded,
                    format!("Created tracking branch for {}", remote_ref),
                )
            } else {
                Entry::new(
                    repository,
                    OperationOutcome::failed("Failed to create tracking branch"),
                    "Failed to create tracking branch",
                )
                .with_details(out.lines())
            });
        }

        if options.dry_run {
            return Ok(Entry::new(
                repository,
                OperationOutcome::Succeeded,
                format!("[DRY RUN] Would create branch '{}'", name),
            ));
        }

        let out = self.git(&dir, &["branch", name])?;
        if !out.success {
            return Ok(Entry::new(
                repository,
                OperationOutcome::failed("Failed to create branch"),
                "Failed to create branch",
            )
            .with_details(out.lines()));
        }

        let mut details = Vec::new();
        if options.checkout {
            details.push(self.checkout(&dir, name, false)?);
        }
        Ok(Entry::new(
            repository,
            OperationOutcome::Succeeded,
            format!("Created branch '{}'", name),
        )
        .with_details(details))
    }

    /// Check out `name`; the result is reported as a detail line only.
    fn checkout(&self, dir: &Path, name: &str, dry_run: bool) -> Result<String> {
        if dry_run {
            return Ok(format!("[DRY RUN] Would checkout '{}'", name));
        }

        let out = self.git(dir, &["checkout", name])?;
        Ok(if out.success {
            format!("Checked out '{}'", name)
        } else {
            format!("Failed to checkout '{}': {}", name, out.lines().join(" "))
        })
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
