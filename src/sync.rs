//! Version synchronisation across managed children.

use std::path::Path;

use crate::config::SubmodulerConfig;
use crate::error::Result;
use crate::orchestrator::{missing_dir, Orchestrator};
use crate::outcome::{CommandKind, Entry, OperationOutcome, ResultAggregator, RunReport};
use crate::repository::Repository;
use crate::runner::CommandRunner;
use crate::version::{SemVerTriple, SyncAction, SyncPlan, VersionRecord};

/// Options for `sync_version`.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
}

/// Commit message used for each synced repository.
pub fn sync_commit_message(version: &SemVerTriple) -> String {
    format!("Sync version to {}", version)
}

impl<R: CommandRunner> Orchestrator<R> {
    /// Raise every managed child's version to the highest one declared.
    pub fn sync_version(&self, options: &SyncOptions) -> Result<RunReport> {
        self.console
            .section("=== Syncing Versions Across Submodules ===");

        let children = self.discover().children;
        let mut aggregator = ResultAggregator::new(CommandKind::SyncVersion);
        if children.is_empty() {
            return Ok(RunReport::new(&aggregator, true).with_note("No submodules found."));
        }

        self.console.info("Collecting versions from submodules...");
        let collected: Vec<(Repository, std::result::Result<VersionRecord, String>)> = children
            .into_iter()
            .map(|child| {
                let record = self.collect_version(&child);
                match &record {
                    Ok(r) => self.console.info(&format!("{}: {}", child.name, r.version)),
                    Err(reason) => self.console.info(&format!("{}: {}", child.name, reason)),
                }
                (child, record)
            })
            .collect();

        let records: Vec<VersionRecord> = collected
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok().cloned())
            .collect();

        let Some(plan) = SyncPlan::build(&records) else {
            for (child, result) in &collected {
                if let Err(reason) = result {
                    aggregator.record(child, OperationOutcome::skipped(reason.clone()));
                }
            }
            return Ok(RunReport::new(&aggregator, false)
                .with_note("No versions found in submodules."));
        };

        let target = plan.target_version;
        self.console.info(&format!(
            "Highest version found: {} ({} submodule(s) behind)",
            target,
            plan.pending()
        ));
        self.console.section(&if options.dry_run {
            format!("DRY RUN: Would sync the following submodules to {}:", target)
        } else {
            format!("Syncing submodules to version {}...", target)
        });

        for (child, result) in &collected {
            let entry = match result {
                Err(reason) => Entry::new(child, OperationOutcome::skipped(reason.clone()), reason.clone()),
                Ok(record) => {
                    let action = plan
                        .entries
                        .iter()
                        .find(|(r, _)| r.path == record.path)
                        .map(|(_, action)| *action)
                        .unwrap_or(SyncAction::AlreadySatisfied);
                    self.apply_sync(child, record, action, target, options)
                }
            };
            self.console.repository(child);
            self.console.entry(&entry);
            aggregator.push(entry);
        }

        let success = !aggregator.has_failures();
        let mut report = RunReport::new(&aggregator, success)
            .with_note(format!("Target version: {} (from {})", target, plan.source));
        if options.dry_run {
            report = report.with_note("DRY RUN - No changes were made");
        }
        Ok(report)
    }

    /// Version record for a managed child, or the reason it has none.
    fn collect_version(&self, child: &Repository) -> std::result::Result<VersionRecord, String> {
        let dir = child.dir(&self.root);
        if !dir.is_dir() {
            return Err(missing_dir(child));
        }
        if !SubmodulerConfig::is_managed(&dir) {
            return Err("No .submoduler.ini (skipping)".to_string());
        }

        let file = self
            .versions
            .find_version_file(&dir)
            .ok_or_else(|| "No version file found".to_string())?;
        let version = self.versions.extract_version(&file).ok_or_else(|| {
            let shown = file.strip_prefix(&dir).unwrap_or(&file);
            format!("Unparsable version in {}", shown.display())
        })?;

        Ok(VersionRecord {
            repository_name: child.name.clone(),
            path: child.path.clone(),
            file,
            version,
        })
    }

    fn apply_sync(
        &self,
        child: &Repository,
        record: &VersionRecord,
        action: SyncAction,
        target: SemVerTriple,
        options: &SyncOptions,
    ) -> Entry {
        let from = match action {
            SyncAction::AlreadySatisfied => {
                return Entry::new(
                    child,
                    OperationOutcome::AlreadySatisfied,
                    format!("Already at {}", target),
                );
            }
            SyncAction::Bump { from } => from,
        };

        if options.dry_run {
            return Entry::new(
                child,
                OperationOutcome::Succeeded,
                format!("[DRY RUN] {} → {}", from, target),
            );
        }

        match self.write_and_commit(&child.dir(&self.root), &record.file, &target) {
            Ok(()) => Entry::new(
                child,
                OperationOutcome::Succeeded,
                format!("{} → {}", from, target),
            ),
            Err((reason, details)) => {
                Entry::new(child, OperationOutcome::failed(reason.clone()), reason)
                    .with_details(details)
            }
        }
    }

    /// Rewrite `file` and commit it alone inside `repo_dir`.
    fn write_and_commit(
        &self,
        repo_dir: &Path,
        file: &Path,
        target: &SemVerTriple,
    ) -> std::result::Result<(), (String, Vec<String>)> {
        match self.versions.write_version(file, target) {
            Ok(true) => {}
            Ok(false) => return Err(("No VERSION assignment to update".to_string(), Vec::new())),
            Err(e) => return Err((format!("Failed to update: {}", e), Vec::new())),
        }

        let relative = file.strip_prefix(repo_dir).unwrap_or(file).to_string_lossy().into_owned();
        let message = sync_commit_message(target);

        for args in [
            vec!["add", "--", relative.as_str()],
            vec!["commit", "-m", message.as_str(), "--", relative.as_str()],
        ] {
            match self.git(repo_dir, &args) {
                Ok(out) if out.success => {}
                Ok(out) => {
                    return Err((
                        format!("Version written but `git {}` failed", args[0]),
                        out.lines(),
                    ))
                }
                Err(e) => return Err((e.to_string(), Vec::new())),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
