//! Per-repository outcomes, their aggregation and the run summary.

use colored::Colorize;
use serde::Serialize;

use crate::repository::Repository;

/// Result of one command on one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OperationOutcome {
    Succeeded,
    AlreadySatisfied,
    Skipped(String),
    Failed(String),
}

impl OperationOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Self::Succeeded => Bucket::Succeeded,
            Self::AlreadySatisfied => Bucket::AlreadySatisfied,
            Self::Skipped(_) => Bucket::Skipped,
            Self::Failed(_) => Bucket::Failed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Summary bucket an outcome falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Succeeded,
    AlreadySatisfied,
    Skipped,
    Failed,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Succeeded,
        Bucket::AlreadySatisfied,
        Bucket::Skipped,
        Bucket::Failed,
    ];
}

/// The orchestrated commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Status,
    Push,
    Test,
    AddBranch,
    Update,
    SyncVersion,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Push => "push",
            Self::Test => "test",
            Self::AddBranch => "add_branch",
            Self::Update => "update",
            Self::SyncVersion => "sync_version",
        }
    }

    /// How each bucket is named in this command's summary.
    pub fn label(&self, bucket: Bucket) -> &'static str {
        match (self, bucket) {
            (_, Bucket::Skipped) => "Skipped",
            (_, Bucket::Failed) => "Failed",
            (Self::Status, Bucket::Succeeded) => "With changes",
            (Self::Status, Bucket::AlreadySatisfied) => "Clean",
            (Self::Push, Bucket::Succeeded) => "Pushed",
            (Self::Push, Bucket::AlreadySatisfied) => "Nothing to push",
            (Self::Test, Bucket::Succeeded) => "Passed",
            (Self::Test, Bucket::AlreadySatisfied) => "Passed",
            (Self::AddBranch, Bucket::Succeeded) => "Created",
            (Self::AddBranch, Bucket::AlreadySatisfied) => "Already existed",
            (Self::Update, Bucket::Succeeded) => "Updated",
            (Self::Update, Bucket::AlreadySatisfied) => "No changes",
            (Self::SyncVersion, Bucket::Succeeded) => "Synced",
            (Self::SyncVersion, Bucket::AlreadySatisfied) => "Already at target",
        }
    }
}

/// One recorded outcome with its display text.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub repository: Repository,
    pub outcome: OperationOutcome,
    /// One-line description of what happened.
    pub message: String,
    /// Subprocess output or other supporting lines.
    pub details: Vec<String>,
}

impl Entry {
    pub fn new(repository: &Repository, outcome: OperationOutcome, message: impl Into<String>) -> Self {
        Self {
            repository: repository.clone(),
            outcome,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

/// Collects exactly one entry per visited repository, in visiting order.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    command: CommandKind,
    entries: Vec<Entry>,
}

impl ResultAggregator {
    pub fn new(command: CommandKind) -> Self {
        Self {
            command,
            entries: Vec::new(),
        }
    }

    /// Record an outcome with its default message.
    pub fn record(&mut self, repository: &Repository, outcome: OperationOutcome) {
        let message = match &outcome {
            OperationOutcome::Skipped(reason) | OperationOutcome::Failed(reason) => reason.clone(),
            OperationOutcome::Succeeded | OperationOutcome::AlreadySatisfied => {
                self.command.label(outcome.bucket()).to_string()
            }
        };
        self.push(Entry::new(repository, outcome, message));
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of `record`/`push` calls so far.
    pub fn visited(&self) -> usize {
        self.entries.len()
    }

    pub fn names_in(&self, bucket: Bucket) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.outcome.bucket() == bucket)
            .map(|e| e.repository.name.as_str())
            .collect()
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.bucket() == bucket)
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(Bucket::Failed) > 0
    }

    pub fn summarize(&self) -> Summary {
        let buckets = Bucket::ALL
            .iter()
            .map(|&bucket| BucketSummary {
                bucket,
                label: self.command.label(bucket).to_string(),
                repositories: self
                    .names_in(bucket)
                    .into_iter()
                    .map(String::from)
                    .collect(),
            })
            .collect();

        Summary {
            command: self.command,
            total: self.visited(),
            buckets,
        }
    }
}

/// Repositories in one bucket, in recording order.
#[derive(Debug, Clone, Serialize)]
pub struct BucketSummary {
    pub bucket: Bucket,
    pub label: String,
    pub repositories: Vec<String>,
}

/// Counts and names per bucket for one command run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub command: CommandKind,
    pub total: usize,
    pub buckets: Vec<BucketSummary>,
}

impl Summary {
    pub fn count(&self, bucket: Bucket) -> usize {
        self.buckets
            .iter()
            .find(|b| b.bucket == bucket)
            .map_or(0, |b| b.repositories.len())
    }

    /// Plain-text lines: one header per non-empty bucket, then its names.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for bucket in self.buckets.iter().filter(|b| !b.repositories.is_empty()) {
            lines.push(format!("{} ({}):", bucket.label, bucket.repositories.len()));
            lines.extend(bucket.repositories.iter().map(|name| format!("  - {}", name)));
        }
        lines.push(format!("Total: {} repository(ies) processed", self.total));
        lines
    }
}

/// Everything a finished command hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: Summary,
    pub entries: Vec<Entry>,
    pub success: bool,
    /// Command-level remarks, e.g. the sync target or a dry-run notice.
    pub notes: Vec<String>,
}

impl RunReport {
    pub fn new(aggregator: &ResultAggregator, success: bool) -> Self {
        Self {
            summary: aggregator.summarize(),
            entries: aggregator.entries().to_vec(),
            success,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn exit_code(&self) -> u8 {
        if self.success {
            0
        } else {
            1
        }
    }

    /// Print the colorized summary block.
    pub fn print_terminal(&self) {
        println!("\n{}", "═".repeat(60).bright_black());
        println!(
            "{} {}",
            self.summary.command.as_str().bright_white().bold(),
            "summary".bright_white().bold()
        );
        println!("{}", "═".repeat(60).bright_black());

        for note in &self.notes {
            println!("{}", note.cyan());
        }

        for bucket in self.summary.buckets.iter().filter(|b| !b.repositories.is_empty()) {
            let header = format!("{} ({}):", bucket.label, bucket.repositories.len());
            let header = match bucket.bucket {
                Bucket::Succeeded => format!("{} {}", "✓".green(), header),
                Bucket::AlreadySatisfied => format!("{} {}", "ℹ".blue(), header),
                Bucket::Skipped => format!("{} {}", "⊘".yellow(), header),
                Bucket::Failed => format!("{} {}", "✗".red(), header),
            };
            println!("{}", header);
            for name in &bucket.repositories {
                println!("  - {}", name);
            }
        }

        println!(
            "{} {} repository(ies) processed",
            "Total:".cyan(),
            self.summary.total
        );
    }
}

/// Live progress printer. Silent when output is machine-readable.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    enabled: bool,
    verbose: bool,
}

impl Console {
    pub fn new(enabled: bool, verbose: bool) -> Self {
        Self { enabled, verbose }
    }

    pub fn silent() -> Self {
        Self::new(false, false)
    }

    pub fn section(&self, title: &str) {
        if self.enabled {
            println!("\n{}", title.bright_white().bold());
        }
    }

    pub fn info(&self, text: &str) {
        if self.enabled {
            println!("{} {}", "ℹ".blue(), text);
        }
    }

    pub fn repository(&self, repository: &Repository) {
        if self.enabled {
            println!("  {}:", repository.name.bold());
        }
    }

    /// Print one recorded entry under its repository header.
    pub fn entry(&self, entry: &Entry) {
        if !self.enabled {
            return;
        }

        let icon = match entry.outcome.bucket() {
            Bucket::Succeeded => "✓".green(),
            Bucket::AlreadySatisfied => "ℹ".blue(),
            Bucket::Skipped => "⊘".yellow(),
            Bucket::Failed => "✗".red(),
        };
        println!("    {} {}", icon, entry.message);

        let show_details = self.verbose || entry.outcome.is_failure() || entry.details.len() <= 10;
        if show_details {
            for detail in &entry.details {
                println!("      {}", detail.dimmed());
            }
        } else {
            for detail in entry.details.iter().take(10) {
                println!("      {}", detail.dimmed());
            }
            println!(
                "      {} {} more lines (use --verbose)",
                "...".dimmed(),
                (entry.details.len() - 10).to_string().dimmed()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> Repository {
        Repository::child(name, format!("sub/{name}"))
    }

    #[test]
    fn test_bucket_sum_matches_records() {
        let mut agg = ResultAggregator::new(CommandKind::AddBranch);
        agg.record(&repo("a"), OperationOutcome::Succeeded);
        agg.record(&repo("b"), OperationOutcome::AlreadySatisfied);
        agg.record(&repo("c"), OperationOutcome::failed("boom"));
        agg.record(&repo("d"), OperationOutcome::Succeeded);

        let summary = agg.summarize();
        let sum: usize = Bucket::ALL.iter().map(|&b| summary.count(b)).sum();
        assert_eq!(sum, 4);
        assert_eq!(summary.total, 4);
        assert!(agg.has_failures());
    }

    #[test]
    fn test_summary_preserves_insertion_order() {
        let mut agg = ResultAggregator::new(CommandKind::SyncVersion);
        agg.record(&repo("zeta"), OperationOutcome::Succeeded);
        agg.record(&repo("alpha"), OperationOutcome::skipped("no version"));
        agg.record(&repo("mid"), OperationOutcome::Succeeded);

        assert_eq!(agg.names_in(Bucket::Succeeded), vec!["zeta", "mid"]);
        assert_eq!(
            agg.summarize().lines(),
            vec![
                "Synced (2):",
                "  - zeta",
                "  - mid",
                "Skipped (1):",
                "  - alpha",
                "Total: 3 repository(ies) processed",
            ]
        );
    }

    #[test]
    fn test_record_uses_reason_as_message() {
        let mut agg = ResultAggregator::new(CommandKind::Push);
        agg.record(&repo("a"), OperationOutcome::skipped("Directory does not exist: sub/a"));
        assert_eq!(agg.entries()[0].message, "Directory does not exist: sub/a");
    }

    #[test]
    fn test_report_serializes() {
        let mut agg = ResultAggregator::new(CommandKind::Status);
        agg.record(&Repository::parent(), OperationOutcome::AlreadySatisfied);
        let report = RunReport::new(&agg, true).with_note("note");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["command"], "status");
        assert_eq!(json["entries"][0]["outcome"]["status"], "already_satisfied");
        assert_eq!(json["entries"][0]["repository"]["kind"], "parent");
        assert_eq!(report.exit_code(), 0);
    }
}
