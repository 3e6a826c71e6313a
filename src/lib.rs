//! Multi-repository orchestration for Submoduler checkouts.
//!
//! A working root with a `.submoduler.ini` manages child repositories listed
//! in `.gitmodules` and vendor repositories under its vendor directory. This
//! crate runs git and test commands across that set, recursively updates
//! nested children, and keeps declared `version.rb` versions in sync.

pub mod config;
pub mod error;
pub mod locator;
pub mod orchestrator;
pub mod outcome;
pub mod repository;
pub mod runner;
pub mod symlink;
pub mod sync;
pub mod telemetry;
pub mod update;
pub mod version;

pub use config::SubmodulerConfig;
pub use error::{Error, Result};
pub use locator::{Discovery, RepositoryLocator};
pub use orchestrator::{BranchOptions, Orchestrator, PushOptions, TestOptions};
pub use outcome::{Bucket, CommandKind, Console, Entry, OperationOutcome, ResultAggregator, RunReport};
pub use repository::{Repository, RepositoryKind};
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use symlink::{build_symlinks, SymlinkReport};
pub use sync::SyncOptions;
pub use update::{synthesize_commit_message, UpdateOptions};
pub use version::{SemVerTriple, SyncPlan, VersionInspector, VersionRecord};
