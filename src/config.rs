//! `.submoduler.ini` context loading.

use ini::{Ini, ParseOption};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// File that marks a directory as a managed Submoduler repository.
pub const CONFIG_FILE: &str = ".submoduler.ini";

/// Vendor root used when the config does not name one.
pub const DEFAULT_VENDOR_DIR: &str = "vendor";

/// Test runner used when the config does not name one.
pub const DEFAULT_TEST_COMMAND: &str =
    "ruby -Ilib:test -e 'Dir.glob(\"test/**/*test*.rb\").each { |f| require_relative f }'";

/// Settings for one managed repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmodulerConfig {
    /// Value of the `master` key, if declared.
    pub master: Option<String>,
    pub vendor_dir: PathBuf,
    pub test_command: String,
    pub timeout: Option<Duration>,
}

impl Default for SubmodulerConfig {
    fn default() -> Self {
        Self {
            master: None,
            vendor_dir: PathBuf::from(DEFAULT_VENDOR_DIR),
            test_command: DEFAULT_TEST_COMMAND.to_string(),
            timeout: None,
        }
    }
}

impl SubmodulerConfig {
    /// Load the config of the top-level root.
    ///
    /// The file must exist and declare `master` somewhere; this is the check
    /// that stops the tool from running outside a Submoduler checkout.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(CONFIG_FILE);
        if !path.is_file() {
            return Err(Error::NotInContext { path });
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::parse(&content).map_err(|message| Error::InvalidConfig {
            path: path.clone(),
            message,
        })?;

        if config.master.is_none() {
            return Err(Error::InvalidConfig {
                path,
                message: "missing 'master' configuration".to_string(),
            });
        }

        Ok(config)
    }

    /// Load a nested child's config, falling back to defaults on any problem.
    pub fn load_lenient(root: impl AsRef<Path>) -> Self {
        let path = root.as_ref().join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|message| {
                tracing::warn!(path = %path.display(), %message, "ignoring unparsable config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Parse config text. Keys are looked up across all sections, first wins.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        // values such as test_command go to `sh -c` untouched
        let options = ParseOption {
            enabled_escape: false,
            enabled_quote: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, options).map_err(|e| e.to_string())?;

        let lookup = |key: &str| -> Option<String> {
            ini.iter()
                .find_map(|(_, props)| props.get(key))
                .map(|v| v.trim().to_string())
        };

        let mut config = Self {
            master: lookup("master"),
            ..Self::default()
        };

        if let Some(dir) = lookup("vendor_dir").filter(|d| !d.is_empty()) {
            config.vendor_dir = PathBuf::from(dir);
        }
        if let Some(cmd) = lookup("test_command").filter(|c| !c.is_empty()) {
            config.test_command = cmd;
        }
        if let Some(secs) = lookup("timeout_secs") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| format!("timeout_secs must be a whole number, got '{}'", secs))?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Whether `dir` carries its own config marker, i.e. is a managed child.
    pub fn is_managed(dir: impl AsRef<Path>) -> bool {
        dir.as_ref().join(CONFIG_FILE).is_file()
    }
}
