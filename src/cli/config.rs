//! Blindset configuration file handling
//!
//! Operator settings for a PSI party: which cipher suite to use, how the
//! server publishes its set, and logging. Both parties must agree on the
//! `[suite]` section; `[matching]` only affects the server side.
//!
//! Keys are NOT stored here - they live in separate key files written by
//! `blindset keygen` with owner-only permissions.

use blindset::crypto::GroupId;
use blindset::psi::{BatchOptions, MatchMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default Bloom filter false-positive rate
const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Blindset operator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlindsetConfig {
    /// Cipher suite both parties must share
    #[serde(default)]
    pub suite: SuiteConfig,

    /// Server-side matching settings
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Group and domain separation tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Group name: "ristretto255", "p256", "p384" or "p521"
    #[serde(default = "default_group")]
    pub group: String,

    /// Domain separation tag (defaults to the group's recommended tag)
    pub tag: Option<String>,
}

/// How the server publishes its masked set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// "exact" or "filter"
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Target false-positive rate when mode = "filter"
    #[serde(default = "default_false_positive_rate")]
    pub false_positive_rate: f64,

    /// Worker threads for batch masking (all cores if not specified)
    pub threads: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_group() -> String {
    GroupId::Ristretto255.name().to_string()
}

fn default_mode() -> String {
    "exact".to_string()
}

fn default_false_positive_rate() -> f64 {
    DEFAULT_FALSE_POSITIVE_RATE
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            group: default_group(),
            tag: None,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            threads: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl BlindsetConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: BlindsetConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Load `path` if given, else the default path if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Configured group
    pub fn group_id(&self) -> Result<GroupId, Box<dyn std::error::Error>> {
        Ok(self.suite.group.parse::<GroupId>()?)
    }

    /// Configured tag, or the group's default
    pub fn tag(&self, group: GroupId) -> String {
        self.suite
            .tag
            .clone()
            .unwrap_or_else(|| group.default_tag().to_string())
    }

    /// Configured publication mode
    pub fn match_mode(&self) -> Result<MatchMode, Box<dyn std::error::Error>> {
        match self.matching.mode.to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "filter" => Ok(MatchMode::Filter {
                false_positive_rate: self.matching.false_positive_rate,
            }),
            other => Err(format!(
                "Unknown matching mode '{}' (expected \"exact\" or \"filter\")",
                other
            )
            .into()),
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            threads: self.matching.threads,
        }
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        format!(
            r#"# Blindset Configuration
#
# Both parties of a PSI session must use the same [suite]. Parties with
# different groups or tags get an error, never a silently wrong result.
#
# Keys are NOT stored here. Generate them with `blindset keygen`.

[suite]
# Group: "ristretto255", "p256", "p384" or "p521"
group = "{group}"

# Domain separation tag (optional)
# Leave commented to use the group's recommended tag:
#   ristretto255: {ristretto_tag}
#   p256:         {p256_tag}
#   p384:         {p384_tag}
#   p521:         {p521_tag}
# tag = "MYAPP-V01-..."

[matching]
# How the server publishes its masked set:
#   "exact"  - every masked value; exact results
#   "filter" - Bloom filter; smaller, with false positives at the rate below
mode = "exact"
false_positive_rate = {rate}

# Worker threads for batch masking (optional, defaults to all cores)
# threads = 4

[logging]
# Log level: trace, debug, info, warn, error
# RUST_LOG overrides this when set
level = "{level}"
"#,
            group = GroupId::Ristretto255.name(),
            ristretto_tag = GroupId::Ristretto255.default_tag(),
            p256_tag = GroupId::P256.default_tag(),
            p384_tag = GroupId::P384.default_tag(),
            p521_tag = GroupId::P521.default_tag(),
            rate = DEFAULT_FALSE_POSITIVE_RATE,
            level = DEFAULT_LOG_LEVEL,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default config file path
///
/// - Linux: ~/.config/blindset/config.toml
/// - macOS: ~/Library/Application Support/blindset/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("blindset")
        .join("config.toml")
}
