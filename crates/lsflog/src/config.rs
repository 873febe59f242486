use crate::error::{LsfLogError, Result};
use crate::ir::FormatProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Prefix of the first line of every report block.
pub const DEFAULT_BLOCK_MARKER: &str = "Sender:";
/// Line introducing the captured stdout/stderr of a job.
pub const DEFAULT_OUTPUT_INTRO: &str = "The output (if any) follows:";

/// How the format profile of each block is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSelection {
    /// Probe each block for a status line.
    #[default]
    Auto,
    Legacy,
    Current,
}

impl ProfileSelection {
    pub fn fixed(&self) -> Option<FormatProfile> {
        match self {
            ProfileSelection::Auto => None,
            ProfileSelection::Legacy => Some(FormatProfile::Legacy),
            ProfileSelection::Current => Some(FormatProfile::Current),
        }
    }
}

impl FromStr for ProfileSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "legacy" => Ok(Self::Legacy),
            "current" => Ok(Self::Current),
            other => Err(format!(
                "unknown profile `{other}` (expected auto, legacy or current)"
            )),
        }
    }
}

impl fmt::Display for ProfileSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileSelection::Auto => "auto",
            ProfileSelection::Legacy => "legacy",
            ProfileSelection::Current => "current",
        };
        f.write_str(name)
    }
}

/// Parser settings. The defaults match stock LSF notification output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub profile: ProfileSelection,
    pub block_marker: String,
    pub output_intro: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            profile: ProfileSelection::Auto,
            block_marker: DEFAULT_BLOCK_MARKER.to_string(),
            output_intro: DEFAULT_OUTPUT_INTRO.to_string(),
        }
    }
}

impl ParserConfig {
    pub fn with_profile(mut self, profile: ProfileSelection) -> Self {
        self.profile = profile;
        self
    }

    /// Loads a JSON config file. Missing keys keep their defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|source| LsfLogError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(field) = config.blank_field() {
            return Err(LsfLogError::ConfigValue {
                path: path.to_path_buf(),
                field,
            });
        }
        log::debug!("Loaded parser config from {:?}", path);
        Ok(config)
    }

    // A blank marker would open a block on every line.
    fn blank_field(&self) -> Option<&'static str> {
        if self.block_marker.trim().is_empty() {
            Some("block_marker")
        } else if self.output_intro.trim().is_empty() {
            Some("output_intro")
        } else {
            None
        }
    }
}
