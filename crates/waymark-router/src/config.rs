// File: src/config.rs
// Purpose: Router configuration, optionally read from a `[router]` TOML table

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pattern::PatternOptions;
use crate::RouterError;

/// Router settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Path prefix every routed URL lives under (e.g., "/app")
    #[serde(default)]
    pub base: String,

    /// Whether a trailing slash is significant when matching
    #[serde(default = "default_false")]
    pub strict: bool,

    /// Keep routed paths in the fragment as `#!/path`
    #[serde(default = "default_false")]
    pub hashbang: bool,

    /// Decode params, query string and fragment (default: true)
    #[serde(default = "default_true")]
    pub decode_url_components: bool,

    /// Case-sensitive route matching (default: false)
    #[serde(default = "default_false")]
    pub case_sensitive: bool,

    /// Dispatch the current location on `start` (default: true)
    #[serde(default = "default_true")]
    pub dispatch: bool,
}

/// Layout of a configuration file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    router: RouterConfig,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base: String::new(),
            strict: false,
            hashbang: false,
            decode_url_components: true,
            case_sensitive: false,
            dispatch: true,
        }
    }
}

impl RouterConfig {
    /// Parses the `[router]` table of a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, RouterError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.router)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Missing file means defaults
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Matching options derived from this configuration
    pub fn pattern_options(&self) -> PatternOptions {
        PatternOptions::default()
            .with_strict(self.strict)
            .with_sensitive(self.case_sensitive)
    }
}
