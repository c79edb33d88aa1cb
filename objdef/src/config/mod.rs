use crate::ddl::{Dialect, Layout};
use crate::error::{ObjdefError, Result};
use crate::render::PrettyStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one compiler instance. Every field has a default so a
/// config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub dialect: Dialect,
    /// Relocate language-adaptive properties into `languages` tables.
    pub multi_language: bool,
    /// Index `ordinalposition` alone on hierarchical objects instead of the
    /// `siblingorder` composite.
    pub legacy_ordinal_index: bool,
    pub pretty: PrettyStyle,
    pub layout: Layout,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            dialect: Dialect::default(),
            multi_language: true,
            legacy_ordinal_index: false,
            pretty: PrettyStyle::default(),
            layout: Layout::default(),
        }
    }
}

impl CompilerConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ObjdefError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }
}
