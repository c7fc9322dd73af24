use std::path::Path;

use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};

/// Tunables of a [`Transpiler`](crate::Transpiler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranspilerConfig {
    /// Additional identifiers to treat as reserved, i.e. renamed with a leading `_` when used by
    /// a flow.
    pub extra_reserved: Vec<String>,
    /// Whether to put a comment naming the source flow on top of the generated function.
    pub emit_header_comment: bool,
}

impl Default for TranspilerConfig {
    fn default() -> Self {
        Self {
            extra_reserved: vec![],
            emit_header_comment: true,
        }
    }
}

impl TranspilerConfig {
    /// Parse a configuration from the content of a TOML file.
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        toml::from_str(content).context("Invalid transpiler configuration")
    }

    /// Load the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("While loading {}", path.display()))
    }
}
