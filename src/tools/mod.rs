pub mod check;
pub mod gen_autocompletion;
pub mod runtime;
pub mod transpile;

use std::path::Path;

use anyhow::{anyhow, Error};

/// The qualified name of the flow stored at `path`, i.e. its file name without the extension.
pub fn flow_name_from_path(path: &Path) -> Result<String, Error> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .ok_or_else(|| anyhow!("Cannot derive the flow name from {}", path.display()))
}
