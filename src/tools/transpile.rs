use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::Parser;

use flowc_transpiler::{Transpiler, TranspilerConfig};

use crate::tools::flow_name_from_path;

#[derive(Parser, Debug, Clone)]
pub struct TranspileOpt {
    /// Path of the flow to transpile
    pub file: PathBuf,

    /// Qualified name of the flow
    ///
    /// When not specified, the name of the file without its extension is used.
    #[clap(long = "name", short = 'n')]
    pub name: Option<String>,

    /// Print the whole transpilation result as JSON, not only the code
    #[clap(long = "json")]
    pub json: bool,

    /// Write the output to this file instead of stdout
    #[clap(long = "output", short = 'o')]
    pub output: Option<PathBuf>,
}

/// Transpile the flow and return what should be printed.
pub fn transpile_file(opt: &TranspileOpt, config: TranspilerConfig) -> Result<String, Error> {
    let name = match &opt.name {
        Some(name) => name.clone(),
        None => flow_name_from_path(&opt.file)?,
    };
    let source = std::fs::read_to_string(&opt.file)
        .with_context(|| format!("Failed to read {}", opt.file.display()))?;
    let transpiler = Transpiler::new(config);
    let result = match transpiler.transpile(&name, &source) {
        Ok(result) => result,
        Err(e) => {
            eprint!("{}", e.to_diagnostic(&opt.file, &source));
            return Err(e).with_context(|| format!("Failed to transpile {}", opt.file.display()));
        }
    };
    info!(
        "Transpiled {} into {} ({} inputs, timeout {:?})",
        opt.file.display(),
        result.function_name,
        result.inputs.len(),
        result.timeout
    );
    if opt.json {
        let mut json =
            serde_json::to_string_pretty(&result).context("Failed to serialize the result")?;
        json.push('\n');
        Ok(json)
    } else {
        Ok(result.code)
    }
}

pub fn main_transpile(opt: TranspileOpt, config: TranspilerConfig) -> Result<(), Error> {
    let output = transpile_file(&opt, config)?;
    match &opt.output {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", output),
    }
    Ok(())
}
