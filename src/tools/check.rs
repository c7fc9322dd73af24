use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Error};
use clap::Parser;
use walkdir::WalkDir;

use flowc_diagnostics::{DiagnosticContext, DiagnosticLevel};
use flowc_transpiler::{Transpiler, TranspilerConfig};

use crate::tools::flow_name_from_path;

/// Extension of the files considered when checking a directory.
const FLOW_EXTENSION: &str = "flow";

#[derive(Parser, Debug, Clone)]
pub struct CheckOpt {
    /// Flows to check, directories are searched recursively for *.flow files
    #[clap(required = true)]
    pub paths: Vec<PathBuf>,

    /// Qualified name the flow must declare
    ///
    /// Only allowed when checking a single file. When not specified, the name of the file without
    /// its extension is used.
    #[clap(long = "name", short = 'n', conflicts_with = "no_name_check")]
    pub name: Option<String>,

    /// Do not compare the name declared by the flows with the expected one
    #[clap(long = "no-name-check")]
    pub no_name_check: bool,
}

/// The outcome of checking some flows.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// The files that have been checked.
    pub checked: Vec<PathBuf>,
    /// The problems found in those files.
    pub diagnostics: DiagnosticContext,
}

impl CheckReport {
    /// The number of files with at least an error.
    pub fn failed(&self) -> usize {
        self.diagnostics.count(DiagnosticLevel::Error)
    }
}

/// Expand the paths to check into the list of flow files, sorted within each directory.
fn find_flows(paths: &[PathBuf]) -> Result<Vec<PathBuf>, Error> {
    let mut flows = vec![];
    for path in paths {
        if !path.is_dir() {
            flows.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("Failed to list the flows in {}", path.display()))?;
            let is_flow = entry.path().extension().and_then(|ext| ext.to_str())
                == Some(FLOW_EXTENSION);
            if entry.file_type().is_file() && is_flow {
                flows.push(entry.into_path());
            }
        }
    }
    Ok(flows)
}

fn check_file(
    transpiler: &Transpiler,
    path: &Path,
    name: Option<&str>,
    diagnostics: &mut DiagnosticContext,
) -> Result<(), Error> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    debug!("Checking {} (expected name: {:?})", path.display(), name);
    if let Err(e) = transpiler.check_syntax(&source, name) {
        diagnostics.add_diagnostic(e.to_diagnostic(path, &source));
    }
    Ok(())
}

/// Check all the flows selected by the options, collecting the problems in the report.
pub fn check_flows(opt: &CheckOpt, config: TranspilerConfig) -> Result<CheckReport, Error> {
    if opt.name.is_some() && (opt.paths.len() != 1 || opt.paths[0].is_dir()) {
        bail!("--name can be used only when checking a single file");
    }
    let transpiler = Transpiler::new(config);
    let mut report = CheckReport::default();
    for path in find_flows(&opt.paths)? {
        let name = if opt.no_name_check {
            None
        } else if let Some(name) = &opt.name {
            Some(name.clone())
        } else {
            Some(flow_name_from_path(&path)?)
        };
        check_file(&transpiler, &path, name.as_deref(), &mut report.diagnostics)?;
        report.checked.push(path);
    }
    Ok(report)
}

pub fn main_check(opt: CheckOpt, config: TranspilerConfig) -> Result<(), Error> {
    let report = check_flows(&opt, config)?;
    for diagnostic in report.diagnostics.diagnostics() {
        eprint!("{}", diagnostic);
    }
    let failed = report.failed();
    if failed > 0 {
        bail!("{} of {} flows have errors", failed, report.checked.len());
    }
    info!("{} flows checked, no errors", report.checked.len());
    Ok(())
}
