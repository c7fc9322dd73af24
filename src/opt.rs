use std::path::PathBuf;

use anyhow::Error;
use clap::{Parser, Subcommand};

use flowc_transpiler::TranspilerConfig;

use crate::tools::check::CheckOpt;
use crate::tools::gen_autocompletion::GenAutocompletionOpt;
use crate::tools::transpile::TranspileOpt;

/// Version of the tool, including the git revision it was built from.
const VERSION: &str = include_str!(concat!(env!("OUT_DIR"), "/version.txt"));

#[derive(Parser, Debug)]
#[clap(name = "flowc", version, long_version = VERSION)]
pub struct Opt {
    #[clap(flatten, next_help_heading = Some("LOGGING"))]
    pub logger: LoggerOpt,

    /// Configuration file of the transpiler, in TOML
    ///
    /// Without it the default configuration is used.
    #[clap(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Which tool to use
    #[clap(subcommand)]
    pub tool: Tool,
}

#[derive(Subcommand, Debug)]
pub enum Tool {
    /// Transpile a flow into a JavaScript function
    Transpile(TranspileOpt),
    /// Check the syntax of some flows, without generating any code
    Check(CheckOpt),
    /// Print the runtime support that the generated functions need
    Runtime,
    /// Generate the autocompletion files for the shell
    GenAutocompletion(GenAutocompletionOpt),
}

#[derive(Parser, Debug, Clone)]
pub struct LoggerOpt {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl LoggerOpt {
    pub fn enable_log(&self) {
        if self.verbose > 0 {
            std::env::set_var("RUST_BACKTRACE", "1");
            match self.verbose {
                0 => unreachable!(),
                1 => std::env::set_var("RUST_LOG", "info"),
                2 => std::env::set_var("RUST_LOG", "debug"),
                _ => std::env::set_var("RUST_LOG", "trace"),
            }
        }

        env_logger::Builder::from_default_env()
            .format_timestamp_nanos()
            .init();
        better_panic::install();
    }
}

impl Opt {
    /// The transpiler configuration selected with `--config`, or the default one.
    pub fn load_config(&self) -> Result<TranspilerConfig, Error> {
        match &self.config {
            Some(path) => {
                debug!("Loading the configuration from {}", path.display());
                TranspilerConfig::from_file(path)
            }
            None => Ok(TranspilerConfig::default()),
        }
    }
}
