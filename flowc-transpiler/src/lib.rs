//! Transpiler of the flow DSL into JavaScript functions.
//!
//! A flow source goes through these stages:
//! - parsing, with the pest grammar in `grammar/flow.pest` ([`SyntaxError`] on failure);
//! - building of the [`IrTree`], where identifiers and accessors are rewritten by the
//!   [`IdentifierRewriter`];
//! - semantic validation of the tree ([`TranspilerError`] on failure);
//! - rendering of the function with the askama templates.
//!
//! ```
//! use flowc_transpiler::transpile;
//!
//! let result = transpile("com.acme.login", "Flow com.acme.login\n  Inputs user\nFinish user").unwrap();
//! assert_eq!(result.function_name, "_com_acme_login");
//! assert_eq!(result.inputs, vec!["user"]);
//! ```
//!
//! The generated code relies on [`RUNTIME_SUPPORT`], which the host must load once next to the
//! generated functions.

#![allow(clippy::upper_case_acronyms)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate pest_derive;

mod codegen;
mod config;
mod error;
mod ir;
mod parser;
mod rewrite;
mod transpiler;
mod validate;

pub use codegen::{extract_inputs, extract_timeout, render};
pub use config::TranspilerConfig;
pub use error::{Error, SyntaxError, TranspilerError};
pub use ir::{classify, IrNode, IrTree, RuleKind, TextTransform};
pub use parser::Rule;
pub use rewrite::IdentifierRewriter;
pub use transpiler::{function_name, TranspilationResult, Transpiler};
pub use validate::validate;

/// The JavaScript helpers the generated functions call (`indexByInt`, `indexByString`, ...).
pub const RUNTIME_SUPPORT: &str = include_str!("../assets/runtime.js");

lazy_static! {
    /// Transpiler with the default configuration, used by the free functions of this crate.
    static ref DEFAULT_TRANSPILER: Transpiler = Transpiler::default();
}

/// Transpile a flow with the default configuration.
pub fn transpile(qname: &str, source: &str) -> Result<TranspilationResult, Error> {
    DEFAULT_TRANSPILER.transpile(qname, source)
}

/// Check the syntax of a flow (and its name, if provided) with the default configuration.
pub fn check_syntax(source: &str, qname: Option<&str>) -> Result<(), Error> {
    DEFAULT_TRANSPILER.check_syntax(source, qname)
}
