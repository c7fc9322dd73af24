use std::path::Path;

use flowc_diagnostics::{CodeSpan, Diagnostic};
use thiserror::Error;

use crate::parser::{rule_name, Rule};

/// The source of a flow is not valid according to the grammar.
///
/// This also covers the case of a source that parses only partially: the whole input must be
/// consumed by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}:{column}")]
pub struct SyntaxError {
    /// Human readable description of the problem.
    pub message: String,
    /// The text of the offending token, `<EOF>` when the problem is at the end of the input.
    pub symbol: String,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 0-based column of the offending token.
    pub column: usize,
    /// Byte offset of the offending token.
    pub offset: usize,
}

impl SyntaxError {
    pub(crate) fn new(
        message: impl Into<String>,
        symbol: impl Into<String>,
        line: usize,
        column: usize,
        offset: usize,
    ) -> Self {
        Self {
            message: message.into(),
            symbol: symbol.into(),
            line,
            column,
            offset,
        }
    }

    pub(crate) fn from_pest(error: pest::error::Error<Rule>, source: &str) -> Self {
        let error = error.renamed_rules(rule_name);
        let (line, column) = match error.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        let offset = match error.location {
            pest::error::InputLocation::Pos(pos) => pos,
            pest::error::InputLocation::Span((start, _)) => start,
        };
        Self {
            message: error.variant.message().to_string(),
            symbol: offending_symbol(source, offset),
            line,
            column: column.saturating_sub(1),
            offset,
        }
    }

    /// Make a [`Diagnostic`] pointing at the offending token.
    pub fn to_diagnostic(&self, path: &Path, source: &str) -> Diagnostic {
        let len = if self.symbol == "<EOF>" {
            0
        } else {
            self.symbol.len()
        };
        let span = CodeSpan::from_str(path, source, self.offset, len).ok();
        Diagnostic::error(format!("Syntax error: {}", self.message))
            .with_code_span_opt(span)
            .with_note(format!("Offending symbol: {}", self.symbol))
    }
}

/// The text starting at `offset` up to the next whitespace.
fn offending_symbol(source: &str, offset: usize) -> String {
    let rest = source.get(offset..).unwrap_or("");
    let symbol: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
    if symbol.is_empty() {
        if rest.is_empty() {
            "<EOF>".to_string()
        } else {
            // the parser stopped at a line terminator
            "<NEWLINE>".to_string()
        }
    } else {
        symbol
    }
}

/// Any failure of the transpilation that is not a syntax error.
#[derive(Debug, Error)]
pub enum TranspilerError {
    /// The qualified name passed by the caller is not a valid flow name.
    #[error("Invalid flow qualified name: {0:?}")]
    InvalidFlowName(String),
    /// The header of the flow declares a different qualified name.
    #[error("Qualified name mismatch: {expected} vs. {found}")]
    NameMismatch { expected: String, found: String },
    /// The flow triggers itself.
    #[error("A flow cannot trigger itself ({0})")]
    SelfInvocation(String),
    /// A header line (`Inputs`, `Configs`, `Timeout` or `Basepath`) appears more than once.
    #[error("Header line {0} is declared more than once")]
    DuplicateHeaderItem(String),
    /// An input name appears more than once in the `Inputs` list.
    #[error("One or more input variable names are duplicated: {0}")]
    DuplicateInput(String),
    /// The config variable is also declared as an input.
    #[error("Variable {0} is used both as input and config holder")]
    ConfigInputClash(String),
    /// The timeout is not a valid number of seconds.
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
    /// The code generation template failed to render.
    #[error("Failed to render the generated code")]
    Template(#[from] askama::Error),
    /// Any other unexpected failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TranspilerError {
    /// Make a [`Diagnostic`] for this error, anchored to the header of the flow when possible.
    pub fn to_diagnostic(&self, path: &Path, source: &str) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string());
        let anchor = match self {
            TranspilerError::NameMismatch { found, .. } => find_after(source, "Flow", found),
            TranspilerError::SelfInvocation(name) => find_after(source, "Trigger", name),
            TranspilerError::DuplicateInput(name) | TranspilerError::ConfigInputClash(name) => {
                find_after(source, "Inputs", name)
            }
            TranspilerError::InvalidTimeout(value) => find_after(source, "Timeout", value),
            TranspilerError::DuplicateHeaderItem(keyword) => find_repeated(source, keyword),
            _ => None,
        };
        let diagnostic = match anchor
            .and_then(|(offset, len)| CodeSpan::from_str(path, source, offset, len).ok())
        {
            Some(span) => diagnostic.with_code_span(span),
            None => diagnostic,
        };
        match self {
            TranspilerError::NameMismatch { expected, .. } => diagnostic.with_help(format!(
                "Rename the flow to {} or move the file accordingly",
                expected
            )),
            TranspilerError::SelfInvocation(_) => {
                diagnostic.with_help("Use a loop instead of triggering the same flow")
            }
            TranspilerError::DuplicateHeaderItem(_) => {
                diagnostic.with_help("Merge the repeated lines into a single one")
            }
            _ => diagnostic,
        }
    }
}

/// Find the first line starting with `keyword` that contains `needle` and return the position of
/// the needle.
fn find_after(source: &str, keyword: &str, needle: &str) -> Option<(usize, usize)> {
    let mut line_start = 0;
    for line in source.split('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if trimmed.starts_with(keyword) {
            let rest = &trimmed[keyword.len()..];
            if let Some(pos) = rest.find(needle) {
                return Some((line_start + indent + keyword.len() + pos, needle.len()));
            }
        }
        line_start += line.len() + 1;
    }
    None
}

/// The position of the keyword of the second line starting with `keyword`.
fn find_repeated(source: &str, keyword: &str) -> Option<(usize, usize)> {
    let mut line_start = 0;
    let mut seen = false;
    for line in source.split('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with(keyword) {
            if seen {
                return Some((line_start + line.len() - trimmed.len(), keyword.len()));
            }
            seen = true;
        }
        line_start += line.len() + 1;
    }
    None
}

/// The errors returned by the transpilation entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Transpiler(#[from] TranspilerError),
}

impl Error {
    /// Make a [`Diagnostic`] for this error.
    pub fn to_diagnostic(&self, path: &Path, source: &str) -> Diagnostic {
        match self {
            Error::Syntax(e) => e.to_diagnostic(path, source),
            Error::Transpiler(e) => e.to_diagnostic(path, source),
        }
    }

    /// The syntax error, if this is one.
    pub fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            Error::Syntax(e) => Some(e),
            Error::Transpiler(_) => None,
        }
    }

    /// The transpiler error, if this is one.
    pub fn as_transpiler(&self) -> Option<&TranspilerError> {
        match self {
            Error::Syntax(_) => None,
            Error::Transpiler(e) => Some(e),
        }
    }
}
