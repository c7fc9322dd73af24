use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{bail, Context, Error};
use colored::Colorize;

use crate::DiagnosticLevel;

/// A [`CodeSpan`] represent a slice of a flow source.
///
/// Spans never cross a line: a span that would continue on the next line is cut at the end of
/// the line it starts on.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct CodeSpan {
    /// The path of the file where this span comes from.
    file_name: PathBuf,
    /// The line number inside the file.
    line_number: NonZeroUsize,
    /// The offset of the first byte of the span, relative to the start of the file.
    file_offset: usize,
    /// The offset of the first byte of the span, relative to the start of the line.
    line_offset: usize,
    /// The length of the span.
    len: usize,
    /// The content of the line, without the line terminator.
    line: String,
}

impl CodeSpan {
    /// Create a new [`CodeSpan`] from the content of a file, and the start-length pair.
    ///
    /// An offset pointing at the end of a line (or at the end of the file) is accepted and
    /// produces an empty span there.
    pub fn from_str(
        file_name: impl Into<PathBuf>,
        content: impl AsRef<str>,
        offset: usize,
        len: usize,
    ) -> Result<Self, Error> {
        let content = content.as_ref();
        if offset > content.len() {
            bail!("The offset exceeds the length of the file");
        }
        let mut line_start = 0;
        for (index, line) in content.split('\n').enumerate() {
            let line_end = line_start + line.len();
            if offset > line_end {
                line_start = line_end + 1; // Includes \n.
                continue;
            }
            let line_offset = offset - line_start;
            let line = line.strip_suffix('\r').unwrap_or(line);
            let len = len.min(line.len().saturating_sub(line_offset));
            return Ok(Self {
                file_name: file_name.into(),
                line_number: NonZeroUsize::new(index + 1).context("Invalid line number")?,
                line: line.into(),
                file_offset: offset,
                line_offset,
                len,
            });
        }
        bail!("The offset exceeds the length of the file")
    }

    /// Get the content of the span as a `&str`.
    pub fn as_str(&self) -> &str {
        self.line
            .get(self.line_offset..self.line_offset + self.len)
            .unwrap_or("")
    }

    /// The 1-based line number of the span.
    pub fn line_number(&self) -> usize {
        self.line_number.get()
    }

    /// The 0-based byte offset of the span inside its line.
    pub fn column(&self) -> usize {
        self.line_offset
    }

    /// The byte offset of the span inside the whole file.
    pub fn file_offset(&self) -> usize {
        self.file_offset
    }

    /// Obtain a string (with colors) of this span.
    pub fn to_string(&self, level: DiagnosticLevel) -> String {
        let mut result = String::new();

        result += &format!(
            "{}:{}:{}\n",
            self.file_name.display(),
            self.line_number,
            self.line_offset
        );

        let line_number = self.line_number.get().to_string();
        result += &format!("{} | {}\n", line_number, self.line);

        let pad = line_number.len() + 3 + self.line_offset;
        result += &" ".repeat(pad);

        let color = level.color();
        for _ in 0..(self.len.max(1)) {
            result += &format!("{}", "^".color(color).bold());
        }
        result += "\n";
        result
    }
}
