use std::fmt::Display;

use anyhow::{anyhow, Error};

/// Exit status of `flowc` when a tool fails.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Adds methods for failing without panic. Like `expect` but without panic.
pub trait NiceError<T> {
    /// Exit with [`FAILURE_EXIT_CODE`] if the value is not present, printing the error chain to
    /// stderr. Otherwise return the content.
    fn nice_unwrap(self) -> T;

    /// Like [`NiceError::nice_unwrap`], but `mex` is printed as the outermost error.
    fn nice_expect<S: Display + Send + Sync + 'static>(self, mex: S) -> T;
}

/// Format the error followed by its chain of causes.
pub fn format_error(error: &Error) -> String {
    let mut result = format!("Error: {}\n", error);
    for cause in error.chain().skip(1) {
        result += &format!("\nCaused by:\n    {}\n", cause);
    }
    result
}

fn fail(error: Error) -> ! {
    debug!("{:?}", error);
    eprint!("{}", format_error(&error));
    std::process::exit(FAILURE_EXIT_CODE);
}

impl<T> NiceError<T> for Result<T, Error> {
    fn nice_unwrap(self) -> T {
        self.unwrap_or_else(|e| fail(e))
    }

    fn nice_expect<S: Display + Send + Sync + 'static>(self, mex: S) -> T {
        self.unwrap_or_else(|e| fail(e.context(mex)))
    }
}

impl<T> NiceError<T> for Option<T> {
    fn nice_unwrap(self) -> T {
        self.unwrap_or_else(|| fail(anyhow!("Option is None")))
    }

    fn nice_expect<S: Display + Send + Sync + 'static>(self, mex: S) -> T {
        self.unwrap_or_else(|| fail(anyhow!("{}", mex)))
    }
}
