use std::path::PathBuf;

use anyhow::Error;
use clap::Parser;
use tempfile::TempDir;

use flowc::tools::transpile::transpile_file;
use flowc::{Opt, Tool};
use flowc_transpiler::{SyntaxError, TranspilationResult, TranspilerError};

/// Interface for testing the transpilation of a flow.
#[derive(Debug)]
pub struct TestInterface {
    fixture: String,
    state: Result<TranspilationResult, Error>,
    _tempdir: TempDir,
}

/// Interface for testing a flow that has been transpiled successfully.
#[derive(Debug)]
pub struct TestInterfaceSuccessful {
    result: TranspilationResult,
}

impl TestInterface {
    /// Transpile the fixture `tests/flows/<fixture>.flow` with the default configuration.
    pub fn run_local<S: Into<String>>(fixture: S) -> Self {
        Self::run(fixture, None, &[])
    }

    /// Transpile the fixture with the provided TOML configuration.
    pub fn run_with_config<S: Into<String>>(fixture: S, config: &str) -> Self {
        Self::run(fixture, Some(config), &[])
    }

    /// Transpile the fixture forcing the qualified name of the flow.
    pub fn run_named<S: Into<String>>(fixture: S, name: &str) -> Self {
        Self::run(fixture, None, &["--name", name])
    }

    /// The path of a fixture flow.
    pub fn fixture_path(fixture: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("flows")
            .join(format!("{}.flow", fixture))
    }

    /// Expect the transpilation to fail with the specified message.
    pub fn fail<S: AsRef<str>>(self, err: S) {
        let err = err.as_ref();
        match self.state {
            Err(e) => {
                if !format!("{:?}", e).contains(err) {
                    panic!(
                        "Expecting {} to fail with '{}' but failed with {:?}",
                        self.fixture, err, e
                    );
                }
            }
            Ok(_) => panic!(
                "Expecting {} to fail with '{}' but didn't fail",
                self.fixture, err
            ),
        }
    }

    /// Expect the transpilation to fail with a syntax error at the specified position.
    pub fn syntax_error(self, line: usize, column: usize) -> SyntaxError {
        let error = self.transpiler_error();
        let syntax = match error.as_syntax() {
            Some(syntax) => syntax.clone(),
            None => panic!("Expecting a syntax error, got {:?}", error),
        };
        assert_eq!(
            (syntax.line, syntax.column),
            (line, column),
            "Wrong position of {:?}",
            syntax
        );
        syntax
    }

    /// Expect the transpilation to fail with an error that is not a syntax error, and check it.
    pub fn semantic_error<F: FnOnce(&TranspilerError) -> bool>(self, check: F) {
        let error = self.transpiler_error();
        match error.as_transpiler() {
            Some(e) if check(e) => {}
            _ => panic!("Unexpected error: {:?}", error),
        }
    }

    /// Expect the transpilation not to fail, unlocking the possibility to test its result.
    pub fn success(self) -> TestInterfaceSuccessful {
        match self.state {
            Ok(result) => TestInterfaceSuccessful { result },
            Err(e) => panic!(
                "Expecting {} not to fail, but failed with {:?}",
                self.fixture, e
            ),
        }
    }

    fn transpiler_error(&self) -> &flowc_transpiler::Error {
        match &self.state {
            Ok(result) => panic!("Expecting {} to fail, got {:?}", self.fixture, result),
            Err(e) => e
                .downcast_ref::<flowc_transpiler::Error>()
                .unwrap_or_else(|| panic!("Not a transpiler error: {:?}", e)),
        }
    }

    /// Run `flowc transpile --json` on the fixture by calling the tool from this process, parsing
    /// the command line the same way the binary does.
    fn run<S: Into<String>>(fixture: S, config: Option<&str>, extra_args: &[&str]) -> Self {
        let _ = env_logger::Builder::from_default_env()
            .format_timestamp_nanos()
            .is_test(true)
            .try_init();
        let fixture = fixture.into();
        let tempdir = TempDir::new().expect("Cannot create tempdir");

        let path = Self::fixture_path(&fixture).to_string_lossy().into_owned();
        let mut args = vec!["flowc", "transpile", path.as_str(), "--json"];
        let config_path = tempdir.path().join("flowc.toml");
        let config_path = config_path.to_string_lossy().into_owned();
        if let Some(config) = config {
            std::fs::write(&config_path, config).expect("Cannot write the config");
            args.push("--config");
            args.push(&config_path);
        }
        args.extend_from_slice(extra_args);

        let opt = Opt::parse_from(&args);
        let state = opt.load_config().and_then(|config| match &opt.tool {
            Tool::Transpile(transpile) => transpile_file(transpile, config),
            tool => panic!("Unexpected tool {:?}", tool),
        });
        let state = state.and_then(|json| Ok(serde_json::from_str(&json)?));
        TestInterface {
            fixture,
            state,
            _tempdir: tempdir,
        }
    }
}

impl TestInterfaceSuccessful {
    /// Check the name of the generated function.
    pub fn function_name(self, name: &str) -> Self {
        assert_eq!(self.result.function_name, name, "Wrong function name");
        self
    }

    /// Check the parameters of the generated function.
    pub fn inputs<I: IntoIterator<Item = &'static str>>(self, inputs: I) -> Self {
        let expected: Vec<_> = inputs.into_iter().collect();
        assert_eq!(self.result.inputs, expected, "Wrong inputs");
        self
    }

    /// Check the timeout of the flow.
    pub fn timeout(self, timeout: Option<u64>) -> Self {
        assert_eq!(self.result.timeout, timeout, "Wrong timeout");
        self
    }

    /// Check that the generated code contains all these lines, in this order, ignoring the
    /// indentation.
    pub fn code_lines<I: IntoIterator<Item = &'static str>>(self, lines: I) -> Self {
        let code: Vec<&str> = self.result.code.lines().map(str::trim).collect();
        let mut position = 0;
        for line in lines {
            match code[position..].iter().position(|l| *l == line) {
                Some(index) => position += index + 1,
                None => panic!(
                    "Line {:?} not found after line {} of:\n{}",
                    line, position, self.result.code
                ),
            }
        }
        self
    }

    /// Check that the generated code does not contain this text.
    pub fn code_without(self, text: &str) -> Self {
        assert!(
            !self.result.code.contains(text),
            "Unexpected {:?} in:\n{}",
            text,
            self.result.code
        );
        self
    }

    /// Check that the generated code is exactly the content of `tests/flows/<fixture>.js`.
    pub fn code_matches(self, fixture: &str) -> Self {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("flows")
            .join(format!("{}.js", fixture));
        let expected = std::fs::read_to_string(&path).expect("Cannot read the expected code");
        pretty_assertions::assert_eq!(self.result.code, expected);
        self
    }

    /// The whole result of the transpilation.
    pub fn result(&self) -> &TranspilationResult {
        &self.result
    }
}
