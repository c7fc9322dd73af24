use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::codegen::{extract_inputs, extract_timeout, render};
use crate::config::TranspilerConfig;
use crate::error::{Error, TranspilerError};
use crate::ir::{IrBuilder, IrTree};
use crate::parser::parse;
use crate::rewrite::IdentifierRewriter;
use crate::validate::{check_name, validate};

lazy_static! {
    /// A dot-separated list of identifiers.
    static ref QUALIFIED_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("Invalid regex");
}

/// The outcome of a successful transpilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranspilationResult {
    /// The name of the generated function.
    pub function_name: String,
    /// The names of the parameters of the function, in order.
    pub inputs: Vec<String>,
    /// The timeout of the flow in seconds, if declared.
    pub timeout: Option<u64>,
    /// The source of the generated function.
    pub code: String,
}

/// The name of the function generated for the flow `qname`.
pub fn function_name(qname: &str) -> String {
    format!("_{}", qname.replace('.', "_"))
}

fn check_qualified_name(qname: &str) -> Result<(), TranspilerError> {
    if !QUALIFIED_NAME.is_match(qname) {
        return Err(TranspilerError::InvalidFlowName(qname.to_string()));
    }
    Ok(())
}

/// Transpiles flow sources into JavaScript functions.
///
/// The transpiler holds only immutable state built at construction: it can be shared (e.g. in an
/// `Arc`) by threads transpiling concurrently.
#[derive(Debug, Clone, Default)]
pub struct Transpiler {
    config: TranspilerConfig,
    rewriter: IdentifierRewriter,
}

impl Transpiler {
    /// Make a new transpiler with the provided configuration.
    pub fn new(config: TranspilerConfig) -> Self {
        let rewriter = IdentifierRewriter::new(config.extra_reserved.iter().cloned());
        Self { config, rewriter }
    }

    /// The configuration of this transpiler.
    pub fn config(&self) -> &TranspilerConfig {
        &self.config
    }

    /// Parse the source and build its intermediate tree, without validating it.
    pub fn build_tree(&self, qname: &str, source: &str) -> Result<IrTree, Error> {
        let flow = parse(source)?;
        let tree = IrBuilder::new(&self.rewriter).build(flow, function_name(qname));
        trace!("Intermediate tree of {}:\n{}", qname, tree);
        Ok(tree)
    }

    /// Transpile the flow `qname` from its source.
    pub fn transpile(&self, qname: &str, source: &str) -> Result<TranspilationResult, Error> {
        check_qualified_name(qname)?;
        debug!("Transpiling flow {}", qname);
        let tree = self.build_tree(qname, source)?;
        validate(&tree, qname)?;
        debug!("Flow {} is valid, generating code", qname);
        let code = render(&tree, &self.config)?;
        let result = TranspilationResult {
            function_name: tree.function_name().to_string(),
            inputs: extract_inputs(&tree),
            timeout: extract_timeout(&tree)?,
            code,
        };
        debug!(
            "Flow {} transpiled into {} ({} inputs)",
            qname,
            result.function_name,
            result.inputs.len()
        );
        Ok(result)
    }

    /// Only check the syntax of the source and, if `qname` is provided, that the flow has that
    /// name. No code is generated.
    pub fn check_syntax(&self, source: &str, qname: Option<&str>) -> Result<(), Error> {
        match qname {
            Some(qname) => {
                check_qualified_name(qname)?;
                let tree = self.build_tree(qname, source)?;
                check_name(&tree, qname)?;
            }
            None => {
                parse(source)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use super::*;

    #[test]
    fn test_function_name() {
        assert_eq!(function_name("com.acme.login"), "_com_acme_login");
        assert_eq!(function_name("single"), "_single");
    }

    #[test]
    fn test_invalid_qualified_name() {
        let transpiler = Transpiler::default();
        for qname in ["", "a..b", ".a", "a.", "a-b", "1a", "a b"] {
            let err = transpiler.transpile(qname, "Flow a").unwrap_err();
            assert!(
                matches!(err, Error::Transpiler(TranspilerError::InvalidFlowName(_))),
                "{:?} accepted",
                qname
            );
        }
    }

    #[test]
    fn test_end_to_end() {
        let transpiler = Transpiler::default();
        let result = transpiler
            .transpile("a.b", "Flow a.b\n    Inputs user\n    Timeout 30 seconds\nLog user\n")
            .unwrap();
        assert_eq!(result.function_name, "_a_b");
        assert_eq!(result.inputs, vec!["user"]);
        assert_eq!(result.timeout, Some(30));
        assert_that(&result.code).contains("function _a_b(user) {");
    }

    #[test]
    fn test_name_mismatch_before_anything_else() {
        let transpiler = Transpiler::default();
        let err = transpiler
            .transpile("a.b", "Flow a.c\n  Inputs x x\nTrigger a.c")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transpiler(TranspilerError::NameMismatch { .. })
        ));
    }

    #[test]
    fn test_repeated_header_lines() {
        let transpiler = Transpiler::default();
        let err = transpiler
            .transpile("a.b", "Flow a.b\n  Inputs a\n  Inputs b\nLog b\n")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transpiler(TranspilerError::DuplicateHeaderItem(_))
        ));
        let err = transpiler
            .transpile("a.b", "Flow a.b\n  Configs a\n  Configs b\n  Inputs b\nLog b\n")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transpiler(TranspilerError::DuplicateHeaderItem(_))
        ));
    }

    #[test]
    fn test_syntax_error_wins() {
        let transpiler = Transpiler::default();
        let err = transpiler.transpile("a.b", "Flow a.c\nLog \"x").unwrap_err();
        let syntax = err.as_syntax().unwrap();
        assert_eq!(syntax.line, 2);
        assert_eq!(syntax.column, 4);
    }

    #[test]
    fn test_check_syntax() {
        let transpiler = Transpiler::default();
        let source = "Flow a.b\n  Inputs x x\nTrigger a.b";
        transpiler.check_syntax(source, None).unwrap();
        transpiler.check_syntax(source, Some("a.b")).unwrap();
        assert!(transpiler.check_syntax(source, Some("a.c")).is_err());
        assert!(transpiler.check_syntax("Flow", None).is_err());
    }

    #[test]
    fn test_extra_reserved() {
        let transpiler = Transpiler::new(TranspilerConfig {
            extra_reserved: vec!["session".into()],
            emit_header_comment: false,
        });
        let result = transpiler
            .transpile("a.b", "Flow a.b\n  Inputs session\nLog session.id")
            .unwrap();
        assert_eq!(result.inputs, vec!["_session"]);
        assert_that(&result.code).contains("_log(_session.id);");
    }

    #[test]
    fn test_deterministic() {
        let transpiler = Transpiler::default();
        let source = "Flow a.b\nRepeat 3 times\n    x = [1, 2]\nEnd";
        assert_eq!(
            transpiler.transpile("a.b", source).unwrap(),
            transpiler.transpile("a.b", source).unwrap()
        );
    }

    #[test]
    fn test_result_json() {
        let result = TranspilationResult {
            function_name: "_a_b".into(),
            inputs: vec!["x".into()],
            timeout: None,
            code: "function _a_b(x) {}".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "functionName": "_a_b",
                "inputs": ["x"],
                "timeout": null,
                "code": "function _a_b(x) {}"
            })
        );
    }
}
