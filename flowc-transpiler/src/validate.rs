//! Semantic checks on the [`IrTree`] of a flow, run before emitting any code.

use itertools::Itertools;

use crate::error::TranspilerError;
use crate::ir::IrTree;
use crate::parser::Rule;

/// Check that the flow can be transpiled under the name `expected`.
///
/// The checks run in a fixed order and the first failing one is reported.
pub fn validate(tree: &IrTree, expected: &str) -> Result<(), TranspilerError> {
    check_name(tree, expected)?;
    check_single_header_items(tree)?;
    check_self_invocation(tree, expected)?;
    check_unique_inputs(tree)?;
    check_config_not_input(tree)?;
    Ok(())
}

/// The qualified name in the header must be exactly the expected one.
pub fn check_name(tree: &IrTree, expected: &str) -> Result<(), TranspilerError> {
    let found = tree.qualified_name().unwrap_or_default();
    if found != expected {
        return Err(TranspilerError::NameMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Each kind of header line can be declared at most once.
fn check_single_header_items(tree: &IrTree) -> Result<(), TranspilerError> {
    if let Some(rule) = tree.duplicated_header_items().first() {
        let keyword = match rule {
            Rule::inputs => "Inputs",
            Rule::configs => "Configs",
            Rule::timeout => "Timeout",
            Rule::base_path => "Basepath",
            rule => return Err(anyhow::anyhow!("Unexpected header item {:?}", rule).into()),
        };
        return Err(TranspilerError::DuplicateHeaderItem(keyword.to_string()));
    }
    Ok(())
}

fn check_self_invocation(tree: &IrTree, expected: &str) -> Result<(), TranspilerError> {
    if tree.flow_calls().contains(&expected) {
        return Err(TranspilerError::SelfInvocation(expected.to_string()));
    }
    Ok(())
}

fn check_unique_inputs(tree: &IrTree) -> Result<(), TranspilerError> {
    let duplicated = tree.inputs().into_iter().duplicates().join(", ");
    if !duplicated.is_empty() {
        return Err(TranspilerError::DuplicateInput(duplicated));
    }
    Ok(())
}

fn check_config_not_input(tree: &IrTree) -> Result<(), TranspilerError> {
    if let Some(config) = tree.config() {
        if tree.inputs().contains(&config) {
            return Err(TranspilerError::ConfigInputClash(config.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ir::IrBuilder;
    use crate::parser::parse;
    use crate::rewrite::IdentifierRewriter;

    fn check(source: &str, expected: &str) -> Result<(), TranspilerError> {
        let rewriter = IdentifierRewriter::default();
        let tree = IrBuilder::new(&rewriter).build(parse(source).unwrap(), "_f");
        validate(&tree, expected)
    }

    #[test]
    fn test_valid() {
        check("Flow a.b\n  Inputs x y\n  Configs c\nTrigger a.c", "a.b").unwrap();
    }

    #[test]
    fn test_name_mismatch() {
        let err = check("Flow a.c\n  Inputs x x\nTrigger a.c", "a.b").unwrap_err();
        match err {
            TranspilerError::NameMismatch { expected, found } => {
                assert_eq!(expected, "a.b");
                assert_eq!(found, "a.c");
            }
            _ => panic!("Unexpected error: {:?}", err),
        }
    }

    #[test]
    fn test_name_is_case_sensitive() {
        assert!(check("Flow a.B", "a.b").is_err());
    }

    #[test]
    fn test_self_invocation() {
        let err = check("Flow a.b\nWhen x is 1\n    Trigger a.b\nEnd", "a.b").unwrap_err();
        assert!(matches!(err, TranspilerError::SelfInvocation(name) if name == "a.b"));
    }

    #[test]
    fn test_dynamic_trigger_is_not_self_invocation() {
        check("Flow a.b\nTrigger $x", "a.b").unwrap();
    }

    #[test]
    fn test_duplicate_inputs() {
        let err = check("Flow a.b\n  Inputs x y x", "a.b").unwrap_err();
        assert!(matches!(err, TranspilerError::DuplicateInput(name) if name == "x"));
    }

    #[test]
    fn test_config_clash() {
        let err = check("Flow a.b\n  Configs cfg\n  Inputs cfg", "a.b").unwrap_err();
        assert!(matches!(err, TranspilerError::ConfigInputClash(name) if name == "cfg"));
    }

    #[test]
    fn test_repeated_inputs_line() {
        let err = check("Flow a.b\n  Inputs a\n  Inputs b\nLog b", "a.b").unwrap_err();
        assert!(matches!(err, TranspilerError::DuplicateHeaderItem(k) if k == "Inputs"));
    }

    #[test]
    fn test_repeated_configs_line() {
        let err = check("Flow a.b\n  Configs a\n  Configs b\n  Inputs b\nLog b", "a.b").unwrap_err();
        assert!(matches!(err, TranspilerError::DuplicateHeaderItem(k) if k == "Configs"));
    }

    #[test]
    fn test_first_failure_wins() {
        let err = check("Flow a.b\n  Configs x\n  Inputs x x\nTrigger a.b", "a.b").unwrap_err();
        assert!(matches!(err, TranspilerError::SelfInvocation(_)));
    }
}
