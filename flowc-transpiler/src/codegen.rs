//! Rendering of the [`IrTree`] into the source of a JavaScript function.
//!
//! The function and the block statements are rendered with askama templates (see the
//! `templates/` directory of this crate); the single line statements are formatted inline. Each
//! renderer returns the lines of the statement, the enclosing template indents them.

use anyhow::anyhow;
use askama::Template;
use itertools::Itertools;

use crate::config::TranspilerConfig;
use crate::error::TranspilerError;
use crate::ir::{IrNode, IrTree};
use crate::parser::Rule;
use crate::rewrite::js_string;

#[derive(Template)]
#[template(path = "function.js", escape = "none")]
struct FunctionTemplate {
    header_comment: Option<String>,
    function_name: String,
    params: String,
    prologue: Vec<String>,
    body: Vec<String>,
    qname: String,
}

#[derive(Template)]
#[template(path = "when.js", escape = "none")]
struct WhenTemplate {
    condition: String,
    body: Vec<String>,
    otherwise: Option<Vec<String>>,
}

#[derive(Template)]
#[template(path = "repeat.js", escape = "none")]
struct RepeatTemplate {
    counter: String,
    times: String,
    body: Vec<String>,
}

#[derive(Template)]
#[template(path = "iterate.js", escape = "none")]
struct IterateTemplate {
    item: String,
    items: String,
    body: Vec<String>,
}

struct MatchArm {
    value: String,
    body: Vec<String>,
}

#[derive(Template)]
#[template(path = "match.js", escape = "none")]
struct MatchTemplate {
    subject_var: String,
    subject: String,
    arms: Vec<MatchArm>,
    otherwise: Option<Vec<String>>,
}

#[derive(Template)]
#[template(path = "action.js", escape = "none")]
struct ActionTemplate {
    target: Option<String>,
    catch_var: Option<String>,
    call: String,
}

/// Split the output of a template into lines.
fn lines_of(rendered: String) -> Vec<String> {
    rendered.trim_end().lines().map(String::from).collect()
}

/// The text of the first child with the given rule, or an error if missing.
fn text_of(node: &IrNode, rule: Rule) -> Result<&str, TranspilerError> {
    node.child(rule)
        .and_then(IrNode::text)
        .ok_or_else(|| anyhow!("{:?} without {:?}", node.rule(), rule).into())
}

/// The texts of all the `expression` children, as the list of arguments of a call.
fn arguments(node: &IrNode) -> String {
    node.children_of(Rule::expression)
        .filter_map(IrNode::text)
        .join(", ")
}

/// Renders the statements of a single flow.
struct Renderer {
    /// Source of unique suffixes for the temporaries of loops and matches.
    counter: usize,
}

impl Renderer {
    fn new() -> Self {
        Self { counter: 0 }
    }

    fn temporary(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("_{}{}", prefix, self.counter)
    }

    /// Render the statements of a block, which may be missing if empty.
    fn block(&mut self, block: Option<&IrNode>) -> Result<Vec<String>, TranspilerError> {
        match block {
            Some(block) => self.statements(block.children().iter()),
            None => Ok(vec![]),
        }
    }

    fn statements<'a>(
        &mut self,
        statements: impl Iterator<Item = &'a IrNode>,
    ) -> Result<Vec<String>, TranspilerError> {
        let mut lines = vec![];
        for statement in statements {
            lines.extend(self.statement(statement)?);
        }
        Ok(lines)
    }

    fn statement(&mut self, node: &IrNode) -> Result<Vec<String>, TranspilerError> {
        let lines = match node.rule() {
            Rule::assignment => vec![format!(
                "{} = {};",
                text_of(node, Rule::variable)?,
                text_of(node, Rule::expression)?
            )],
            Rule::log_stmt => vec![format!("_log({});", arguments(node))],
            Rule::finish_stmt => vec![format!(
                "return _finish({});",
                text_of(node, Rule::expression)?
            )],
            Rule::quit_stmt => vec![format!(
                "if ({}) return _finish(false);",
                self.conditions(node)?
            )],
            Rule::action_stmt => self.action(node)?,
            Rule::when_block => {
                let template = WhenTemplate {
                    condition: self.conditions(node)?,
                    body: self.block(node.child(Rule::block))?,
                    otherwise: match node.child(Rule::otherwise) {
                        Some(otherwise) => Some(self.block(otherwise.child(Rule::block))?),
                        None => None,
                    },
                };
                lines_of(template.render()?)
            }
            Rule::repeat_block => {
                let template = RepeatTemplate {
                    counter: self.temporary("r"),
                    times: text_of(node, Rule::expression)?.to_string(),
                    body: self.block(node.child(Rule::block))?,
                };
                lines_of(template.render()?)
            }
            Rule::iterate_block => {
                let template = IterateTemplate {
                    item: text_of(node, Rule::short_var)?.to_string(),
                    items: text_of(node, Rule::expression)?.to_string(),
                    body: self.block(node.child(Rule::block))?,
                };
                lines_of(template.render()?)
            }
            Rule::match_block => {
                let subject_var = self.temporary("m");
                let mut arms = vec![];
                for arm in node.children_of(Rule::match_arm) {
                    arms.push(MatchArm {
                        value: text_of(arm, Rule::expression)?.to_string(),
                        body: self.block(arm.child(Rule::block))?,
                    });
                }
                let template = MatchTemplate {
                    subject_var,
                    subject: text_of(node, Rule::expression)?.to_string(),
                    arms,
                    otherwise: match node.child(Rule::otherwise) {
                        Some(otherwise) => Some(self.block(otherwise.child(Rule::block))?),
                        None => None,
                    },
                };
                lines_of(template.render()?)
            }
            rule => {
                return Err(anyhow!("Unexpected statement {:?}", rule).into());
            }
        };
        Ok(lines)
    }

    /// Render the `conditions` child of `node` as a boolean expression.
    fn conditions(&self, node: &IrNode) -> Result<String, TranspilerError> {
        let conditions = node
            .child(Rule::conditions)
            .ok_or_else(|| anyhow!("{:?} without conditions", node.rule()))?;
        let mut result = String::new();
        for child in conditions.children() {
            match child.rule() {
                Rule::AND => result += " && ",
                Rule::OR => result += " || ",
                Rule::condition => {
                    let operands: Vec<_> = child
                        .children_of(Rule::expression)
                        .filter_map(IrNode::text)
                        .collect();
                    let [left, right] = operands[..] else {
                        return Err(anyhow!("Malformed condition").into());
                    };
                    let negated = child.child(Rule::NOT).is_some();
                    result += &format!(
                        "{}_eq({}, {})",
                        if negated { "!" } else { "" },
                        left,
                        right
                    );
                }
                rule => return Err(anyhow!("Unexpected {:?} in conditions", rule).into()),
            }
        }
        Ok(result)
    }

    fn action(&mut self, node: &IrNode) -> Result<Vec<String>, TranspilerError> {
        let mut template = ActionTemplate {
            target: None,
            catch_var: None,
            call: String::new(),
        };
        for child in node.children() {
            match child.rule() {
                Rule::preassign => {
                    template.target = Some(text_of(child, Rule::variable)?.to_string());
                }
                Rule::catch_assign => {
                    template.target = child
                        .child(Rule::variable)
                        .and_then(IrNode::text)
                        .map(String::from);
                    template.catch_var = Some(text_of(child, Rule::short_var)?.to_string());
                }
                _ => template.call = call(child)?,
            }
        }
        Ok(lines_of(template.render()?))
    }
}

/// Render a call as an expression.
fn call(node: &IrNode) -> Result<String, TranspilerError> {
    let call = match node.rule() {
        Rule::flow_call => {
            let target = if node.child(Rule::DOLLAR).is_some() {
                text_of(node, Rule::variable)?.to_string()
            } else {
                js_string(text_of(node, Rule::qname)?)
            };
            format!("_flowCall({}, [{}])", target, arguments(node))
        }
        Rule::method_call => {
            if let Some(target) = node.child(Rule::static_call) {
                format!(
                    "_callStatic({}, {}, [{}])",
                    js_string(text_of(target, Rule::qname)?),
                    js_string(text_of(target, Rule::method)?),
                    arguments(node)
                )
            } else {
                let target = node
                    .child(Rule::instance_call)
                    .ok_or_else(|| anyhow!("Call without target"))?;
                format!(
                    "_callInstance({}, {}, [{}])",
                    text_of(target, Rule::variable)?,
                    js_string(text_of(target, Rule::method)?),
                    arguments(node)
                )
            }
        }
        Rule::rrf_call => {
            let data = node
                .child(Rule::map)
                .or_else(|| node.child(Rule::variable))
                .and_then(IrNode::text)
                .unwrap_or("null");
            let use_callback = node
                .child(Rule::BOOL)
                .and_then(IrNode::text)
                .unwrap_or("false");
            format!(
                "_renderReplyFetch({}, {}, {})",
                text_of(node, Rule::STRING)?,
                data,
                use_callback
            )
        }
        Rule::rfac_call => format!(
            "_redirectFetchAtCallback({})",
            text_of(node, Rule::expression)?
        ),
        rule => return Err(anyhow!("Unexpected call {:?}", rule).into()),
    };
    Ok(call)
}

fn is_plain_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The variables assigned by the flow that need a local declaration.
fn collect_locals<'a>(node: &'a IrNode, locals: &mut Vec<&'a str>) {
    let assigned: Vec<&IrNode> = match node.rule() {
        Rule::assignment | Rule::preassign => node.child(Rule::variable).into_iter().collect(),
        Rule::catch_assign => node
            .child(Rule::variable)
            .into_iter()
            .chain(node.child(Rule::short_var))
            .collect(),
        Rule::iterate_block => node.child(Rule::short_var).into_iter().collect(),
        _ => vec![],
    };
    locals.extend(
        assigned
            .into_iter()
            .filter_map(IrNode::text)
            .filter(|t| is_plain_identifier(t)),
    );
    for child in node.children() {
        collect_locals(child, locals);
    }
}

/// The names of the parameters of the generated function.
pub fn extract_inputs(tree: &IrTree) -> Vec<String> {
    tree.inputs().into_iter().map(String::from).collect()
}

/// The timeout of the flow in seconds, `None` if not declared.
///
/// Zero is rejected: a flow with no time to run could never finish.
pub fn extract_timeout(tree: &IrTree) -> Result<Option<u64>, TranspilerError> {
    match tree.timeout() {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) => Err(TranspilerError::InvalidTimeout(format!(
                "{} (must be positive)",
                raw
            ))),
            Ok(seconds) => Ok(Some(seconds)),
            Err(_) => Err(TranspilerError::InvalidTimeout(raw.to_string())),
        },
    }
}

/// Render the whole function of the flow.
pub fn render(tree: &IrTree, config: &TranspilerConfig) -> Result<String, TranspilerError> {
    let qname = tree
        .qualified_name()
        .ok_or_else(|| anyhow!("Flow without qualified name"))?;
    let inputs = tree.inputs();
    let config_var = tree.config();

    let mut locals = vec![];
    collect_locals(tree.root(), &mut locals);
    let locals = locals
        .into_iter()
        .filter(|l| !inputs.contains(l) && Some(*l) != config_var)
        .unique()
        .collect_vec();
    debug!("Locals of {}: {:?}", qname, locals);

    let mut prologue = vec![];
    if !locals.is_empty() {
        prologue.push(format!("let {};", locals.join(", ")));
    }
    if let Some(config_var) = config_var {
        prologue.push(format!(
            "let {} = _flowConfigs({});",
            config_var,
            js_string(qname)
        ));
    }
    if let Some(base_path) = tree.base_path() {
        prologue.push(format!("_setBasePath({});", base_path));
    }

    let body = Renderer::new().statements(tree.statements())?;
    let template = FunctionTemplate {
        header_comment: config
            .emit_header_comment
            .then(|| format!("Generated from flow {}", qname)),
        function_name: tree.function_name().to_string(),
        params: inputs.join(", "),
        prologue,
        body,
        qname: js_string(qname),
    };
    let mut code = template.render()?.trim_end().to_string();
    code.push('\n');
    Ok(code)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ir::IrBuilder;
    use crate::parser::parse;
    use crate::rewrite::IdentifierRewriter;

    fn tree(source: &str) -> IrTree {
        let rewriter = IdentifierRewriter::default();
        IrBuilder::new(&rewriter).build(parse(source).unwrap(), "_a_b")
    }

    fn body(source: &str) -> Vec<String> {
        Renderer::new().statements(tree(source).statements()).unwrap()
    }

    #[test]
    fn test_function_shape() {
        let config = TranspilerConfig::default();
        let code = render(
            &tree("Flow a.b\n  Basepath \"login\"\n  Configs conf\n  Inputs user\nx = user.name\nFinish x"),
            &config,
        )
        .unwrap();
        assert_eq!(
            code,
            r#"// Generated from flow a.b
function _a_b(user) {
    let x;
    let conf = _flowConfigs("a.b");
    _setBasePath("login");
    x = user.name;
    return _finish(x);
    return _unfinished("a.b");
}
"#
        );
    }

    #[test]
    fn test_no_header_comment() {
        let config = TranspilerConfig {
            emit_header_comment: false,
            ..Default::default()
        };
        let code = render(&tree("Flow a.b"), &config).unwrap();
        assert_eq!(code, "function _a_b() {\n    return _unfinished(\"a.b\");\n}\n");
    }

    #[test]
    fn test_locals() {
        let source = "Flow a.b\n  Inputs x\nx = 1\ny = 2\nz.w = 3\nr | E = Trigger c.d\nIterate over y using it\n    y = it\nEnd";
        let mut locals = vec![];
        let tree = tree(source);
        collect_locals(tree.root(), &mut locals);
        assert_eq!(locals, vec!["x", "y", "r", "E", "it", "y"]);
    }

    #[test]
    fn test_when() {
        assert_eq!(
            body("Flow a.b\nWhen x is 1 and y is not null\n    Log \"one\"\nOtherwise\n    Log \"other\" x\nEnd"),
            vec![
                "if (_eq(x, 1) && !_eq(y, null)) {",
                "    _log(\"one\");",
                "} else {",
                "    _log(\"other\", x);",
                "}",
            ]
        );
    }

    #[test]
    fn test_empty_when() {
        assert_eq!(body("Flow a.b\nWhen x is 1\nEnd"), vec!["if (_eq(x, 1)) {", "}"]);
    }

    #[test]
    fn test_nested_loops() {
        assert_eq!(
            body("Flow a.b\nRepeat 2 times\n    Repeat n times\n        Log i\n    End\nEnd"),
            vec![
                "for (let _r1 = 0; _r1 < 2; _r1++) {",
                "    for (let _r2 = 0; _r2 < n; _r2++) {",
                "        _log(i);",
                "    }",
                "}",
            ]
        );
    }

    #[test]
    fn test_iterate() {
        assert_eq!(
            body("Flow a.b\nIterate over list[0] using item\n    Log item\nEnd"),
            vec![
                "for (item of _items(list[indexByInt(0, \"0\")])) {",
                "    _log(item);",
                "}",
            ]
        );
    }

    #[test]
    fn test_match() {
        assert_eq!(
            body("Flow a.b\nMatch x to\n    \"a\"\n        Log 1\n    2\n        Log 2\nOtherwise\n    Log 3\nEnd"),
            vec![
                "const _m1 = x;",
                "if (_eq(_m1, \"a\")) {",
                "    _log(1);",
                "} else if (_eq(_m1, 2)) {",
                "    _log(2);",
                "} else {",
                "    _log(3);",
                "}",
            ]
        );
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            body(
                "Flow a.b\nTrigger c.d 1 x\ny = Trigger $name\nCall com.acme.Util#hash x\nres = Call x toString\nRRF \"index.ftlh\" { a: 1 } true\nRRF \"page.ftlh\"\nv = RFAC \"https://example.com\"",
            ),
            vec![
                "_flowCall(\"c.d\", [1, x]);",
                "y = _flowCall(name, []);",
                "_callStatic(\"com.acme.Util\", \"hash\", [x]);",
                "res = _callInstance(x, \"toString\", []);",
                "_renderReplyFetch(\"index.ftlh\", {a: 1}, true);",
                "_renderReplyFetch(\"page.ftlh\", null, false);",
                "v = _redirectFetchAtCallback(\"https://example.com\");",
            ]
        );
    }

    #[test]
    fn test_catch_assign() {
        assert_eq!(
            body("Flow a.b\nres | err = Trigger c.d"),
            vec![
                "try {",
                "    res = _flowCall(\"c.d\", []);",
                "    err = null;",
                "} catch (_e) {",
                "    err = _asError(_e);",
                "}",
            ]
        );
        assert_eq!(
            body("Flow a.b\n| err = Call x close"),
            vec![
                "try {",
                "    _callInstance(x, \"close\", []);",
                "    err = null;",
                "} catch (_e) {",
                "    err = _asError(_e);",
                "}",
            ]
        );
    }

    #[test]
    fn test_finish_and_quit() {
        assert_eq!(
            body("Flow a.b\nQuit When x is null\nFinish true"),
            vec!["if (_eq(x, null)) return _finish(false);", "return _finish(true);"]
        );
    }

    #[test]
    fn test_timeout() {
        assert_eq!(extract_timeout(&tree("Flow a.b")).unwrap(), None);
        assert_eq!(
            extract_timeout(&tree("Flow a.b\n  Timeout 30 seconds")).unwrap(),
            Some(30)
        );
        assert!(extract_timeout(&tree("Flow a.b\n  Timeout 0 seconds")).is_err());
        assert!(extract_timeout(&tree("Flow a.b\n  Timeout 99999999999999999999 seconds")).is_err());
    }
}
