//! The intermediate tree built from the parse tree of a flow.
//!
//! Every grammar rule is classified once (see [`classify`]): the rules that are "a value" are
//! collapsed into a single text leaf, the structural rules keep their meaningful children and the
//! tokens are either kept as text leaves or dropped.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::parser::{Pair, Rule};
use crate::rewrite::IdentifierRewriter;

/// How the text of a collapsed rule is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    /// Concatenation of the text of the descendants.
    Verbatim,
    /// A plain identifier, renamed if reserved.
    Identifier,
    /// A variable reference: identifier correction and accessor rewriting.
    Variable,
}

/// The role of a grammar rule when building the [`IrTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The whole subtree becomes a single text leaf.
    Text(TextTransform),
    /// The node keeps its children, dropping the ones without content.
    Structural,
    /// A terminal token: kept as a text leaf only if `keep`.
    Token { keep: bool },
}

/// The classification table of the grammar rules.
pub fn classify(rule: Rule) -> RuleKind {
    use TextTransform::*;
    match rule {
        Rule::qname | Rule::method | Rule::map_key => RuleKind::Text(Verbatim),
        Rule::expression | Rule::list | Rule::map | Rule::map_entry => RuleKind::Text(Verbatim),
        Rule::short_var => RuleKind::Text(Identifier),
        Rule::variable => RuleKind::Text(Variable),

        Rule::IS | Rule::NOT | Rule::AND | Rule::OR => RuleKind::Token { keep: true },
        Rule::STRING | Rule::NUM | Rule::UINT | Rule::BOOL | Rule::NULL => {
            RuleKind::Token { keep: true }
        }
        Rule::DOLLAR => RuleKind::Token { keep: true },

        Rule::FLOW
        | Rule::BASEPATH
        | Rule::TIMEOUT
        | Rule::SECONDS
        | Rule::CONFIGS
        | Rule::INPUTS
        | Rule::LOG
        | Rule::TRIGGER
        | Rule::CALL
        | Rule::RRF
        | Rule::RFAC
        | Rule::FINISH
        | Rule::QUIT
        | Rule::WHEN
        | Rule::OTHERWISE
        | Rule::REPEAT
        | Rule::TIMES
        | Rule::ITERATE
        | Rule::OVER
        | Rule::USING
        | Rule::MATCH
        | Rule::TO
        | Rule::END
        | Rule::ASSIGN
        | Rule::PIPE
        | Rule::HASH
        | Rule::LBRACK
        | Rule::RBRACK
        | Rule::LBRACE
        | Rule::RBRACE
        | Rule::COMMA
        | Rule::COLON
        | Rule::EOI => RuleKind::Token { keep: false },

        Rule::flow
        | Rule::header
        | Rule::base_path
        | Rule::timeout
        | Rule::configs
        | Rule::inputs
        | Rule::conditions
        | Rule::condition
        | Rule::assignment
        | Rule::action_stmt
        | Rule::preassign
        | Rule::catch_assign
        | Rule::flow_call
        | Rule::method_call
        | Rule::static_call
        | Rule::instance_call
        | Rule::rrf_call
        | Rule::rfac_call
        | Rule::log_stmt
        | Rule::finish_stmt
        | Rule::quit_stmt
        | Rule::block
        | Rule::otherwise
        | Rule::when_block
        | Rule::repeat_block
        | Rule::iterate_block
        | Rule::match_block
        | Rule::match_arm => RuleKind::Structural,

        // silent helper rules never produce a pair
        #[allow(unreachable_patterns)]
        _ => RuleKind::Structural,
    }
}

/// A node of the [`IrTree`].
///
/// An element holds only children and a text leaf holds only text, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrNode {
    Element { rule: Rule, children: Vec<IrNode> },
    Text { rule: Rule, text: String },
}

impl IrNode {
    /// The grammar rule this node comes from.
    pub fn rule(&self) -> Rule {
        match self {
            IrNode::Element { rule, .. } | IrNode::Text { rule, .. } => *rule,
        }
    }

    /// The text of a text leaf, `None` for elements.
    pub fn text(&self) -> Option<&str> {
        match self {
            IrNode::Element { .. } => None,
            IrNode::Text { text, .. } => Some(text),
        }
    }

    /// The children of an element, empty for text leaves.
    pub fn children(&self) -> &[IrNode] {
        match self {
            IrNode::Element { children, .. } => children,
            IrNode::Text { .. } => &[],
        }
    }

    /// The first direct child with the given rule.
    pub fn child(&self, rule: Rule) -> Option<&IrNode> {
        self.children().iter().find(|c| c.rule() == rule)
    }

    /// All the direct children with the given rule.
    pub fn children_of(&self, rule: Rule) -> impl Iterator<Item = &IrNode> {
        self.children().iter().filter(move |c| c.rule() == rule)
    }

    /// Follow a path of rules from this node, returning all the nodes reached.
    pub fn select(&self, path: &[Rule]) -> Vec<&IrNode> {
        match path.split_first() {
            None => vec![self],
            Some((first, rest)) => self
                .children_of(*first)
                .flat_map(|child| child.select(rest))
                .collect(),
        }
    }

    /// All the descendants (this node included) with the given rule, in document order.
    pub fn descendants(&self, rule: Rule) -> Vec<&IrNode> {
        let mut result = vec![];
        self.collect_descendants(rule, &mut result);
        result
    }

    fn collect_descendants<'a>(&'a self, rule: Rule, result: &mut Vec<&'a IrNode>) {
        if self.rule() == rule {
            result.push(self);
        }
        for child in self.children() {
            child.collect_descendants(rule, result);
        }
    }

    fn fmt_indented(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
        let pad = "  ".repeat(depth);
        match self {
            IrNode::Element { rule, children } => {
                writeln!(f, "{}{:?}", pad, rule)?;
                for child in children {
                    child.fmt_indented(f, depth + 1)?;
                }
                Ok(())
            }
            IrNode::Text { rule, text } => writeln!(f, "{}{:?} {:?}", pad, rule, text),
        }
    }
}

impl Display for IrNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// The intermediate tree of a flow, identified by the name of the function it will become.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrTree {
    function_name: String,
    root: IrNode,
}

impl IrTree {
    /// The name of the generated function.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// The `flow` node.
    pub fn root(&self) -> &IrNode {
        &self.root
    }

    /// The `header` node.
    pub fn header(&self) -> Option<&IrNode> {
        self.root.child(Rule::header)
    }

    /// The first header line of the given kind.
    fn header_item(&self, rule: Rule) -> Option<&IrNode> {
        self.header().and_then(|h| h.child(rule))
    }

    /// The qualified name declared after `Flow`.
    pub fn qualified_name(&self) -> Option<&str> {
        self.header_item(Rule::qname).and_then(IrNode::text)
    }

    /// The names of the inputs, in declaration order.
    pub fn inputs(&self) -> Vec<&str> {
        self.header_item(Rule::inputs)
            .map(|inputs| inputs.children().iter().filter_map(IrNode::text).collect())
            .unwrap_or_default()
    }

    /// The name of the config variable, if any.
    pub fn config(&self) -> Option<&str> {
        self.header_item(Rule::configs)
            .and_then(|c| c.child(Rule::short_var))
            .and_then(IrNode::text)
    }

    /// The base path as a string literal (quotes included), if any.
    pub fn base_path(&self) -> Option<&str> {
        self.header_item(Rule::base_path)
            .and_then(|b| b.child(Rule::STRING))
            .and_then(IrNode::text)
    }

    /// The timeout, as written in the source, if any.
    pub fn timeout(&self) -> Option<&str> {
        self.header_item(Rule::timeout)
            .and_then(|t| t.child(Rule::UINT))
            .and_then(IrNode::text)
    }

    /// The kinds of header lines that appear more than once, which makes the flow invalid.
    pub fn duplicated_header_items(&self) -> Vec<Rule> {
        self.header()
            .map(|h| {
                h.children()
                    .iter()
                    .map(IrNode::rule)
                    .filter(|r| *r != Rule::qname)
                    .duplicates()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The qualified names of all the flows triggered statically, in document order.
    pub fn flow_calls(&self) -> Vec<&str> {
        self.root
            .descendants(Rule::flow_call)
            .into_iter()
            .filter_map(|call| call.child(Rule::qname))
            .filter_map(IrNode::text)
            .collect()
    }

    /// The top level statements of the flow.
    pub fn statements(&self) -> impl Iterator<Item = &IrNode> {
        self.root
            .children()
            .iter()
            .filter(|c| c.rule() != Rule::header)
    }
}

impl Display for IrTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# {}", self.function_name)?;
        write!(f, "{}", self.root)
    }
}

/// Builds the [`IrTree`] out of the parse tree.
pub struct IrBuilder<'a> {
    rewriter: &'a IdentifierRewriter,
}

impl<'a> IrBuilder<'a> {
    pub fn new(rewriter: &'a IdentifierRewriter) -> Self {
        Self { rewriter }
    }

    /// Build the tree of the `flow` pair.
    pub(crate) fn build(&self, flow: Pair<'_>, function_name: impl Into<String>) -> IrTree {
        let root = self.visit(flow).unwrap_or(IrNode::Element {
            rule: Rule::flow,
            children: vec![],
        });
        IrTree {
            function_name: function_name.into(),
            root,
        }
    }

    fn visit(&self, pair: Pair<'_>) -> Option<IrNode> {
        let rule = pair.as_rule();
        match classify(rule) {
            RuleKind::Text(transform) => Some(IrNode::Text {
                rule,
                text: self.flatten(pair, transform),
            }),
            RuleKind::Structural => {
                let children: Vec<_> = pair.into_inner().filter_map(|p| self.visit(p)).collect();
                if children.is_empty() {
                    None
                } else {
                    Some(IrNode::Element { rule, children })
                }
            }
            RuleKind::Token { keep: true } => Some(IrNode::Text {
                rule,
                text: pair.as_str().to_string(),
            }),
            RuleKind::Token { keep: false } => None,
        }
    }

    fn flatten(&self, pair: Pair<'_>, transform: TextTransform) -> String {
        match transform {
            TextTransform::Identifier => self.rewriter.correct_identifier(pair.as_str()),
            TextTransform::Variable => self.rewriter.rewrite_variable(pair.as_str()),
            TextTransform::Verbatim => {
                if pair.clone().into_inner().next().is_none() {
                    return match pair.as_rule() {
                        Rule::COMMA => ", ".to_string(),
                        Rule::COLON => ": ".to_string(),
                        _ => pair.as_str().to_string(),
                    };
                }
                pair.into_inner()
                    .map(|child| {
                        let transform = match classify(child.as_rule()) {
                            RuleKind::Text(transform) => transform,
                            _ => TextTransform::Verbatim,
                        };
                        self.flatten(child, transform)
                    })
                    .collect()
            }
        }
    }
}
