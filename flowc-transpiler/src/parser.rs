//! Thin wrapper around the pest generated parser of the flow DSL.

use pest::Parser;

use crate::error::SyntaxError;

/// This module exists because of a `pest`'s bug: https://github.com/pest-parser/pest/issues/326
#[allow(missing_docs)]
pub(crate) mod grammar {
    /// The parser of the `.flow` files.
    #[derive(Parser)]
    #[grammar = "grammar/flow.pest"]
    pub struct FlowParser;
}

pub use grammar::Rule;

/// Helper type for lightening the types.
pub(crate) type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// Parse the whole source, returning the `flow` pair.
///
/// The grammar is anchored at both ends, so any unconsumed trailing input is reported as a
/// [`SyntaxError`] at the position where the parser gave up.
pub(crate) fn parse(source: &str) -> Result<Pair<'_>, SyntaxError> {
    let mut pairs = grammar::FlowParser::parse(Rule::flow, source)
        .map_err(|e| SyntaxError::from_pest(e, source))?;
    match pairs.next() {
        Some(flow) => Ok(flow),
        None => Err(SyntaxError::new("empty parse tree", "<EOF>", 1, 0, 0)),
    }
}

/// Human readable name of a rule, used in the syntax error messages.
pub(crate) fn rule_name(rule: &Rule) -> String {
    let name = match rule {
        Rule::EOI => "end of file",
        Rule::FLOW => "'Flow'",
        Rule::BASEPATH => "'Basepath'",
        Rule::TIMEOUT => "'Timeout'",
        Rule::SECONDS => "'seconds'",
        Rule::CONFIGS => "'Configs'",
        Rule::INPUTS => "'Inputs'",
        Rule::LOG => "'Log'",
        Rule::TRIGGER => "'Trigger'",
        Rule::CALL => "'Call'",
        Rule::RRF => "'RRF'",
        Rule::RFAC => "'RFAC'",
        Rule::FINISH => "'Finish'",
        Rule::QUIT => "'Quit'",
        Rule::WHEN => "'When'",
        Rule::OTHERWISE => "'Otherwise'",
        Rule::REPEAT => "'Repeat'",
        Rule::TIMES => "'times'",
        Rule::ITERATE => "'Iterate'",
        Rule::OVER => "'over'",
        Rule::USING => "'using'",
        Rule::MATCH => "'Match'",
        Rule::TO => "'to'",
        Rule::END => "'End'",
        Rule::IS => "'is'",
        Rule::NOT => "'not'",
        Rule::AND => "'and'",
        Rule::OR => "'or'",
        Rule::ASSIGN => "'='",
        Rule::PIPE => "'|'",
        Rule::HASH => "'#'",
        Rule::DOLLAR => "'$'",
        Rule::LBRACK => "'['",
        Rule::RBRACK => "']'",
        Rule::LBRACE => "'{'",
        Rule::RBRACE => "'}'",
        Rule::COMMA => "','",
        Rule::COLON => "':'",
        Rule::STRING => "string literal",
        Rule::NUM => "number",
        Rule::UINT => "integer",
        Rule::BOOL => "boolean",
        Rule::NULL => "'null'",
        Rule::qname => "qualified name",
        Rule::short_var => "identifier",
        Rule::variable => "variable",
        Rule::method => "method name",
        Rule::expression => "expression",
        Rule::map_entry | Rule::map_key => "map entry",
        Rule::condition | Rule::conditions => "condition",
        Rule::block => "new line",
        Rule::otherwise => "'Otherwise'",
        Rule::match_arm => "match arm",
        _ => return format!("{:?}", rule),
    };
    name.to_string()
}
