//! Renaming of the identifiers that would clash with the target language and rewriting of the
//! variable accessors into calls to the runtime indexing helpers.

use std::collections::HashSet;

use regex::{Captures, Regex};

/// Keywords and literals of the target language.
const JS_KEYWORDS: &[&str] = &[
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

/// Globally reachable names that a flow must not shadow.
const DENIED_GLOBALS: &[&str] = &[
    "undefined",
    "NaN",
    "Infinity",
    "Object",
    "Array",
    "String",
    "Number",
    "Boolean",
    "Date",
    "Math",
    "JSON",
    "RegExp",
    "Error",
    "Function",
    "Symbol",
    "Promise",
    "Map",
    "Set",
    "globalThis",
    "java",
    "javax",
    "Packages",
    "JavaAdapter",
    "JavaImporter",
    "importPackage",
    "importClass",
    "print",
    "indexByInt",
    "indexByString",
    "arguments",
    "eval",
];

/// Matches a string literal, so that it is skipped.
const STRING_LITERAL: &str = r#""(?:[^"\\]|\\.)*""#;

lazy_static! {
    /// `[E]`, an index already in brackets.
    static ref INT_INDEX: Regex =
        Regex::new(&format!(r#"{STRING_LITERAL}|\[([^\[\]"]*)\]"#)).expect("Invalid regex");
    /// `."S"`, a property named by a string literal.
    static ref STRING_PROPERTY: Regex =
        Regex::new(&format!(r#"{STRING_LITERAL}|\.({STRING_LITERAL})"#)).expect("Invalid regex");
    /// `.$E`, a property named by the value of a variable.
    static ref EVAL_PROPERTY: Regex =
        Regex::new(&format!(r#"{STRING_LITERAL}|\.\$([A-Za-z][A-Za-z0-9_]*)"#))
            .expect("Invalid regex");
}

/// Quote a string as a literal of the target language.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Rewrites the names and the accessors of the variables of a flow.
///
/// The set of reserved names is built once and never changed, so a single rewriter can be shared
/// by many concurrent transpilations.
#[derive(Debug, Clone)]
pub struct IdentifierRewriter {
    reserved: HashSet<String>,
}

impl Default for IdentifierRewriter {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl IdentifierRewriter {
    /// Make a rewriter that also reserves the provided names.
    ///
    /// Names starting with `_` are ignored: flow identifiers never start with an underscore, so
    /// they cannot clash.
    pub fn new<I, S>(extra_reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut reserved: HashSet<String> = JS_KEYWORDS
            .iter()
            .chain(DENIED_GLOBALS.iter())
            .map(|s| s.to_string())
            .collect();
        for name in extra_reserved {
            let name = name.into();
            if name.starts_with('_') || name.is_empty() {
                warn!("Ignoring reserved name {:?}: it can never clash", name);
                continue;
            }
            reserved.insert(name);
        }
        Self { reserved }
    }

    /// Whether `name` is a reserved identifier.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Prefix with `_` the leading identifier of `name` if it is reserved. The rest of the name
    /// (everything from the first `.` or `[`) is kept untouched.
    pub fn correct_identifier(&self, name: &str) -> String {
        let end = name
            .find(|c: char| c == '.' || c == '[')
            .unwrap_or(name.len());
        let (ident, rest) = name.split_at(end);
        if self.is_reserved(ident) {
            trace!("Renaming reserved identifier {} to _{}", ident, ident);
            format!("_{}{}", ident, rest)
        } else {
            name.to_string()
        }
    }

    /// Rewrite the accessors of a variable reference into calls to `indexByInt` and
    /// `indexByString`.
    ///
    /// The three kinds are rewritten in a fixed order: bracket indices, string literal
    /// properties, evaluated properties. Text inside string literals is never touched.
    pub fn rewrite_accessors(&self, text: &str) -> String {
        let text = INT_INDEX.replace_all(text, |caps: &Captures| match caps.get(1) {
            Some(index) => {
                let index = index.as_str();
                format!(
                    "[indexByInt({}, {})]",
                    self.correct_identifier(index),
                    js_string(index)
                )
            }
            None => caps[0].to_string(),
        });
        let text = STRING_PROPERTY.replace_all(&text, |caps: &Captures| match caps.get(1) {
            Some(key) => format!("[indexByString({}, null)]", key.as_str()),
            None => caps[0].to_string(),
        });
        let text = EVAL_PROPERTY.replace_all(&text, |caps: &Captures| match caps.get(1) {
            Some(expr) => {
                let expr = expr.as_str();
                format!(
                    "[indexByString({}, {})]",
                    self.correct_identifier(expr),
                    js_string(expr)
                )
            }
            None => caps[0].to_string(),
        });
        text.into_owned()
    }

    /// Both corrections, in order: the leading identifier first, then the accessors.
    pub fn rewrite_variable(&self, text: &str) -> String {
        self.rewrite_accessors(&self.correct_identifier(text))
    }
}
