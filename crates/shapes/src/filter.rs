//! `QuadFilter` and `ValueFilter`: the constraint vocabulary
//! `Shape::Quads` and `Shape::Filter` are built from.

use quad_model::Direction;
use iter_tree::CompOp;

use crate::shape::Shape;

/// One direction constraint within a `Shape::Quads`: quads whose
/// component in `dir` is among the refs produced by `values`.
#[derive(Debug, Clone)]
pub struct QuadFilter {
    /// Which quad component this filter constrains.
    pub dir: Direction,
    /// The node-relation shape whose results bound `dir`.
    pub values: Box<Shape>,
}

impl QuadFilter {
    /// Build a filter constraining `dir` to `values`' results.
    pub fn new(dir: Direction, values: Shape) -> Self {
        QuadFilter {
            dir,
            values: Box::new(values),
        }
    }
}

/// A single-value refinement within `Shape::Filter`.
#[derive(Debug, Clone)]
pub enum ValueFilter {
    /// Retain results whose resolved value compares `op` against
    /// `literal`.
    Comparison {
        /// The relational operator.
        op: CompOp,
        /// The constant compared against.
        literal: quad_model::Value,
    },
    /// A shell-style glob (`*`, `?`) compiled to a regex before matching
    /// (glob→regex).
    Wildcard {
        /// The glob pattern, e.g. `"node_*"`.
        pattern: String,
    },
    /// A regular expression.
    Regexp {
        /// The pattern, in `regex` crate syntax.
        re: String,
        /// When `true`, match against the ref's opaque string form
        /// instead of its resolved lexical value.
        matches_refs: bool,
    },
}

/// Compile a shell-style glob into an anchored regex. Only `*` (any run) and `?` (single char) are
/// treated as metacharacters; everything else is escaped literally.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => {
                if is_regex_metacharacter(c) {
                    out.push('\\');
                }
                out.push(c);
            }
        }
    }
    out.push('$');
    out
}

fn is_regex_metacharacter(c: char) -> bool {
    matches!(
        c,
        '.' | '^' | '$' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' | '\\'
    )
}
