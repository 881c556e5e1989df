//! Syntax tree produced by the recipe parser.

use crate::dsl::Value;
use std::sync::Arc;

/// A parsed recipe or helper file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// One builder-operation call, with the line it starts on (1-based, relative
/// to the start of the parsed text).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub call: Call,
}

/// `name args [.call(args)] [do |params| ... end]`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    /// `key: value` arguments in source order
    pub keywords: Vec<(String, Expr)>,
    /// Arguments of a trailing `.call(...)`; `Some` marks a dispatch statement
    pub call_args: Option<Vec<Expr>>,
    pub block: Option<Arc<Block>>,
}

impl Call {
    /// A call with no arguments, keywords or block.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            keywords: Vec::new(),
            call_args: None,
            block: None,
        }
    }
}

/// Body of a `do ... end` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub params: Vec<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `nil`, booleans, integers, plain strings and symbols
    Literal(Value),
    /// Double-quoted string containing `#{...}`
    Interpolated(Vec<StrPart>),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    /// Bare identifier: a local or a variable accessor
    Ident(String),
    /// `target[key]`
    Index(Box<Expr>, Box<Expr>),
    /// `name(args)` in expression position, e.g. `fetch(:key)`
    Call { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrPart {
    Text(String),
    Expr(Expr),
}
