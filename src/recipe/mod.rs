//! Recipe language: syntax tree and parser.
//!
//! Recipes are data. The parser only knows the shape of statements
//! (`name args [.call(args)] [do |params| ... end]`, with `{ |params| ... }`
//! accepted for the block); which names are valid operations is decided by
//! the interpreter in [`crate::dsl`], against the builder operations and the
//! hooks declared by the DSL definition.

pub mod ast;
pub mod parser;

pub use ast::{Block, Call, Expr, Program, Statement, StrPart};
pub use parser::{MAX_NESTING, parse_recipe};
