//! `ember`: lexer, parser, analyzer, tree-walking interpreter and Java-like
//! emitter for a small statically-typed imperative language.
pub mod analyzer;
pub mod ast;
pub mod builtins;
pub mod emitter;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod token;
pub mod types;
pub mod value;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use log::debug;

pub use error::{EvalError, ParseError};
pub use value::Value;

/// One error type crossing the whole pipeline: lex/parse errors carry an
/// offset, analysis and runtime errors carry a message alone.
#[derive(Debug)]
pub enum EmberError {
    Parse(ParseError),
    Eval(EvalError),
}

impl std::fmt::Display for EmberError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmberError::Parse(e) => write!(f, "{e}"),
            EmberError::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EmberError {}

impl From<ParseError> for EmberError {
    fn from(e: ParseError) -> Self {
        EmberError::Parse(e)
    }
}

impl From<EvalError> for EmberError {
    fn from(e: EvalError) -> Self {
        EmberError::Eval(e)
    }
}

/// Lexes and parses `source`, producing an unanalyzed `Source` tree.
pub fn parse_source(source: &str) -> Result<ast::Source, EmberError> {
    debug!("lexing {} bytes of source", source.len());
    let tokens = lexer::lex(source)?;
    debug!("lexed {} tokens", tokens.len());
    let tree = parser::parse(tokens)?;
    debug!(
        "parsed {} globals, {} functions",
        tree.globals.len(),
        tree.functions.len()
    );
    Ok(tree)
}

/// Runs `source` end to end: lex, parse, analyze, interpret. `output`
/// receives everything written by the built-in `print`.
pub fn run_source(source: &str, output: Rc<RefCell<dyn Write>>) -> Result<Value, EmberError> {
    let tree = parse_source(source)?;
    let scope = analyzer::analyze(&tree)?;
    debug!("analysis complete, invoking main/0");
    Ok(interpreter::run(&tree, &scope, output)?)
}

/// Lexes, parses, analyzes, and emits `source` as Java-like target text.
pub fn emit_source(source: &str) -> Result<String, EmberError> {
    let tree = parse_source(source)?;
    analyzer::analyze(&tree)?;
    Ok(emitter::emit(&tree))
}
