//! Top-level declarations: `Source`, `Global`, `Function`.
use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::expression::Expr;
use crate::ast::statement::Stmt;
use crate::scope::{Function as ResolvedFunction, Variable};

#[derive(Debug)]
pub struct Global {
    pub name: String,
    /// Name of the declared type: the element type when `is_list` is set,
    /// since `LIST name : type = [...]` names the element type, not `List`.
    pub type_name: String,
    pub mutable: bool,
    pub is_list: bool,
    pub value: Option<Expr>,
    pub variable: RefCell<Option<Rc<Variable>>>,
    pub offset: usize,
}

#[derive(Debug)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type_name: Option<String>,
    /// Shared so an installed closure can own a cheap handle to the body
    /// independent of how long the parsed `Source` itself stays alive.
    pub body: Rc<Vec<Stmt>>,
    pub function: RefCell<Option<Rc<ResolvedFunction>>>,
    pub offset: usize,
}

#[derive(Debug)]
pub struct Source {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}
