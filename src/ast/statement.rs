//! Statement nodes.
use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::expression::Expr;
use crate::scope::Variable;

#[derive(Debug)]
pub struct Case {
    /// `None` marks the default case; it must be last (invariant 4).
    pub value: Option<Expr>,
    pub block: Vec<Stmt>,
}

#[derive(Debug)]
pub enum StmtKind {
    Expression(Expr),
    Declaration {
        name: String,
        type_name: Option<String>,
        value: Option<Expr>,
        variable: RefCell<Option<Rc<Variable>>>,
    },
    Assignment {
        receiver: Expr,
        value: Expr,
    },
    If {
        cond: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
    },
    Switch {
        cond: Expr,
        cases: Vec<Case>,
    },
    While {
        cond: Expr,
        block: Vec<Stmt>,
    },
    Return(Expr),
}

#[derive(Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub offset: usize,
}

impl Stmt {
    pub fn new(kind: StmtKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}
