//! Expression nodes. Every expression shares one annotation slot for its
//! resolved type; `Access` and `Call` carry an extra slot for the binding
//! they resolve to.
use std::cell::RefCell;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::scope::{Function, Variable};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
}

#[derive(Debug)]
pub enum ExprKind {
    Literal(Literal),
    Group(Box<Expr>),
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Access {
        name: String,
        index: Option<Box<Expr>>,
        variable: RefCell<Option<Rc<Variable>>>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        function: RefCell<Option<Rc<Function>>>,
    },
    ListLiteral(Vec<Expr>),
}

/// A node plus its source offset (for diagnostics) and its type slot,
/// written exactly once by the analyzer.
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub offset: usize,
    pub ty: RefCell<Option<Type>>,
}

impl Expr {
    pub fn new(kind: ExprKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            ty: RefCell::new(None),
        }
    }

    pub fn resolved_type(&self) -> Option<Type> {
        self.ty.borrow().clone()
    }

    pub fn set_type(&self, ty: Type) {
        *self.ty.borrow_mut() = Some(ty);
    }
}
