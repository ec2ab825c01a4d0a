//! The abstract syntax tree: a closed family of declaration, statement and
//! expression nodes produced by the parser and annotated in place by the
//! analyzer.
//!
//! Annotation slots live as `RefCell` fields on the nodes themselves rather
//! than in a side table or a separate "analyzed AST" type. A distinct
//! analyzed-AST type was the other option on the table, but `Function`/
//! `Variable` objects are shared between the analyzer's stub installation
//! and the interpreter's later fill-in (see `scope::Function::install_body`),
//! so the same node graph has to survive both passes; in-place `RefCell`
//! slots are the direct way to express that without two parallel tree
//! types.
pub mod declaration;
pub mod expression;
pub mod statement;

pub use declaration::{Function, Global, Param, Source};
pub use expression::{Expr, ExprKind, Literal};
pub use statement::{Case, Stmt, StmtKind};
