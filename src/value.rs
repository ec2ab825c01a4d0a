//! Runtime values: a tagged wrapper around the interpreter's value space.
use std::fmt::{self, Display};
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
    List(Rc<std::cell::RefCell<Vec<Value>>>),
}

impl Value {
    pub fn type_of(&self) -> Type {
        match self {
            Value::Nil => Type::Nil,
            Value::Boolean(_) => Type::Boolean,
            Value::Integer(_) => Type::Integer,
            Value::Decimal(_) => Type::Decimal,
            Value::Character(_) => Type::Character,
            Value::String(_) => Type::String,
            Value::List(items) => {
                let items = items.borrow();
                let element = items.first().map(|v| v.type_of()).unwrap_or(Type::Any);
                Type::List(Box::new(element))
            }
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer_index(&self) -> Option<usize> {
        match self {
            Value::Integer(i) => i.to_string().parse::<usize>().ok(),
            _ => None,
        }
    }

    /// Printable form used by the `print` built-in and the switch/case and
    /// `==`/`!=` value-equality comparisons.
    pub fn display_form(&self) -> String {
        format!("{self}")
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Character(c) => write!(f, "{c}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                let items = items.borrow();
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
