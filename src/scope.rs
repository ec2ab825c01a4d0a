//! Resolved bindings and the lexical scope chain shared by the analyzer
//! (static pass) and the interpreter (dynamic pass).
//!
//! Scopes walk their chain back-to-front to resolve a name, as a
//! parent-linked tree of `Rc`-shared nodes rather than a flat stack, so a
//! function value can capture the scope active at its definition site and
//! keep it alive for as long as the function is reachable, independent of
//! the call stack shape.
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::EvalError;
use crate::types::Type;
use crate::value::Value;

/// A variable resolved by the analyzer and read/written by the interpreter.
/// `value` starts as `Nil` when installed during analysis; the interpreter
/// overwrites it in place as the program runs.
#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub mutable: bool,
    pub ty: Type,
    pub value: RefCell<Value>,
}

impl Variable {
    pub fn new(name: impl Into<String>, mutable: bool, ty: Type) -> Self {
        Self {
            name: name.into(),
            mutable,
            ty,
            value: RefCell::new(Value::Nil),
        }
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }
}

/// The callable body of a resolved function. `None` while only the analyzer
/// has installed the stub; the interpreter fills it in with a real closure
/// before the function can be invoked.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

pub struct Function {
    pub name: String,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub body: RefCell<Option<NativeFn>>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("param_types", &self.param_types)
            .field("return_type", &self.return_type)
            .finish()
    }
}

impl Function {
    pub fn new(name: impl Into<String>, param_types: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            param_types,
            return_type,
            body: RefCell::new(None),
        }
    }

    pub fn install_body(&self, body: NativeFn) {
        *self.body.borrow_mut() = Some(body);
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        let body = self.body.borrow();
        match body.as_ref() {
            Some(f) => f(args),
            None => Err(EvalError::new(format!(
                "function '{}' has no installed body",
                self.name
            ))),
        }
    }
}

#[derive(Default)]
struct ScopeNode {
    parent: Option<Scope>,
    variables: HashMap<String, Rc<Variable>>,
    functions: HashMap<(String, usize), Rc<Function>>,
}

/// A lexical scope: parent-linked, cheaply cloned (an `Rc` handle), created
/// at block entry and dropped at block exit except when captured by a
/// closure.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeNode>>);

impl Scope {
    pub fn root() -> Self {
        Scope(Rc::new(RefCell::new(ScopeNode::default())))
    }

    pub fn child(&self) -> Self {
        Scope(Rc::new(RefCell::new(ScopeNode {
            parent: Some(self.clone()),
            ..Default::default()
        })))
    }

    pub fn define_variable(&self, variable: Rc<Variable>) {
        self.0
            .borrow_mut()
            .variables
            .insert(variable.name.clone(), variable);
    }

    pub fn define_function(&self, function: Rc<Function>) {
        let key = (function.name.clone(), function.param_types.len());
        self.0.borrow_mut().functions.insert(key, function);
    }

    pub fn lookup_variable(&self, name: &str) -> Option<Rc<Variable>> {
        let node = self.0.borrow();
        if let Some(v) = node.variables.get(name) {
            return Some(v.clone());
        }
        node.parent.as_ref().and_then(|p| p.lookup_variable(name))
    }

    pub fn lookup_function(&self, name: &str, arity: usize) -> Option<Rc<Function>> {
        let node = self.0.borrow();
        if let Some(f) = node.functions.get(&(name.to_owned(), arity)) {
            return Some(f.clone());
        }
        node.parent
            .as_ref()
            .and_then(|p| p.lookup_function(name, arity))
    }

    pub fn contains_variable_in_current_scope(&self, name: &str) -> bool {
        self.0.borrow().variables.contains_key(name)
    }

    pub fn contains_function_in_current_scope(&self, name: &str, arity: usize) -> bool {
        self.0
            .borrow()
            .functions
            .contains_key(&(name.to_owned(), arity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_sees_parent_bindings() {
        let root = Scope::root();
        root.define_variable(Rc::new(Variable::new("x", false, Type::Integer)));

        let child = root.child();
        assert!(child.lookup_variable("x").is_some());
        assert!(child.lookup_variable("y").is_none());
    }

    #[test]
    fn closure_keeps_capture_scope_reachable_after_definition_scope_is_dropped() {
        let root = Scope::root();
        let captured = {
            let inner = root.child();
            inner.define_variable(Rc::new(Variable::new("z", false, Type::Integer)));
            inner
        };
        // `inner`'s local binding (`z`) is only reachable through our clone.
        assert!(captured.lookup_variable("z").is_some());
    }

    #[test]
    fn inner_declaration_does_not_shadow_for_sibling_scopes() {
        let root = Scope::root();
        root.define_variable(Rc::new(Variable::new("y", true, Type::Integer)));

        let sibling_a = root.child();
        sibling_a.define_variable(Rc::new(Variable::new("y", true, Type::Integer)));

        let sibling_b = root.child();
        let resolved = sibling_b.lookup_variable("y").unwrap();
        assert!(!sibling_a.contains_variable_in_current_scope("nonexistent"));
        assert_eq!(resolved.name, "y");
    }
}
