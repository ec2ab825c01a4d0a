//! The semantic analyzer: one top-down walk that resolves names, assigns
//! types, checks assignability and enforces the structural rules (unique
//! `main/0`, switch default-last, etc).
use std::rc::Rc;

use crate::ast::{Case, Expr, ExprKind, Function as AstFunction, Global, Literal, Source, Stmt, StmtKind};
use crate::builtins;
use crate::error::EvalError;
use crate::scope::{Function, Scope, Variable};
use crate::types::Type;

/// Analyzes `source` against a fresh scope seeded with the built-in
/// signatures, returning that root scope so the interpreter can reuse the
/// same resolved `Variable`/`Function` objects.
pub fn analyze(source: &Source) -> Result<Scope, EvalError> {
    let root = Scope::root();
    for sig in builtins::signatures() {
        root.define_function(Rc::new(Function::new(
            sig.name,
            sig.param_types.to_vec(),
            sig.return_type,
        )));
    }

    for global in &source.globals {
        analyze_global(global, &root)?;
    }

    // Stub functions are installed before any body is analyzed so that
    // self- and forward-reference both resolve.
    for function in &source.functions {
        let param_types = resolve_types(function.params.iter().map(|p| p.type_name.as_str()))?;
        if root.contains_function_in_current_scope(&function.name, param_types.len()) {
            return Err(EvalError::new(format!(
                "function '{}/{}' is already defined",
                function.name,
                param_types.len()
            )));
        }
        let return_type = match &function.return_type_name {
            Some(name) => resolve_type(name)?,
            None => Type::Nil,
        };
        let resolved = Rc::new(Function::new(function.name.clone(), param_types, return_type));
        *function.function.borrow_mut() = Some(resolved.clone());
        root.define_function(resolved);
    }

    for function in &source.functions {
        analyze_function(function, &root)?;
    }

    let main = root
        .lookup_function("main", 0)
        .ok_or_else(|| EvalError::new("no function 'main' with arity 0"))?;
    if main.return_type != Type::Integer {
        return Err(EvalError::new("'main' must return Integer"));
    }

    Ok(root)
}

fn resolve_type(name: &str) -> Result<Type, EvalError> {
    Type::from_name(name).ok_or_else(|| EvalError::new(format!("unknown type '{name}'")))
}

fn resolve_types<'a>(names: impl Iterator<Item = &'a str>) -> Result<Vec<Type>, EvalError> {
    names.map(resolve_type).collect()
}

fn analyze_global(global: &Global, scope: &Scope) -> Result<(), EvalError> {
    let element_or_declared = resolve_type(&global.type_name)?;
    let declared = if global.is_list {
        Type::List(Box::new(element_or_declared))
    } else {
        element_or_declared
    };

    if let Some(value) = &global.value {
        analyze_expr(value, scope)?;
        let value_type = value.resolved_type().expect("analyzed expression has a type");
        if !value_type.is_assignable_to(&declared) {
            return Err(EvalError::new(format!(
                "global '{}' declared as {declared} but initialized with {value_type}",
                global.name
            )));
        }
    }

    let variable = Rc::new(Variable::new(global.name.clone(), global.mutable, declared));
    *global.variable.borrow_mut() = Some(variable.clone());
    scope.define_variable(variable);
    Ok(())
}

fn analyze_function(function: &AstFunction, parent: &Scope) -> Result<(), EvalError> {
    let resolved = function
        .function
        .borrow()
        .clone()
        .expect("stub installed before body analysis");

    let body_scope = parent.child();
    for (param, ty) in function.params.iter().zip(resolved.param_types.iter()) {
        body_scope.define_variable(Rc::new(Variable::new(param.name.clone(), true, ty.clone())));
    }

    analyze_block(&function.body, &body_scope, &resolved.return_type)
}

fn analyze_block(block: &[Stmt], scope: &Scope, expected_return: &Type) -> Result<(), EvalError> {
    for stmt in block {
        analyze_stmt(stmt, scope, expected_return)?;
    }
    Ok(())
}

fn analyze_stmt(stmt: &Stmt, scope: &Scope, expected_return: &Type) -> Result<(), EvalError> {
    match &stmt.kind {
        StmtKind::Expression(e) => {
            analyze_expr(e, scope)?;
        }
        StmtKind::Declaration {
            name,
            type_name,
            value,
            variable,
        } => {
            if type_name.is_none() && value.is_none() {
                return Err(EvalError::new(format!(
                    "declaration of '{name}' needs a type, an initializer, or both"
                )));
            }
            let declared = match type_name {
                Some(n) => Some(resolve_type(n)?),
                None => None,
            };
            let ty = if let Some(v) = value {
                analyze_expr(v, scope)?;
                let value_type = v.resolved_type().expect("analyzed expression has a type");
                if let Some(declared) = &declared {
                    if !value_type.is_assignable_to(declared) {
                        return Err(EvalError::new(format!(
                            "'{name}' declared as {declared} but initialized with {value_type}"
                        )));
                    }
                }
                declared.unwrap_or(value_type)
            } else {
                declared.expect("checked above")
            };
            let resolved = Rc::new(Variable::new(name.clone(), true, ty));
            *variable.borrow_mut() = Some(resolved.clone());
            scope.define_variable(resolved);
        }
        StmtKind::Assignment { receiver, value } => {
            let ExprKind::Access { name, .. } = &receiver.kind else {
                return Err(EvalError::new("assignment target must be a variable access"));
            };
            analyze_expr(receiver, scope)?;
            analyze_expr(value, scope)?;
            let variable = scope
                .lookup_variable(name)
                .ok_or_else(|| EvalError::new(format!("undefined variable '{name}'")))?;
            if !variable.mutable {
                return Err(EvalError::new(format!("cannot assign to immutable variable '{name}'")));
            }
            let receiver_type = receiver.resolved_type().expect("analyzed expression has a type");
            let value_type = value.resolved_type().expect("analyzed expression has a type");
            if !value_type.is_assignable_to(&receiver_type) {
                return Err(EvalError::new(format!(
                    "cannot assign {value_type} to '{name}' of type {receiver_type}"
                )));
            }
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            analyze_expr(cond, scope)?;
            require_boolean(cond)?;
            if then_block.is_empty() {
                return Err(EvalError::new("'IF' then-block must be non-empty"));
            }
            analyze_block(then_block, &scope.child(), expected_return)?;
            if let Some(else_block) = else_block {
                analyze_block(else_block, &scope.child(), expected_return)?;
            }
        }
        StmtKind::Switch { cond, cases } => {
            analyze_expr(cond, scope)?;
            let cond_type = cond.resolved_type().expect("analyzed expression has a type");
            analyze_switch_cases(cases, &cond_type, scope, expected_return)?;
        }
        StmtKind::While { cond, block } => {
            analyze_expr(cond, scope)?;
            require_boolean(cond)?;
            analyze_block(block, &scope.child(), expected_return)?;
        }
        StmtKind::Return(value) => {
            analyze_expr(value, scope)?;
            let value_type = value.resolved_type().expect("analyzed expression has a type");
            if !value_type.is_assignable_to(expected_return) {
                return Err(EvalError::new(format!(
                    "returned {value_type} but enclosing function returns {expected_return}"
                )));
            }
        }
    }
    Ok(())
}

fn analyze_switch_cases(
    cases: &[Case],
    cond_type: &Type,
    scope: &Scope,
    expected_return: &Type,
) -> Result<(), EvalError> {
    for (i, case) in cases.iter().enumerate() {
        let is_last = i == cases.len() - 1;
        match &case.value {
            None if !is_last => {
                return Err(EvalError::new("'DEFAULT' case must be last"));
            }
            Some(value) => {
                analyze_expr(value, scope)?;
                let value_type = value.resolved_type().expect("analyzed expression has a type");
                if !value_type.is_assignable_to(cond_type) {
                    return Err(EvalError::new(format!(
                        "case value of type {value_type} is not comparable to {cond_type}"
                    )));
                }
            }
            None => {}
        }
        analyze_block(&case.block, &scope.child(), expected_return)?;
    }
    if cases.is_empty() || cases.last().unwrap().value.is_some() {
        return Err(EvalError::new("'SWITCH' requires a 'DEFAULT' case"));
    }
    Ok(())
}

fn require_boolean(expr: &Expr) -> Result<(), EvalError> {
    match expr.resolved_type() {
        Some(Type::Boolean) => Ok(()),
        Some(other) => Err(EvalError::new(format!("expected Boolean, found {other}"))),
        None => unreachable!("expression analyzed before this check"),
    }
}

fn analyze_expr(expr: &Expr, scope: &Scope) -> Result<(), EvalError> {
    match &expr.kind {
        ExprKind::Literal(lit) => {
            let ty = match lit {
                Literal::Nil => Type::Nil,
                Literal::Boolean(_) => Type::Boolean,
                Literal::Integer(_) => Type::Integer,
                Literal::Decimal(_) => Type::Decimal,
                Literal::Character(_) => Type::Character,
                Literal::String(_) => Type::String,
            };
            expr.set_type(ty);
        }
        ExprKind::Group(inner) => {
            analyze_expr(inner, scope)?;
            if !matches!(inner.kind, ExprKind::Binary { .. }) {
                return Err(EvalError::new("a parenthesized group must contain a binary expression"));
            }
            expr.set_type(inner.resolved_type().expect("analyzed"));
        }
        ExprKind::Binary { op, left, right } => {
            analyze_expr(left, scope)?;
            analyze_expr(right, scope)?;
            let lt = left.resolved_type().expect("analyzed");
            let rt = right.resolved_type().expect("analyzed");
            let ty = analyze_binary(op, &lt, &rt, expr.offset)?;
            expr.set_type(ty);
        }
        ExprKind::Access { name, index, variable } => {
            let resolved = scope
                .lookup_variable(name)
                .ok_or_else(|| EvalError::new(format!("undefined variable '{name}'")))?;
            if let Some(index) = index {
                analyze_expr(index, scope)?;
                let index_type = index.resolved_type().expect("analyzed");
                if index_type != Type::Integer {
                    return Err(EvalError::new("list index must be an Integer"));
                }
            }
            let ty = match (&resolved.ty, index.is_some()) {
                (Type::List(element), true) => (**element).clone(),
                (other, false) => other.clone(),
                (other, true) => {
                    return Err(EvalError::new(format!("cannot index into {other}")));
                }
            };
            expr.set_type(ty);
            *variable.borrow_mut() = Some(resolved);
        }
        ExprKind::Call { name, args, function } => {
            for arg in args {
                analyze_expr(arg, scope)?;
            }
            let resolved = scope
                .lookup_function(name, args.len())
                .ok_or_else(|| EvalError::new(format!("undefined function '{name}/{}'", args.len())))?;
            for (arg, param_ty) in args.iter().zip(resolved.param_types.iter()) {
                let arg_ty = arg.resolved_type().expect("analyzed");
                if !arg_ty.is_assignable_to(param_ty) {
                    return Err(EvalError::new(format!(
                        "argument of type {arg_ty} is not assignable to parameter of type {param_ty}"
                    )));
                }
            }
            expr.set_type(resolved.return_type.clone());
            *function.borrow_mut() = Some(resolved);
        }
        ExprKind::ListLiteral(values) => {
            for v in values {
                analyze_expr(v, scope)?;
            }
            let element = match values.first() {
                Some(first) => first.resolved_type().expect("analyzed"),
                None => Type::Any,
            };
            for v in values.iter().skip(1) {
                let vt = v.resolved_type().expect("analyzed");
                if !vt.is_assignable_to(&element) {
                    return Err(EvalError::new(format!(
                        "list element of type {vt} is not assignable to element type {element}"
                    )));
                }
            }
            expr.set_type(Type::List(Box::new(element)));
        }
    }
    Ok(())
}

fn analyze_binary(op: &str, lt: &Type, rt: &Type, offset: usize) -> Result<Type, EvalError> {
    let mismatch = || {
        EvalError::new(format!(
            "operator '{op}' is not defined for operands of type {lt} and {rt} (at offset {offset})"
        ))
    };

    match op {
        "&&" | "||" => {
            if *lt == Type::Boolean && *rt == Type::Boolean {
                Ok(Type::Boolean)
            } else {
                Err(mismatch())
            }
        }
        "<" | ">" => {
            if lt.is_assignable_to(&Type::Comparable) && lt == rt {
                Ok(Type::Boolean)
            } else {
                Err(mismatch())
            }
        }
        // Equality also admits `Nil` (equal only to itself) and `Any` (the
        // runtime values behind it compare across dynamic types), neither of
        // which belongs to the ordered `Comparable` lattice `<`/`>` use.
        "==" | "!=" => {
            let equatable =
                lt == rt && (lt.is_assignable_to(&Type::Comparable) || *lt == Type::Nil || *lt == Type::Any);
            if equatable {
                Ok(Type::Boolean)
            } else {
                Err(mismatch())
            }
        }
        "+" => {
            if *lt == Type::String || *rt == Type::String {
                Ok(Type::String)
            } else if *lt == Type::Integer && *rt == Type::Integer {
                Ok(Type::Integer)
            } else if *lt == Type::Decimal && *rt == Type::Decimal {
                Ok(Type::Decimal)
            } else {
                Err(mismatch())
            }
        }
        "-" | "*" | "/" => {
            if *lt == Type::Integer && *rt == Type::Integer {
                Ok(Type::Integer)
            } else if *lt == Type::Decimal && *rt == Type::Decimal {
                Ok(Type::Decimal)
            } else {
                Err(mismatch())
            }
        }
        "^" => {
            if *lt == Type::Integer && *rt == Type::Integer {
                Ok(Type::Integer)
            } else {
                Err(mismatch())
            }
        }
        _ => Err(EvalError::new(format!("unknown operator '{op}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn analyze_source(src: &str) -> Result<Scope, EvalError> {
        analyze(&parse(lex(src).unwrap()).unwrap())
    }

    #[test]
    fn requires_a_main_function() {
        let err = analyze_source("FUN notMain(): Integer DO RETURN 0; END");
        assert!(err.is_err());
    }

    #[test]
    fn s4_run_main_type_checks() {
        assert!(analyze_source("VAR x: Integer = 1; FUN main(): Integer DO RETURN x + 2; END").is_ok());
    }

    #[test]
    fn rejects_non_boolean_if_condition() {
        let err = analyze_source("FUN main(): Integer DO IF 1 DO RETURN 0; END RETURN 1; END");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_empty_then_block() {
        let err = analyze_source("FUN main(): Integer DO IF TRUE DO END RETURN 1; END");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_mismatched_return_type() {
        let err = analyze_source(r#"FUN main(): Integer DO RETURN "oops"; END"#);
        assert!(err.is_err());
    }

    #[test]
    fn plus_yields_string_when_either_operand_is_string() {
        assert!(analyze_source(
            r#"FUN main(): Integer DO LET s = "n=" + "1"; RETURN 0; END"#
        )
        .is_ok());
    }

    #[test]
    fn comparable_lattice_allows_string_equality() {
        assert!(analyze_source(
            r#"FUN main(): Integer DO IF "a" == "a" DO RETURN 1; END RETURN 0; END"#
        )
        .is_ok());
    }

    #[test]
    fn rejects_a_second_definition_of_the_same_name_and_arity() {
        let err = analyze_source(
            "FUN main(): Integer DO RETURN 0; END FUN main(): Integer DO RETURN 1; END",
        );
        assert!(err.is_err());
    }

    #[test]
    fn nil_equality_type_checks_outside_the_comparable_lattice() {
        assert!(analyze_source("FUN main(): Integer DO IF NIL == NIL DO RETURN 1; END RETURN 0; END").is_ok());
    }

    #[test]
    fn nil_does_not_type_check_against_less_than() {
        let err = analyze_source("FUN main(): Integer DO IF NIL < NIL DO RETURN 1; END RETURN 0; END");
        assert!(err.is_err());
    }

    #[test]
    fn list_indexing_resolves_to_element_type() {
        assert!(analyze_source(
            "LIST xs: Integer = [1, 2]; FUN main(): Integer DO RETURN xs[0]; END"
        )
        .is_ok());
    }
}
