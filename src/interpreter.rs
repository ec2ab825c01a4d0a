//! The tree-walking interpreter: evaluates an analyzed `Source` against a
//! runtime scope chain rooted at the built-ins.
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use crate::ast::{Case, Expr, ExprKind, Function as AstFunction, Literal, Source, Stmt, StmtKind};
use crate::builtins;
use crate::error::EvalError;
use crate::scope::Scope;
use crate::value::Value;

/// Decimal division rounds half-to-even at this many fractional digits.
const DECIMAL_SCALE: i64 = 32;

/// Non-local control flow raised while evaluating a block. The only frame
/// that intercepts `Return` is the closure `install_function` installs for
/// each user function.
enum Flow {
    Error(EvalError),
    Return(Value),
}

impl From<EvalError> for Flow {
    fn from(e: EvalError) -> Self {
        Flow::Error(e)
    }
}

type FlowResult<T> = Result<T, Flow>;

/// Runs an analyzed program: evaluates globals, installs user functions as
/// closures over the current scope, then calls `main/0`.
pub fn run(source: &Source, scope: &Scope, output: Rc<RefCell<dyn Write>>) -> Result<Value, EvalError> {
    install_builtins(scope, output);

    for global in &source.globals {
        let variable = global
            .variable
            .borrow()
            .clone()
            .expect("analyzer installed this global");
        let value = match &global.value {
            Some(expr) => eval_expr(expr, scope).map_err(flow_to_error)?,
            None => Value::Nil,
        };
        variable.set(value);
    }

    for function in &source.functions {
        install_function(function, scope);
    }

    let main = scope.lookup_function("main", 0).expect("analyzer checked this");
    main.call(&[])
}

fn flow_to_error(flow: Flow) -> EvalError {
    match flow {
        Flow::Error(e) => e,
        Flow::Return(_) => EvalError::new("'RETURN' used outside of a function body"),
    }
}

fn install_builtins(scope: &Scope, output: Rc<RefCell<dyn Write>>) {
    for sig in builtins::signatures() {
        let function = scope
            .lookup_function(sig.name, sig.param_types.len())
            .expect("analyzer installed a stub for every built-in");
        match sig.name {
            "print" => {
                let output = output.clone();
                function.install_body(Rc::new(move |args: &[Value]| {
                    writeln!(output.borrow_mut(), "{}", args[0].display_form())
                        .map_err(|e| EvalError::new(format!("write to stdout failed: {e}")))?;
                    Ok(Value::Nil)
                }));
            }
            "logarithm" => {
                function.install_body(Rc::new(|args: &[Value]| {
                    let Value::Decimal(d) = &args[0] else {
                        return Err(EvalError::new("logarithm expects a Decimal"));
                    };
                    natural_log(d).map(Value::Decimal)
                }));
            }
            "converter" => {
                function.install_body(Rc::new(|args: &[Value]| {
                    let (Value::Integer(n), Value::Integer(base)) = (&args[0], &args[1]) else {
                        return Err(EvalError::new("converter expects two Integers"));
                    };
                    convert_base(n, base).map(Value::String)
                }));
            }
            _ => unreachable!("no other built-ins are defined"),
        }
    }
}

/// Installs `function` as a closure capturing `scope` as it stands right
/// now: a call always enters a child of this capture scope, never of its
/// call site.
fn install_function(function: &AstFunction, scope: &Scope) {
    let resolved = function
        .function
        .borrow()
        .clone()
        .expect("analyzer installed this function");
    let capture = scope.clone();
    let param_names: Vec<String> = function.params.iter().map(|p| p.name.clone()).collect();
    let body = function.body.clone();

    resolved.install_body(Rc::new(move |args: &[Value]| {
        let call_scope = capture.child();
        for (name, value) in param_names.iter().zip(args) {
            call_scope.define_variable(Rc::new(crate::scope::Variable::new(
                name.clone(),
                true,
                value.type_of(),
            )));
            call_scope
                .lookup_variable(name)
                .expect("just defined")
                .set(value.clone());
        }

        match eval_block(&body, &call_scope) {
            Ok(()) => Ok(Value::Nil),
            Err(Flow::Return(v)) => Ok(v),
            Err(Flow::Error(e)) => Err(e),
        }
    }));
}

fn eval_block(block: &[Stmt], scope: &Scope) -> FlowResult<()> {
    for stmt in block {
        eval_stmt(stmt, scope)?;
    }
    Ok(())
}

fn eval_stmt(stmt: &Stmt, scope: &Scope) -> FlowResult<()> {
    match &stmt.kind {
        StmtKind::Expression(e) => {
            eval_expr(e, scope)?;
        }
        StmtKind::Declaration { value, variable, .. } => {
            let analyzed = variable
                .borrow()
                .clone()
                .expect("analyzer installed this variable");
            let v = match value {
                Some(expr) => eval_expr(expr, scope)?,
                None => Value::Nil,
            };
            // A fresh cell per execution, not the analyzer's shared stub: a
            // recursive or re-entrant call must get its own `acc`, not share
            // one `RefCell<Value>` across activations.
            let local = Rc::new(crate::scope::Variable::new(
                analyzed.name.clone(),
                analyzed.mutable,
                analyzed.ty.clone(),
            ));
            local.set(v);
            scope.define_variable(local);
        }
        StmtKind::Assignment { receiver, value } => {
            let v = eval_expr(value, scope)?;
            assign(receiver, v, scope)?;
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            if eval_expr(cond, scope)?.as_boolean().expect("analyzer checked Boolean") {
                eval_block(then_block, &scope.child())?;
            } else if let Some(else_block) = else_block {
                eval_block(else_block, &scope.child())?;
            }
        }
        StmtKind::Switch { cond, cases } => {
            eval_switch(cond, cases, scope)?;
        }
        StmtKind::While { cond, block } => {
            while eval_expr(cond, scope)?.as_boolean().expect("analyzer checked Boolean") {
                eval_block(block, &scope.child())?;
            }
        }
        StmtKind::Return(value) => {
            let v = eval_expr(value, scope)?;
            return Err(Flow::Return(v));
        }
    }
    Ok(())
}

fn eval_switch(cond: &Expr, cases: &[Case], scope: &Scope) -> FlowResult<()> {
    let value = eval_expr(cond, scope)?;
    for case in cases {
        match &case.value {
            Some(case_expr) => {
                let case_value = eval_expr(case_expr, scope)?;
                if values_equal(&value, &case_value) {
                    return eval_block(&case.block, &scope.child());
                }
            }
            None => {
                return eval_block(&case.block, &scope.child());
            }
        }
    }
    unreachable!("analyzer guarantees a default case")
}

fn assign(receiver: &Expr, value: Value, scope: &Scope) -> FlowResult<()> {
    let ExprKind::Access { name, index, .. } = &receiver.kind else {
        return Err(EvalError::new("assignment target must be a variable access").into());
    };
    let variable = scope
        .lookup_variable(name)
        .ok_or_else(|| EvalError::new(format!("undefined variable '{name}'")))?;

    match index {
        None => variable.set(value),
        Some(index_expr) => {
            let Value::List(items) = variable.get() else {
                return Err(EvalError::new(format!("'{name}' is not a list")).into());
            };
            let idx = eval_list_index(index_expr, &items.borrow(), scope)?;
            items.borrow_mut()[idx] = value;
        }
    }
    Ok(())
}

fn eval_list_index(index_expr: &Expr, items: &[Value], scope: &Scope) -> FlowResult<usize> {
    let index_value = eval_expr(index_expr, scope)?;
    let Value::Integer(i) = &index_value else {
        return Err(EvalError::new("list index must be an Integer").into());
    };
    let idx = i
        .to_usize()
        .filter(|idx| *idx < items.len())
        .ok_or_else(|| EvalError::new(format!("index {i} out of range [0, {})", items.len())))?;
    Ok(idx)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b
}

fn eval_expr(expr: &Expr, scope: &Scope) -> FlowResult<Value> {
    match &expr.kind {
        ExprKind::Literal(lit) => Ok(match lit {
            Literal::Nil => Value::Nil,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(i) => Value::Integer(i.clone()),
            Literal::Decimal(d) => Value::Decimal(d.clone()),
            Literal::Character(c) => Value::Character(*c),
            Literal::String(s) => Value::String(s.clone()),
        }),
        ExprKind::Group(inner) => eval_expr(inner, scope),
        ExprKind::Binary { op, left, right } => eval_binary(op, left, right, scope),
        ExprKind::Access { name, index, .. } => {
            let variable = scope
                .lookup_variable(name)
                .ok_or_else(|| EvalError::new(format!("undefined variable '{name}'")))?;
            match index {
                None => Ok(variable.get()),
                Some(index_expr) => {
                    let Value::List(items) = variable.get() else {
                        return Err(EvalError::new(format!("'{name}' is not a list")).into());
                    };
                    let items = items.borrow();
                    let idx = eval_list_index(index_expr, &items, scope)?;
                    Ok(items[idx].clone())
                }
            }
        }
        ExprKind::Call { name, args, .. } => {
            let function = scope
                .lookup_function(name, args.len())
                .ok_or_else(|| EvalError::new(format!("undefined function '{name}/{}'", args.len())))?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, scope)?);
            }
            Ok(function.call(&values)?)
        }
        ExprKind::ListLiteral(values) => {
            let mut evaluated = Vec::with_capacity(values.len());
            for v in values {
                evaluated.push(eval_expr(v, scope)?);
            }
            Ok(Value::List(Rc::new(RefCell::new(evaluated))))
        }
    }
}

fn eval_binary(op: &str, left: &Expr, right: &Expr, scope: &Scope) -> FlowResult<Value> {
    match op {
        // Short-circuit: the right operand is not evaluated when the left
        // operand already determines the result.
        "&&" => {
            let l = eval_expr(left, scope)?;
            if !l.as_boolean().expect("analyzer checked Boolean") {
                return Ok(Value::Boolean(false));
            }
            eval_expr(right, scope)
        }
        "||" => {
            let l = eval_expr(left, scope)?;
            if l.as_boolean().expect("analyzer checked Boolean") {
                return Ok(Value::Boolean(true));
            }
            eval_expr(right, scope)
        }
        _ => {
            let l = eval_expr(left, scope)?;
            let r = eval_expr(right, scope)?;
            eval_binary_values(op, l, r)
        }
    }
}

fn eval_binary_values(op: &str, l: Value, r: Value) -> FlowResult<Value> {
    match op {
        "<" | ">" | "==" | "!=" => Ok(Value::Boolean(compare(op, &l, &r)?)),
        "+" if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) => {
            Ok(Value::String(format!("{l}{r}")))
        }
        _ => arithmetic(op, l, r),
    }
}

/// `==`/`!=` over the full value space: `Nil` equals only `Nil`, and is
/// never equal to a value of another type (no implicit nil-as-false or
/// nil-as-zero coercion). Cross-type comparisons simply resolve to
/// `false`/`true` rather than erroring.
fn compare(op: &str, l: &Value, r: &Value) -> Result<bool, EvalError> {
    let ordering = match (l, r) {
        (Value::Nil, Value::Nil) => Some(std::cmp::Ordering::Equal),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => a.partial_cmp(b),
        (Value::Character(a), Value::Character(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        "==" => Ok(ordering == Some(std::cmp::Ordering::Equal)),
        "!=" => Ok(ordering != Some(std::cmp::Ordering::Equal)),
        "<" => Ok(ordering == Some(std::cmp::Ordering::Less)),
        ">" => Ok(ordering == Some(std::cmp::Ordering::Greater)),
        _ => unreachable!("analyzer only admits these comparison operators"),
    }
}

fn arithmetic(op: &str, l: Value, r: Value) -> FlowResult<Value> {
    match (op, l, r) {
        ("^", Value::Integer(base), Value::Integer(exponent)) => {
            if exponent.is_negative() {
                return Err(EvalError::new("exponent must be non-negative").into());
            }
            let exponent = exponent
                .to_u32()
                .ok_or_else(|| EvalError::new("exponent does not fit a host integer"))?;
            Ok(Value::Integer(base.pow(exponent)))
        }
        ("+", Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
        ("-", Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a - b)),
        ("*", Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a * b)),
        ("/", Value::Integer(a), Value::Integer(b)) => {
            if b.is_zero() {
                return Err(EvalError::new("integer division by zero").into());
            }
            Ok(Value::Integer(a / b))
        }
        ("+", Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(a + b)),
        ("-", Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(a - b)),
        ("*", Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(a * b)),
        ("/", Value::Decimal(a), Value::Decimal(b)) => {
            if b.is_zero() {
                return Err(EvalError::new("decimal division by zero").into());
            }
            Ok(Value::Decimal((a / b).with_scale_round(DECIMAL_SCALE, RoundingMode::HalfEven)))
        }
        (op, l, r) => unreachable!("analyzer rejected {op} on {l:?}/{r:?} before evaluation"),
    }
}

/// Natural log via Newton's method on `e^y = x` (no native primitive
/// exists for arbitrary-precision decimals).
fn natural_log(x: &BigDecimal) -> Result<BigDecimal, EvalError> {
    if !x.is_positive() {
        return Err(EvalError::new("logarithm is undefined for non-positive values"));
    }
    if x == &BigDecimal::from(1) {
        return Ok(BigDecimal::from(0));
    }

    // Seed from the host float log, then refine with a few Newton steps:
    // y_{n+1} = y_n + x / e^{y_n} - 1, evaluated via the Taylor series for
    // exp at fixed scale.
    let x_f64 = x.to_f64().ok_or_else(|| EvalError::new("value is out of range for logarithm"))?;
    let mut y = BigDecimal::from_f64(x_f64.ln())
        .ok_or_else(|| EvalError::new("logarithm is undefined here"))?;

    for _ in 0..20 {
        let exp_y = exp_taylor(&y);
        let correction = (x - &exp_y) / &exp_y;
        y += &correction;
    }

    Ok(y.with_scale_round(DECIMAL_SCALE, RoundingMode::HalfEven))
}

fn exp_taylor(y: &BigDecimal) -> BigDecimal {
    let mut term = BigDecimal::from(1);
    let mut sum = BigDecimal::from(1);
    for n in 1..60 {
        term = (&term * y) / BigDecimal::from(n);
        sum += &term;
    }
    sum
}

/// Converts `n` to a string in the given `base` (2..=36) for the
/// `converter/2` built-in.
fn convert_base(n: &BigInt, base: &BigInt) -> Result<String, EvalError> {
    let base = base
        .to_u32()
        .filter(|b| (2..=36).contains(b))
        .ok_or_else(|| EvalError::new("converter base must be between 2 and 36"))?;

    if n.is_zero() {
        return Ok("0".to_string());
    }

    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let negative = n.is_negative();
    let mut n = n.abs();
    let base_big = BigInt::from(base);
    let mut digits = Vec::new();
    while !n.is_zero() {
        let remainder = (&n % &base_big).to_u32().expect("remainder fits u32");
        digits.push(DIGITS[remainder as usize]);
        n /= &base_big;
    }
    if negative {
        digits.push(b'-');
    }
    digits.reverse();
    Ok(String::from_utf8(digits).expect("digits are ASCII"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn run_source(src: &str) -> (Value, String) {
        let source = parse(lex(src).unwrap()).unwrap();
        let scope = analyze(&source).unwrap();
        let output = Rc::new(RefCell::new(Vec::new()));
        let value = run(&source, &scope, output.clone() as Rc<RefCell<dyn Write>>).unwrap();
        let printed = String::from_utf8(output.borrow().clone()).unwrap();
        (value, printed)
    }

    #[test]
    fn s1_hello_world_prints_and_returns_nil() {
        let (value, printed) = run_source(
            r#"FUN main(): Integer DO print("Hello, World!"); RETURN 0; END"#,
        );
        assert_eq!(printed, "Hello, World!\n");
        assert_eq!(value, Value::Integer(BigInt::from(0)));
    }

    #[test]
    fn s4_global_plus_literal() {
        let (value, _) = run_source("VAR x: Integer = 1; FUN main(): Integer DO RETURN x + 2; END");
        assert_eq!(value, Value::Integer(BigInt::from(3)));
    }

    #[test]
    fn s5_closure_over_global_not_shadowed_by_caller_local() {
        let (value, _) = run_source(
            "VAR x: Integer = 1; VAR y: Integer = 2; VAR z: Integer = 3; \
             FUN f(z: Integer): Integer DO RETURN x + y + z; END \
             FUN main(): Integer DO LET y = 4; RETURN f(5); END",
        );
        assert_eq!(value, Value::Integer(BigInt::from(8)));
    }

    #[test]
    fn s6_switch_picks_matching_case_then_default() {
        let (_, printed_two) = run_source(
            r#"VAR c: Integer = 2; FUN main(): Integer DO
                SWITCH c CASE 1: print("one"); CASE 2: print("two"); DEFAULT print("other"); END
                RETURN 0; END"#,
        );
        assert_eq!(printed_two, "two\n");

        let (_, printed_other) = run_source(
            r#"VAR c: Integer = 9; FUN main(): Integer DO
                SWITCH c CASE 1: print("one"); CASE 2: print("two"); DEFAULT print("other"); END
                RETURN 0; END"#,
        );
        assert_eq!(printed_other, "other\n");
    }

    #[test]
    fn integer_division_by_zero_is_a_runtime_error() {
        let source = parse(lex("FUN main(): Integer DO RETURN 1 / 0; END").unwrap()).unwrap();
        let scope = analyze(&source).unwrap();
        let output = Rc::new(RefCell::new(Vec::new())) as Rc<RefCell<dyn Write>>;
        assert!(run(&source, &scope, output).is_err());
    }

    #[test]
    fn exponent_identity_holds_for_small_values() {
        let (value, _) = run_source("FUN main(): Integer DO RETURN 2 ^ 10; END");
        assert_eq!(value, Value::Integer(BigInt::from(1024)));
    }

    #[test]
    fn list_index_assignment_updates_element_in_place() {
        let (value, _) = run_source(
            "LIST xs: Integer = [1, 2, 3]; \
             FUN main(): Integer DO xs[1] = 9; RETURN xs[1]; END",
        );
        assert_eq!(value, Value::Integer(BigInt::from(9)));
    }

    #[test]
    fn out_of_range_index_is_a_runtime_error() {
        let source = parse(
            lex("LIST xs: Integer = [1]; FUN main(): Integer DO RETURN xs[5]; END").unwrap(),
        )
        .unwrap();
        let scope = analyze(&source).unwrap();
        let output = Rc::new(RefCell::new(Vec::new())) as Rc<RefCell<dyn Write>>;
        assert!(run(&source, &scope, output).is_err());
    }

    #[test]
    fn converter_renders_integer_in_given_base() {
        let (value, printed) = run_source(
            r#"FUN main(): Integer DO print(converter(255, 16)); RETURN 0; END"#,
        );
        assert_eq!(printed, "ff\n");
        assert_eq!(value, Value::Integer(BigInt::from(0)));
    }

    #[test]
    fn logarithm_of_one_is_zero() {
        let source = parse(
            lex("FUN main(): Integer DO LET r: Decimal = logarithm(1.0); RETURN 0; END").unwrap(),
        )
        .unwrap();
        let scope = analyze(&source).unwrap();
        let output = Rc::new(RefCell::new(Vec::new())) as Rc<RefCell<dyn Write>>;
        assert!(run(&source, &scope, output).is_ok());
    }

    #[test]
    fn nil_equals_only_nil() {
        let (value, _) = run_source(
            "FUN main(): Integer DO
                IF NIL == NIL DO RETURN 1; END
                RETURN 0; END",
        );
        assert_eq!(value, Value::Integer(BigInt::from(1)));
    }

    #[test]
    fn each_call_activation_gets_its_own_local_cell() {
        let (value, _) = run_source(
            "FUN f(n: Integer): Integer DO
                LET acc: Integer = n;
                IF n > 0 DO
                    LET t: Integer = f(n - 1);
                END
                RETURN acc;
             END
             FUN main(): Integer DO RETURN f(2); END",
        );
        assert_eq!(value, Value::Integer(BigInt::from(2)));
    }

    #[test]
    fn short_circuit_and_does_not_evaluate_right_operand() {
        let (value, printed) = run_source(
            r#"FUN sideEffect(): Boolean DO print("unreachable"); RETURN TRUE; END
               FUN main(): Integer DO
                IF FALSE && sideEffect() DO RETURN 1; END
                RETURN 0; END"#,
        );
        assert_eq!(value, Value::Integer(BigInt::from(0)));
        assert_eq!(printed, "");
    }
}
