//! End-to-end scenarios run against the public library API. There is no
//! compiled artifact to spawn here, unlike a binary-level test harness, so
//! these call `ember::run_source`/`ember::emit_source` directly.
use std::cell::RefCell;
use std::rc::Rc;

use ember::Value;

fn run(src: &str) -> (Value, String) {
    let output = Rc::new(RefCell::new(Vec::new()));
    let value = ember::run_source(src, output.clone()).expect("program should run successfully");
    let printed = String::from_utf8(output.borrow().clone()).unwrap();
    (value, printed)
}

#[test]
fn s1_hello_world() {
    // Wrapped in a function since a bare call statement is not a valid
    // top-level unit: statements only appear inside function bodies.
    let (value, printed) = run(r#"FUN main(): Integer DO print("Hello, World!"); RETURN 0; END"#);
    assert_eq!(printed, "Hello, World!\n");
    assert_eq!(value.to_string(), "0");
}

#[test]
fn s4_run_main() {
    let (value, _) = run("VAR x: Integer = 1; FUN main(): Integer DO RETURN x + 2; END");
    assert_eq!(value.to_string(), "3");
}

#[test]
fn s5_closure_over_global_not_shadowed_by_caller_local() {
    let (value, _) = run(
        "VAR x: Integer = 1; VAR y: Integer = 2; VAR z: Integer = 3; \
         FUN f(z: Integer): Integer DO RETURN x + y + z; END \
         FUN main(): Integer DO LET y = 4; RETURN f(5); END",
    );
    assert_eq!(value.to_string(), "8");
}

#[test]
fn s6_switch_with_default() {
    let program = |c: i32| {
        format!(
            r#"VAR c: Integer = {c}; FUN main(): Integer DO
                SWITCH c CASE 1: print("one"); CASE 2: print("two"); DEFAULT print("other"); END
                RETURN 0; END"#
        )
    };
    let (_, printed_two) = run(&program(2));
    assert_eq!(printed_two, "two\n");

    let (_, printed_other) = run(&program(9));
    assert_eq!(printed_other, "other\n");
}

#[test]
fn rejects_a_source_missing_main() {
    let output = Rc::new(RefCell::new(Vec::new()));
    let err = ember::run_source("FUN notMain(): Integer DO RETURN 0; END", output);
    assert!(err.is_err());
}

#[test]
fn lex_error_surfaces_with_an_offset_at_or_past_the_bad_character() {
    let output = Rc::new(RefCell::new(Vec::new()));
    let err = ember::run_source("FUN main(): Integer DO RETURN \"unterminated; END", output);
    match err {
        Err(ember::EmberError::Parse(e)) => assert!(e.offset > 0),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn emits_analyzed_source_as_java_like_text() {
    let text = ember::emit_source("FUN main(): Integer DO RETURN 0; END").unwrap();
    assert!(text.contains("public class Main"));
    assert!(text.contains("public java.math.BigInteger main()"));
}

#[test]
fn fibonacci_with_recursion_and_while_loop() {
    let (value, _) = run(
        "FUN fib(n: Integer): Integer DO
            IF n < 2 DO RETURN n; END
            RETURN fib(n - 1) + fib(n - 2);
         END
         FUN main(): Integer DO RETURN fib(10); END",
    );
    assert_eq!(value.to_string(), "55");
}

#[test]
fn while_loop_accumulates_into_a_mutable_local() {
    let (value, _) = run(
        "FUN main(): Integer DO
            LET total: Integer = 0;
            LET i: Integer = 0;
            WHILE i < 5 DO
                total = total + i;
                i = i + 1;
            END
            RETURN total;
         END",
    );
    assert_eq!(value.to_string(), "10");
}
