//! Pretty-prints an analyzed `Source` as Java-like target text. The
//! contract is purely structural: one `Main` class, globals as fields,
//! functions as methods, a synthetic `main` that drives `new
//! Main().main()`.
use std::fmt::Write as _;

use crate::ast::{Case, Expr, ExprKind, Function, Global, Literal, Source, Stmt, StmtKind};
use crate::types::Type;

pub fn emit(source: &Source) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "public class Main {{");

    for global in &source.globals {
        emit_global(global, &mut out);
    }
    if !source.globals.is_empty() {
        out.push('\n');
    }

    for function in &source.functions {
        emit_function(function, &mut out);
        out.push('\n');
    }

    out.push_str("    public static void main(String[] args) {\n");
    out.push_str("        System.exit(new Main().main());\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

fn java_type(ty: &Type) -> String {
    match ty {
        Type::Any | Type::Comparable => "Object".to_string(),
        Type::Nil => "void".to_string(),
        Type::Boolean => "boolean".to_string(),
        Type::Integer => "java.math.BigInteger".to_string(),
        Type::Decimal => "java.math.BigDecimal".to_string(),
        Type::Character => "char".to_string(),
        Type::String => "String".to_string(),
        Type::List(element) => format!("{}[]", java_type(element)),
    }
}

fn emit_global(global: &Global, out: &mut String) {
    let variable = global.variable.borrow();
    let ty = variable
        .as_ref()
        .map(|v| v.ty.clone())
        .unwrap_or(Type::Any);
    let qualifier = if global.mutable { "" } else { "final " };

    let _ = write!(out, "    {qualifier}{} {}", java_type(&ty), global.name);
    if let Some(value) = &global.value {
        let _ = write!(out, " = {}", emit_expr(value));
    }
    out.push_str(";\n");
}

fn emit_function(function: &Function, out: &mut String) {
    let resolved = function.function.borrow();
    let return_type = resolved
        .as_ref()
        .map(|f| f.return_type.clone())
        .unwrap_or(Type::Nil);

    let params: Vec<String> = function
        .params
        .iter()
        .map(|p| format!("{} {}", p.type_name, p.name))
        .collect();

    let _ = writeln!(
        out,
        "    public {} {}({}) {{",
        java_type(&return_type),
        function.name,
        params.join(", ")
    );
    emit_block(&function.body, 2, out);
    out.push_str("    }\n");
}

fn emit_block(block: &[Stmt], indent: usize, out: &mut String) {
    let pad = "    ".repeat(indent);
    for stmt in block {
        emit_stmt(stmt, indent, &pad, out);
    }
}

fn emit_stmt(stmt: &Stmt, indent: usize, pad: &str, out: &mut String) {
    match &stmt.kind {
        StmtKind::Expression(e) => {
            let _ = writeln!(out, "{pad}{};", emit_expr(e));
        }
        StmtKind::Declaration { name, value, variable, .. } => {
            let ty = variable
                .borrow()
                .as_ref()
                .map(|v| v.ty.clone())
                .unwrap_or(Type::Any);
            let _ = write!(out, "{pad}{} {}", java_type(&ty), name);
            if let Some(value) = value {
                let _ = write!(out, " = {}", emit_expr(value));
            }
            out.push_str(";\n");
        }
        StmtKind::Assignment { receiver, value } => {
            let _ = writeln!(out, "{pad}{} = {};", emit_expr(receiver), emit_expr(value));
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            let _ = writeln!(out, "{pad}if ({}) {{", emit_expr(cond));
            emit_block(then_block, indent + 1, out);
            if let Some(else_block) = else_block {
                let _ = writeln!(out, "{pad}}} else {{");
                emit_block(else_block, indent + 1, out);
            }
            let _ = writeln!(out, "{pad}}}");
        }
        StmtKind::Switch { cond, cases } => emit_switch(cond, cases, indent, pad, out),
        StmtKind::While { cond, block } => {
            let _ = writeln!(out, "{pad}while ({}) {{", emit_expr(cond));
            emit_block(block, indent + 1, out);
            let _ = writeln!(out, "{pad}}}");
        }
        StmtKind::Return(value) => {
            let _ = writeln!(out, "{pad}return {};", emit_expr(value));
        }
    }
}

fn emit_switch(cond: &Expr, cases: &[Case], indent: usize, pad: &str, out: &mut String) {
    let _ = writeln!(out, "{pad}switch ({}) {{", emit_expr(cond));
    let inner_pad = "    ".repeat(indent + 1);
    for case in cases {
        match &case.value {
            Some(value) => {
                let _ = writeln!(out, "{inner_pad}case {}:", emit_expr(value));
            }
            None => {
                let _ = writeln!(out, "{inner_pad}default:");
            }
        }
        emit_block(&case.block, indent + 2, out);
        let _ = writeln!(out, "{}break;", "    ".repeat(indent + 2));
    }
    let _ = writeln!(out, "{pad}}}");
}

fn emit_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(lit) => emit_literal(lit),
        ExprKind::Group(inner) => format!("({})", emit_expr(inner)),
        ExprKind::Binary { op, left, right } => {
            if op == "^" {
                format!("Math.pow({}, {})", emit_expr(left), emit_expr(right))
            } else {
                format!("{} {op} {}", emit_expr(left), emit_expr(right))
            }
        }
        ExprKind::Access { name, index, .. } => match index {
            Some(index) => format!("{name}[{}]", emit_expr(index)),
            None => name.clone(),
        },
        ExprKind::Call { name, args, .. } => {
            let args: Vec<String> = args.iter().map(emit_expr).collect();
            if name == "print" {
                format!("System.out.println({})", args.join(", "))
            } else {
                format!("{name}({})", args.join(", "))
            }
        }
        ExprKind::ListLiteral(values) => {
            let values: Vec<String> = values.iter().map(emit_expr).collect();
            format!("{{{}}}", values.join(", "))
        }
    }
}

fn emit_literal(lit: &Literal) -> String {
    match lit {
        Literal::Nil => "null".to_string(),
        Literal::Boolean(b) => b.to_string(),
        Literal::Integer(i) => format!("java.math.BigInteger.valueOf({i}L)"),
        Literal::Decimal(d) => format!("new java.math.BigDecimal(\"{d}\")"),
        Literal::Character(c) => format!("'{}'", escape_char(*c)),
        Literal::String(s) => format!("\"{}\"", escape_str(s)),
    }
}

fn escape_char(c: char) -> String {
    match c {
        '\u{8}' => "\\b".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\'' => "\\'".to_string(),
        '\\' => "\\\\".to_string(),
        other => other.to_string(),
    }
}

fn escape_str(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '"' => "\\\"".to_string(),
            other => escape_char(other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn emit_str(src: &str) -> String {
        let source = parse(lex(src).unwrap()).unwrap();
        analyze(&source).unwrap();
        emit(&source)
    }

    #[test]
    fn emits_main_class_wrapper() {
        let out = emit_str("FUN main(): Integer DO RETURN 0; END");
        assert!(out.starts_with("public class Main {"));
        assert!(out.contains("System.exit(new Main().main());"));
    }

    #[test]
    fn global_var_is_mutable_field_val_is_final() {
        let out = emit_str(
            "VAR m: Integer = 1; VAL c: Integer = 2; FUN main(): Integer DO RETURN m + c; END",
        );
        assert!(out.contains("java.math.BigInteger m = "));
        assert!(out.contains("final java.math.BigInteger c = "));
    }

    #[test]
    fn list_global_emits_as_array_initializer() {
        let out = emit_str("LIST xs: Integer = [1, 2, 3]; FUN main(): Integer DO RETURN xs[0]; END");
        assert!(out.contains("[]"));
        assert!(out.contains("{java.math.BigInteger.valueOf(1L), java.math.BigInteger.valueOf(2L), java.math.BigInteger.valueOf(3L)}"));
    }

    #[test]
    fn caret_emits_as_math_pow_call() {
        let out = emit_str("FUN main(): Integer DO RETURN 2 ^ 3; END");
        assert!(out.contains("Math.pow("));
    }

    #[test]
    fn print_emits_as_system_out_println() {
        let out = emit_str(r#"FUN main(): Integer DO print("hi"); RETURN 0; END"#);
        assert!(out.contains("System.out.println(\"hi\");"));
    }
}
