//! End-to-end pipeline tests: source text through the parser and code
//! generator to textual IR.

use yolang::diagnostic::{Diagnostic, DiagnosticKind};

fn ir(source: &str) -> String {
    yolang::compile_to_ir_text(source).expect("program should compile")
}

fn err(source: &str) -> Diagnostic {
    yolang::compile(source).expect_err("program should not compile")
}

#[test]
fn empty_program_emits_empty_module() {
    let module = yolang::compile("").unwrap();
    assert!(module.funcs.is_empty());
    let text = ir("");
    assert!(!text.contains("define"));
}

#[test]
fn minimal_module_shape() {
    let text = ir("func main() -> Int: { return 0; }");
    insta::assert_snapshot!(text, @r#"
; ModuleID = 'Module'

declare i32 @printf(i8*, ...)
declare i32 @scanf(i8*, ...)

define i32 @main() {
main_entry:
  ret i32 0
}
"#);
}

#[test]
fn arithmetic_widens_toward_float() {
    let text = ir("func main() -> Int: { var x: Float = 1 + 2.5; return 0; }");
    assert!(text.contains("sitofp i32 1 to double"));
    assert!(text.contains("fadd double"));
    assert!(text.contains("store double"));
    assert!(text.contains("ret i32 0"));
}

#[test]
fn conditional_with_else_compiles() {
    let text = ir("func main() -> Int: { if (0) { return 1; } else { return 2; } }");
    assert!(text.contains("icmp ne i32 0, 0"));
    assert!(text.contains("br i1"));
    assert!(text.contains("ret i32 1"));
    assert!(text.contains("ret i32 2"));
    // The merge block is unreachable: both branches return.
    assert!(text.contains("unreachable"));
}

#[test]
fn missing_return_on_some_path_fails() {
    let diagnostic = err("func f() -> Int: { if (1) { return 1; } }");
    assert_eq!(
        diagnostic.message,
        "every path must have return statement in function 'f'"
    );
}

#[test]
fn return_on_every_path_succeeds() {
    let text = ir("func f() -> Int: { if (1) { return 1; } else { return 2; } }");
    assert!(text.contains("define i32 @f()"));
}

#[test]
fn empty_body_fails_missing_return() {
    let diagnostic = err("func f() -> Int: { }");
    assert!(diagnostic.message.contains("every path must have return"));
}

#[test]
fn call_with_int_to_float_coercion() {
    let text = ir(
        "func inc(x: Float) -> Float: { return x + 1; }\n\
         func main() -> Int: { print(inc(4)); return 0; }",
    );
    assert!(text.contains("define double @inc(double %x)"));
    assert!(text.contains("sitofp i32 4 to double"));
    assert!(text.contains("call double @inc(double"));
    // Float print format.
    assert!(text.contains("c\"%f\\0A\\00\""));
}

#[test]
fn forward_calls_resolve_in_both_directions() {
    let text = ir(
        "func main() -> Int: { return helper(); }\n\
         func helper() -> Int: { return 7; }",
    );
    assert!(text.contains("call i32 @helper()"));
}

#[test]
fn unknown_identifier_message() {
    let diagnostic = err("func main() -> Int: { return y; }");
    assert_eq!(diagnostic.kind, DiagnosticKind::Semantic);
    assert_eq!(diagnostic.message, "variable 'y' is not defined");
}

#[test]
fn unknown_function_message() {
    let diagnostic = err("func main() -> Int: { return g(1); }");
    assert_eq!(diagnostic.message, "function 'g' is undefined");
}

#[test]
fn arity_mismatch_message() {
    let diagnostic = err(
        "func f(a: Int) -> Int: { return a; }\n\
         func main() -> Int: { return f(1,2); }",
    );
    assert_eq!(diagnostic.message, "function 'f' expects 1 params, 2 given");
}

#[test]
fn uncastable_argument_cites_position() {
    let diagnostic = err(
        "func f(a: Int) -> Int: { return a; }\n\
         func main() -> Int: { return f(\"hi\"); }",
    );
    assert_eq!(
        diagnostic.message,
        "function 'f' expects 'Int' as parameter 1, 'String' given (can't cast)"
    );
}

#[test]
fn non_bool_condition_message() {
    let diagnostic = err("func main() -> Int: { if (\"hi\") { return 0; } return 1; }");
    assert_eq!(
        diagnostic.message,
        "expression in condition statement must be convertible to bool"
    );
}

#[test]
fn redeclaration_in_same_block_fails() {
    let diagnostic = err("func main() -> Int: { var x: Int; var x: Float; return 0; }");
    assert_eq!(diagnostic.message, "variable 'x' is already defined");
}

#[test]
fn shadowing_in_nested_block_is_allowed() {
    let text = ir(
        "func main() -> Int: { var x: Int; { var x: Float; x = 1.5; } return x; }",
    );
    assert!(text.contains("%xPtr = alloca i32"));
    assert!(text.contains("%xPtr1 = alloca double"));
    assert!(text.contains("ret i32"));
}

#[test]
fn float_initializer_truncates_into_int() {
    let text = ir("func main() -> Int: { var x: Int = 1.5; return x; }");
    assert!(text.contains("fptosi double"));
}

#[test]
fn string_variable_is_rejected() {
    let diagnostic = err("func main() -> Int: { var x: String = 1; return 0; }");
    assert_eq!(diagnostic.kind, DiagnosticKind::Semantic);
    assert!(diagnostic
        .message
        .contains("variables of type 'String' are not supported yet"));
}

#[test]
fn modulo_on_ints_compiles() {
    let text = ir("func main() -> Int: { return 3 % 2; }");
    assert!(text.contains("srem i32 3, 2"));
}

#[test]
fn modulo_on_float_fails() {
    let diagnostic = err("func main() -> Int: { return 3.0 % 2; }");
    assert_eq!(
        diagnostic.message,
        "modulo operator expects integers on both sides of an expression"
    );
}

#[test]
fn incompatible_operands_name_operator_and_types() {
    let diagnostic = err("func main() -> Int: { return 1 + \"x\"; }");
    assert_eq!(
        diagnostic.message,
        "can't perform operator '+' on operands with types 'Int' and 'String'"
    );
}

#[test]
fn assignment_type_mismatch_names_variable() {
    let diagnostic = err("func main() -> Int: { var x: Int; x = \"hi\"; return x; }");
    assert_eq!(
        diagnostic.message,
        "can't set expression of type 'String' to variable 'x' of type 'Int'"
    );
}

#[test]
fn assignment_to_undefined_variable_fails() {
    let diagnostic = err("func main() -> Int: { x = 1; return 0; }");
    assert_eq!(
        diagnostic.message,
        "can't assign because variable 'x' is not defined"
    );
}

#[test]
fn while_loop_lowers_to_three_blocks() {
    let text = ir(
        "func main() -> Int: { var x: Int = 5; while (x > 0) { x = x - 1; } return x; }",
    );
    assert!(text.contains("loop_cond:"));
    assert!(text.contains("loop_body:"));
    assert!(text.contains("loop_exit:"));
    assert!(text.contains("br label %loop_cond"));
    assert!(text.contains("icmp sgt i32"));
}

#[test]
fn print_formats_by_type() {
    let text = ir(
        "func main() -> Int: { print(1); print(2.5); print(True); return 0; }",
    );
    assert!(text.contains("c\"%d\\0A\\00\""));
    assert!(text.contains("c\"%f\\0A\\00\""));
    // Bool is widened to i32 before printing.
    assert!(text.contains("zext i1 true to i32"));
}

#[test]
fn print_string_is_rejected() {
    let diagnostic = err("func main() -> Int: { print(\"hi\"); return 0; }");
    assert!(diagnostic
        .message
        .contains("values of type 'String' can't be printed out yet"));
}

#[test]
fn scan_takes_slot_addresses() {
    let text = ir("func main() -> Int: { var x: Int; scan(x); return x; }");
    assert!(text.contains("call i32 (i8*, ...) @scanf(i8* getelementptr"));
    assert!(text.contains("c\"%d\\00\""));
    assert!(text.contains("i32* %xPtr"));
}

#[test]
fn scan_of_non_variable_is_rejected() {
    let diagnostic = err("func main() -> Int: { scan(1 + 2); return 0; }");
    assert_eq!(
        diagnostic.message,
        "scan expects variable names as arguments"
    );
}

#[test]
fn scan_float_uses_lf_format() {
    let text = ir("func main() -> Int: { var x: Float; scan(x); return 0; }");
    assert!(text.contains("c\"%lf\\00\""));
    assert!(text.contains("double* %xPtr"));
}

#[test]
fn duplicate_function_fails() {
    let diagnostic = err(
        "func f() -> Int: { return 1; }\n\
         func f() -> Int: { return 2; }",
    );
    assert_eq!(diagnostic.message, "function 'f' is already defined");
}

#[test]
fn implicit_return_type_is_int() {
    let text = ir("func f() : { return 5; }");
    assert!(text.contains("define i32 @f()"));
    assert!(text.contains("ret i32 5"));
}

#[test]
fn bare_return_is_rejected() {
    let diagnostic = err("func f() : { return; }");
    assert_eq!(
        diagnostic.message,
        "return statement must have an expression in function returning 'Int'"
    );
}

#[test]
fn return_coerces_to_declared_type() {
    let text = ir("func f() -> Float: { return 1; }");
    assert!(text.contains("sitofp i32 1 to double"));
    assert!(text.contains("ret double"));
}

#[test]
fn logical_operators_lower_operands_to_bool() {
    let text = ir("func main() -> Int: { if (1 && 2.5) { return 1; } return 0; }");
    assert!(text.contains("icmp ne i32 1, 0"));
    assert!(text.contains("fcmp one double"));
    assert!(text.contains("and i1"));
}

#[test]
fn comparison_produces_bool() {
    let text = ir("func main() -> Int: { var b: Bool = 1 < 2.5; return 0; }");
    // Operands widen to double, comparison yields i1.
    assert!(text.contains("fcmp olt double"));
    assert!(text.contains("store i1"));
}

#[test]
fn negation_is_logical_not() {
    let text = ir("func main() -> Int: { var b: Bool = !1; return 0; }");
    assert!(text.contains("icmp ne i32 1, 0"));
    assert!(text.contains("xor i1"));
}

#[test]
fn array_access_is_parsed_but_rejected_in_codegen() {
    let diagnostic = err("func main() -> Int: { return xs[0]; }");
    assert!(diagnostic
        .message
        .contains("array element access is not supported yet"));
}

#[test]
fn statements_after_return_are_dropped() {
    let text = ir("func main() -> Int: { return 1; print(2); return 3; }");
    assert!(!text.contains("call i32 (i8*, ...) @printf"));
    assert!(text.contains("ret i32 1"));
    assert!(!text.contains("ret i32 3"));
}

#[test]
fn unary_minus_by_type() {
    let text = ir("func main() -> Int: { var x: Int = -3; var y: Float = -2.5; return x; }");
    assert!(text.contains("sub i32 0, 3"));
    assert!(text.contains("fneg double"));
}

#[test]
fn nested_conditionals_relink_merge_blocks() {
    let text = ir(
        "func main() -> Int: {\n\
           if (1) {\n\
             if (2) { return 1; }\n\
           }\n\
           return 0;\n\
         }",
    );
    // Two merge blocks; the inner one chains on to the outer.
    assert!(text.contains("continue:"));
    assert!(text.contains("continue1:"));
    assert!(text.contains("ret i32 0"));
}

#[test]
fn lexical_error_surfaces_with_position() {
    let diagnostic = err("func main() -> Int: { return 0 @ 1; }");
    assert_eq!(diagnostic.kind, DiagnosticKind::Lexical);
    assert!(diagnostic.message.contains("can't parse char '@'"));
}

#[test]
fn syntax_error_aborts_without_a_program() {
    let diagnostic = err("func main( { return 0; }");
    assert_eq!(diagnostic.kind, DiagnosticKind::Syntax);
    assert!(diagnostic.message.starts_with("unexpected token:"));
}

#[test]
fn save_ir_writes_the_module() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.ll");
    yolang::save_ir_to_path("func main() -> Int: { return 0; }", &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("define i32 @main()"));
}
