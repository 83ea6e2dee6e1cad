// Integration tests driving the full lex -> parse -> compile -> run pipeline
// through the public `mossy::interpret` entry point, the same one the CLI
// and the REPL use.

use mossy::value::{Obj, Value};
use mossy::vm::VM;
use mossy::{interpret, ScriptError};

fn run(source: &str) -> Result<VM, ScriptError> {
    let mut vm = VM::new();
    interpret(source, &mut vm)?;
    Ok(vm)
}

#[test]
fn arithmetic_expression_round_trips_through_a_global() {
    let vm = run("var result = 1 + 2 * 3;").unwrap();
    assert!(matches!(vm.globals.get("result"), Some(Value::Number(n)) if *n == 7.0));
}

#[test]
fn variable_declaration_and_reassignment() {
    let vm = run("var x = 10; x = x + 5;").unwrap();
    assert!(matches!(vm.globals.get("x"), Some(Value::Number(n)) if *n == 15.0));
}

#[test]
fn if_else_picks_the_right_branch() {
    let vm = run("var x = 0; if (1 < 2) { x = 1; } else { x = 2; }").unwrap();
    assert!(matches!(vm.globals.get("x"), Some(Value::Number(n)) if *n == 1.0));

    let vm = run("var x = 0; if (2 < 1) { x = 1; } else { x = 2; }").unwrap();
    assert!(matches!(vm.globals.get("x"), Some(Value::Number(n)) if *n == 2.0));
}

#[test]
fn while_loop_sums_to_ten() {
    let vm = run("var sum = 0; var i = 0; while (i < 5) { sum = sum + i; i = i + 1; }").unwrap();
    assert!(matches!(vm.globals.get("sum"), Some(Value::Number(n)) if *n == 10.0));
}

#[test]
fn recursive_function_computes_a_sum() {
    let vm = run(
        "function add(a, b) { return a + b; } \
         function sumTo(n) { if (n < 1) { return 0; } return add(n, sumTo(n - 1)); } \
         var total = sumTo(4);",
    )
    .unwrap();
    assert!(matches!(vm.globals.get("total"), Some(Value::Number(n)) if *n == 10.0));
}

#[test]
fn string_concatenation_produces_a_new_string() {
    let vm = run(r#"var greeting = "hello, " + "world";"#).unwrap();
    assert!(
        matches!(vm.globals.get("greeting"), Some(Value::Obj(Obj::String(s))) if s.bytes == "hello, world")
    );
}

#[test]
fn undefined_identifier_is_a_runtime_error() {
    let err = run("print(doesNotExist);").unwrap_err();
    assert!(matches!(err, ScriptError::Runtime(_)));
}

#[test]
fn wrong_number_of_arguments_is_a_runtime_error() {
    let err = run("function f(a) { return a; } f(1, 2);").unwrap_err();
    assert!(matches!(err, ScriptError::Runtime(_)));
}

#[test]
fn unclosed_block_is_a_compile_error() {
    let err = run("function f() { var x = 1;").unwrap_err();
    assert!(matches!(err, ScriptError::Compile(_)));
}

#[test]
fn write_and_read_file_round_trip_through_native_functions() {
    let path = std::env::temp_dir().join("mossy_integration_test.txt");
    let path_str = path.to_string_lossy().replace('\\', "\\\\");
    let source = format!(
        r#"var ok = writeTextToFile("{path}", "hi there");
           var contents = readFile("{path}");"#,
        path = path_str
    );
    let vm = run(&source).unwrap();
    assert!(matches!(vm.globals.get("ok"), Some(Value::Bool(true))));
    assert!(
        matches!(vm.globals.get("contents"), Some(Value::Obj(Obj::String(s))) if s.bytes == "hi there\n")
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn print_accepts_multiple_arguments_without_erroring() {
    assert!(run(r#"print("x =", 1, true);"#).is_ok());
}

#[test]
fn vm_recovers_after_a_runtime_error_mid_call_for_repl_reuse() {
    let mut vm = VM::new();
    let first = interpret("function f(a) { return a; } f(1, 2);", &mut vm);
    assert!(matches!(first, Err(ScriptError::Runtime(_))));

    let second = interpret("var x = 1 + 2;", &mut vm);
    assert!(second.is_ok());
    assert!(matches!(vm.globals.get("x"), Some(Value::Number(n)) if *n == 3.0));
}
