//! Tests for the virtual machine.

use super::*;
use crate::compiler::Compiler;
use crate::config::VmConfig;
use crate::error::{Error, RuntimeError};
use crate::parser::Parser;
use crate::runtime::value::Value;

fn eval_with(src: &str, config: VmConfig) -> Result<Value, Error> {
    let mut parser = Parser::new(src);
    let program = parser.parse_program()?;
    let mut compiler = Compiler::new();
    let bytecode = compiler.compile(&program)?;
    let mut vm = VM::with_config(bytecode, config);
    vm.run()?;
    Ok(vm.last_popped())
}

fn eval(src: &str) -> Result<Value, Error> {
    eval_with(src, VmConfig::default())
}

fn eval_ok(src: &str) -> Value {
    eval(src).expect("Evaluation should succeed")
}

fn runtime_error(src: &str) -> RuntimeError {
    match eval(src) {
        Err(Error::Runtime(err)) => err,
        other => panic!("expected runtime error for {:?}, got {:?}", src, other),
    }
}

fn int(n: i64) -> Value {
    Value::Integer(n)
}

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Integer).collect())
}

// ============================================================================
// Literals and arithmetic
// ============================================================================

#[test]
fn test_empty_program() {
    assert_eq!(eval_ok(""), Value::Null);
}

#[test]
fn test_integer_arithmetic() {
    let cases = [
        ("1", 1),
        ("2", 2),
        ("1 + 2", 3),
        ("1 - 2", -1),
        ("1 * 2", 2),
        ("4 / 2", 2),
        ("50 / 2 * 2 + 10 - 5", 55),
        ("5 * (2 + 10)", 60),
        ("-5", -5),
        ("-10", -10),
        ("-50 + 100 + -50", 0),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
        ("7 / 2", 3),
        ("-7 / 2", -3),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), int(expected), "{}", src);
    }
}

#[test]
fn test_integer_overflow_wraps() {
    assert_eq!(eval_ok("9223372036854775807 + 1"), int(i64::MIN));
    assert_eq!(eval_ok("-9223372036854775807 - 2"), int(i64::MAX));
}

#[test]
fn test_division_by_zero() {
    assert_eq!(runtime_error("1 / 0"), RuntimeError::DivisionByZero);
    assert_eq!(runtime_error("let z = 0; 10 / z"), RuntimeError::DivisionByZero);
}

#[test]
fn test_boolean_expressions() {
    let cases = [
        ("true", true),
        ("false", false),
        ("1 < 2", true),
        ("1 > 2", false),
        ("1 < 1", false),
        ("1 > 1", false),
        ("1 == 1", true),
        ("1 != 1", false),
        ("1 == 2", false),
        ("1 != 2", true),
        ("true == true", true),
        ("false == false", true),
        ("true == false", false),
        ("true != false", true),
        ("(1 < 2) == true", true),
        ("(1 > 2) == true", false),
        ("!true", false),
        ("!false", true),
        ("!5", false),
        ("!!true", true),
        ("!!5", true),
        ("!(if (false) { 5; })", true),
        ("\"a\" == \"a\"", true),
        ("\"a\" != \"b\"", true),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), Value::Boolean(expected), "{}", src);
    }
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval_ok("\"quill\""), Value::string("quill"));
    assert_eq!(eval_ok("\"qu\" + \"ill\""), Value::string("quill"));
    assert_eq!(eval_ok("\"a\" + \"b\" + \"c\""), Value::string("abc"));
}

#[test]
fn test_type_mismatch() {
    assert_eq!(
        runtime_error("1 + true"),
        RuntimeError::TypeMismatch {
            left: "INTEGER",
            op: "+",
            right: "BOOLEAN",
        }
    );
    assert_eq!(
        runtime_error("1 == \"1\""),
        RuntimeError::TypeMismatch {
            left: "INTEGER",
            op: "==",
            right: "STRING",
        }
    );
}

#[test]
fn test_unknown_operator() {
    assert_eq!(
        runtime_error("\"a\" - \"b\""),
        RuntimeError::UnknownOperator("STRING - STRING".into())
    );
    assert_eq!(
        runtime_error("true + false"),
        RuntimeError::UnknownOperator("BOOLEAN + BOOLEAN".into())
    );
    assert_eq!(
        runtime_error("-true"),
        RuntimeError::UnknownOperator("-BOOLEAN".into())
    );
    assert_eq!(
        runtime_error("true > false"),
        RuntimeError::UnknownOperator("BOOLEAN > BOOLEAN".into())
    );
}

#[test]
fn test_error_display() {
    let err = eval("1 + true").unwrap_err();
    assert_eq!(
        err.to_string(),
        "RuntimeError: type mismatch: INTEGER + BOOLEAN"
    );
}

// ============================================================================
// Conditionals and globals
// ============================================================================

#[test]
fn test_conditionals() {
    let cases = [
        ("if (true) { 10 }", int(10)),
        ("if (true) { 10 } else { 20 }", int(10)),
        ("if (false) { 10 } else { 20 }", int(20)),
        ("if (1) { 10 }", int(10)),
        ("if (1 < 2) { 10 }", int(10)),
        ("if (1 < 2) { 10 } else { 20 }", int(10)),
        ("if (1 > 2) { 10 } else { 20 }", int(20)),
        ("if (1 > 2) { 10 }", Value::Null),
        ("if (false) { 10 }", Value::Null),
        ("if ((if (false) { 10 })) { 10 } else { 20 }", int(20)),
        ("if (true) { }", Value::Null),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), expected, "{}", src);
    }
}

#[test]
fn test_global_let_statements() {
    assert_eq!(eval_ok("let one = 1; one"), int(1));
    assert_eq!(eval_ok("let one = 1; let two = 2; one + two"), int(3));
    assert_eq!(eval_ok("let one = 1; let two = one + one; one + two"), int(3));
}

#[test]
fn test_global_assignment() {
    assert_eq!(eval_ok("let x = 1; x = x + 41; x"), int(42));
    assert_eq!(eval_ok("let x = 1; let f = fn() { x = 5; }; f(); x"), int(5));
}

#[test]
fn test_let_rebinds_same_slot() {
    assert_eq!(eval_ok("let a = 1; let a = a + 1; a"), int(2));
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_array_literals() {
    assert_eq!(eval_ok("[]"), ints(&[]));
    assert_eq!(eval_ok("[1, 2, 3]"), ints(&[1, 2, 3]));
    assert_eq!(eval_ok("[1 + 2, 3 * 4, 5 + 6]"), ints(&[3, 12, 11]));
}

#[test]
fn test_hash_literals() {
    assert_eq!(eval_ok("{}").to_string(), "{}");
    assert_eq!(eval_ok("{1: 2, 2: 3}").to_string(), "{1: 2, 2: 3}");
    assert_eq!(
        eval_ok("{1 + 1: 2 * 2, 3 + 3: 4 * 4}").to_string(),
        "{2: 4, 6: 16}"
    );
    assert_eq!(
        eval_ok("{\"b\": 1, \"a\": [1, \"x\"]}").to_string(),
        "{\"a\": [1, \"x\"], \"b\": 1}"
    );
}

#[test]
fn test_hash_unhashable_key() {
    assert_eq!(
        runtime_error("let k = [1]; {k: 1}"),
        RuntimeError::UnhashableKey("ARRAY")
    );
}

#[test]
fn test_index_expressions() {
    let cases = [
        ("[1, 2, 3][1]", int(2)),
        ("[1, 2, 3][0 + 2]", int(3)),
        ("[[1, 1, 1]][0][0]", int(1)),
        ("[][0]", Value::Null),
        ("[1, 2, 3][99]", Value::Null),
        ("[1][-1]", Value::Null),
        ("{1: 1, 2: 2}[1]", int(1)),
        ("{1: 1, 2: 2}[2]", int(2)),
        ("{1: 1}[0]", Value::Null),
        ("{}[0]", Value::Null),
        ("{\"one\": 1}[\"one\"]", int(1)),
        ("{true: 5}[true]", int(5)),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), expected, "{}", src);
    }
}

#[test]
fn test_index_errors() {
    assert_eq!(
        runtime_error("1[0]"),
        RuntimeError::IndexNotSupported("INTEGER[INTEGER]".into())
    );
    assert_eq!(
        runtime_error("[1][true]"),
        RuntimeError::IndexNotSupported("ARRAY[BOOLEAN]".into())
    );
    assert_eq!(
        runtime_error("{1: 2}[[1]]"),
        RuntimeError::UnhashableKey("ARRAY")
    );
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_calling_functions_without_arguments() {
    assert_eq!(eval_ok("let f = fn() { 5 + 10; }; f();"), int(15));
    assert_eq!(
        eval_ok("let one = fn() { 1; }; let two = fn() { 2; }; one() + two()"),
        int(3)
    );
    assert_eq!(
        eval_ok("let a = fn() { 1 }; let b = fn() { a() + 1 }; let c = fn() { b() + 1 }; c();"),
        int(3)
    );
}

#[test]
fn test_functions_with_return_statement() {
    assert_eq!(eval_ok("let f = fn() { return 99; 100; }; f();"), int(99));
    assert_eq!(eval_ok("let f = fn() { return 99; return 100; }; f();"), int(99));
}

#[test]
fn test_functions_without_return_value() {
    assert_eq!(eval_ok("let f = fn() { }; f();"), Value::Null);
    assert_eq!(eval_ok("let f = fn() { return; }; f();"), Value::Null);
    assert_eq!(eval_ok("let f = fn() { let x = 1; }; f();"), Value::Null);
    assert_eq!(
        eval_ok("let none = fn() { }; let again = fn() { none(); }; none(); again();"),
        Value::Null
    );
}

#[test]
fn test_first_class_functions() {
    let src = "
        let returnsOne = fn() { 1; };
        let returnsOneReturner = fn() { returnsOne; };
        returnsOneReturner()();
    ";
    assert_eq!(eval_ok(src), int(1));
}

#[test]
fn test_local_bindings() {
    let cases = [
        ("let one = fn() { let one = 1; one }; one();", 1),
        ("let f = fn() { let a = 1; let b = 2; a + b }; f();", 3),
        (
            "let f = fn() { let a = 1; let b = 2; a + b }; let g = fn() { let a = 3; let b = 4; a + b }; f() + g();",
            10,
        ),
        (
            "let seed = 50; let f = fn() { let n = 1; seed - n }; let g = fn() { let n = 2; seed - n }; f() + g();",
            97,
        ),
        ("let f = fn() { let x = 1; x = x + 1; x }; f();", 2),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), int(expected), "{}", src);
    }
}

#[test]
fn test_arguments_and_bindings() {
    let cases = [
        ("let identity = fn(a) { a; }; identity(4);", 4),
        ("let sum = fn(a, b) { a + b; }; sum(1, 2);", 3),
        ("let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2);", 3),
        (
            "let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2) + sum(3, 4);",
            10,
        ),
        (
            "let sum = fn(a, b) { let c = a + b; c; }; let outer = fn() { sum(1, 2) + sum(3, 4); }; outer();",
            10,
        ),
        (
            "let g = 10; let sum = fn(a, b) { let c = a + b; c + g; }; let outer = fn() { sum(1, 2) + sum(3, 4) + g; }; outer() + g;",
            50,
        ),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), int(expected), "{}", src);
    }
}

#[test]
fn test_locals_start_null() {
    // The second call must not see the first call's local.
    let src = "
        let f = fn(flag) { if (flag) { let x = 7; } x };
        f(true);
        f(false);
    ";
    assert_eq!(eval_ok(src), Value::Null);
}

#[test]
fn test_wrong_argument_count() {
    assert_eq!(
        runtime_error("fn() { 1; }(1);"),
        RuntimeError::WrongArgumentCount { want: 0, got: 1 }
    );
    assert_eq!(
        runtime_error("fn(a) { a; }();"),
        RuntimeError::WrongArgumentCount { want: 1, got: 0 }
    );
    assert_eq!(
        runtime_error("fn(a, b) { a + b; }(1);"),
        RuntimeError::WrongArgumentCount { want: 2, got: 1 }
    );
}

#[test]
fn test_calling_non_function() {
    assert_eq!(runtime_error("1();"), RuntimeError::NotCallable("INTEGER"));
    assert_eq!(
        runtime_error("let s = \"f\"; s(1);"),
        RuntimeError::NotCallable("STRING")
    );
}

#[test]
fn test_return_outside_function() {
    assert_eq!(runtime_error("return 1;"), RuntimeError::ReturnOutsideFunction);
}

// ============================================================================
// Closures
// ============================================================================

#[test]
fn test_closures() {
    let cases = [
        (
            "let newClosure = fn(a) { fn() { a; }; }; let closure = newClosure(99); closure();",
            99,
        ),
        (
            "let newAdder = fn(a, b) { fn(c) { a + b + c }; }; let adder = newAdder(1, 2); adder(8);",
            11,
        ),
        (
            "let newAdder = fn(a, b) { let c = a + b; fn(d) { c + d }; }; let adder = newAdder(1, 2); adder(8);",
            11,
        ),
        (
            "let newAdderOuter = fn(a, b) { let c = a + b; fn(d) { let e = d + c; fn(f) { e + f; }; }; };
             let newAdderInner = newAdderOuter(1, 2);
             let adder = newAdderInner(3);
             adder(8);",
            14,
        ),
        (
            "let a = 1;
             let newAdderOuter = fn(b) { fn(c) { fn(d) { a + b + c + d }; }; };
             let newAdderInner = newAdderOuter(2);
             let adder = newAdderInner(3);
             adder(8);",
            14,
        ),
        (
            "let newClosure = fn(a, b) { let one = fn() { a; }; let two = fn() { b; }; fn() { one() + two(); }; };
             let closure = newClosure(9, 90);
             closure();",
            99,
        ),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), int(expected), "{}", src);
    }
}

#[test]
fn test_closures_capture_values() {
    let src = "
        let make = fn() { let x = 1; let get = fn() { x }; x = 2; get };
        make()();
    ";
    assert_eq!(eval_ok(src), int(1));
}

#[test]
fn test_recursive_functions() {
    let cases = [
        (
            "let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } }; countDown(1);",
            0,
        ),
        (
            "let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
             let wrapper = fn() { countDown(1); };
             wrapper();",
            0,
        ),
        (
            "let wrapper = fn() {
                 let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
                 countDown(1);
             };
             wrapper();",
            0,
        ),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), int(expected), "{}", src);
    }
}

#[test]
fn test_recursive_fibonacci() {
    let src = "
        let fibonacci = fn(x) {
            if (x == 0) { return 0; }
            if (x == 1) { return 1; }
            fibonacci(x - 1) + fibonacci(x - 2);
        };
        fibonacci(15);
    ";
    assert_eq!(eval_ok(src), int(610));
}

#[test]
fn test_closure_display() {
    assert_eq!(eval_ok("let add = fn(a, b) { a + b }; add").to_string(), "Closure[add/2]");
    assert_eq!(eval_ok("fn() { }").to_string(), "Closure[<anonymous>/0]");
}

// ============================================================================
// Builtins
// ============================================================================

#[test]
fn test_builtin_functions() {
    let cases = [
        ("len(\"\")", int(0)),
        ("len(\"four\")", int(4)),
        ("len(\"hello world\")", int(11)),
        ("len([1, 2, 3])", int(3)),
        ("len([])", int(0)),
        ("print(\"hello\", \"world!\")", Value::Null),
        ("first([1, 2, 3])", int(1)),
        ("first([])", Value::Null),
        ("last([1, 2, 3])", int(3)),
        ("last([])", Value::Null),
        ("rest([1, 2, 3])", ints(&[2, 3])),
        ("rest([])", Value::Null),
        ("push([], 1)", ints(&[1])),
        ("let a = [1]; push(a, 2); a", ints(&[1])),
    ];
    for (src, expected) in cases {
        assert_eq!(eval_ok(src), expected, "{}", src);
    }
}

#[test]
fn test_builtin_errors() {
    assert_eq!(
        runtime_error("len(1)"),
        RuntimeError::Builtin {
            name: "len",
            message: "argument to `len` not supported, got INTEGER".into(),
        }
    );
    assert_eq!(
        runtime_error("len(\"one\", \"two\")"),
        RuntimeError::Builtin {
            name: "len",
            message: "wrong number of arguments. got=2, want=1".into(),
        }
    );
    assert_eq!(
        runtime_error("first(1)"),
        RuntimeError::Builtin {
            name: "first",
            message: "argument to `first` must be ARRAY, got INTEGER".into(),
        }
    );
    assert_eq!(
        runtime_error("push(1, 1)"),
        RuntimeError::Builtin {
            name: "push",
            message: "argument to `push` must be ARRAY, got INTEGER".into(),
        }
    );
}

#[test]
fn test_builtins_inside_closures() {
    let src = "
        let map = fn(arr, f) {
            let iter = fn(arr, acc) {
                if (len(arr) == 0) { acc } else { iter(rest(arr), push(acc, f(first(arr)))); }
            };
            iter(arr, []);
        };
        map([1, 2, 3], fn(x) { x * 2 });
    ";
    assert_eq!(eval_ok(src), ints(&[2, 4, 6]));
}

// ============================================================================
// Limits
// ============================================================================

#[test]
fn test_frame_overflow() {
    let src = "let f = fn(n) { f(n + 1) }; f(0);";
    let config = VmConfig::new().max_frames(64);
    match eval_with(src, config) {
        Err(Error::Runtime(RuntimeError::FrameOverflow(64))) => {}
        other => panic!("expected frame overflow, got {:?}", other),
    }
}

#[test]
fn test_stack_overflow() {
    let config = VmConfig::new().stack_size(4);
    match eval_with("[1, 2, 3, 4, 5]", config) {
        Err(Error::Runtime(RuntimeError::StackOverflow)) => {}
        other => panic!("expected stack overflow, got {:?}", other),
    }
}

#[test]
fn test_globals_survive_between_runs() {
    let mut compiler = Compiler::new();

    let program = Parser::new("let x = 40;").parse_program().unwrap();
    let mut vm = VM::new(compiler.compile(&program).unwrap());
    vm.run().unwrap();
    let globals = vm.into_globals();

    let program = Parser::new("x + 2").parse_program().unwrap();
    let mut vm = VM::with_globals(
        compiler.compile(&program).unwrap(),
        VmConfig::default(),
        globals,
    );
    vm.run().unwrap();
    assert_eq!(vm.last_popped(), int(42));
}

#[test]
fn test_stack_is_empty_after_statements() {
    let program = Parser::new("1; 2; let a = [3]; a[0];").parse_program().unwrap();
    let mut vm = VM::new(Compiler::new().compile(&program).unwrap());
    vm.run().unwrap();
    assert_eq!(vm.stack_top(), None);
    assert_eq!(vm.last_popped(), int(3));
}

#[test]
fn test_let_statement_leaves_no_result() {
    assert_eq!(eval_ok("let x = 5;"), Value::Null);
    assert_eq!(eval_ok("let f = fn() { 1 }; let y = f();"), Value::Null);
}

#[test]
fn test_result_is_last_expression_statement() {
    assert_eq!(eval_ok("1; let y = 2;"), int(1));
    assert_eq!(eval_ok("let y = 2; y; y = 7;"), int(2));
}

#[test]
fn test_pops_inside_functions_are_not_the_result() {
    let src = "let f = fn() { 10; 20; 30 }; let r = f();";
    assert_eq!(eval_ok(src), Value::Null);
    assert_eq!(eval_ok("let f = fn() { 10; 20; 30 }; f();"), int(30));
}
