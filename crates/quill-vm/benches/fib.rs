use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use quill_vm::compiler::Compiler;
use quill_vm::parser::Parser;
use quill_vm::{Engine, VM};

const FIB: &str = "
let fibonacci = fn(x) {
    if (x == 0) { return 0; }
    if (x == 1) { return 1; }
    fibonacci(x - 1) + fibonacci(x - 2);
};
fibonacci(20);
";

fn bench_compile(c: &mut Criterion) {
    let program = Parser::new(FIB).parse_program().expect("parse");
    c.bench_function("fib_compile", |b| {
        b.iter(|| {
            let mut compiler = Compiler::new();
            black_box(compiler.compile(black_box(&program)).unwrap());
        })
    });
}

fn bench_vm(c: &mut Criterion) {
    let program = Parser::new(FIB).parse_program().expect("parse");
    let bytecode = Compiler::new().compile(&program).expect("compile");
    c.bench_function("fib_vm", |b| {
        b.iter(|| {
            let mut vm = VM::new(bytecode.clone());
            vm.run().unwrap();
            black_box(vm.last_popped());
        })
    });
}

fn bench_engine(c: &mut Criterion) {
    c.bench_function("fib_engine_eval", |b| {
        b.iter(|| {
            let mut engine = Engine::new();
            black_box(engine.eval(black_box(FIB)).unwrap());
        })
    });
}

criterion_group!(benches, bench_compile, bench_vm, bench_engine);
criterion_main!(benches);
