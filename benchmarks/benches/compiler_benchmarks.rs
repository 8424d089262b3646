//! Benchmarks for the coco compiler.
//!
//! Measures throughput of:
//! - Lexing
//! - Parsing
//! - Type checking
//! - Full source-to-IR compilation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use coco_lang::codegen::pipeline::Compiler;
use coco_lang::lexer::lex;
use coco_lang::parser::Parser;
use coco_lang::typechecker::TypeChecker;

/// Simple arithmetic
const SIMPLE_EXPR: &str = "let a = 1 + 2 * 3;";

/// Wider arithmetic with literal promotion
const NESTED_EXPR: &str =
    "let a = 1 + 2 * 3 - 4 / 5 + 6 * 7; let b = 1.5 + 2 * 3.25 - 4.5 / 5.0;";

/// Branching with builtins
const BRANCHY: &str = r#"
let a = 1;
let b = float(a) + 2.5;
if (a < 3) {
    print(a, b);
} else if (a < 5) {
    print(float(a));
} else {
    exit(int(b));
}
"#;

/// Loop-heavy program
const LOOPS: &str = r#"
let total = 0;
for (let i = 0; i < 100; i = i + 1) {
    if (i == 50) {
        continue;
    }
    total = total + i;
}
while (total > 0) {
    total = total - 7;
}
exit(total);
"#;

const CASES: [(&str, &str); 4] = [
    ("simple", SIMPLE_EXPR),
    ("nested", NESTED_EXPR),
    ("branchy", BRANCHY),
    ("loops", LOOPS),
];

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    for (name, source) in CASES {
        group.bench_with_input(BenchmarkId::new("lex", name), source, |b, source| {
            b.iter(|| lex(black_box(source)))
        });
    }

    group.finish();
}

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    for (name, source) in CASES {
        group.bench_with_input(BenchmarkId::new("parse", name), source, |b, source| {
            b.iter(|| {
                let mut parser = Parser::new(lex(black_box(source)));
                parser.parse_program()
            })
        });
    }

    group.finish();
}

fn bench_typechecker(c: &mut Criterion) {
    let mut group = c.benchmark_group("typechecker");

    for (name, source) in CASES {
        let mut parser = Parser::new(lex(source));
        let program = parser.parse_program();
        assert!(!parser.has_errors());

        group.bench_with_input(BenchmarkId::new("check", name), &program, |b, program| {
            b.iter(|| {
                let mut program = program.clone();
                let mut checker = TypeChecker::new();
                checker.check(&mut program);
                program
            })
        });
    }

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let compiler = Compiler::new();

    for (name, source) in CASES {
        group.bench_with_input(BenchmarkId::new("to_ir", name), source, |b, source| {
            b.iter(|| compiler.compile_to_ir(black_box(source)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_lexer,
    bench_parser,
    bench_typechecker,
    bench_full_pipeline
);
criterion_main!(benches);
