//! Benchmarks for trace translation.
//!
//! A counting loop `for (i = 0; i < n; i++) acc += i` is translated for several trip counts:
//! - Direct calls on the translator
//! - Replay of recorded events
//! - Snapshot capture and JSON serialization of the finished state

extern crate symtrace;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::{hint::black_box, sync::Arc};
use symtrace::prelude::*;

fn program() -> Arc<Program> {
    let mut program = Program::builder();
    program.class(ClassDecl::new("app/Loop"));
    let method = program
        .method("app/Loop", "sum", &["I"], "I", MethodFlags::STATIC)
        .unwrap();

    let mut body = MethodBody::builder(method);
    let entry = body.block("entry");
    let header = body.block("header");
    let step = body.block("body");
    let exit = body.block("exit");
    let local = |name: &str| Value::Local {
        name: name.to_string(),
        ty: SymType::Int,
    };
    let zero = Value::Constant(Constant::Int(0));

    body.inst(entry, "j0", InstKind::Jump).unwrap();
    body.value(
        header,
        "%i",
        InstKind::Phi(vec![(entry, zero.clone()), (step, local("%i2"))]),
        SymType::Int,
    )
    .unwrap()
    .value(
        header,
        "%acc",
        InstKind::Phi(vec![(entry, zero), (step, local("%acc2"))]),
        SymType::Int,
    )
    .unwrap()
    .value(header, "%c", InstKind::Cmp(CmpOp::Lt), SymType::Bool)
    .unwrap()
    .inst(header, "br", InstKind::Branch)
    .unwrap()
    .value(step, "%acc2", InstKind::Binary(BinaryOp::Add), SymType::Int)
    .unwrap()
    .value(step, "%i2", InstKind::Binary(BinaryOp::Add), SymType::Int)
    .unwrap()
    .inst(step, "j", InstKind::Jump)
    .unwrap()
    .inst(exit, "ret", InstKind::Return)
    .unwrap();
    program.body(body.finish());

    Arc::new(program.build())
}

fn events(n: i32) -> Vec<TraceEvent> {
    let int = RuntimeValue::Int;
    let mut events = vec![
        TraceEvent::MethodEnter {
            class: "app/Loop".to_string(),
            method: "sum".to_string(),
            arg_types: vec!["I".to_string()],
            ret_type: "I".to_string(),
            instance: None,
            args: vec![int(n)],
        },
        TraceEvent::Jump {
            inst: "j0".to_string(),
        },
    ];

    let mut acc = 0;
    for i in 0..=n {
        events.push(TraceEvent::Phi {
            value: "%i".to_string(),
            concrete_value: int(i),
        });
        events.push(TraceEvent::Phi {
            value: "%acc".to_string(),
            concrete_value: int(acc),
        });
        events.push(TraceEvent::Cmp {
            value: "%c".to_string(),
            lhv: "%i".to_string(),
            rhv: "arg$0".to_string(),
            concrete_lhv: int(i),
            concrete_rhv: int(n),
        });
        events.push(TraceEvent::Branch {
            inst: "br".to_string(),
            condition: "%c".to_string(),
        });
        if i == n {
            break;
        }
        events.push(TraceEvent::Binary {
            value: "%acc2".to_string(),
            lhv: "%acc".to_string(),
            rhv: "%i".to_string(),
            concrete_value: int(acc + i),
            concrete_lhv: int(acc),
            concrete_rhv: int(i),
        });
        events.push(TraceEvent::Binary {
            value: "%i2".to_string(),
            lhv: "%i".to_string(),
            rhv: "1".to_string(),
            concrete_value: int(i + 1),
            concrete_lhv: int(i),
            concrete_rhv: int(1),
        });
        events.push(TraceEvent::Jump {
            inst: "j".to_string(),
        });
        acc += i;
    }
    events.push(TraceEvent::Ret {
        inst: "ret".to_string(),
        return_value: Some("%acc".to_string()),
        concrete_value: int(acc),
    });
    events
}

/// Benchmark driving the translator directly with recorded events.
fn bench_translate(c: &mut Criterion) {
    let program = program();
    let mut group = c.benchmark_group("translate_loop");
    for n in [10, 100, 1000] {
        let events = events(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &events, |b, events| {
            b.iter(|| {
                let mut translator = SymbolicTraceBuilder::new(program.clone());
                for event in events {
                    event.apply(&mut translator).unwrap();
                }
                black_box(translator.symbolic_state())
            });
        });
    }
    group.finish();
}

/// Benchmark parallel replay of independent traces.
fn bench_replay_all(c: &mut Criterion) {
    let program = program();
    let traces: Vec<Vec<TraceEvent>> = (0..16).map(|_| events(200)).collect();

    c.bench_function("replay_all_16x200", |b| {
        b.iter(|| {
            let results = replay_all(&program, TranslatorConfig::default(), black_box(&traces));
            black_box(results)
        });
    });
}

/// Benchmark capturing and serializing a finished state.
fn bench_snapshot(c: &mut Criterion) {
    let program = program();
    let state = replay(program, TranslatorConfig::default(), &events(500)).unwrap();

    c.bench_function("snapshot_json_500", |b| {
        b.iter(|| {
            let json = SymbolicStateSnapshot::capture(black_box(&state)).to_json().unwrap();
            black_box(json)
        });
    });
}

criterion_group!(benches, bench_translate, bench_replay_all, bench_snapshot);
criterion_main!(benches);
