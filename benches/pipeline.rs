extern crate ilscope;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ilscope::prelude::*;
use std::hint::black_box;

/// Builds a function of `loops` sequential counting loops with a small body each.
fn synthetic(loops: usize) -> IlFunction {
    let mut builder = FunctionBuilder::new("synthetic");
    let mut temp = 0;
    for index in 0..loops {
        let head = format!("loop{index}");
        let counter = IlValue::local(format!("synthetic.c{index}"), IlType::Byte);
        builder
            .store_variable(counter.clone(), IlValue::byte(0))
            .label(&head)
            .load_variable(IlValue::temp(temp), counter.clone())
            .binary(IlOpcode::Mul, IlValue::temp(temp + 1), IlValue::temp(temp), IlValue::byte(4))
            .poke(IlValue::memory(0x0400), IlValue::temp(temp + 1))
            .binary(IlOpcode::Add, IlValue::temp(temp + 2), IlValue::temp(temp), IlValue::byte(1))
            .store_variable(counter, IlValue::temp(temp + 2))
            .binary(
                IlOpcode::CompareLt,
                IlValue::temp(temp + 3),
                IlValue::temp(temp + 2),
                IlValue::byte(40),
            )
            .branch_if_true(IlValue::temp(temp + 3), &head);
        temp += 4;
    }
    builder.ret(None);
    builder.build()
}

/// Benchmark the control flow analyzer on growing functions
fn bench_control_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_flow");
    for loops in [1usize, 8, 64] {
        let function = synthetic(loops);
        group.throughput(Throughput::Elements(function.instructions.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(loops), &function, |b, function| {
            let analyzer = ControlFlowAnalyzer::default();
            b.iter(|| {
                let result = analyzer.analyze_function(black_box(function)).unwrap();
                black_box(result)
            });
        });
    }
    group.finish();
}

/// Benchmark coarse against precise liveness
fn bench_data_flow_precision(c: &mut Criterion) {
    let function = synthetic(32);
    let mut group = c.benchmark_group("data_flow_precision");
    for precision in [DataFlowPrecision::Coarse, DataFlowPrecision::Precise] {
        let options = AnalysisOptions {
            precision,
            ..AnalysisOptions::default()
        };
        group.bench_function(format!("{precision:?}"), |b| {
            let analyzer = ControlFlowAnalyzer::new(options);
            b.iter(|| {
                let result = analyzer.analyze_function(black_box(&function)).unwrap();
                black_box(result)
            });
        });
    }
    group.finish();
}

/// Benchmark timing validation and quality metrics on top of a fixed analysis
fn bench_timing_and_quality(c: &mut Criterion) {
    let function = synthetic(16);
    let cfa = ControlFlowAnalyzer::default()
        .analyze_function(&function)
        .unwrap();

    let mut group = c.benchmark_group("timing");
    for (platform, variant) in [("c64", "6510"), ("vic20", "6502"), ("x16", "65c02")] {
        let validator = TimingValidator::new(TimingOptions::for_target(platform, variant).unwrap());
        group.bench_function(variant, |b| {
            b.iter(|| {
                let result = validator
                    .analyze_function(black_box(&function), black_box(&cfa))
                    .unwrap();
                black_box(result)
            });
        });
    }
    group.finish();

    let timing = TimingValidator::new(TimingOptions::default())
        .analyze_function(&function, &cfa)
        .unwrap();
    c.bench_function("quality_report", |b| {
        let analyzer = QualityAnalyzer::default();
        b.iter(|| {
            black_box(analyzer.analyze_function(
                black_box(&function),
                Some(black_box(&cfa)),
                Some(black_box(&timing)),
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_control_flow,
    bench_data_flow_precision,
    bench_timing_and_quality
);
criterion_main!(benches);
