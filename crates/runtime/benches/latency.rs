use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dispatch::{evaluate_decision, DecisionInputs};
use runtime::{logging::InMemoryRunLogWriter, SimEngine, SimSession};
use std::time::Instant;
use tokio::runtime::Builder;

const LATENCY_SAMPLES: usize = 5_000;

fn percentile(sorted: &[u128], pct: usize) -> u128 {
    let index = (sorted.len() * pct / 100).min(sorted.len().saturating_sub(1));
    sorted.get(index).copied().unwrap_or_default()
}

fn bench_decision_latency(c: &mut Criterion) {
    let session = SimSession::default();
    let controls = session.controls().clone();
    let forecast = session.forecast().to_vec();
    let average_rt = session.average_rt();

    let mut samples: Vec<u128> = (0..LATENCY_SAMPLES)
        .map(|sample| {
            let started = Instant::now();
            let result = evaluate_decision(&DecisionInputs {
                controls: &controls,
                forecast: &forecast,
                current_index: sample % forecast.len(),
                average_rt,
                total_pnl: 0.0,
            });
            black_box(result);
            started.elapsed().as_nanos()
        })
        .collect();
    samples.sort_unstable();
    println!(
        "decision_latency p50_nanos={} p95_nanos={} p99_nanos={} samples={}",
        percentile(&samples, 50),
        percentile(&samples, 95),
        percentile(&samples, 99),
        samples.len()
    );

    c.bench_function("evaluate_decision", |b| {
        let mut index = 0;
        b.iter(|| {
            index = (index + 1) % forecast.len();
            black_box(evaluate_decision(&DecisionInputs {
                controls: &controls,
                forecast: &forecast,
                current_index: index,
                average_rt,
                total_pnl: 0.0,
            }))
        });
    });
}

fn bench_tick_latency(c: &mut Criterion) {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime should build");

    c.bench_function("engine_step_once", |b| {
        let mut engine = SimEngine::with_run_log(SimSession::default(), InMemoryRunLogWriter::new());
        b.iter(|| {
            runtime.block_on(async {
                black_box(engine.step_once().await);
            });
        });
    });
}

criterion_group!(benches, bench_decision_latency, bench_tick_latency);
criterion_main!(benches);
