//! Criterion benchmarks for anchorlab hot paths.
//!
//! Benchmarks:
//! 1. Bar loop (full backtest with a flat and a crossover strategy)
//! 2. Simulator order churn (alternating adds, partial closes, reversals)
//! 3. Indicator precompute (SMA, ATR)

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use anchorlab_core::indicators::{Atr, Indicator, Sma};
use anchorlab_core::strategy::{Flat, SmaCross};
use anchorlab_core::{run_backtest, Bar, EngineConfig, ExecutionSimulator, SimulatorConfig};

// ── Helpers ──────────────────────────────────────────────────────────

/// Seeded random walk with a high/low band proportional to the move.
fn make_bars(n: usize) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(42);
    let base = Utc.with_ymd_and_hms(2015, 1, 2, 0, 0, 0).unwrap();
    let mut close = 100.0;
    (0..n)
        .map(|i| {
            let step: f64 = rng.gen_range(-0.02..0.02);
            close *= 1.0 + step;
            let band = close * (0.005 + step.abs());
            Bar::from_close(base + Duration::days(i as i64), close).with_range(close + band, close - band)
        })
        .collect()
}

// ── 1. Bar Loop ──────────────────────────────────────────────────────

fn bench_bar_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_loop");

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);
        let config = EngineConfig {
            atr_len: Some(14),
            risk_multiplier: Some(2.0),
            ..EngineConfig::default()
        };

        group.bench_with_input(BenchmarkId::new("flat", bar_count), &bar_count, |b, _| {
            b.iter(|| run_backtest(black_box(&bars), &mut Flat, black_box(&config)))
        });
        group.bench_with_input(BenchmarkId::new("sma_cross", bar_count), &bar_count, |b, _| {
            b.iter(|| {
                let mut strategy = SmaCross::new(10, 50, true);
                run_backtest(black_box(&bars), &mut strategy, black_box(&config))
            })
        });
    }

    group.finish();
}

// ── 2. Simulator ─────────────────────────────────────────────────────

fn bench_simulator(c: &mut Criterion) {
    let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let config = SimulatorConfig {
        commission: 1.0,
        slippage_bps: 5.0,
        ..SimulatorConfig::default()
    };

    c.bench_function("simulator_10k_orders", |b| {
        b.iter(|| {
            let mut sim = ExecutionSimulator::new(config);
            for i in 0..10_000 {
                let price = 100.0 + (i % 17) as f64;
                let t = ts + Duration::minutes(i);
                sim.update_market(t, price);
                let target = [2.0, 3.0, 1.0, -2.0, 0.0][(i % 5) as usize];
                sim.order_target(black_box(target), price, t);
            }
            sim.equity()
        })
    });
}

// ── 3. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let bars = make_bars(2520);
    let mut group = c.benchmark_group("indicators");
    group.bench_function("sma_50", |b| b.iter(|| Sma::new(50).compute(black_box(&bars))));
    group.bench_function("atr_14", |b| b.iter(|| Atr::new(14).compute(black_box(&bars))));
    group.finish();
}

criterion_group!(benches, bench_bar_loop, bench_simulator, bench_indicators);
criterion_main!(benches);
