//! A TOML document drives a complete walk-forward run.

use chrono::{Duration, TimeZone, Utc};

use anchorlab_core::{builtin_factory, Bar};
use anchorlab_runner::{run_walk_forward, DefaultMetrics, RunConfig, WalkForwardReport};

const CONFIG: &str = r#"
[engine]
starting_cash = 10000.0
mode = "target"
size = 10

[walk_forward]
selection_metric = "TotalReturn"
window = { kind = "anchored", min_train_bars = 40, test_window_bars = 20 }

[strategy]
name = "sma_cross"

[grid]
fast = [2, 4]
slow = [10, 20]
"#;

fn sine_bars(n: usize) -> Vec<Bar> {
    let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + 10.0 * (i as f64 / 8.0).sin();
            Bar::from_close(t0 + Duration::days(i as i64), close)
        })
        .collect()
}

fn run(config: &RunConfig, bars: &[Bar]) -> WalkForwardReport {
    let factory = builtin_factory(&config.strategy.name).unwrap();
    run_walk_forward(
        bars,
        factory.as_ref(),
        &config.param_grid(),
        &DefaultMetrics,
        &config.engine,
        &config.walk_forward,
        None,
    )
    .unwrap()
    .with_fingerprint(config.fingerprint().unwrap())
}

#[test]
fn config_document_runs_end_to_end() {
    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    assert_eq!(config.param_grid().len(), 4);

    let bars = sine_bars(120);
    let report = run(&config, &bars);

    assert_eq!(report.selection_metric, "TotalReturn");
    assert_eq!(report.splits.len(), 4);
    assert_eq!(report.oos_equity.len(), 80);
    assert!(report.mean_is_score.is_finite());
    for split in &report.splits {
        assert!(config.param_grid().iter().any(|p| *p == split.params));
        assert_eq!(split.oos_equity.len(), split.test_bars.len());
    }
}

#[test]
fn repeated_runs_are_identical_and_share_a_fingerprint() {
    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    let bars = sine_bars(100);

    let a = run(&config, &bars);
    let b = run(&config, &bars);
    assert_eq!(a.fingerprint, b.fingerprint);
    assert!(a.fingerprint.is_some());
    assert_eq!(a.oos_equity, b.oos_equity);
    let params_a: Vec<_> = a.splits.iter().map(|s| s.params.clone()).collect();
    let params_b: Vec<_> = b.splits.iter().map(|s| s.params.clone()).collect();
    assert_eq!(params_a, params_b);
}

#[test]
fn report_serializes_undefined_stats_as_null() {
    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    let report = run(&config, &sine_bars(70));
    let json = serde_json::to_value(&report).unwrap();
    let first = &json["splits"][0]["oos_stats"];
    assert!(first.get("TotalReturn").is_some());
    assert!(json["splits"][0]["params"].get("fast").is_some());
}
