//! Performance metrics: pure functions from an equity curve (plus trades and
//! an optional benchmark) to named statistics.
//!
//! `summarize` is the default scoring function consumed by the optimizer. Any
//! other `Metric` implementation works as long as it produces the configured
//! selection key.

use std::collections::BTreeMap;

use chrono::{Datelike, Weekday};

use anchorlab_core::{Fill, Series, Timestamp, Trade};

/// Named scalar statistics. Undefined values are `NaN` (serialized as null).
pub type Stats = BTreeMap<String, f64>;

/// Everything a scoring function may look at.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub equity: &'a Series,
    pub fills: &'a [Fill],
    pub trades: &'a [Trade],
    pub benchmark: Option<&'a Series>,
}

/// Maps a run to named statistics.
pub trait Metric: Send + Sync {
    fn score(&self, input: &ScoringInput<'_>) -> Stats;
}

impl<F> Metric for F
where
    F: Fn(&ScoringInput<'_>) -> Stats + Send + Sync,
{
    fn score(&self, input: &ScoringInput<'_>) -> Stats {
        self(input)
    }
}

/// The built-in statistics set produced by [`summarize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMetrics;

impl Metric for DefaultMetrics {
    fn score(&self, input: &ScoringInput<'_>) -> Stats {
        summarize(input.equity, input.trades, input.benchmark)
    }
}

/// Keys always present in [`summarize`] output.
pub const SUMMARY_KEYS: &[&str] = &[
    "Start",
    "End",
    "TotalReturn",
    "CAGR",
    "Volatility_annualized",
    "Sharpe_d",
    "Sharpe_annualized",
    "Sortino_annualized",
    "MaxDrawdown",
    "Calmar",
    "Omega",
    "VaR_5",
    "CVaR_5",
    "Trades",
    "WinRate",
    "AvgTrade",
    "AvgWin",
    "AvgLoss",
    "ProfitFactor",
];

/// Keys added when a benchmark is supplied.
pub const BENCHMARK_KEYS: &[&str] = &[
    "Alpha",
    "Beta",
    "InformationRatio",
    "TrackingError",
    "UpCapture",
    "DownCapture",
];

// ─── Summary ─────────────────────────────────────────────────────────

/// Compute the full statistics map for one equity curve.
///
/// Trade statistics (`Trades`, `WinRate`, averages, `ProfitFactor`) count
/// finalized trades only; a trade still open at the end of the curve is not
/// counted. An empty curve yields every equity statistic as `NaN`.
pub fn summarize(equity: &Series, trades: &[Trade], benchmark: Option<&Series>) -> Stats {
    let mut stats = Stats::new();
    let mut put = |k: &str, v: f64| {
        stats.insert(k.to_string(), v);
    };

    let values = equity.values();
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) => {
            let ppy = periods_per_year(equity.timestamps()) as f64;
            let returns = simple_returns(values);

            put("Start", first);
            put("End", last);
            put("TotalReturn", last / first - 1.0);
            let cagr = cagr(values, ppy);
            put("CAGR", cagr);
            put(
                "Volatility_annualized",
                if returns.is_empty() { 0.0 } else { sample_std(&returns) * ppy.sqrt() },
            );

            let sharpe = if returns.is_empty() { 0.0 } else { sharpe_ratio(&returns) };
            put("Sharpe_d", sharpe);
            put("Sharpe_annualized", sharpe * ppy.sqrt());

            let sortino = if returns.is_empty() { f64::INFINITY } else { sortino_ratio(&returns) };
            put("Sortino_annualized", sortino * ppy.sqrt());

            let mdd = max_drawdown(values);
            put("MaxDrawdown", mdd);
            put("Calmar", if mdd < 0.0 { cagr / mdd.abs() } else { f64::NAN });

            if returns.is_empty() {
                put("Omega", f64::NAN);
                put("VaR_5", f64::NAN);
                put("CVaR_5", f64::NAN);
            } else {
                put("Omega", omega_ratio(&returns, 0.0));
                let var = percentile(&returns, 5.0);
                put("VaR_5", var);
                put("CVaR_5", conditional_tail_mean(&returns, var));
            }
        }
        _ => {
            for &key in &SUMMARY_KEYS[..13] {
                put(key, f64::NAN);
            }
        }
    }

    for (k, v) in trade_stats(trades) {
        put(k, v);
    }

    if let Some(bench) = benchmark.filter(|b| !b.is_empty()) {
        for (k, v) in benchmark_stats(equity, bench) {
            put(k, v);
        }
    }

    stats
}

// ─── Individual metric functions ────────────────────────────────────

/// Bar-over-bar simple returns; length is `len - 1`.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Compound annual growth over `len - 1` periods.
pub fn cagr(values: &[f64], periods_per_year: f64) -> f64 {
    let (Some(&first), Some(&last)) = (values.first(), values.last()) else {
        return 0.0;
    };
    if first == 0.0 {
        return 0.0;
    }
    let growth = last / first;
    let periods = values.len().saturating_sub(1).max(1) as f64;
    let years = periods / periods_per_year;
    if years <= 0.0 {
        return growth - 1.0;
    }
    growth.powf(1.0 / years) - 1.0
}

/// Per-period Sharpe: mean / sample std. 0 when the std is 0 or undefined.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std = sample_std(returns);
    if std == 0.0 || std.is_nan() {
        return 0.0;
    }
    mean_f64(returns) / std
}

/// Per-period Sortino: mean / sample std of negative returns.
/// Infinite when there is no measurable downside.
pub fn sortino_ratio(returns: &[f64]) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return f64::INFINITY;
    }
    let std = sample_std(&downside);
    if std == 0.0 || std.is_nan() {
        return f64::INFINITY;
    }
    mean_f64(returns) / std
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        let dd = v / peak - 1.0;
        if dd < worst {
            worst = dd;
        }
    }
    worst
}

/// Sum of gains over sum of losses relative to `threshold`.
pub fn omega_ratio(returns: &[f64], threshold: f64) -> f64 {
    let gains: f64 = returns.iter().map(|r| (r - threshold).max(0.0)).sum();
    let losses: f64 = returns.iter().map(|r| (threshold - r).max(0.0)).sum();
    if losses > 0.0 {
        gains / losses
    } else {
        f64::INFINITY
    }
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (sorted.len() - 1) as f64 * pct / 100.0;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

fn conditional_tail_mean(returns: &[f64], cutoff: f64) -> f64 {
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= cutoff).collect();
    if tail.is_empty() {
        cutoff
    } else {
        mean_f64(&tail)
    }
}

fn trade_stats(trades: &[Trade]) -> Vec<(&'static str, f64)> {
    let pnls: Vec<f64> = trades.iter().filter_map(|t| t.pnl).collect();
    if pnls.is_empty() {
        return vec![
            ("Trades", 0.0),
            ("WinRate", f64::NAN),
            ("AvgTrade", 0.0),
            ("AvgWin", 0.0),
            ("AvgLoss", 0.0),
            ("ProfitFactor", f64::NAN),
        ];
    }
    let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();
    let gross_win: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum();
    let mean_or_zero = |v: &[f64]| if v.is_empty() { 0.0 } else { mean_f64(v) };
    vec![
        ("Trades", pnls.len() as f64),
        ("WinRate", wins.len() as f64 / pnls.len() as f64),
        ("AvgTrade", mean_f64(&pnls)),
        ("AvgWin", mean_or_zero(&wins)),
        ("AvgLoss", mean_or_zero(&losses)),
        (
            "ProfitFactor",
            if gross_loss != 0.0 { gross_win / gross_loss.abs() } else { f64::INFINITY },
        ),
    ]
}

// ─── Benchmark-relative ──────────────────────────────────────────────

/// The part of `benchmark` that covers `equity`'s dates (inclusive).
///
/// Scoring a window against this slice starts both return series at 0 on the
/// window's first bar, rather than pairing the strategy's first 0 return with
/// the benchmark's move into that bar.
pub fn benchmark_window(benchmark: &Series, equity: &Series) -> Series {
    match (equity.first(), equity.last()) {
        (Some((start, _)), Some((end, _))) => benchmark.slice_between(start, end),
        _ => Series::new(),
    }
}

/// Returns with their timestamps; the first bar contributes a 0 return.
fn timed_returns(series: &Series) -> Vec<(Timestamp, f64)> {
    let mut prev: Option<f64> = None;
    series
        .iter()
        .map(|(t, v)| {
            let r = prev.map_or(0.0, |p| v / p - 1.0);
            prev = Some(v);
            (t, r)
        })
        .collect()
}

/// Inner join on timestamp: (timestamps, strategy returns, benchmark returns).
fn aligned_returns(equity: &Series, bench: &Series) -> (Vec<Timestamp>, Vec<f64>, Vec<f64>) {
    let b: BTreeMap<Timestamp, f64> = timed_returns(bench).into_iter().collect();
    let mut ts = Vec::new();
    let mut eq = Vec::new();
    let mut bm = Vec::new();
    for (t, r) in timed_returns(equity) {
        if let Some(&br) = b.get(&t) {
            if r.is_finite() && br.is_finite() {
                ts.push(t);
                eq.push(r);
                bm.push(br);
            }
        }
    }
    (ts, eq, bm)
}

fn benchmark_stats(equity: &Series, bench: &Series) -> Vec<(&'static str, f64)> {
    let (ts, eq, bm) = aligned_returns(equity, bench);

    let capture = |pick: fn(f64) -> bool| -> f64 {
        let (s, b): (Vec<f64>, Vec<f64>) = eq
            .iter()
            .zip(&bm)
            .filter(|(_, b)| pick(**b))
            .map(|(s, b)| (*s, *b))
            .unzip();
        if s.is_empty() {
            0.0
        } else {
            mean_f64(&s) / (mean_f64(&b) + 1e-12)
        }
    };
    let up = capture(|b| b > 0.0);
    let down = capture(|b| b < 0.0);

    let undefined = |up, down| {
        vec![
            ("Alpha", f64::NAN),
            ("Beta", f64::NAN),
            ("InformationRatio", f64::NAN),
            ("TrackingError", 0.0),
            ("UpCapture", up),
            ("DownCapture", down),
        ]
    };

    let bench_var = population_var(&bm);
    if eq.len() < 2 || !(bench_var.is_finite() && bench_var > 0.0) {
        return undefined(up, down);
    }

    let ppy = periods_per_year(&ts).max(1) as f64;
    let mean_s = mean_f64(&eq);
    let mean_b = mean_f64(&bm);
    let cov = eq
        .iter()
        .zip(&bm)
        .map(|(s, b)| (s - mean_s) * (b - mean_b))
        .sum::<f64>()
        / eq.len() as f64;
    let beta = cov / bench_var;
    let diff: Vec<f64> = eq.iter().zip(&bm).map(|(s, b)| s - b).collect();
    let tracking_error = population_var(&diff).sqrt() * ppy.sqrt();
    let alpha = (mean_s - beta * mean_b) * ppy;
    let info_ratio = if tracking_error > 0.0 && tracking_error.is_finite() {
        (mean_s - mean_b) * ppy / tracking_error
    } else {
        f64::NAN
    };

    vec![
        ("Alpha", alpha),
        ("Beta", beta),
        ("InformationRatio", info_ratio),
        ("TrackingError", if tracking_error > 0.0 { tracking_error } else { 0.0 }),
        ("UpCapture", up),
        ("DownCapture", down),
    ]
}

// ─── Annualisation ───────────────────────────────────────────────────

/// Infer the annualisation factor from timestamp spacing.
///
/// Regular daily or business-daily spacing → 252, weekly → 52, monthly → 12,
/// quarterly → 4, yearly → 1; anything else → round(365 / mean spacing in
/// days). Fewer than two timestamps → 252.
pub fn periods_per_year(timestamps: &[Timestamp]) -> u32 {
    if timestamps.len() < 2 {
        return 252;
    }
    let days: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64 / 86_400.0)
        .collect();
    let all = |lo: f64, hi: f64| days.iter().all(|d| *d >= lo && *d <= hi);

    if all(1.0, 1.0) || is_business_daily(timestamps) {
        return 252;
    }
    if all(7.0, 7.0) {
        return 52;
    }
    if all(28.0, 31.0) {
        return 12;
    }
    if all(89.0, 92.0) {
        return 4;
    }
    if all(365.0, 366.0) {
        return 1;
    }

    let avg = mean_f64(&days);
    if avg > 0.0 {
        (365.0 / avg).round().max(1.0) as u32
    } else {
        252
    }
}

/// Every timestamp is a weekday and each step lands on the next weekday.
fn is_business_daily(timestamps: &[Timestamp]) -> bool {
    let weekend = |t: &Timestamp| matches!(t.weekday(), Weekday::Sat | Weekday::Sun);
    if timestamps.iter().any(weekend) {
        return false;
    }
    timestamps.windows(2).all(|w| {
        let expected = if w[0].weekday() == Weekday::Fri { 3 } else { 1 };
        (w[1] - w[0]).num_seconds() == expected * 86_400
    })
}

// ─── Helpers ─────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). `NaN` below two values.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean_f64(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn population_var(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean_f64(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorlab_core::{Direction, TradeId};
    use chrono::{Duration, TimeZone, Utc};

    fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
        assert!(
            (actual - expected).abs() < epsilon,
            "actual={actual}, expected={expected}"
        );
    }

    fn business_days(n: usize) -> Vec<Timestamp> {
        // 2024-01-01 is a Monday.
        let mut t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            if !matches!(t.weekday(), Weekday::Sat | Weekday::Sun) {
                out.push(t);
            }
            t += Duration::days(1);
        }
        out
    }

    fn series(values: &[f64]) -> Series {
        Series::from_parts(business_days(values.len()), values.to_vec())
    }

    #[test]
    fn periods_per_year_by_spacing() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let every = |days: i64, n: i64| -> Vec<Timestamp> {
            (0..n).map(|i| base + Duration::days(i * days)).collect()
        };
        assert_eq!(periods_per_year(&business_days(60)), 252);
        assert_eq!(periods_per_year(&every(1, 30)), 252);
        assert_eq!(periods_per_year(&every(7, 10)), 52);
        assert_eq!(periods_per_year(&every(2, 10)), 183);
        assert_eq!(periods_per_year(&every(1, 1)), 252);
    }

    #[test]
    fn constant_equity_summary() {
        let s = summarize(&series(&[1000.0; 30]), &[], None);
        assert_eq!(s["TotalReturn"], 0.0);
        assert_eq!(s["CAGR"], 0.0);
        assert_eq!(s["Sharpe_annualized"], 0.0);
        assert_eq!(s["MaxDrawdown"], 0.0);
        assert!(s["Calmar"].is_nan());
        assert!(s["Sortino_annualized"].is_infinite());
        assert_eq!(s["Trades"], 0.0);
        for key in SUMMARY_KEYS {
            assert!(s.contains_key(*key), "missing {key}");
        }
    }

    #[test]
    fn sharpe_uses_sample_std() {
        let returns = [0.01, -0.02, 0.03, 0.0];
        let mean = 0.005;
        let var = ((0.005f64).powi(2) + (0.025f64).powi(2) + (0.025f64).powi(2) + (0.005f64).powi(2)) / 3.0;
        assert_approx(sharpe_ratio(&returns), mean / var.sqrt(), 1e-12);
    }

    #[test]
    fn drawdown_from_running_peak() {
        assert_approx(max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]), -0.25, 1e-12);
    }

    #[test]
    fn cagr_over_one_business_year() {
        let mut values = vec![100.0; 253];
        values[252] = 110.0;
        assert_approx(cagr(&values, 252.0), 0.10, 1e-12);
    }

    #[test]
    fn percentile_interpolates() {
        let v: Vec<f64> = (1..=21).map(|i| i as f64).collect();
        assert_approx(percentile(&v, 5.0), 2.0, 1e-12);
        assert_approx(percentile(&[1.0, 2.0], 50.0), 1.5, 1e-12);
    }

    #[test]
    fn empty_equity_is_undefined() {
        let s = summarize(&Series::new(), &[], None);
        assert!(s["TotalReturn"].is_nan());
        assert!(s["Sharpe_annualized"].is_nan());
        assert_eq!(s["Trades"], 0.0);
    }

    #[test]
    fn open_trades_are_not_counted() {
        let days = business_days(3);
        let closed = Trade {
            id: TradeId(0),
            direction: Direction::Long,
            entry_time: days[0],
            entry_price: 100.0,
            entry_quantity: 1.0,
            quantity: 0.0,
            partial_pnl: 0.0,
            exit_time: Some(days[1]),
            exit_price: Some(104.0),
            pnl: Some(4.0),
            return_pct: Some(0.04),
        };
        let open = Trade {
            id: TradeId(1),
            entry_time: days[2],
            quantity: 1.0,
            exit_time: None,
            exit_price: None,
            pnl: None,
            return_pct: None,
            ..closed.clone()
        };
        let s = summarize(&series(&[100.0, 104.0, 104.0]), &[closed, open], None);
        assert_eq!(s["Trades"], 1.0);
        assert_eq!(s["WinRate"], 1.0);
        assert_eq!(s["AvgTrade"], 4.0);
    }

    #[test]
    fn benchmark_of_itself_has_unit_beta() {
        let eq = series(&[100.0, 101.0, 99.0, 102.0, 103.0, 101.0]);
        let s = summarize(&eq, &[], Some(&eq));
        assert_approx(s["Beta"], 1.0, 1e-9);
        assert_approx(s["Alpha"], 0.0, 1e-9);
        assert_eq!(s["TrackingError"], 0.0);
        assert!(s["InformationRatio"].is_nan());
        for key in BENCHMARK_KEYS {
            assert!(s.contains_key(*key));
        }
    }

    #[test]
    fn closures_are_metrics() {
        let metric = |input: &ScoringInput<'_>| -> Stats {
            let mut s = Stats::new();
            s.insert("Bars".into(), input.equity.len() as f64);
            s
        };
        let eq = series(&[1.0, 2.0]);
        let input = ScoringInput { equity: &eq, fills: &[], trades: &[], benchmark: None };
        assert_eq!(metric.score(&input)["Bars"], 2.0);
    }

    #[test]
    fn benchmark_window_covers_equity_dates_only() {
        let bench = series(&[100.0, 101.0, 103.0, 102.0, 104.0]);
        let days = business_days(5);
        let equity = Series::from_parts(days[2..4].to_vec(), vec![1_000.0, 1_010.0]);

        let window = benchmark_window(&bench, &equity);
        assert_eq!(window.timestamps(), &days[2..4]);
        assert_eq!(window.values(), &[103.0, 102.0]);
        assert!(benchmark_window(&bench, &Series::new()).is_empty());
    }
}
