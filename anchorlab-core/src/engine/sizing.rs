//! Per-bar position sizing and signal interpretation.

use super::config::EngineConfig;

/// Units per unit of signal for the current bar.
///
/// Priority: notional target, then ATR risk sizing (only when it yields at
/// least one unit), then the fixed size.
pub fn resolve_base_size(
    config: &EngineConfig,
    price: f64,
    equity: f64,
    risk_fraction: f64,
    atr: Option<f64>,
) -> f64 {
    if let Some(notional) = config.notional {
        if price > 0.0 {
            return (notional / price).floor().max(0.0);
        }
    }

    if let (Some(multiplier), Some(atr)) = (config.risk_multiplier, atr) {
        let risk_distance = atr * multiplier;
        if risk_distance > 0.0 {
            let units = (equity * risk_fraction / risk_distance).floor();
            if units > 0.0 {
                return units;
            }
        }
    }

    config.size as f64
}

/// Round a raw signal to whole units (ties to even). `None` if non-finite.
pub fn signal_units(signal: f64) -> Option<f64> {
    signal.is_finite().then(|| signal.round_ties_even())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_size_by_default() {
        let config = EngineConfig::default();
        assert_eq!(resolve_base_size(&config, 100.0, 1e5, 0.01, Some(2.0)), 1.0);
    }

    #[test]
    fn notional_takes_priority() {
        let config = EngineConfig {
            notional: Some(1_050.0),
            risk_multiplier: Some(2.0),
            ..EngineConfig::default()
        };
        assert_eq!(resolve_base_size(&config, 100.0, 1e5, 0.01, Some(2.0)), 10.0);
    }

    #[test]
    fn risk_sizing_uses_atr_distance() {
        let config = EngineConfig {
            risk_multiplier: Some(2.0),
            size: 3,
            ..EngineConfig::default()
        };
        // 100_000 * 0.01 / (2.5 * 2) = 200
        assert_eq!(resolve_base_size(&config, 50.0, 100_000.0, 0.01, Some(2.5)), 200.0);
        // No ATR → fixed size.
        assert_eq!(resolve_base_size(&config, 50.0, 100_000.0, 0.01, None), 3.0);
        // Less than one unit of risk budget → fixed size.
        assert_eq!(resolve_base_size(&config, 50.0, 10.0, 0.01, Some(2.5)), 3.0);
    }

    #[test]
    fn signals_round_half_to_even() {
        assert_eq!(signal_units(0.5), Some(0.0));
        assert_eq!(signal_units(1.5), Some(2.0));
        assert_eq!(signal_units(-0.6), Some(-1.0));
        assert_eq!(signal_units(f64::NAN), None);
        assert_eq!(signal_units(f64::INFINITY), None);
    }
}
