//! Per-instrument feature build: run the enabled indicators, outer-merge.

use super::merge::{merge_outer, FeatureFrame, FeatureSeries};
use super::FeatureConfig;
use crate::domain::Bar;
use crate::indicators;

/// Build the feature table for one instrument.
///
/// Bars are sorted ascending before any indicator runs — indicators assume
/// monotonic time order.
pub fn build_features(symbol: &str, bars: &[Bar], config: &FeatureConfig) -> FeatureFrame {
    let mut bars: Vec<&Bar> = bars.iter().collect();
    bars.sort_by_key(|b| b.ts);

    let axis: Vec<_> = bars.iter().map(|b| b.ts).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let mut series: Vec<FeatureSeries> = Vec::new();
    let mut push = |name: String, values: Vec<f64>| {
        series.push(FeatureSeries::from_dense(name, &axis, &values));
    };

    if config.returns {
        push("return".into(), indicators::simple_returns(&close));
    }
    if config.log_returns {
        push("log_return".into(), indicators::log_returns(&close));
    }
    for &w in &config.ma_windows {
        push(format!("ma_{w}"), indicators::rolling_mean(&close, w));
    }
    for &w in &config.bb_windows {
        let (upper, lower) = indicators::bollinger(&close, w);
        push(format!("bb_upper_{w}"), upper);
        push(format!("bb_lower_{w}"), lower);
    }
    for &w in &config.rsi_windows {
        push(format!("rsi_{w}"), indicators::rsi(&close, w));
    }
    for &(fast, slow, signal) in &config.macd_params {
        let (line, signal_line) = indicators::macd(&close, fast, slow, signal);
        push(format!("macd_{fast}_{slow}_{signal}"), line);
        push(format!("macd_signal_{fast}_{slow}_{signal}"), signal_line);
    }
    for &w in &config.vol_windows {
        push(format!("vol_{w}"), indicators::volatility(&close, w));
    }
    for &w in &config.atr_windows {
        push(format!("atr_{w}"), indicators::atr(&high, &low, &close, w));
    }

    merge_outer(symbol, series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64) * 0.5 + if i % 2 == 0 { 1.0 } else { -1.0 };
                Bar {
                    ts: NaiveDate::from_ymd_opt(2024, 1, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap()
                        + chrono::Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0,
                    adj_close: Some(close),
                }
            })
            .collect()
    }

    #[test]
    fn frame_covers_every_bar_despite_warm_ups() {
        let bars = bars(60);
        let frame = build_features("SPY", &bars, &FeatureConfig::default());
        // Outer join: even ma_50's 49-row warm-up doesn't shrink the axis.
        assert_eq!(frame.height(), 60);
        let ma50 = frame.column("ma_50").unwrap();
        assert!(ma50[..49].iter().all(|v| v.is_none()));
        assert!(ma50[49].is_some());
    }

    #[test]
    fn disabled_indicators_are_absent() {
        let config = FeatureConfig {
            returns: false,
            ma_windows: vec![],
            ..FeatureConfig::default()
        };
        let frame = build_features("SPY", &bars(30), &config);
        assert!(frame.column("return").is_none());
        assert!(frame.column("ma_5").is_none());
        assert!(frame.column("log_return").is_some());
    }

    #[test]
    fn unsorted_bars_are_sorted_before_indicators() {
        let mut shuffled = bars(10);
        shuffled.swap(0, 9);
        shuffled.swap(2, 5);
        let frame = build_features("SPY", &shuffled, &FeatureConfig::default());
        for w in frame.dates.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn column_names_encode_parameters() {
        let frame = build_features("SPY", &bars(40), &FeatureConfig::default());
        for name in [
            "return",
            "log_return",
            "ma_5",
            "ma_20",
            "bb_upper_20",
            "bb_lower_20",
            "rsi_14",
            "macd_12_26_9",
            "macd_signal_12_26_9",
            "vol_10",
            "atr_14",
        ] {
            assert!(frame.column(name).is_some(), "missing column {name}");
        }
    }
}
