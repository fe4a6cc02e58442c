//! Property tests for numeric and storage invariants.
//!
//! Uses proptest to verify:
//! 1. RSI stays inside [0, 100] wherever it is defined
//! 2. Rolling statistics produce exactly `window - 1` warm-up rows
//! 3. Cleaning yields a sorted, deduplicated series
//! 4. Store upsert is idempotent and last-write-wins

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tickerlab_core::data::{clean_bars, BarStore};
use tickerlab_core::domain::{Bar, Interval};
use tickerlab_core::indicators::{rolling_mean, rolling_std, rsi};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_store() -> (BarStore, PathBuf) {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir =
        std::env::temp_dir().join(format!("tickerlab_prop_test_{}_{id}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    (BarStore::new(&dir), dir)
}

fn day(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        + chrono::Duration::days(i as i64)
}

fn bar(i: usize, close: f64) -> Bar {
    Bar {
        ts: day(i),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000.0,
        adj_close: None,
    }
}

fn arb_prices() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(10.0..500.0_f64, 20..120)
}

proptest! {
    /// RSI is a bounded oscillator: every defined value lies in [0, 100].
    #[test]
    fn rsi_stays_in_bounds(prices in arb_prices()) {
        for v in rsi(&prices, 14) {
            if !v.is_nan() {
                prop_assert!((0.0..=100.0).contains(&v), "rsi out of bounds: {v}");
            }
        }
    }

    /// Rolling statistics need a full window: exactly window-1 leading NaNs
    /// on an all-finite input, finite values everywhere after.
    #[test]
    fn rolling_warm_up_is_exactly_window_minus_one(
        prices in arb_prices(),
        window in 2usize..15,
    ) {
        prop_assume!(prices.len() >= window);
        for out in [rolling_mean(&prices, window), rolling_std(&prices, window)] {
            prop_assert_eq!(out.len(), prices.len());
            for (i, v) in out.iter().enumerate() {
                if i < window - 1 {
                    prop_assert!(v.is_nan());
                } else {
                    prop_assert!(v.is_finite(), "non-finite at {i}: {v}");
                }
            }
        }
    }

    /// Cleaning always yields strictly ascending, deduplicated timestamps,
    /// whatever the input order and duplication.
    #[test]
    fn cleaned_bars_are_sorted_and_unique(
        closes in prop::collection::vec(10.0..500.0_f64, 1..60),
        dup_from in any::<prop::sample::Index>(),
    ) {
        let mut bars: Vec<Bar> = closes.iter().enumerate().map(|(i, c)| bar(i, *c)).collect();
        // Inject a duplicate timestamp and scramble the order.
        let dup = bars[dup_from.index(bars.len())].clone();
        bars.push(dup);
        bars.reverse();

        let cleaned = clean_bars(bars, false);
        prop_assert_eq!(cleaned.len(), closes.len());
        for w in cleaned.windows(2) {
            prop_assert!(w[0].ts < w[1].ts);
        }
    }

}

proptest! {
    // Fewer cases here: every case does real Parquet I/O.
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Upserting the same frame twice changes nothing; upserting changed
    /// closes for the same timestamps replaces them (last write wins).
    #[test]
    fn upsert_is_idempotent_and_last_write_wins(
        closes in prop::collection::vec(10.0..500.0_f64, 5..40),
    ) {
        let (store, dir) = temp_store();
        let bars: Vec<Bar> = closes.iter().enumerate().map(|(i, c)| bar(i, *c)).collect();

        store.upsert("SPY", Interval::Daily, &bars).unwrap();
        store.upsert("SPY", Interval::Daily, &bars).unwrap();
        let first = store.read_range("SPY", Interval::Daily, None, None).unwrap();
        prop_assert_eq!(first.len(), bars.len());

        let revised: Vec<Bar> = bars.iter().map(|b| Bar { close: b.close + 1.0, ..b.clone() }).collect();
        store.upsert("SPY", Interval::Daily, &revised).unwrap();
        let second = store.read_range("SPY", Interval::Daily, None, None).unwrap();
        prop_assert_eq!(second.len(), bars.len());
        for (orig, got) in bars.iter().zip(&second) {
            prop_assert_eq!(got.close, orig.close + 1.0);
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
