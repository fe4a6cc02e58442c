//! Post-fetch normalization.
//!
//! Provider output is sorted ascending, deduplicated by timestamp (the later
//! occurrence wins), and optionally gap-filled: interior NaNs are linearly
//! interpolated in time, trailing NaNs hold the last observed value, and
//! leading NaNs are back-filled from the first observed value.

use crate::domain::Bar;

/// Clean a freshly fetched bar series.
pub fn clean_bars(mut bars: Vec<Bar>, fill_missing: bool) -> Vec<Bar> {
    bars.sort_by_key(|b| b.ts);

    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.ts == bar.ts => *last = bar,
            _ => out.push(bar),
        }
    }

    if fill_missing {
        fill_gaps(&mut out);
    }
    out
}

fn fill_gaps(bars: &mut [Bar]) {
    if bars.is_empty() {
        return;
    }
    let ts: Vec<f64> = bars
        .iter()
        .map(|b| b.ts.and_utc().timestamp_millis() as f64)
        .collect();

    let mut column = |get: fn(&Bar) -> f64, set: fn(&mut Bar, f64)| {
        let mut vals: Vec<f64> = bars.iter().map(get).collect();
        interpolate_in_time(&ts, &mut vals);
        for (bar, v) in bars.iter_mut().zip(vals) {
            set(bar, v);
        }
    };

    column(|b| b.open, |b, v| b.open = v);
    column(|b| b.high, |b, v| b.high = v);
    column(|b| b.low, |b, v| b.low = v);
    column(|b| b.close, |b, v| b.close = v);
    column(|b| b.volume, |b, v| b.volume = v);

    // adj_close only when the series carries it at all
    if bars.iter().any(|b| b.adj_close.is_some()) {
        let mut vals: Vec<f64> = bars
            .iter()
            .map(|b| b.adj_close.unwrap_or(f64::NAN))
            .collect();
        interpolate_in_time(&ts, &mut vals);
        for (bar, v) in bars.iter_mut().zip(vals) {
            bar.adj_close = if v.is_nan() { None } else { Some(v) };
        }
    }
}

/// Time-weighted linear interpolation of interior NaN runs, forward-fill of
/// trailing NaNs, back-fill of leading NaNs. All-NaN input is left as is.
fn interpolate_in_time(ts: &[f64], vals: &mut [f64]) {
    let n = vals.len();
    let Some(first_valid) = vals.iter().position(|v| !v.is_nan()) else {
        return;
    };
    let last_valid = n - 1 - vals.iter().rev().position(|v| !v.is_nan()).unwrap();

    // Leading: back-fill
    let first_val = vals[first_valid];
    for v in vals.iter_mut().take(first_valid) {
        *v = first_val;
    }
    // Trailing: hold last
    let last_val = vals[last_valid];
    for v in vals.iter_mut().skip(last_valid + 1) {
        *v = last_val;
    }

    // Interior runs: linear in timestamp space
    let mut prev_valid = first_valid;
    for i in (first_valid + 1)..=last_valid {
        if vals[i].is_nan() {
            continue;
        }
        if i > prev_valid + 1 {
            let (t0, v0) = (ts[prev_valid], vals[prev_valid]);
            let (t1, v1) = (ts[i], vals[i]);
            let span = t1 - t0;
            for j in (prev_valid + 1)..i {
                let w = if span == 0.0 { 0.0 } else { (ts[j] - t0) / span };
                vals[j] = v0 + w * (v1 - v0);
            }
        }
        prev_valid = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(d: u32, close: f64) -> Bar {
        Bar {
            ts: NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
            adj_close: None,
        }
    }

    #[test]
    fn sorts_and_dedupes_keep_last() {
        let mut dup = bar(2, 50.0);
        dup.volume = 1.0;
        let cleaned = clean_bars(vec![bar(3, 103.0), bar(2, 102.0), dup.clone()], false);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0], dup);
        assert_eq!(cleaned[1].close, 103.0);
    }

    #[test]
    fn interpolates_interior_gap_linearly() {
        let mut middle = bar(3, f64::NAN);
        middle.open = f64::NAN;
        middle.high = f64::NAN;
        middle.low = f64::NAN;
        middle.volume = f64::NAN;
        // Days 2 and 4 are two days apart, so day 3 lands halfway.
        let cleaned = clean_bars(vec![bar(2, 100.0), middle, bar(4, 104.0)], true);
        assert_eq!(cleaned[1].close, 102.0);
        assert_eq!(cleaned[1].volume, 100.0);
    }

    #[test]
    fn backfills_leading_and_holds_trailing() {
        let mut first = bar(2, f64::NAN);
        first.open = f64::NAN;
        first.high = f64::NAN;
        first.low = f64::NAN;
        first.volume = f64::NAN;
        let mut last = first.clone();
        last.ts = bar(5, 0.0).ts;
        let cleaned = clean_bars(vec![first, bar(3, 100.0), bar(4, 101.0), last], true);
        assert_eq!(cleaned[0].close, 100.0);
        assert_eq!(cleaned[3].close, 101.0);
    }

    #[test]
    fn fill_disabled_leaves_nans() {
        let mut middle = bar(3, f64::NAN);
        middle.open = f64::NAN;
        let cleaned = clean_bars(vec![bar(2, 100.0), middle, bar(4, 104.0)], false);
        assert!(cleaned[1].close.is_nan());
    }
}
