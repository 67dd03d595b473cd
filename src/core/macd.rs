//! Dual-EMA momentum oscillator over closing prices.
//!
//! Each EMA is seeded with the simple average of its first `period` inputs
//! and every value is rounded to price scale. DEA is the signal-period EMA
//! of DIF, seeded the same way once enough DIF values exist. The histogram
//! is `(DIF - DEA) * 2`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MacdParams;
use crate::core::precision::round_price;
use crate::models::Candle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub dif: Option<Decimal>,
    pub dea: Option<Decimal>,
    pub histogram: Option<Decimal>,
}

impl MacdPoint {
    pub fn is_positive(&self) -> bool {
        self.histogram.is_some_and(|h| h > Decimal::ZERO)
    }

    pub fn is_negative(&self) -> bool {
        self.histogram.is_some_and(|h| h < Decimal::ZERO)
    }
}

/// DIF crosses above DEA between `prev` and `cur`. A touch on `prev` does not count.
pub fn is_golden_cross(prev: &MacdPoint, cur: &MacdPoint) -> bool {
    match (prev.dif, prev.dea, cur.dif, cur.dea) {
        (Some(pd), Some(pe), Some(cd), Some(ce)) => pd < pe && cd > ce,
        _ => false,
    }
}

/// DIF crosses below DEA between `prev` and `cur`. A touch on `prev` does not count.
pub fn is_death_cross(prev: &MacdPoint, cur: &MacdPoint) -> bool {
    match (prev.dif, prev.dea, cur.dif, cur.dea) {
        (Some(pd), Some(pe), Some(cd), Some(ce)) => pd > pe && cd < ce,
        _ => false,
    }
}

/// Sum of absolute histogram values with timestamps in `[start, end]`.
pub fn area(points: &[MacdPoint], start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    points
        .iter()
        .filter(|p| p.timestamp >= start && p.timestamp <= end)
        .filter_map(|p| p.histogram)
        .map(|h| h.abs())
        .sum()
}

/// Exponential moving average aligned with `values`; `None` until seeded.
pub fn ema(values: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = dec!(2) / Decimal::from(period as u64 + 1);
    let one_minus_k = Decimal::ONE - k;

    let seed = values[..period].iter().copied().sum::<Decimal>() / Decimal::from(period as u64);
    let mut prev = round_price(seed);
    out[period - 1] = Some(prev);

    for (i, &value) in values.iter().enumerate().skip(period) {
        prev = round_price(value * k + prev * one_minus_k);
        out[i] = Some(prev);
    }
    out
}

pub struct MacdCalculator {
    pub params: MacdParams,
}

impl Default for MacdCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl MacdCalculator {
    pub fn new() -> Self {
        Self::with_params(MacdParams::default())
    }

    pub fn with_params(params: MacdParams) -> Self {
        Self { params }
    }

    pub fn calculate(&self, candles: &[Candle]) -> Vec<MacdPoint> {
        let MacdParams { fast, slow, signal } = self.params;
        if candles.len() < slow || fast == 0 || signal == 0 {
            return Vec::new();
        }

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let fast_ema = ema(&closes, fast);
        let slow_ema = ema(&closes, slow);

        let dif: Vec<Option<Decimal>> = fast_ema
            .iter()
            .zip(&slow_ema)
            .enumerate()
            .map(|(i, (f, s))| match (f, s) {
                (Some(f), Some(s)) if i + 1 >= slow => Some(f - s),
                _ => None,
            })
            .collect();

        let dea = self.signal_line(&dif);

        let points: Vec<MacdPoint> = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| {
                let histogram = match (dif[i], dea[i]) {
                    (Some(d), Some(e)) => Some((d - e) * dec!(2)),
                    _ => None,
                };
                MacdPoint {
                    timestamp: candle.timestamp,
                    dif: dif[i],
                    dea: dea[i],
                    histogram,
                }
            })
            .collect();

        debug!(
            "computed MACD({},{},{}) over {} candles",
            fast,
            slow,
            signal,
            candles.len()
        );
        points
    }

    /// EMA of the defined DIF values, positioned back onto the full series.
    fn signal_line(&self, dif: &[Option<Decimal>]) -> Vec<Option<Decimal>> {
        let mut out = vec![None; dif.len()];
        let Some(first) = dif.iter().position(Option::is_some) else {
            return out;
        };
        let defined: Vec<Decimal> = dif[first..].iter().map(|d| d.unwrap_or_default()).collect();
        for (offset, value) in ema(&defined, self.params.signal).into_iter().enumerate() {
            out[first + offset] = value;
        }
        out
    }
}
