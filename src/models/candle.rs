use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::models::Timeframe;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub interval: Timeframe,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

impl Candle {
    pub fn total_range(&self) -> Decimal {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Ordered candles of one symbol and interval.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn tail(&self, n: usize) -> CandleSeries {
        let start = self.candles.len().saturating_sub(n);
        CandleSeries::new(self.candles[start..].to_vec())
    }

    pub fn slice(&self, start: usize, end: usize) -> CandleSeries {
        let s = start.min(self.candles.len());
        let e = end.min(self.candles.len()).max(s);
        CandleSeries::new(self.candles[s..e].to_vec())
    }

    /// The trailing `size` candles ending at `index` inclusive.
    pub fn window_ending(&self, index: usize, size: usize) -> &[Candle] {
        if self.candles.is_empty() {
            return &[];
        }
        let end = (index + 1).min(self.candles.len());
        let start = end.saturating_sub(size);
        &self.candles[start..end]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }

    /// Checks strictly increasing timestamps and well-formed ranges.
    pub fn validate(&self) -> Result<(), DataError> {
        for (i, candle) in self.candles.iter().enumerate() {
            if candle.high < candle.low {
                return Err(DataError::InvertedRange { index: i });
            }
            if i > 0 && candle.timestamp <= self.candles[i - 1].timestamp {
                return Err(DataError::OutOfOrder {
                    index: i,
                    timestamp: candle.timestamp,
                });
            }
        }
        Ok(())
    }

    /// Sorts by time and drops repeated timestamps, keeping the first.
    pub fn normalize(&mut self) {
        self.candles.sort_by_key(|c| c.timestamp);
        self.candles.dedup_by_key(|c| c.timestamp);
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::new(candles)
    }
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;
    use rust_decimal_macros::dec;

    #[test]
    fn candle_range_and_bias() {
        let s = make_candles(&[(100.0, 115.0, 95.0, 110.0)]);
        assert_eq!(s[0].total_range(), dec!(20));
        assert!(s[0].is_bullish());
        assert!(!s[0].is_bearish());
    }

    #[test]
    fn window_ending_clamps_to_start() {
        let data: Vec<(f64, f64, f64, f64)> = (0..10)
            .map(|i| {
                let v = 100.0 + i as f64;
                (v, v + 2.0, v - 1.0, v + 1.0)
            })
            .collect();
        let s = make_candles(&data);
        assert_eq!(s.window_ending(3, 500).len(), 4);
        let w = s.window_ending(9, 4);
        assert_eq!(w.len(), 4);
        assert_eq!(w[0].open, dec!(106));
        assert!(CandleSeries::default().window_ending(0, 5).is_empty());
    }

    #[test]
    fn validate_rejects_out_of_order() {
        let mut s = make_candles(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
        ]);
        assert!(s.validate().is_ok());
        let first = s[0].clone();
        s.push(first);
        assert!(
            matches!(s.validate(), Err(DataError::OutOfOrder { index: 2, .. })),
            "Expected out-of-order error, got {:?}",
            s.validate()
        );
        s.normalize();
        assert_eq!(s.len(), 2);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn serializes_timestamp_as_millis() {
        let s = make_candles(&[(100.0, 105.0, 95.0, 102.0)]);
        let json = serde_json::to_value(&s[0]).unwrap();
        assert_eq!(json["timestamp"], serde_json::json!(s[0].timestamp_millis()));
        let back: Candle = serde_json::from_value(json).unwrap();
        assert_eq!(back, s[0]);
    }
}
