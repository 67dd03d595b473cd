use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::models::{Candle, Confidence, PointType};
use crate::strategies::chan_engine::{ChanEngine, ChanResult};
use crate::strategies::trading_points::TradingPoint;

/// Which trading points a strategy is willing to act on.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFilter {
    pub point_type: Option<PointType>,
    pub level: Option<u8>,
    pub min_confidence: Confidence,
    /// Points older than this relative to the evaluated bar are ignored.
    pub max_age: Option<Duration>,
}

impl Default for PointFilter {
    fn default() -> Self {
        Self {
            point_type: None,
            level: None,
            min_confidence: Confidence::Low,
            max_age: None,
        }
    }
}

impl PointFilter {
    pub fn buys() -> Self {
        Self {
            point_type: Some(PointType::Buy),
            ..Self::default()
        }
    }

    pub fn sells() -> Self {
        Self {
            point_type: Some(PointType::Sell),
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_min_confidence(mut self, confidence: Confidence) -> Self {
        self.min_confidence = confidence;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn matches(&self, point: &TradingPoint, now: DateTime<Utc>) -> bool {
        if self.point_type.is_some_and(|t| t != point.point_type) {
            return false;
        }
        if self.level.is_some_and(|l| l != point.level) {
            return false;
        }
        if point.confidence < self.min_confidence {
            return false;
        }
        if point.timestamp > now {
            return false;
        }
        match self.max_age {
            Some(age) => now - point.timestamp <= age,
            None => true,
        }
    }
}

/// Price levels a position manager can hang stops and targets on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anchors {
    pub stroke_low: Option<Decimal>,
    pub stroke_high: Option<Decimal>,
    pub pivot_low: Option<Decimal>,
    pub pivot_high: Option<Decimal>,
}

impl Anchors {
    pub fn from_result(result: &ChanResult) -> Self {
        let stroke = result.strokes.last();
        let pivot = result.pivots.iter().max_by_key(|p| p.end_time);
        Self {
            stroke_low: stroke.map(|s| s.low()),
            stroke_high: stroke.map(|s| s.high()),
            pivot_low: pivot.map(|p| p.low),
            pivot_high: pivot.map(|p| p.high),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    /// Bar whose window first produced the point.
    pub bar_index: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub bar_time: DateTime<Utc>,
    pub point: TradingPoint,
    pub anchors: Anchors,
}

/// Re-runs the full pipeline over a trailing window for each evaluated bar.
pub struct SignalGenerator {
    engine: ChanEngine,
    pub window_size: usize,
    pub filter: PointFilter,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl SignalGenerator {
    pub fn new(cfg: &AnalysisConfig) -> Self {
        Self {
            engine: ChanEngine::new(cfg),
            window_size: cfg.window_size,
            filter: PointFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: PointFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The candles ending at bar `index`, at most `window_size` of them.
    pub fn window<'a>(&self, candles: &'a [Candle], index: usize) -> &'a [Candle] {
        if index >= candles.len() {
            return &[];
        }
        let start = (index + 1).saturating_sub(self.window_size);
        &candles[start..=index]
    }

    pub fn analyze_at(&self, candles: &[Candle], index: usize) -> ChanResult {
        self.engine.calculate_full(self.window(candles, index))
    }

    /// Latest matching trading point as seen from bar `index`.
    pub fn latest(&self, candles: &[Candle], index: usize) -> Option<TradingPoint> {
        let now = candles.get(index)?.timestamp;
        let result = self.analyze_at(candles, index);
        self.pick(&result, now).cloned()
    }

    /// One event per bar whose latest matching point differs from the previous one.
    pub fn replay(&self, candles: &[Candle]) -> Vec<SignalEvent> {
        let mut events: Vec<SignalEvent> = Vec::new();

        for (index, candle) in candles.iter().enumerate() {
            let result = self.analyze_at(candles, index);
            let Some(point) = self.pick(&result, candle.timestamp) else {
                continue;
            };
            if events.last().is_some_and(|e| same_point(&e.point, point)) {
                continue;
            }
            debug!("bar {}: new {}", index, point.description());
            events.push(SignalEvent {
                bar_index: index,
                bar_time: candle.timestamp,
                point: point.clone(),
                anchors: Anchors::from_result(&result),
            });
        }

        events
    }

    fn pick<'r>(&self, result: &'r ChanResult, now: DateTime<Utc>) -> Option<&'r TradingPoint> {
        result
            .trading_points
            .iter()
            .rev()
            .find(|p| self.filter.matches(p, now))
    }
}

fn same_point(a: &TradingPoint, b: &TradingPoint) -> bool {
    a.timestamp == b.timestamp && a.point_type == b.point_type && a.level == b.level && a.price == b.price
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{base_time, make_candles};
    use rust_decimal_macros::dec;

    fn point(point_type: PointType, level: u8, confidence: Confidence, minutes: i64) -> TradingPoint {
        TradingPoint {
            point_type,
            level,
            price: dec!(100),
            timestamp: base_time() + Duration::minutes(minutes),
            confidence,
            reason: "test".to_string(),
            divergence: None,
            stroke: None,
            segment: None,
            pivot: None,
        }
    }

    #[test]
    fn filter_matches_direction_level_and_confidence() {
        let now = base_time() + Duration::minutes(10);
        let buy = point(PointType::Buy, 2, Confidence::Medium, 5);

        assert!(PointFilter::default().matches(&buy, now));
        assert!(PointFilter::buys().matches(&buy, now));
        assert!(!PointFilter::sells().matches(&buy, now));
        assert!(PointFilter::buys().with_level(2).matches(&buy, now));
        assert!(!PointFilter::buys().with_level(1).matches(&buy, now));
        assert!(!PointFilter::default()
            .with_min_confidence(Confidence::High)
            .matches(&buy, now));
        assert!(PointFilter::default()
            .with_min_confidence(Confidence::Medium)
            .matches(&buy, now));
    }

    #[test]
    fn filter_respects_age_and_future_points() {
        let now = base_time() + Duration::minutes(10);
        let recent = point(PointType::Sell, 3, Confidence::Low, 6);
        let stale = point(PointType::Sell, 3, Confidence::Low, 0);
        let future = point(PointType::Sell, 3, Confidence::Low, 11);
        let filter = PointFilter::default().with_max_age(Duration::minutes(5));
        assert!(filter.matches(&recent, now));
        assert!(!filter.matches(&stale, now));
        assert!(!filter.matches(&future, now));
    }

    #[test]
    fn window_is_trailing_and_bounded() {
        let data: Vec<(f64, f64, f64, f64)> = (0..10).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        let candles = make_candles(&data);
        let cfg = AnalysisConfig {
            window_size: 4,
            ..AnalysisConfig::default()
        };
        let generator = SignalGenerator::new(&cfg);
        assert_eq!(generator.window(candles.as_slice(), 2).len(), 3);
        let w = generator.window(candles.as_slice(), 9);
        assert_eq!(w.len(), 4);
        assert_eq!(w[0].timestamp, candles[6].timestamp);
        assert!(generator.window(candles.as_slice(), 10).is_empty());
    }

    #[test]
    fn flat_market_has_no_signal() {
        let data: Vec<(f64, f64, f64, f64)> = (0..40).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        let candles = make_candles(&data);
        let generator = SignalGenerator::default();
        assert!(generator.latest(candles.as_slice(), 39).is_none());
        assert!(generator.latest(candles.as_slice(), 99).is_none());
        assert!(generator.replay(candles.as_slice()).is_empty());
    }

    #[test]
    fn anchors_from_empty_result() {
        assert_eq!(Anchors::from_result(&ChanResult::default()), Anchors::default());
    }
}
