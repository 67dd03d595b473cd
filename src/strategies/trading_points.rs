use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::core::divergence::{Divergence, DivergenceDetector};
use crate::core::macd::{MacdCalculator, MacdPoint};
use crate::core::pivot::Pivot;
use crate::core::segment::Segment;
use crate::core::stroke::Stroke;
use crate::models::{Candle, Confidence, DivergenceType, Direction, PointType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPoint {
    pub point_type: PointType,
    /// 1 (divergence), 2 (confirmation) or 3 (pivot edge).
    pub level: u8,
    pub price: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub confidence: Confidence,
    pub reason: String,
    pub divergence: Option<Divergence>,
    /// Indices into the stroke, segment and pivot sequences of the same run.
    pub stroke: Option<usize>,
    pub segment: Option<usize>,
    pub pivot: Option<usize>,
}

impl TradingPoint {
    pub fn is_buy(&self) -> bool {
        self.point_type == PointType::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.point_type == PointType::Sell
    }

    pub fn is_strong_signal(&self) -> bool {
        self.level == 1 && self.confidence == Confidence::High
    }

    pub fn is_medium_signal(&self) -> bool {
        self.level == 2 || (self.level == 1 && self.confidence == Confidence::Medium)
    }

    /// Short label such as "Tier-1 BUY".
    pub fn label(&self) -> String {
        format!("Tier-{} {}", self.level, self.point_type)
    }

    pub fn description(&self) -> String {
        format!(
            "{} @ {} ({}): {}",
            self.label(),
            self.price,
            self.confidence,
            self.reason
        )
    }
}

pub struct TradingPointClassifier {
    pub confirm_lookahead: usize,
    pub pivot_edge_ratio: Decimal,
    pub pivot_grace: Duration,
    macd: MacdCalculator,
    divergence_detector: DivergenceDetector,
}

impl Default for TradingPointClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingPointClassifier {
    pub fn new() -> Self {
        Self::with_config(&AnalysisConfig::default())
    }

    pub fn with_config(cfg: &AnalysisConfig) -> Self {
        Self {
            confirm_lookahead: cfg.confirm_lookahead,
            pivot_edge_ratio: cfg.pivot_edge_ratio,
            pivot_grace: Duration::days(1),
            macd: MacdCalculator::with_params(cfg.macd),
            divergence_detector: DivergenceDetector::new(),
        }
    }

    /// Classifies trading points, computing the oscillator from `candles`.
    pub fn identify(
        &self,
        strokes: &[Stroke],
        segments: &[Segment],
        pivots: &[Pivot],
        candles: &[Candle],
    ) -> Vec<TradingPoint> {
        let macd = self.macd.calculate(candles);
        self.identify_with_macd(strokes, segments, pivots, candles, &macd)
    }

    /// Same as [`identify`](Self::identify) with a precomputed oscillator.
    pub fn identify_with_macd(
        &self,
        strokes: &[Stroke],
        segments: &[Segment],
        pivots: &[Pivot],
        candles: &[Candle],
        macd: &[MacdPoint],
    ) -> Vec<TradingPoint> {
        if strokes.is_empty() || candles.is_empty() {
            return Vec::new();
        }

        let first = self.divergence_points(segments, macd, candles);
        let second = self.confirmation_points(&first, strokes);
        let third = self.pivot_edge_points(pivots, strokes);

        debug!(
            "classified trading points: {} tier-1, {} tier-2, {} tier-3",
            first.len(),
            second.len(),
            third.len()
        );

        let mut points = first;
        points.extend(second);
        points.extend(third);
        points.sort_by_key(|p| p.timestamp);
        points
    }

    fn divergence_points(
        &self,
        segments: &[Segment],
        macd: &[MacdPoint],
        candles: &[Candle],
    ) -> Vec<TradingPoint> {
        if segments.len() < 2 {
            return Vec::new();
        }

        self.divergence_detector
            .detect_all(segments, macd, candles)
            .into_iter()
            .map(|div| {
                let (point_type, reason) = match div.divergence_type {
                    DivergenceType::Bearish => (PointType::Sell, "top divergence, MACD area shrinking"),
                    DivergenceType::Bullish => (PointType::Buy, "bottom divergence, MACD area shrinking"),
                };
                TradingPoint {
                    point_type,
                    level: 1,
                    price: div.price,
                    timestamp: div.timestamp,
                    confidence: Confidence::from(div.strength),
                    reason: reason.to_string(),
                    segment: Some(div.second_segment),
                    divergence: Some(div),
                    stroke: None,
                    pivot: None,
                }
            })
            .collect()
    }

    /// The second stroke after a tier-1 point pulls back without a new extreme.
    fn confirmation_points(&self, tier_one: &[TradingPoint], strokes: &[Stroke]) -> Vec<TradingPoint> {
        if strokes.len() < 3 {
            return Vec::new();
        }

        tier_one
            .iter()
            .filter_map(|point| {
                let following: Vec<&Stroke> = strokes
                    .iter()
                    .filter(|s| s.start_time >= point.timestamp)
                    .take(self.confirm_lookahead)
                    .collect();
                let pullback = *following.get(1)?;

                let reason = match point.point_type {
                    PointType::Buy
                        if pullback.direction == Direction::Down && pullback.end_price > point.price =>
                    {
                        "pullback after tier-1 buy holds above its low"
                    }
                    PointType::Sell
                        if pullback.direction == Direction::Up && pullback.end_price < point.price =>
                    {
                        "rebound after tier-1 sell stays below its high"
                    }
                    _ => return None,
                };

                Some(TradingPoint {
                    point_type: point.point_type,
                    level: 2,
                    price: pullback.end_price,
                    timestamp: pullback.end_time,
                    confidence: Confidence::Medium,
                    reason: reason.to_string(),
                    divergence: None,
                    stroke: Some(pullback.index),
                    segment: None,
                    pivot: None,
                })
            })
            .collect()
    }

    /// Strokes ending close to a pivot edge without crossing it.
    fn pivot_edge_points(&self, pivots: &[Pivot], strokes: &[Stroke]) -> Vec<TradingPoint> {
        let mut points = Vec::new();

        for (pivot_index, pivot) in pivots.iter().enumerate() {
            let tolerance = pivot.height() * self.pivot_edge_ratio;
            let window_end = pivot.end_time + self.pivot_grace;

            for stroke in strokes {
                if stroke.start_time < pivot.start_time || stroke.end_time > window_end {
                    continue;
                }

                let signal = match stroke.direction {
                    Direction::Down
                        if (stroke.end_price - pivot.low).abs() <= tolerance
                            && stroke.end_price >= pivot.low =>
                    {
                        Some((PointType::Buy, "holding near the pivot low"))
                    }
                    Direction::Up
                        if (pivot.high - stroke.end_price).abs() <= tolerance
                            && stroke.end_price <= pivot.high =>
                    {
                        Some((PointType::Sell, "capped near the pivot high"))
                    }
                    _ => None,
                };

                if let Some((point_type, reason)) = signal {
                    points.push(TradingPoint {
                        point_type,
                        level: 3,
                        price: stroke.end_price,
                        timestamp: stroke.end_time,
                        confidence: Confidence::Low,
                        reason: reason.to_string(),
                        divergence: None,
                        stroke: Some(stroke.index),
                        segment: None,
                        pivot: Some(pivot_index),
                    });
                }
            }
        }

        points
    }
}
