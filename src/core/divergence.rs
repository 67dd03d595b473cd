use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::macd::{area, MacdPoint};
use crate::core::precision::{ratio_change, round_ratio};
use crate::core::segment::Segment;
use crate::models::{Candle, Direction, DivergenceType, Strength};

/// Price makes a new extreme while oscillator area shrinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub divergence_type: DivergenceType,
    /// Indices of the compared segments in the sequence handed to the detector.
    pub first_segment: usize,
    pub second_segment: usize,
    pub first_area: Decimal,
    pub second_area: Decimal,
    pub price_change: Decimal,
    pub macd_change: Decimal,
    pub volume_change: Decimal,
    pub strength: Strength,
    /// End of the second segment, where the divergence completes.
    pub price: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Divergence {
    pub fn is_bullish(&self) -> bool {
        self.divergence_type == DivergenceType::Bullish
    }

    pub fn is_bearish(&self) -> bool {
        self.divergence_type == DivergenceType::Bearish
    }
}

#[derive(Default)]
pub struct DivergenceDetector;

impl DivergenceDetector {
    pub fn new() -> Self {
        Self
    }

    /// Compares segments `i` and `i + 2` for every `i` where both share a direction.
    pub fn detect_all(
        &self,
        segments: &[Segment],
        macd: &[MacdPoint],
        candles: &[Candle],
    ) -> Vec<Divergence> {
        let divergences: Vec<Divergence> = segments
            .iter()
            .enumerate()
            .zip(segments.iter().enumerate().skip(2))
            .filter(|((_, a), (_, b))| a.direction == b.direction)
            .filter_map(|((i, a), (j, b))| self.detect((i, a), (j, b), macd, candles))
            .collect();

        debug!(
            "found {} divergences across {} segments",
            divergences.len(),
            segments.len()
        );
        divergences
    }

    pub fn detect(
        &self,
        (first_index, first): (usize, &Segment),
        (second_index, second): (usize, &Segment),
        macd: &[MacdPoint],
        candles: &[Candle],
    ) -> Option<Divergence> {
        if first.direction != second.direction || macd.is_empty() {
            return None;
        }

        let first_area = area(macd, first.start_time, first.end_time);
        let second_area = area(macd, second.start_time, second.end_time);
        let new_extreme = match first.direction {
            Direction::Up => second.end_price > first.end_price,
            Direction::Down => second.end_price < first.end_price,
        };
        if !new_extreme || second_area >= first_area {
            return None;
        }

        let divergence_type = match first.direction {
            Direction::Up => DivergenceType::Bearish,
            Direction::Down => DivergenceType::Bullish,
        };
        let price_change = ratio_change(first.end_price, second.end_price);
        let macd_change = ratio_change(first_area, second_area);
        let volume_change = ratio_change(
            volume_between(candles, first.start_time, first.end_time),
            volume_between(candles, second.start_time, second.end_time),
        );
        let strength = classify_strength(price_change, macd_change);

        trace!(
            "{} divergence between segments {} and {}: price {} area {} ({})",
            divergence_type,
            first_index,
            second_index,
            price_change,
            macd_change,
            strength
        );

        Some(Divergence {
            divergence_type,
            first_segment: first_index,
            second_segment: second_index,
            first_area,
            second_area,
            price_change,
            macd_change,
            volume_change,
            strength,
            price: second.end_price,
            timestamp: second.end_time,
        })
    }
}

/// |area change| relative to |price change|: above 2 is strong, above 1 medium.
pub fn classify_strength(price_change: Decimal, macd_change: Decimal) -> Strength {
    if price_change.is_zero() {
        return Strength::Weak;
    }
    let ratio = round_ratio(macd_change.abs() / price_change.abs());
    if ratio > dec!(2) {
        Strength::Strong
    } else if ratio > Decimal::ONE {
        Strength::Medium
    } else {
        Strength::Weak
    }
}

fn volume_between(candles: &[Candle], start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    candles
        .iter()
        .filter(|c| c.timestamp >= start && c.timestamp <= end)
        .map(|c| c.volume)
        .sum()
}
