use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::precision::percent_change;
use crate::core::stroke::Stroke;
use crate::models::{BreakKind, Direction};

/// Overlap of the stroke pair (i, i+1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureElement {
    pub index: usize,
    pub first_stroke: usize,
    pub second_stroke: usize,
    /// Lower of the two highs.
    pub high: Decimal,
    /// Higher of the two lows.
    pub low: Decimal,
    /// The overlap is inverted: the pair shares no price range.
    pub gap: bool,
    pub gap_size: Decimal,
}

/// A trend leg made of at least five strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub direction: Direction,
    /// Indices into the stroke sequence, both inclusive.
    pub start_stroke: usize,
    pub end_stroke: usize,
    pub stroke_count: usize,
    pub start_price: Decimal,
    pub end_price: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub features: Vec<FeatureElement>,
    pub confirmed: bool,
    pub broken: bool,
    pub break_kind: Option<BreakKind>,
}

impl Segment {
    pub fn high(&self) -> Decimal {
        match self.direction {
            Direction::Up => self.end_price,
            Direction::Down => self.start_price,
        }
    }

    pub fn low(&self) -> Decimal {
        match self.direction {
            Direction::Up => self.start_price,
            Direction::Down => self.end_price,
        }
    }

    pub fn amplitude(&self) -> Decimal {
        self.high() - self.low()
    }

    pub fn change_percent(&self) -> Decimal {
        percent_change(self.start_price, self.end_price)
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn contains_price(&self, price: Decimal) -> bool {
        price >= self.low() && price <= self.high()
    }

    pub fn contains_time(&self, time: DateTime<Utc>) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    /// The member strokes, resolved against the stroke sequence this segment was built from.
    pub fn strokes<'a>(&self, strokes: &'a [Stroke]) -> &'a [Stroke] {
        strokes.get(self.start_stroke..=self.end_stroke).unwrap_or(&[])
    }
}

pub fn feature_sequence(strokes: &[Stroke]) -> Vec<FeatureElement> {
    strokes
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let high = pair[0].high().min(pair[1].high());
            let low = pair[0].low().max(pair[1].low());
            let gap = high < low;
            FeatureElement {
                index: i,
                first_stroke: i,
                second_stroke: i + 1,
                high,
                low,
                gap,
                gap_size: if gap { low - high } else { Decimal::ZERO },
            }
        })
        .collect()
}

pub struct SegmentBuilder {
    pub min_strokes: usize,
}

impl Default for SegmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self::with_min_strokes(5)
    }

    pub fn with_min_strokes(min_strokes: usize) -> Self {
        Self { min_strokes }
    }

    pub fn build(&self, strokes: &[Stroke]) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();
        let n = strokes.len();
        if n < self.min_strokes {
            return segments;
        }

        let features = feature_sequence(strokes);
        let mut start = 0;

        for i in 2..n {
            let Some(kind) = self.detect_break(&features, strokes, start, i) else {
                continue;
            };
            trace!("{} break at stroke {} for segment starting at {}", kind, i, start);
            if let Some(segment) =
                self.make_segment(segments.len(), strokes, &features, start, i - 1, Some(kind))
            {
                segments.push(segment);
            }
            start = i - 1;
        }

        if start + 1 < n {
            if let Some(segment) =
                self.make_segment(segments.len(), strokes, &features, start, n - 1, None)
            {
                segments.push(segment);
            }
        }

        debug!(
            "built {} segments ({} confirmed) from {} strokes",
            segments.len(),
            segments.iter().filter(|s| s.confirmed).count(),
            n
        );
        segments
    }

    /// Whether the segment starting at `start` is broken by stroke `current`.
    fn detect_break(
        &self,
        features: &[FeatureElement],
        strokes: &[Stroke],
        start: usize,
        current: usize,
    ) -> Option<BreakKind> {
        if current < start + 2 {
            return None;
        }
        if Self::standard_break(features, strokes, start, current) {
            Some(BreakKind::Standard)
        } else if Self::gap_break(features, strokes, start, current) {
            Some(BreakKind::Gap)
        } else {
            None
        }
    }

    /// The current stroke breaches two non-gapped feature elements.
    ///
    /// Both scans stop short of `current - 1`; the second breach must come
    /// from an element strictly after the first.
    fn standard_break(
        features: &[FeatureElement],
        strokes: &[Stroke],
        start: usize,
        current: usize,
    ) -> bool {
        if current <= start + 1 || current >= strokes.len() {
            return false;
        }
        let stroke = &strokes[current];
        let direction = strokes[start].direction;
        let limit = (current - 1).min(features.len());

        let breaches = |f: &FeatureElement| match direction {
            Direction::Up => stroke.low() < f.low,
            Direction::Down => stroke.high() > f.high,
        };

        (start..limit).any(|i| {
            let first = &features[i];
            !first.gap
                && breaches(first)
                && features[i + 1..limit]
                    .iter()
                    .any(|later| !later.gap && breaches(later))
        })
    }

    /// A later stroke covers the range of an earlier gapped feature element.
    fn gap_break(
        features: &[FeatureElement],
        strokes: &[Stroke],
        start: usize,
        current: usize,
    ) -> bool {
        let limit = current.min(features.len());
        (start..limit).filter(|&i| features[i].gap).any(|i| {
            let gapped = &features[i];
            features[i + 1..limit].iter().any(|later| {
                strokes
                    .get(later.second_stroke)
                    .is_some_and(|s| s.low() <= gapped.low && s.high() >= gapped.high)
            })
        })
    }

    fn make_segment(
        &self,
        index: usize,
        strokes: &[Stroke],
        features: &[FeatureElement],
        start: usize,
        end: usize,
        break_kind: Option<BreakKind>,
    ) -> Option<Segment> {
        if start >= end || end >= strokes.len() {
            return None;
        }
        let stroke_count = end - start + 1;
        if stroke_count < self.min_strokes {
            trace!("dropping {}-stroke run {}..={}", stroke_count, start, end);
            return None;
        }

        let first = &strokes[start];
        let last = &strokes[end];
        let confirmed = break_kind.is_some();
        let feature_end = end.min(features.len());

        Some(Segment {
            index,
            direction: first.direction,
            start_stroke: start,
            end_stroke: end,
            stroke_count,
            start_price: first.start_price,
            end_price: last.end_price,
            start_time: first.start_time,
            end_time: last.end_time,
            features: features[start.min(feature_end)..feature_end].to_vec(),
            confirmed,
            broken: confirmed,
            break_kind,
        })
    }
}
