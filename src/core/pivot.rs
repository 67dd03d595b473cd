use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::precision::midpoint;
use crate::core::segment::Segment;
use crate::core::stroke::Stroke;
use crate::models::{PivotLevel, PricePosition};

/// Anything with a price range and a time span that can take part in a pivot.
pub trait PriceRange {
    fn range_high(&self) -> Decimal;
    fn range_low(&self) -> Decimal;
    fn span_start(&self) -> DateTime<Utc>;
    fn span_end(&self) -> DateTime<Utc>;
}

impl PriceRange for Stroke {
    fn range_high(&self) -> Decimal {
        self.high()
    }
    fn range_low(&self) -> Decimal {
        self.low()
    }
    fn span_start(&self) -> DateTime<Utc> {
        self.start_time
    }
    fn span_end(&self) -> DateTime<Utc> {
        self.end_time
    }
}

impl PriceRange for Segment {
    fn range_high(&self) -> Decimal {
        self.high()
    }
    fn range_low(&self) -> Decimal {
        self.low()
    }
    fn span_start(&self) -> DateTime<Utc> {
        self.start_time
    }
    fn span_end(&self) -> DateTime<Utc> {
        self.end_time
    }
}

/// Pivot members, keyed by level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "indices", rename_all = "UPPERCASE")]
pub enum PivotMembers {
    Stroke(RangeInclusive<usize>),
    Segment(RangeInclusive<usize>),
}

impl PivotMembers {
    pub fn level(&self) -> PivotLevel {
        match self {
            PivotMembers::Stroke(_) => PivotLevel::Stroke,
            PivotMembers::Segment(_) => PivotLevel::Segment,
        }
    }

    pub fn indices(&self) -> &RangeInclusive<usize> {
        match self {
            PivotMembers::Stroke(r) | PivotMembers::Segment(r) => r,
        }
    }

    pub fn len(&self) -> usize {
        let r = self.indices();
        r.end() + 1 - r.start()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A consolidation zone: the shared price range of consecutive components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub index: usize,
    pub members: PivotMembers,
    /// Upper bound (ZG).
    pub high: Decimal,
    /// Lower bound (ZD).
    pub low: Decimal,
    pub center: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    /// Starts at 1 for the opening triple, plus one per extension.
    pub oscillations: usize,
    pub confirmed: bool,
}

impl Pivot {
    pub fn level(&self) -> PivotLevel {
        self.members.level()
    }

    pub fn height(&self) -> Decimal {
        self.high - self.low
    }

    pub fn component_count(&self) -> usize {
        self.members.len()
    }

    pub fn price_position(&self, price: Decimal) -> PricePosition {
        if price > self.high {
            PricePosition::Above
        } else if price < self.low {
            PricePosition::Below
        } else {
            PricePosition::Inside
        }
    }

    pub fn contains_time(&self, time: DateTime<Utc>) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    pub fn overlaps(&self, other: &Pivot) -> bool {
        self.low <= other.high && self.high >= other.low
    }

    pub fn strokes<'a>(&self, strokes: &'a [Stroke]) -> &'a [Stroke] {
        match &self.members {
            PivotMembers::Stroke(r) => strokes.get(r.clone()).unwrap_or(&[]),
            PivotMembers::Segment(_) => &[],
        }
    }

    pub fn segments<'a>(&self, segments: &'a [Segment]) -> &'a [Segment] {
        match &self.members {
            PivotMembers::Segment(r) => segments.get(r.clone()).unwrap_or(&[]),
            PivotMembers::Stroke(_) => &[],
        }
    }
}

pub struct PivotDetector {
    pub min_components: usize,
}

impl Default for PivotDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PivotDetector {
    pub fn new() -> Self {
        Self::with_min_components(3)
    }

    pub fn with_min_components(min_components: usize) -> Self {
        Self { min_components }
    }

    pub fn detect_strokes(&self, strokes: &[Stroke]) -> Vec<Pivot> {
        self.detect(strokes, PivotLevel::Stroke)
    }

    pub fn detect_segments(&self, segments: &[Segment]) -> Vec<Pivot> {
        self.detect(segments, PivotLevel::Segment)
    }

    pub fn detect<T: PriceRange>(&self, items: &[T], level: PivotLevel) -> Vec<Pivot> {
        let mut pivots: Vec<Pivot> = Vec::new();
        let k = self.min_components;
        if items.len() < k {
            return pivots;
        }

        let mut i = 0;
        while i + k <= items.len() {
            let opening = &items[i..i + k];
            let mut low = opening.iter().map(|c| c.range_low()).max().unwrap_or_default();
            let mut high = opening.iter().map(|c| c.range_high()).min().unwrap_or_default();
            if low >= high {
                i += 1;
                continue;
            }

            let mut oscillations = 1;
            let mut j = i + k;
            while let Some(next) = items.get(j) {
                if next.range_low() > high || next.range_high() < low {
                    break;
                }
                let narrowed_high = high.min(next.range_high());
                let narrowed_low = low.max(next.range_low());
                if narrowed_low >= narrowed_high {
                    break;
                }
                high = narrowed_high;
                low = narrowed_low;
                oscillations += 1;
                j += 1;
            }

            let members = match level {
                PivotLevel::Stroke => PivotMembers::Stroke(i..=j - 1),
                PivotLevel::Segment => PivotMembers::Segment(i..=j - 1),
            };
            trace!("{} pivot over {:?}: [{}, {}]", level, members.indices(), low, high);
            pivots.push(Pivot {
                index: pivots.len(),
                members,
                high,
                low,
                center: midpoint(high, low),
                start_time: items[i].span_start(),
                end_time: items[j - 1].span_end(),
                oscillations,
                confirmed: true,
            });
            i = j;
        }

        debug!("found {} {} pivots in {} components", pivots.len(), level, items.len());
        pivots
    }
}
