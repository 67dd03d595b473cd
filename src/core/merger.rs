use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::models::{Candle, Direction};

/// A bar with every containment against its neighbour folded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedBar {
    pub index: usize,
    /// Running direction when the bar was placed; `None` for the first bar.
    pub direction: Option<Direction>,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Indices of the source candles absorbed, oldest first, capped.
    pub sources: Vec<usize>,
}

impl MergedBar {
    fn from_candle(index: usize, candle: &Candle) -> Self {
        Self {
            index,
            direction: None,
            high: candle.high,
            low: candle.low,
            open: candle.open,
            close: candle.close,
            volume: candle.volume,
            timestamp: candle.timestamp,
            sources: vec![index],
        }
    }

    /// One range fully covers the other, edges inclusive.
    pub fn contains(&self, other: &MergedBar) -> bool {
        (self.high >= other.high && self.low <= other.low)
            || (self.high <= other.high && self.low >= other.low)
    }
}

pub struct BarMerger {
    pub max_sources: usize,
}

impl Default for BarMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl BarMerger {
    pub fn new() -> Self {
        Self::with_max_sources(100)
    }

    pub fn with_max_sources(max_sources: usize) -> Self {
        Self { max_sources }
    }

    pub fn merge(&self, candles: &[Candle]) -> Vec<MergedBar> {
        let mut merged: Vec<MergedBar> = Vec::with_capacity(candles.len());

        for (i, candle) in candles.iter().enumerate() {
            let mut bar = MergedBar::from_candle(i, candle);
            if merged.is_empty() {
                merged.push(bar);
                continue;
            }

            let direction = Self::running_direction(&merged);
            bar.direction = Some(direction);

            while let Some(last) = merged.last() {
                if !last.contains(&bar) {
                    break;
                }
                let Some(prev) = merged.pop() else { break };
                trace!(
                    "merging bar {} into {} ({})",
                    i,
                    prev.index,
                    direction
                );
                bar = self.combine(prev, bar, direction);
            }
            merged.push(bar);
        }

        for (i, bar) in merged.iter_mut().enumerate() {
            bar.index = i;
        }

        debug!("merged {} candles into {} bars", candles.len(), merged.len());
        merged
    }

    fn running_direction(merged: &[MergedBar]) -> Direction {
        match merged {
            [.., before, last] if before.high >= last.high => Direction::Down,
            _ => Direction::Up,
        }
    }

    fn combine(&self, earlier: MergedBar, later: MergedBar, direction: Direction) -> MergedBar {
        let (high, low) = match direction {
            Direction::Up => (earlier.high.max(later.high), earlier.low.max(later.low)),
            Direction::Down => (earlier.high.min(later.high), earlier.low.min(later.low)),
        };

        let mut sources = earlier.sources;
        sources.extend(later.sources);
        if sources.len() > self.max_sources {
            let excess = sources.len() - self.max_sources;
            sources.drain(..excess);
        }

        MergedBar {
            index: earlier.index,
            direction: Some(direction),
            high,
            low,
            open: earlier.open,
            close: later.close,
            volume: earlier.volume + later.volume,
            timestamp: later.timestamp,
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bars, make_candles};
    use rust_decimal_macros::dec;

    #[test]
    fn empty_input_yields_no_bars() {
        assert!(BarMerger::new().merge(&[]).is_empty());
    }

    #[test]
    fn first_bar_has_no_direction() {
        let s = make_bars(&[(105.0, 100.0), (110.0, 104.0)]);
        let merged = BarMerger::new().merge(s.as_slice());
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].direction, None);
        assert_eq!(merged[1].direction, Some(Direction::Up));
    }

    #[test]
    fn inside_bar_merges_upward_with_max_extremes() {
        // running direction is up with fewer than two bars
        let s = make_candles(&[
            (101.0, 110.0, 100.0, 109.0),
            (103.0, 108.0, 102.0, 104.0),
        ]);
        let merged = BarMerger::new().merge(s.as_slice());
        assert_eq!(merged.len(), 1);
        let bar = &merged[0];
        assert_eq!(bar.high, dec!(110));
        assert_eq!(bar.low, dec!(102));
        assert_eq!(bar.open, dec!(101));
        assert_eq!(bar.close, dec!(104));
        assert_eq!(bar.volume, dec!(200));
        assert_eq!(bar.timestamp, s[1].timestamp);
        assert_eq!(bar.sources, vec![0, 1]);
    }

    #[test]
    fn downward_run_merges_with_min_extremes() {
        let s = make_bars(&[(120.0, 110.0), (115.0, 105.0), (116.0, 104.0)]);
        let merged = BarMerger::new().merge(s.as_slice());
        assert_eq!(merged.len(), 2, "Expected 2 bars, got {:?}", merged);
        assert_eq!(merged[1].high, dec!(115));
        assert_eq!(merged[1].low, dec!(104));
        assert_eq!(merged[1].direction, Some(Direction::Down));
        assert_eq!(merged[1].index, 1);
    }

    #[test]
    fn equal_ranges_count_as_containment() {
        let s = make_bars(&[(110.0, 100.0), (110.0, 100.0)]);
        let merged = BarMerger::new().merge(s.as_slice());
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn outside_bar_folds_into_last_bar_only() {
        let s = make_bars(&[(105.0, 100.0), (108.0, 103.0), (120.0, 90.0)]);
        let merged = BarMerger::new().merge(s.as_slice());
        assert_eq!(merged.len(), 2, "Expected 2 bars, got {:?}", merged);
        assert_eq!(merged[1].high, dec!(120));
        assert_eq!(merged[1].low, dec!(103));
        assert_eq!(merged[1].sources, vec![1, 2]);
    }

    #[test]
    fn source_list_is_capped() {
        let ranges: Vec<(f64, f64)> = std::iter::once((200.0, 50.0))
            .chain((0..10).map(|_| (150.0, 100.0)))
            .collect();
        let s = make_bars(&ranges);
        let merged = BarMerger::with_max_sources(4).merge(s.as_slice());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].sources, vec![7, 8, 9, 10]);
    }

    #[test]
    fn no_adjacent_containment_remains() {
        let s = make_bars(&[
            (110.0, 105.0),
            (109.0, 106.0),
            (112.0, 107.0),
            (111.0, 104.0),
            (115.0, 110.0),
            (114.0, 111.0),
            (108.0, 100.0),
        ]);
        let merged = BarMerger::new().merge(s.as_slice());
        for pair in merged.windows(2) {
            assert!(!pair[0].contains(&pair[1]), "containment left in {:?}", pair);
        }
    }
}
