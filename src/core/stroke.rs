use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::fractal::Fractal;
use crate::core::merger::MergedBar;
use crate::core::precision::percent_change;
use crate::models::{Direction, FractalType};

/// A monotonic leg between two alternating fractals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub index: usize,
    pub direction: Direction,
    /// Indices into the fractal sequence.
    pub start_fractal: usize,
    pub end_fractal: usize,
    /// Merged-bar span, both ends inclusive.
    pub start_bar: usize,
    pub end_bar: usize,
    pub bar_count: usize,
    pub start_price: Decimal,
    pub end_price: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub confirmed: bool,
}

impl Stroke {
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

    /// Signed move from start to end in percent.
    pub fn change_percent(&self) -> Decimal {
        percent_change(self.start_price, self.end_price)
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn is_up(&self) -> bool {
        self.direction == Direction::Up
    }
}

pub struct StrokeBuilder {
    pub min_bars: usize,
}

impl Default for StrokeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeBuilder {
    pub fn new() -> Self {
        Self::with_min_bars(5)
    }

    pub fn with_min_bars(min_bars: usize) -> Self {
        Self { min_bars }
    }

    /// Connects fractals into strokes.
    ///
    /// Until the first stroke is found the start fractal advances one at a
    /// time. Afterwards every stroke starts at the previous stroke's end. When
    /// that end has no valid partner, the last stroke is stretched to the next
    /// later fractal of the same type that is more extreme and the search
    /// resumes from there. The scan stops only when no such fractal remains.
    pub fn build(&self, fractals: &[Fractal], bars: &[MergedBar]) -> Vec<Stroke> {
        let mut strokes: Vec<Stroke> = Vec::new();
        let mut i = 0;

        while i + 1 < fractals.len() {
            match self.find_end(fractals, bars, i) {
                Some(j) => {
                    let stroke = self.make_stroke(strokes.len(), fractals, bars, i, j);
                    trace!(
                        "stroke {} {} {} -> {}",
                        stroke.index,
                        stroke.direction,
                        stroke.start_price,
                        stroke.end_price
                    );
                    strokes.push(stroke);
                    i = j;
                }
                None if strokes.is_empty() => i += 1,
                None => {
                    let Some(k) = Self::find_extension(fractals, i) else {
                        break;
                    };
                    if let Some(last) = strokes.last_mut() {
                        let stretched =
                            self.make_stroke(last.index, fractals, bars, last.start_fractal, k);
                        trace!(
                            "stroke {} stretched {} -> {}",
                            stretched.index,
                            last.end_price,
                            stretched.end_price
                        );
                        *last = stretched;
                    }
                    i = k;
                }
            }
        }

        debug!("built {} strokes from {} fractals", strokes.len(), fractals.len());
        strokes
    }

    fn find_end(&self, fractals: &[Fractal], bars: &[MergedBar], start: usize) -> Option<usize> {
        let from = &fractals[start];
        fractals
            .iter()
            .enumerate()
            .skip(start + 1)
            .find(|(_, to)| {
                if to.fractal_type == from.fractal_type {
                    return false;
                }
                let moves_correctly = match from.fractal_type {
                    FractalType::Bottom => to.price > from.price,
                    FractalType::Top => to.price < from.price,
                };
                moves_correctly && Self::bar_count(bars, from, to) >= self.min_bars
            })
            .map(|(j, _)| j)
    }

    /// First later fractal of the same type as `end` that goes beyond it.
    fn find_extension(fractals: &[Fractal], end: usize) -> Option<usize> {
        let from = &fractals[end];
        fractals
            .iter()
            .enumerate()
            .skip(end + 1)
            .find(|(_, f)| {
                f.fractal_type == from.fractal_type
                    && match from.fractal_type {
                        FractalType::Top => f.price > from.price,
                        FractalType::Bottom => f.price < from.price,
                    }
            })
            .map(|(k, _)| k)
    }

    /// Merged bars from the start center to the end center, inclusive.
    fn bar_count(bars: &[MergedBar], from: &Fractal, to: &Fractal) -> usize {
        bars.get(from.center..=to.center)
            .map(|span| span.len())
            .unwrap_or_else(|| (to.center + 1).saturating_sub(from.center))
    }

    fn make_stroke(
        &self,
        index: usize,
        fractals: &[Fractal],
        bars: &[MergedBar],
        start: usize,
        end: usize,
    ) -> Stroke {
        let from = &fractals[start];
        let to = &fractals[end];
        Stroke {
            index,
            direction: from.fractal_type.stroke_direction(),
            start_fractal: start,
            end_fractal: end,
            start_bar: from.center,
            end_bar: to.center,
            bar_count: Self::bar_count(bars, from, to),
            start_price: from.price,
            end_price: to.price,
            start_time: from.timestamp,
            end_time: to.timestamp,
            confirmed: true,
        }
    }
}
