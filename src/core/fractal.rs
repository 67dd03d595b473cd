use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::merger::MergedBar;
use crate::models::FractalType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fractal {
    pub fractal_type: FractalType,
    /// Merged-bar indices of the 3-bar window.
    pub left: usize,
    pub center: usize,
    pub right: usize,
    /// Center high for a top, center low for a bottom.
    pub price: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Fractal {
    pub fn is_top(&self) -> bool {
        self.fractal_type == FractalType::Top
    }

    pub fn is_bottom(&self) -> bool {
        self.fractal_type == FractalType::Bottom
    }

    /// Whether `other` is a more extreme fractal of the same type.
    fn is_exceeded_by(&self, other: &Fractal) -> bool {
        match self.fractal_type {
            FractalType::Top => other.price > self.price,
            FractalType::Bottom => other.price < self.price,
        }
    }
}

#[derive(Default)]
pub struct FractalDetector;

impl FractalDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, bars: &[MergedBar]) -> Vec<Fractal> {
        let mut fractals: Vec<Fractal> = Vec::new();
        if bars.len() < 3 {
            return fractals;
        }

        for (offset, window) in bars.windows(3).enumerate() {
            let Some(candidate) = Self::classify(offset, window) else {
                continue;
            };

            match fractals.last_mut() {
                Some(last) if last.fractal_type == candidate.fractal_type => {
                    if last.is_exceeded_by(&candidate) {
                        trace!(
                            "replacing {} at bar {} with bar {}",
                            last.fractal_type,
                            last.center,
                            candidate.center
                        );
                        *last = candidate;
                    }
                }
                _ => fractals.push(candidate),
            }
        }

        debug!("found {} fractals in {} merged bars", fractals.len(), bars.len());
        fractals
    }

    fn classify(offset: usize, window: &[MergedBar]) -> Option<Fractal> {
        let [k1, k2, k3] = window else {
            return None;
        };

        let is_top = k2.high > k1.high && k2.high > k3.high && k2.low > k1.low && k2.low > k3.low;
        let is_bottom =
            k2.low < k1.low && k2.low < k3.low && k2.high < k1.high && k2.high < k3.high;

        let (fractal_type, price) = if is_top {
            (FractalType::Top, k2.high)
        } else if is_bottom {
            (FractalType::Bottom, k2.low)
        } else {
            return None;
        };

        Some(Fractal {
            fractal_type,
            left: offset,
            center: offset + 1,
            right: offset + 2,
            price,
            timestamp: k2.timestamp,
        })
    }
}

pub fn count_by_type(fractals: &[Fractal], fractal_type: FractalType) -> usize {
    fractals.iter().filter(|f| f.fractal_type == fractal_type).count()
}
