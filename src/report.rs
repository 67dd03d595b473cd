use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::fractal::count_by_type;
use crate::models::{Candle, Direction, FractalType, PivotLevel, PointType};
use crate::strategies::chan_engine::{ChanEngine, ChanResult};

/// Trailing bars kept by the lite projection.
pub const DEFAULT_LITE_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleLite {
    pub t: i64,
    pub o: Decimal,
    pub h: Decimal,
    pub l: Decimal,
    pub c: Decimal,
    pub v: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedBarLite {
    pub index: usize,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalLite {
    pub center_index: usize,
    #[serde(rename = "type")]
    pub fractal_type: FractalType,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeLite {
    pub start_index: usize,
    pub end_index: usize,
    pub direction: Direction,
    pub start_price: Decimal,
    pub end_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentLite {
    pub start_time: i64,
    pub end_time: i64,
    pub direction: Direction,
    pub start_price: Decimal,
    pub end_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotLite {
    pub start_time: i64,
    pub end_time: i64,
    pub high: Decimal,
    pub low: Decimal,
    pub center: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPointLite {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub level: u8,
    pub price: Decimal,
}

/// Chart-sized projection of a [`ChanResult`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiteResult {
    pub candles: Vec<CandleLite>,
    pub merged_bars: Vec<MergedBarLite>,
    pub fractals: Vec<FractalLite>,
    pub strokes: Vec<StrokeLite>,
    pub segments: Vec<SegmentLite>,
    pub pivots: Vec<PivotLite>,
    pub trading_points: Vec<TradingPointLite>,
}

impl LiteResult {
    /// Runs the pipeline over the last `limit` candles and projects the result.
    pub fn compute(engine: &ChanEngine, candles: &[Candle], limit: usize) -> Self {
        let window = &candles[candles.len().saturating_sub(limit)..];
        Self::from_result(window, &engine.calculate_full(window))
    }

    pub fn from_result(candles: &[Candle], result: &ChanResult) -> Self {
        let millis = |t: chrono::DateTime<chrono::Utc>| t.timestamp_millis();
        let bar_index = |fractal: usize| result.fractals.get(fractal).map(|f| f.center).unwrap_or_default();

        Self {
            candles: candles
                .iter()
                .map(|c| CandleLite {
                    t: c.timestamp_millis(),
                    o: c.open,
                    h: c.high,
                    l: c.low,
                    c: c.close,
                    v: c.volume,
                })
                .collect(),
            merged_bars: result
                .merged_bars
                .iter()
                .map(|b| MergedBarLite {
                    index: b.index,
                    timestamp: millis(b.timestamp),
                })
                .collect(),
            fractals: result
                .fractals
                .iter()
                .map(|f| FractalLite {
                    center_index: f.center,
                    fractal_type: f.fractal_type,
                    price: f.price,
                })
                .collect(),
            strokes: result
                .strokes
                .iter()
                .map(|s| StrokeLite {
                    start_index: bar_index(s.start_fractal),
                    end_index: bar_index(s.end_fractal),
                    direction: s.direction,
                    start_price: s.start_price,
                    end_price: s.end_price,
                })
                .collect(),
            segments: result
                .segments
                .iter()
                .map(|s| SegmentLite {
                    start_time: millis(s.start_time),
                    end_time: millis(s.end_time),
                    direction: s.direction,
                    start_price: s.start_price,
                    end_price: s.end_price,
                })
                .collect(),
            pivots: result
                .pivots
                .iter()
                .map(|p| PivotLite {
                    start_time: millis(p.start_time),
                    end_time: millis(p.end_time),
                    high: p.high,
                    low: p.low,
                    center: p.center,
                })
                .collect(),
            trading_points: result
                .trading_points
                .iter()
                .map(|p| TradingPointLite {
                    timestamp: millis(p.timestamp),
                    point_type: p.point_type,
                    level: p.level,
                    price: p.price,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub merged_bars: usize,
    pub fractals: usize,
    pub top_fractals: usize,
    pub bottom_fractals: usize,
    pub strokes: usize,
    pub segments: usize,
    pub confirmed_segments: usize,
    pub stroke_pivots: usize,
    pub segment_pivots: usize,
    pub trading_points: usize,
    pub buy_points: usize,
    pub sell_points: usize,
    /// Counts for tiers 1, 2 and 3.
    pub by_tier: [usize; 3],
    pub strong_signals: usize,
}

impl AnalysisStats {
    pub fn from_result(result: &ChanResult) -> Self {
        let mut by_tier = [0; 3];
        for point in &result.trading_points {
            if let Some(slot) = by_tier.get_mut(usize::from(point.level).wrapping_sub(1)) {
                *slot += 1;
            }
        }

        Self {
            merged_bars: result.merged_bars.len(),
            fractals: result.fractals.len(),
            top_fractals: count_by_type(&result.fractals, FractalType::Top),
            bottom_fractals: count_by_type(&result.fractals, FractalType::Bottom),
            strokes: result.strokes.len(),
            segments: result.segments.len(),
            confirmed_segments: result.confirmed_segments().len(),
            stroke_pivots: result.pivots_at(PivotLevel::Stroke).count(),
            segment_pivots: result.pivots_at(PivotLevel::Segment).count(),
            trading_points: result.trading_points.len(),
            buy_points: result.trading_points.iter().filter(|p| p.is_buy()).count(),
            sell_points: result.trading_points.iter().filter(|p| p.is_sell()).count(),
            by_tier,
            strong_signals: result
                .trading_points
                .iter()
                .filter(|p| p.is_strong_signal())
                .count(),
        }
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(70));
        println!("  CHAN ANALYSIS");
        println!("{}", "=".repeat(70));
        println!();
        println!("  STRUCTURE");
        println!("  ───────────────────────────────────");
        println!("  Merged bars: {}", self.merged_bars);
        println!(
            "  Fractals:    {} ({} top / {} bottom)",
            self.fractals, self.top_fractals, self.bottom_fractals
        );
        println!("  Strokes:     {}", self.strokes);
        println!(
            "  Segments:    {} ({} confirmed)",
            self.segments, self.confirmed_segments
        );
        println!(
            "  Pivots:      {} stroke / {} segment",
            self.stroke_pivots, self.segment_pivots
        );
        println!();
        println!("  TRADING POINTS");
        println!("  ───────────────────────────────────");
        println!("  Total:       {}", self.trading_points);
        println!("  Buy/Sell:    {} / {}", self.buy_points, self.sell_points);
        println!(
            "  By tier:     {} / {} / {}",
            self.by_tier[0], self.by_tier[1], self.by_tier[2]
        );
        println!("  Strong:      {}", self.strong_signals);
        println!("{}", "=".repeat(70));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_bars;

    fn waves() -> Vec<Candle> {
        make_bars(&[
            (110.0, 105.0),
            (100.0, 95.0),
            (104.0, 99.0),
            (108.0, 103.0),
            (112.0, 107.0),
            (116.0, 111.0),
            (120.0, 115.0),
            (117.0, 112.0),
            (113.0, 108.0),
            (109.0, 104.0),
            (105.0, 100.0),
            (101.0, 96.0),
            (104.0, 99.0),
            (108.0, 103.0),
            (112.0, 107.0),
        ])
        .as_slice()
        .to_vec()
    }

    #[test]
    fn lite_projection_keeps_bar_positions() {
        let candles = waves();
        let lite = LiteResult::compute(&ChanEngine::default(), &candles, DEFAULT_LITE_LIMIT);
        assert_eq!(lite.candles.len(), 15);
        assert_eq!(lite.merged_bars.len(), 15);
        assert_eq!(lite.strokes.len(), 2);
        assert_eq!(lite.strokes[0].start_index, 1);
        assert_eq!(lite.strokes[0].end_index, 6);
        assert_eq!(lite.strokes[1].end_index, 11);
        assert_eq!(lite.candles[0].t, candles[0].timestamp_millis());
    }

    #[test]
    fn lite_limit_trims_leading_candles() {
        let candles = waves();
        let lite = LiteResult::compute(&ChanEngine::default(), &candles, 5);
        assert_eq!(lite.candles.len(), 5);
        assert_eq!(lite.candles[0].t, candles[10].timestamp_millis());
    }

    #[test]
    fn lite_json_uses_type_key() {
        let candles = waves();
        let lite = LiteResult::compute(&ChanEngine::default(), &candles, DEFAULT_LITE_LIMIT);
        let json = lite.to_json().unwrap();
        assert!(json.contains("\"type\":\"BOTTOM\""), "got {}", json);
        assert!(json.contains("\"direction\":\"UP\""), "got {}", json);
        let back: LiteResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lite);
    }

    #[test]
    fn stats_count_structures() {
        let result = ChanEngine::default().calculate_full(&waves());
        let stats = AnalysisStats::from_result(&result);
        assert_eq!(stats.merged_bars, 15);
        assert_eq!(stats.strokes, 2);
        assert_eq!(stats.top_fractals + stats.bottom_fractals, stats.fractals);
        assert_eq!(stats.segments, 0);
        assert_eq!(stats.trading_points, 0);
        assert_eq!(AnalysisStats::from_result(&ChanResult::default()), AnalysisStats::default());
    }
}
