use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::core::fractal::{Fractal, FractalDetector};
use crate::core::macd::{MacdCalculator, MacdPoint};
use crate::core::merger::{BarMerger, MergedBar};
use crate::core::pivot::{Pivot, PivotDetector};
use crate::core::segment::{Segment, SegmentBuilder};
use crate::core::stroke::{Stroke, StrokeBuilder};
use crate::models::{Candle, PivotLevel};
use crate::strategies::trading_points::{TradingPoint, TradingPointClassifier};

/// Merged bars, fractals and strokes only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicResult {
    pub merged_bars: Vec<MergedBar>,
    pub fractals: Vec<Fractal>,
    pub strokes: Vec<Stroke>,
}

/// Every structure of one pipeline run. Cross references are indices into these vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChanResult {
    pub merged_bars: Vec<MergedBar>,
    pub fractals: Vec<Fractal>,
    pub strokes: Vec<Stroke>,
    pub segments: Vec<Segment>,
    /// Stroke-level pivots first, then segment-level ones.
    pub pivots: Vec<Pivot>,
    pub macd: Vec<MacdPoint>,
    pub trading_points: Vec<TradingPoint>,
}

impl ChanResult {
    pub fn latest_point(&self) -> Option<&TradingPoint> {
        self.trading_points.last()
    }

    pub fn confirmed_segments(&self) -> &[Segment] {
        confirmed_prefix(&self.segments)
    }

    pub fn pivots_at(&self, level: PivotLevel) -> impl Iterator<Item = &Pivot> {
        self.pivots.iter().filter(move |p| p.level() == level)
    }

    pub fn latest_pivot(&self, level: PivotLevel) -> Option<&Pivot> {
        self.pivots_at(level).last()
    }

    pub fn is_empty(&self) -> bool {
        self.merged_bars.is_empty()
    }
}

/// Runs the whole structural pipeline over a candle window.
pub struct ChanEngine {
    merger: BarMerger,
    fractal_detector: FractalDetector,
    stroke_builder: StrokeBuilder,
    segment_builder: SegmentBuilder,
    pivot_detector: PivotDetector,
    macd: MacdCalculator,
    classifier: TradingPointClassifier,
}

impl Default for ChanEngine {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl ChanEngine {
    pub fn new(cfg: &AnalysisConfig) -> Self {
        Self {
            merger: BarMerger::with_max_sources(cfg.max_merged_sources),
            fractal_detector: FractalDetector::new(),
            stroke_builder: StrokeBuilder::with_min_bars(cfg.min_stroke_bars),
            segment_builder: SegmentBuilder::with_min_strokes(cfg.min_segment_strokes),
            pivot_detector: PivotDetector::with_min_components(cfg.min_pivot_components),
            macd: MacdCalculator::with_params(cfg.macd),
            classifier: TradingPointClassifier::with_config(cfg),
        }
    }

    pub fn merge_bars(&self, candles: &[Candle]) -> Vec<MergedBar> {
        self.merger.merge(candles)
    }

    pub fn find_fractals(&self, bars: &[MergedBar]) -> Vec<Fractal> {
        self.fractal_detector.detect(bars)
    }

    pub fn build_strokes(&self, fractals: &[Fractal], bars: &[MergedBar]) -> Vec<Stroke> {
        self.stroke_builder.build(fractals, bars)
    }

    pub fn build_segments(&self, strokes: &[Stroke]) -> Vec<Segment> {
        self.segment_builder.build(strokes)
    }

    /// Stroke-level then segment-level pivots, numbered by position in the combined list.
    pub fn find_pivots(&self, strokes: &[Stroke], segments: &[Segment]) -> Vec<Pivot> {
        let mut pivots = self.pivot_detector.detect_strokes(strokes);
        pivots.extend(self.pivot_detector.detect_segments(segments));
        for (i, pivot) in pivots.iter_mut().enumerate() {
            pivot.index = i;
        }
        pivots
    }

    pub fn calculate(&self, candles: &[Candle]) -> BasicResult {
        let merged_bars = self.merge_bars(candles);
        let fractals = self.find_fractals(&merged_bars);
        let strokes = self.build_strokes(&fractals, &merged_bars);
        BasicResult {
            merged_bars,
            fractals,
            strokes,
        }
    }

    pub fn calculate_full(&self, candles: &[Candle]) -> ChanResult {
        let BasicResult {
            merged_bars,
            fractals,
            strokes,
        } = self.calculate(candles);
        let segments = self.build_segments(&strokes);
        let pivots = self.find_pivots(&strokes, &segments);
        let macd = self.macd.calculate(candles);

        // the trailing open segment may still change, so it never feeds divergence
        let confirmed = confirmed_prefix(&segments);
        let trading_points =
            self.classifier
                .identify_with_macd(&strokes, confirmed, &pivots, candles, &macd);

        info!(
            "Chan analysis: {} candles -> {} bars, {} fractals, {} strokes, {} segments, {} pivots, {} trading points",
            candles.len(),
            merged_bars.len(),
            fractals.len(),
            strokes.len(),
            segments.len(),
            pivots.len(),
            trading_points.len()
        );

        ChanResult {
            merged_bars,
            fractals,
            strokes,
            segments,
            pivots,
            macd,
            trading_points,
        }
    }
}

/// Only the last segment can be unconfirmed, so the confirmed ones form a prefix.
fn confirmed_prefix(segments: &[Segment]) -> &[Segment] {
    let n = segments.iter().take_while(|s| s.confirmed).count();
    &segments[..n]
}
