use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    // Input
    pub symbol: String,
    pub interval: Timeframe,

    // Structure
    pub min_stroke_bars: usize,
    pub min_segment_strokes: usize,
    pub min_pivot_components: usize,
    pub max_merged_sources: usize,

    // Oscillator
    pub macd: MacdParams,

    // Trading points
    pub pivot_edge_ratio: Decimal,
    pub confirm_lookahead: usize,

    // Rolling window
    pub window_size: usize,

    // Logging
    pub log_level: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: Timeframe::H1,
            min_stroke_bars: 5,
            min_segment_strokes: 5,
            min_pivot_components: 3,
            max_merged_sources: 100,
            macd: MacdParams::default(),
            pivot_edge_ratio: dec!(0.2),
            confirm_lookahead: 3,
            window_size: 500,
            log_level: "info".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let d = Self::default();

        AnalysisConfig {
            symbol: env("CHAN_SYMBOL", &d.symbol),
            interval: Timeframe::from_str_loose(&env("CHAN_INTERVAL", "1h")).unwrap_or(d.interval),
            min_stroke_bars: env("CHAN_MIN_STROKE_BARS", "5").parse().unwrap_or(5),
            min_segment_strokes: env("CHAN_MIN_SEGMENT_STROKES", "5").parse().unwrap_or(5),
            min_pivot_components: env("CHAN_MIN_PIVOT_COMPONENTS", "3").parse().unwrap_or(3),
            max_merged_sources: env("CHAN_MAX_MERGED_SOURCES", "100").parse().unwrap_or(100),
            macd: MacdParams {
                fast: env("CHAN_MACD_FAST", "12").parse().unwrap_or(12),
                slow: env("CHAN_MACD_SLOW", "26").parse().unwrap_or(26),
                signal: env("CHAN_MACD_SIGNAL", "9").parse().unwrap_or(9),
            },
            pivot_edge_ratio: env("CHAN_PIVOT_EDGE_RATIO", "0.2")
                .parse()
                .unwrap_or(d.pivot_edge_ratio),
            confirm_lookahead: env("CHAN_CONFIRM_LOOKAHEAD", "3").parse().unwrap_or(3),
            window_size: env("CHAN_WINDOW_SIZE", "500").parse().unwrap_or(500),
            log_level: env("LOG_LEVEL", &d.log_level),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, reason: &str| ConfigError::Invalid {
            key,
            reason: reason.to_string(),
        };

        if self.macd.fast == 0 || self.macd.slow == 0 || self.macd.signal == 0 {
            return Err(invalid("CHAN_MACD_*", "periods must be positive"));
        }
        if self.macd.fast >= self.macd.slow {
            return Err(invalid("CHAN_MACD_FAST", "fast period must be below slow period"));
        }
        if self.min_stroke_bars < 2 {
            return Err(invalid("CHAN_MIN_STROKE_BARS", "a stroke spans at least two bars"));
        }
        if self.min_segment_strokes < 3 {
            return Err(invalid("CHAN_MIN_SEGMENT_STROKES", "a segment needs at least three strokes"));
        }
        if self.min_pivot_components < 3 {
            return Err(invalid("CHAN_MIN_PIVOT_COMPONENTS", "a pivot needs at least three components"));
        }
        if self.max_merged_sources == 0 {
            return Err(invalid("CHAN_MAX_MERGED_SOURCES", "must be positive"));
        }
        if self.window_size == 0 {
            return Err(invalid("CHAN_WINDOW_SIZE", "must be positive"));
        }
        if self.pivot_edge_ratio <= Decimal::ZERO || self.pivot_edge_ratio >= Decimal::ONE {
            return Err(invalid("CHAN_PIVOT_EDGE_RATIO", "must lie strictly between 0 and 1"));
        }
        Ok(())
    }
}
