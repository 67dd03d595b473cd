use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::stroke::Stroke;
use crate::models::{Candle, CandleSeries, Direction, Timeframe};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn d(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap()
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();

    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            symbol: "BTCUSDT".to_string(),
            interval: Timeframe::M1,
            timestamp: base + Duration::minutes(i as i64),
            open: d(o),
            high: d(h),
            low: d(l),
            close: d(c),
            volume: dec!(100),
        })
        .collect();

    CandleSeries::new(candles)
}

/// Candles from (high, low) pairs; open sits just above the low, close just below the high.
pub fn make_bars(ranges: &[(f64, f64)]) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = ranges
        .iter()
        .map(|&(h, l)| (l + 1.0, h, l, h - 1.0))
        .collect();
    make_candles(&data)
}

/// Hourly candles walking linearly between integer waypoints, `bars_per_leg` bars per leg.
/// Each bar is centred on the path with a range of two.
pub fn make_zigzag(waypoints: &[i64], bars_per_leg: usize) -> CandleSeries {
    let base = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    let mut candles = Vec::new();
    let legs = waypoints.len().saturating_sub(1);

    for w in 0..legs {
        let (a, b) = (waypoints[w], waypoints[w + 1]);
        let step = (b - a) / bars_per_leg as i64;
        let count = if w + 1 == legs { bars_per_leg + 1 } else { bars_per_leg };
        for j in 0..count {
            let mid = Decimal::from(a + step * j as i64);
            let k = candles.len() as i64;
            candles.push(Candle {
                symbol: "BTCUSDT".to_string(),
                interval: Timeframe::H1,
                timestamp: base + Duration::hours(k),
                open: mid,
                high: mid + Decimal::ONE,
                low: mid - Decimal::ONE,
                close: mid,
                volume: dec!(1000),
            });
        }
    }

    CandleSeries::new(candles)
}

/// Strokes from (start_price, end_price) legs, each lasting ten minutes.
pub fn make_strokes(legs: &[(f64, f64)]) -> Vec<Stroke> {
    let base = base_time();
    legs.iter()
        .enumerate()
        .map(|(k, &(start, end))| {
            let direction = if start < end { Direction::Up } else { Direction::Down };
            Stroke {
                index: k,
                direction,
                start_fractal: k,
                end_fractal: k + 1,
                start_bar: k * 5,
                end_bar: (k + 1) * 5,
                bar_count: 6,
                start_price: d(start),
                end_price: d(end),
                start_time: base + Duration::minutes(k as i64 * 10),
                end_time: base + Duration::minutes((k as i64 + 1) * 10),
                confirmed: true,
            }
        })
        .collect()
}
