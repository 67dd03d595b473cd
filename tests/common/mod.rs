#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use chan_analysis::core::stroke::Stroke;
use chan_analysis::models::{Candle, CandleSeries, Direction, Timeframe};

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

/// Candles from (high, low) pairs.
pub fn make_bars(ranges: &[(f64, f64)]) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = ranges
        .iter()
        .map(|&(h, l)| (l + 1.0, h, l, h - 1.0))
        .collect();
    make_candles(&data)
}

/// Hourly candles walking linearly between waypoints, `bars_per_leg` bars per leg.
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
        .map(|(k, &(start, end))| Stroke {
            index: k,
            direction: if start < end { Direction::Up } else { Direction::Down },
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
        })
        .collect()
}

/// Fifteen hourly bars rising for six, falling for five, rising for four.
pub fn reference_waves() -> CandleSeries {
    let data = [
        (100.0, 105.0, 98.0, 103.0),
        (103.0, 108.0, 101.0, 106.0),
        (106.0, 112.0, 104.0, 110.0),
        (110.0, 118.0, 108.0, 115.0),
        (115.0, 120.0, 113.0, 118.0),
        (118.0, 119.0, 110.0, 112.0),
        (112.0, 114.0, 105.0, 107.0),
        (107.0, 109.0, 100.0, 102.0),
        (102.0, 104.0, 95.0, 97.0),
        (97.0, 99.0, 92.0, 94.0),
        (94.0, 100.0, 93.0, 98.0),
        (98.0, 105.0, 96.0, 103.0),
        (103.0, 110.0, 101.0, 108.0),
        (108.0, 115.0, 106.0, 113.0),
        (113.0, 122.0, 111.0, 120.0),
    ];
    let base = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    let candles = make_candles(&data)
        .into_iter()
        .enumerate()
        .map(|(i, c)| Candle {
            interval: Timeframe::H1,
            timestamp: base + Duration::hours(i as i64),
            ..c
        })
        .collect();
    CandleSeries::new(candles)
}

/// Bottom at 95, top at 120, bottom at 96, then a partial rally.
pub fn up_down_waves() -> CandleSeries {
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
}

/// Decline to 100, rally to 160, a two-bar dip to 150, then ten rising steps
/// whose pullbacks all stay above the rally top.
pub fn pullback_staircase() -> CandleSeries {
    let mut mids: Vec<i64> = (0..=8).map(|k| 140 - 5 * k).collect();
    mids.extend((1..=12).map(|k| 100 + 5 * k));
    mids.extend([155, 150]);
    let mut mid = 155;
    for _ in 0..10 {
        for _ in 0..6 {
            mid += 5;
            mids.push(mid);
        }
        for _ in 0..5 {
            mid -= 3;
            mids.push(mid);
        }
    }
    let ranges: Vec<(f64, f64)> = mids.iter().map(|&m| (m as f64 + 2.0, m as f64 - 2.0)).collect();
    make_bars(&ranges)
}

/// A long decline in four legs whose last low diverges from the second.
pub const DECLINE_WAYPOINTS: [i64; 35] = [
    300, 324, 300, 360, 312, 354, 318, 354, 318, 354, 306, 336, 300, 360, 312, 330, 306, 330, 312,
    342, 282, 312, 252, 294, 234, 282, 258, 288, 258, 276, 252, 294, 276, 318, 288,
];

pub fn decline() -> CandleSeries {
    make_zigzag(&DECLINE_WAYPOINTS, 6)
}

pub fn millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}
