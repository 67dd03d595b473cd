use std::path::Path;

use tracing::{info, warn};

use crate::error::DataError;
use crate::models::{Candle, CandleSeries};

/// Reads a JSON array of candles, sorted by time with duplicate timestamps dropped.
pub fn load_candles(path: impl AsRef<Path>) -> Result<CandleSeries, DataError> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    info!("Loading candles from {}", shown);
    let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: shown.clone(),
        source,
    })?;
    let candles = parse_candles(&content).map_err(|source| DataError::Parse {
        path: shown.clone(),
        source,
    })?;

    let raw = candles.len();
    let mut series = CandleSeries::new(candles);
    series.normalize();
    if series.len() < raw {
        warn!("  Dropped {} duplicate candles", raw - series.len());
    }
    info!("  Loaded {} candles", series.len());
    Ok(series)
}

pub fn parse_candles(content: &str) -> serde_json::Result<Vec<Candle>> {
    serde_json::from_str(content)
}
