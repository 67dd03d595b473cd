use anyhow::{bail, Context, Result};
use tracing::info;

use chan_analysis::config::AnalysisConfig;
use chan_analysis::data::load_candles;
use chan_analysis::report::{AnalysisStats, LiteResult};
use chan_analysis::strategies::ChanEngine;
use chan_analysis::telemetry;

fn main() -> Result<()> {
    let cfg = AnalysisConfig::from_env();
    telemetry::init(&cfg.log_level);
    cfg.validate()?;

    // chan-scan <candles.json> [--lite]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let lite = args.iter().any(|a| a == "--lite");
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("usage: chan-scan <candles.json> [--lite]");
    };

    let candles = load_candles(path).with_context(|| format!("loading {}", path))?;
    let engine = ChanEngine::new(&cfg);

    if lite {
        let result = LiteResult::compute(&engine, candles.as_slice(), cfg.window_size);
        println!("{}", result.to_json()?);
        return Ok(());
    }

    let window = candles.tail(cfg.window_size);
    info!(
        "Analyzing {} {} candles for {}",
        window.len(),
        cfg.interval,
        cfg.symbol
    );
    let result = engine.calculate_full(window.as_slice());
    AnalysisStats::from_result(&result).print_summary();

    if !result.trading_points.is_empty() {
        println!();
        println!("  LATEST POINTS");
        println!("  ───────────────────────────────────");
        for point in result.trading_points.iter().rev().take(5) {
            println!("  {} {}", point.timestamp.format("%Y-%m-%d %H:%M"), point.description());
        }
    }

    Ok(())
}
