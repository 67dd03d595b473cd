pub mod chan_engine;
pub mod signals;
pub mod trading_points;

pub use chan_engine::{BasicResult, ChanEngine, ChanResult};
pub use signals::{Anchors, PointFilter, SignalEvent, SignalGenerator};
pub use trading_points::{TradingPoint, TradingPointClassifier};
