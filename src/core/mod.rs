pub mod divergence;
pub mod fractal;
pub mod macd;
pub mod merger;
pub mod pivot;
pub mod precision;
pub mod segment;
pub mod stroke;
