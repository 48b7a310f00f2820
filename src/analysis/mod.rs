// src/analysis/mod.rs
pub mod indicators;

pub use indicators::{analyze_price_history, IndicatorSet};
