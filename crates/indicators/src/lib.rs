pub mod engine;
pub mod error;
pub mod wilder;

pub use engine::{Cross, IndicatorEngine, IndicatorSnapshot};
pub use error::IndicatorError;
pub use wilder::{Adx, Atr, WilderAverage};
