pub mod error;
pub mod sizer;

pub use error::RiskError;
pub use sizer::PositionSizer;
