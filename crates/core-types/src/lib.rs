pub mod enums;
pub mod error;
pub mod session;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{ExitReason, OrderSide};
pub use error::CoreError;
pub use session::SessionState;
pub use structs::{Bar, Fill, OrderHandle, Position, TradeRecord};
