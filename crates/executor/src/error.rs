use core_types::OrderHandle;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("An order is already pending: {0}")]
    OrderPending(OrderHandle),

    #[error("Invalid order size: {0}")]
    InvalidSize(f64),

    #[error("No open holding to close")]
    NoPosition,

    #[error("A holding is already open; only one position is allowed")]
    PositionExists,

    #[error("Not enough cash available to execute trade. Required: {required:.2}, Available: {available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}
