//! # Executor Crate
//!
//! Order execution for the decision engine. It defines the `OrderGateway` port
//! the engine submits orders through and a `SimulatedGateway` that fills them
//! against historical bars, backed by a `Portfolio` holding cash and at most
//! one long position.
//!
//! ## Architectural Principles
//!
//! - **Execution Abstraction:** the engine is agnostic about whether orders go to
//!   a simulation or a broker. Submission only returns a handle; position state
//!   changes when the resulting `OrderUpdate` is fed back to the engine.
//! - **State vs. Logic Decoupling:** the gateway computes prices, slippage and
//!   fees. The `Portfolio` only applies the resulting cash and holding changes.
//!
//! ## Public API
//!
//! - `OrderGateway`: The port used by the decision engine.
//! - `OrderUpdate`: A fill or rejection reported for a submitted order.
//! - `SimulatedGateway`: The "virtual exchange" for backtesting.
//! - `Portfolio`: Cash and the single holding.
//! - `GatewayError`: The specific error types that can be returned from this crate.

pub mod error;
pub mod exchange;
pub mod portfolio;

pub use error::GatewayError;
pub use exchange::{OrderGateway, OrderUpdate, SimulatedGateway};
pub use portfolio::{Holding, Portfolio};
