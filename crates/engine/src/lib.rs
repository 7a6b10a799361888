//! # Engine Crate
//!
//! The decision engine for a single instrument. `TrendEngine` turns bars and
//! indicator snapshots into entry and exit orders, enforces the session cap and
//! equity floor, and keeps the durable `SessionState` up to date.
//!
//! ## Public API
//!
//! - `TrendEngine`: the state machine with `on_bar`, `on_fill`, `on_reject` and
//!   `on_trade_closed`.
//! - `SessionGuard`: the cap and floor checks.
//! - `BarGate`: drops malformed and out-of-order bars before the indicators see them.
//! - `run_event_loop`: the live host, consuming `EngineEvent`s from one channel.

pub mod decision;
pub mod error;
pub mod event;
pub mod feed;
pub mod guard;

pub use decision::{Decision, EngineState, FillOutcome, TrendEngine};
pub use error::EngineError;
pub use event::{EngineEvent, run_event_loop};
pub use feed::BarGate;
pub use guard::SessionGuard;
