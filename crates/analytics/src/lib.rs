//! # Trendguard Analytics
//!
//! Quantitative analysis of a finished run: the trades the ledger recorded
//! and the daily equity curve the harness sampled.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** depends only on `core-types`. No I/O.
//! - **Stateless calculation:** `AnalyticsEngine` takes raw trading data as
//!   input and produces a `PerformanceReport` as output.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: the calculator.
//! - `PerformanceReport`: the standardized metric set.
//! - `AnalyticsError`: rejected inputs.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::PerformanceReport;
