//! # Persistence Crate
//!
//! Durable storage for the two pieces of state that must survive a restart:
//! the per-session `SessionState` record and the append-only trade ledger.
//!
//! ## Architectural Principles
//!
//! - **Ports and adapters:** the decision engine only sees the `SessionStore` and
//!   `TradeLedger` traits. File-backed adapters are used in production and
//!   cloneable in-memory adapters in tests.
//! - **Synchronous writes:** every save and append has reached the disk before
//!   the call returns, so a crash never loses an acknowledged update.
//! - **Fail-open reads:** a missing or corrupt state file yields default state
//!   and a log line rather than an error.
//!
//! ## Public API
//!
//! - `SessionStore`, `JsonFileSessionStore`, `MemorySessionStore`
//! - `TradeLedger`, `CsvTradeLedger`, `MemoryTradeLedger`, `read_trades`
//! - `PersistenceError`

pub mod error;
pub mod session_store;
pub mod trade_ledger;

pub use error::PersistenceError;
pub use session_store::{JsonFileSessionStore, MemorySessionStore, SessionStore};
pub use trade_ledger::{CsvTradeLedger, MemoryTradeLedger, TradeLedger, read_trades};
