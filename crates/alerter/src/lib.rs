//! Outbound notifications.
//!
//! The engine pushes formatted text onto an `AlertQueue` and never waits on the
//! network. A single worker task owns the `NotificationSink` and delivers each
//! message with a bounded number of timed attempts. Delivery is at-most-once.

pub mod error;
pub mod messages;
pub mod queue;
pub mod sink;

pub use error::AlerterError;
pub use queue::{AlertPolicy, AlertQueue, spawn_alert_worker};
pub use sink::{LogSink, NotificationSink, TelegramAlerter, sink_from_config};
