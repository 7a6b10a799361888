use crate::sink::NotificationSink;
use configuration::AlertsConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Retry and timeout limits applied by the delivery worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl AlertPolicy {
    pub fn from_config(config: &AlertsConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::from_config(&AlertsConfig::default())
    }
}

/// Producer half of the bounded alert queue.
///
/// `notify` never blocks and never fails: when the queue is full the message
/// is dropped with a warning.
#[derive(Debug, Clone)]
pub struct AlertQueue {
    tx: Option<mpsc::Sender<String>>,
}

impl AlertQueue {
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A queue that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn notify(&self, message: impl Into<String>) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(message.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(message = %dropped, "Alert queue full, dropping alert");
            }
            Err(TrySendError::Closed(dropped)) => {
                tracing::debug!(message = %dropped, "Alert worker gone, dropping alert");
            }
        }
    }
}

/// Spawns the task that delivers queued alerts to `sink`.
///
/// The task runs until every `AlertQueue` clone has been dropped and the
/// remaining messages have been attempted, so awaiting the handle after
/// dropping the producers drains the queue.
pub fn spawn_alert_worker(
    mut rx: mpsc::Receiver<String>,
    sink: Arc<dyn NotificationSink>,
    policy: AlertPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Alert worker started.");
        while let Some(message) = rx.recv().await {
            deliver(sink.as_ref(), &message, policy).await;
        }
        tracing::info!("Alert queue closed. Alert worker shutting down.");
    })
}

async fn deliver(sink: &dyn NotificationSink, message: &str, policy: AlertPolicy) {
    for attempt in 1..=policy.max_attempts {
        match tokio::time::timeout(policy.timeout, sink.send(message)).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                tracing::warn!(attempt, error = %e, "Alert delivery failed");
            }
            Err(_) => {
                tracing::warn!(attempt, timeout = ?policy.timeout, "Alert delivery timed out");
            }
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.retry_delay).await;
        }
    }
    tracing::warn!(%message, "Giving up on alert after {} attempts", policy.max_attempts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlerterError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<String>>,
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, message: &str) -> Result<(), AlerterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(AlerterError::Sink("transient".to_string()));
            }
            self.delivered.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct HangingSink;

    #[async_trait]
    impl NotificationSink for HangingSink {
        async fn send(&self, _message: &str) -> Result<(), AlerterError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn fast_policy(max_attempts: u32) -> AlertPolicy {
        AlertPolicy {
            timeout: Duration::from_millis(50),
            max_attempts,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn worker_drains_queue_after_producers_drop() {
        let sink = Arc::new(RecordingSink::default());
        let (queue, rx) = AlertQueue::bounded(8);
        let worker = spawn_alert_worker(rx, sink.clone(), fast_policy(1));

        queue.notify("one");
        queue.notify("two".to_string());
        drop(queue);
        worker.await.unwrap();

        assert_eq!(*sink.delivered.lock().unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let sink = Arc::new(RecordingSink {
            failures_left: AtomicU32::new(1),
            ..Default::default()
        });
        let (queue, rx) = AlertQueue::bounded(8);
        let worker = spawn_alert_worker(rx, sink.clone(), fast_policy(2));
        queue.notify("retry me");
        drop(queue);
        worker.await.unwrap();

        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*sink.delivered.lock().unwrap(), vec!["retry me"]);
    }

    #[tokio::test]
    async fn persistent_failure_is_swallowed_after_max_attempts() {
        let sink = Arc::new(RecordingSink {
            failures_left: AtomicU32::new(10),
            ..Default::default()
        });
        let (queue, rx) = AlertQueue::bounded(8);
        let worker = spawn_alert_worker(rx, sink.clone(), fast_policy(3));
        queue.notify("lost");
        queue.notify("also lost");
        drop(queue);
        worker.await.unwrap();

        assert_eq!(sink.calls.load(Ordering::SeqCst), 6);
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hanging_sink_is_bounded_by_timeout() {
        let (queue, rx) = AlertQueue::bounded(8);
        let worker = spawn_alert_worker(rx, Arc::new(HangingSink), fast_policy(2));
        queue.notify("stuck");
        drop(queue);
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker should finish once attempts time out")
            .unwrap();
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (queue, mut rx) = AlertQueue::bounded(1);
        queue.notify("kept");
        queue.notify("dropped");
        assert_eq!(rx.try_recv().unwrap(), "kept");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_and_disabled_queues_do_not_panic() {
        let (queue, rx) = AlertQueue::bounded(1);
        drop(rx);
        queue.notify("nobody listening");
        AlertQueue::disabled().notify("ignored");
    }

    #[test]
    fn policy_from_config() {
        let policy = AlertPolicy::from_config(&AlertsConfig::default());
        assert_eq!(policy.timeout, Duration::from_secs(4));
        assert_eq!(policy.max_attempts, 2);
    }
}
