//! Delivery tracking
//!
//! [`StatusObserver`] is the pure transition function: it decides whether a
//! newly observed status is a change worth reporting and whether polling is
//! over. [`DeliveryTracker`] drives it against a [`RelayIndex`] with a
//! deadline, a poll interval and an optional cancellation token.

use super::{RelayIndex, RelayMessage, RelayStatus};
use crate::chains::{DEFAULT_DELIVERY_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::error::{RelayError, RelayResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Callback invoked once per observed status transition
pub type StatusCallback = Box<dyn FnMut(RelayStatus) + Send>;

// ============================================================================
// State machine
// ============================================================================

/// What the poller should do after an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep polling (Inflight, Confirming or an unknown status)
    Pending,
    Delivered,
    Failed,
    Blocked,
}

/// Result of feeding one status into the observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Set when the status differs from the previous observation
    pub notify: Option<RelayStatus>,
    pub outcome: Outcome,
}

/// Tracks the last observed status of one message
#[derive(Debug, Clone, Default)]
pub struct StatusObserver {
    last: Option<RelayStatus>,
}

impl StatusObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&RelayStatus> {
        self.last.as_ref()
    }

    pub fn observe(&mut self, status: &RelayStatus) -> Step {
        let notify = if self.last.as_ref() != Some(status) {
            self.last = Some(status.clone());
            Some(status.clone())
        } else {
            None
        };

        let outcome = match status {
            RelayStatus::Delivered => Outcome::Delivered,
            RelayStatus::Failed => Outcome::Failed,
            RelayStatus::Blocked => Outcome::Blocked,
            RelayStatus::Inflight | RelayStatus::Confirming | RelayStatus::Unknown(_) => {
                Outcome::Pending
            }
        };

        Step { notify, outcome }
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Per-call options for [`DeliveryTracker::wait_for_delivery`]
#[derive(Default)]
pub struct WaitOptions {
    /// Overall deadline; the tracker default when unset
    pub timeout: Option<Duration>,
    /// Delay between polls; the tracker default when unset
    pub poll_interval: Option<Duration>,
    pub on_status_change: Option<StatusCallback>,
    pub cancel: Option<CancellationToken>,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn on_status_change(mut self, f: impl FnMut(RelayStatus) + Send + 'static) -> Self {
        self.on_status_change = Some(Box::new(f));
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl std::fmt::Debug for WaitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitOptions")
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("on_status_change", &self.on_status_change.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Polls a relay index until a message reaches a terminal status
#[derive(Clone)]
pub struct DeliveryTracker {
    index: Arc<dyn RelayIndex>,
    poll_interval: Duration,
    timeout: Duration,
}

impl DeliveryTracker {
    pub fn new(index: Arc<dyn RelayIndex>) -> Self {
        Self {
            index,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    /// Override the defaults used when [`WaitOptions`] leaves them unset
    pub fn with_defaults(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    pub fn index(&self) -> &Arc<dyn RelayIndex> {
        &self.index
    }

    /// Single lookup; [`RelayError::NotFound`] means "not indexed yet"
    pub async fn get_message(&self, guid: &str) -> RelayResult<RelayMessage> {
        self.index.get_message(guid).await
    }

    pub async fn messages_by_wallet(
        &self,
        address: &str,
        limit: usize,
    ) -> RelayResult<Vec<RelayMessage>> {
        self.index.get_messages_by_wallet(address, limit).await
    }

    /// True once delivered; a message not indexed yet is simply not delivered
    pub async fn is_delivered(&self, guid: &str) -> RelayResult<bool> {
        match self.index.get_message(guid).await {
            Ok(message) => Ok(message.is_delivered()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Poll until the message is delivered, fails, is blocked, the deadline
    /// passes or the token is cancelled.
    pub async fn wait_for_delivery(
        &self,
        guid: &str,
        opts: WaitOptions,
    ) -> RelayResult<RelayMessage> {
        let WaitOptions {
            timeout,
            poll_interval,
            mut on_status_change,
            cancel,
        } = opts;
        let timeout = timeout.filter(|d| !d.is_zero()).unwrap_or(self.timeout);
        let poll_interval = poll_interval
            .filter(|d| !d.is_zero())
            .unwrap_or(self.poll_interval);
        let cancel = cancel.unwrap_or_default();

        let deadline = Instant::now() + timeout;
        let mut observer = StatusObserver::new();

        info!(
            guid = %guid,
            timeout_secs = timeout.as_secs(),
            poll_ms = poll_interval.as_millis() as u64,
            "Waiting for LayerZero delivery"
        );

        loop {
            if cancel.is_cancelled() {
                return Err(RelayError::Cancelled {
                    guid: guid.to_string(),
                });
            }
            if Instant::now() >= deadline {
                warn!(guid = %guid, ?timeout, "Timed out waiting for delivery");
                return Err(RelayError::Timeout {
                    guid: guid.to_string(),
                    timeout,
                });
            }

            let lookup = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(RelayError::Cancelled { guid: guid.to_string() });
                }
                res = self.index.get_message(guid) => res,
            };

            match lookup {
                Err(e) if e.is_not_found() => {
                    debug!(guid = %guid, "Message not indexed yet");
                }
                Err(e) => return Err(e),
                Ok(message) => {
                    let step = observer.observe(&message.status);

                    if let Some(status) = step.notify {
                        info!(guid = %guid, status = %status, "LayerZero status changed");
                        if let Some(callback) = on_status_change.as_mut() {
                            callback(status);
                        }
                    }

                    match step.outcome {
                        Outcome::Delivered => {
                            info!(
                                guid = %guid,
                                dst_tx_hash = message.dst_tx_hash.as_deref().unwrap_or(""),
                                "Message delivered"
                            );
                            return Ok(message);
                        }
                        Outcome::Failed => {
                            return Err(RelayError::MessageFailed {
                                guid: guid.to_string(),
                            })
                        }
                        Outcome::Blocked => {
                            return Err(RelayError::MessageBlocked {
                                guid: guid.to_string(),
                            })
                        }
                        Outcome::Pending => {}
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(RelayError::Cancelled { guid: guid.to_string() });
                }
                _ = tokio::time::sleep(poll_interval.min(remaining)) => {}
            }
        }
    }
}

impl std::fmt::Debug for DeliveryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryTracker")
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRelayIndex, Scripted};
    use std::sync::Mutex;

    const GUID: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    fn recorder() -> (Arc<Mutex<Vec<RelayStatus>>>, impl FnMut(RelayStatus) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |s| sink.lock().unwrap().push(s))
    }

    fn tracker(index: &Arc<MockRelayIndex>) -> DeliveryTracker {
        DeliveryTracker::new(index.clone())
            .with_defaults(Duration::from_secs(10), Duration::from_secs(600))
    }

    #[test]
    fn test_observer_notifies_once_per_transition() {
        let mut observer = StatusObserver::new();

        let first = observer.observe(&RelayStatus::Inflight);
        assert_eq!(first.notify, Some(RelayStatus::Inflight));
        assert_eq!(first.outcome, Outcome::Pending);

        let repeat = observer.observe(&RelayStatus::Inflight);
        assert_eq!(repeat.notify, None);

        let confirming = observer.observe(&RelayStatus::Confirming);
        assert_eq!(confirming.notify, Some(RelayStatus::Confirming));
        assert_eq!(confirming.outcome, Outcome::Pending);

        let done = observer.observe(&RelayStatus::Delivered);
        assert_eq!(done.notify, Some(RelayStatus::Delivered));
        assert_eq!(done.outcome, Outcome::Delivered);
        assert_eq!(observer.last(), Some(&RelayStatus::Delivered));
    }

    #[test]
    fn test_observer_terminal_outcomes() {
        let mut observer = StatusObserver::new();
        assert_eq!(observer.observe(&RelayStatus::Failed).outcome, Outcome::Failed);
        assert_eq!(observer.observe(&RelayStatus::Blocked).outcome, Outcome::Blocked);
        assert_eq!(
            observer.observe(&RelayStatus::Unknown("STORED".into())).outcome,
            Outcome::Pending
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivered_on_third_poll() {
        let index = Arc::new(MockRelayIndex::new(vec![
            Scripted::Status(RelayStatus::Inflight),
            Scripted::Status(RelayStatus::Confirming),
            Scripted::Status(RelayStatus::Delivered),
        ]));
        let (seen, callback) = recorder();

        let message = tracker(&index)
            .wait_for_delivery(GUID, WaitOptions::new().on_status_change(callback))
            .await
            .unwrap();

        assert_eq!(message.status, RelayStatus::Delivered);
        assert_eq!(message.guid, GUID);
        assert_eq!(index.calls(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                RelayStatus::Inflight,
                RelayStatus::Confirming,
                RelayStatus::Delivered
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_not_repeated_for_same_status() {
        let index = Arc::new(MockRelayIndex::new(vec![
            Scripted::Status(RelayStatus::Inflight),
            Scripted::Status(RelayStatus::Inflight),
            Scripted::Status(RelayStatus::Inflight),
            Scripted::Status(RelayStatus::Delivered),
        ]));
        let (seen, callback) = recorder();

        tracker(&index)
            .wait_for_delivery(GUID, WaitOptions::new().on_status_change(callback))
            .await
            .unwrap();

        assert_eq!(index.calls(), 4);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_retried_silently() {
        let index = Arc::new(MockRelayIndex::new(vec![
            Scripted::NotFound,
            Scripted::NotFound,
            Scripted::Status(RelayStatus::Delivered),
        ]));
        let (seen, callback) = recorder();

        let started = Instant::now();
        tracker(&index)
            .wait_for_delivery(
                GUID,
                WaitOptions::new()
                    .poll_interval(Duration::from_secs(5))
                    .on_status_change(callback),
            )
            .await
            .unwrap();

        assert_eq!(index.calls(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![RelayStatus::Delivered]);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_resolving_message_times_out() {
        let index = Arc::new(MockRelayIndex::repeating(Scripted::Status(RelayStatus::Inflight)));

        let err = tracker(&index)
            .wait_for_delivery(
                GUID,
                WaitOptions::new()
                    .timeout(Duration::from_secs(35))
                    .poll_interval(Duration::from_secs(10)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Timeout { .. }));
        // polls at 0s, 10s, 20s, 30s; the last sleep is clipped to the deadline
        assert_eq!(index.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_and_blocked_are_errors() {
        let failed = Arc::new(MockRelayIndex::new(vec![
            Scripted::Status(RelayStatus::Inflight),
            Scripted::Status(RelayStatus::Failed),
        ]));
        let err = tracker(&failed)
            .wait_for_delivery(GUID, WaitOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MessageFailed { ref guid } if guid == GUID));

        let blocked = Arc::new(MockRelayIndex::new(vec![Scripted::Status(RelayStatus::Blocked)]));
        let err = tracker(&blocked)
            .wait_for_delivery(GUID, WaitOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MessageBlocked { .. }));
        assert!(err.to_string().contains("blocked by DVN"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_not_retried() {
        let index = Arc::new(MockRelayIndex::new(vec![
            Scripted::HttpStatus(500),
            Scripted::Status(RelayStatus::Delivered),
        ]));

        let err = tracker(&index)
            .wait_for_delivery(GUID, WaitOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Status { status: 500, .. }));
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_poll() {
        let index = Arc::new(MockRelayIndex::repeating(Scripted::Status(RelayStatus::Inflight)));
        let token = CancellationToken::new();
        token.cancel();

        let err = tracker(&index)
            .wait_for_delivery(GUID, WaitOptions::new().cancel_token(token))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Cancelled { .. }));
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let index = Arc::new(MockRelayIndex::repeating(Scripted::Status(RelayStatus::Inflight)));
        let token = CancellationToken::new();
        let trigger = token.clone();

        let started = Instant::now();
        let err = tracker(&index)
            .wait_for_delivery(
                GUID,
                WaitOptions::new()
                    .poll_interval(Duration::from_secs(60))
                    .cancel_token(token)
                    .on_status_change(move |_| trigger.cancel()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Cancelled { .. }));
        assert_eq!(index.calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_is_delivered_treats_not_found_as_false() {
        let pending = MockRelayIndex::new(vec![Scripted::NotFound]);
        assert!(!DeliveryTracker::new(Arc::new(pending)).is_delivered(GUID).await.unwrap());

        let done = MockRelayIndex::new(vec![Scripted::Status(RelayStatus::Delivered)]);
        assert!(DeliveryTracker::new(Arc::new(done)).is_delivered(GUID).await.unwrap());

        let broken = MockRelayIndex::new(vec![Scripted::HttpStatus(502)]);
        assert!(DeliveryTracker::new(Arc::new(broken)).is_delivered(GUID).await.is_err());
    }
}
