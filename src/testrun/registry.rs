use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

use super::error::TestRunFailure;
use super::protocol::{TestRunOutcome, TriggerTestRunResponsePayload};

/// How many settled request ids are remembered for duplicate detection.
const SETTLED_HISTORY: usize = 1024;

type Settlement = Result<TestRunOutcome, TestRunFailure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    /// A response (or cancellation) reached the waiter.
    Resolved,
    /// The waiter gave up: timed out or was dropped.
    Abandoned,
}

/// What happened to an incoming response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No waiter wants it: late, abandoned, or never registered here.
    Discarded,
}

#[derive(Default)]
struct State {
    pending: HashMap<String, oneshot::Sender<Settlement>>,
    settled: HashMap<String, Settled>,
    settled_order: VecDeque<String>,
}

impl State {
    fn settle(&mut self, request_id: String, how: Settled) {
        if self.settled.insert(request_id.clone(), how).is_none() {
            self.settled_order.push_back(request_id);
        }
        while self.settled_order.len() > SETTLED_HISTORY {
            if let Some(oldest) = self.settled_order.pop_front() {
                self.settled.remove(&oldest);
            }
        }
    }
}

/// Correlates trigger requests with their responses by `requestId`.
///
/// Registration, resolution and abandonment all happen under one lock, so a
/// response is delivered at most once and never to the wrong waiter.
#[derive(Default)]
pub struct PendingRuns {
    state: Mutex<State>,
}

impl PendingRuns {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every mutation is a single map operation, so a poisoned lock still holds consistent state.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start waiting for `request_id`. Ids must be fresh.
    pub fn register(self: &Arc<Self>, request_id: impl Into<String>) -> Result<PendingRun, TestRunFailure> {
        let request_id = request_id.into();
        let mut state = self.lock();

        if state.pending.contains_key(&request_id) || state.settled.contains_key(&request_id) {
            return Err(TestRunFailure::ProtocolViolation {
                request_id,
                detail: "request id already in use".to_string(),
            });
        }

        let (tx, rx) = oneshot::channel();
        state.pending.insert(request_id.clone(), tx);

        Ok(PendingRun {
            request_id,
            rx,
            registry: Arc::clone(self),
            finished: false,
        })
    }

    /// Route a response to its waiter.
    ///
    /// Returns `Err` when the response itself breaks the protocol: a second
    /// response for a resolved id, or a status/body mismatch. In the latter
    /// case the waiter also receives the violation.
    pub fn resolve(&self, response: TriggerTestRunResponsePayload) -> Result<Delivery, TestRunFailure> {
        let request_id = response.request_id.clone();
        let mut state = self.lock();

        let Some(tx) = state.pending.remove(&request_id) else {
            return match state.settled.get(&request_id) {
                Some(Settled::Resolved) => {
                    tracing::warn!(%request_id, "duplicate test run response");
                    Err(TestRunFailure::ProtocolViolation {
                        request_id,
                        detail: "response for an already resolved request".to_string(),
                    })
                }
                Some(Settled::Abandoned) => {
                    tracing::info!(%request_id, "discarding late test run response");
                    Ok(Delivery::Discarded)
                }
                None => {
                    tracing::warn!(%request_id, "discarding response for unknown request");
                    Ok(Delivery::Discarded)
                }
            };
        };
        state.settle(request_id.clone(), Settled::Resolved);

        let settlement = response.into_outcome();
        let violation = settlement.as_ref().err().cloned();
        let delivered = tx.send(settlement).is_ok();

        match violation {
            Some(violation) => {
                tracing::warn!(%request_id, error = %violation, "malformed test run response");
                Err(violation)
            }
            None if delivered => Ok(Delivery::Delivered),
            None => Ok(Delivery::Discarded),
        }
    }

    /// Deliver `Cancelled` to the waiter for `request_id`, if any.
    pub fn cancel(&self, request_id: &str) -> Delivery {
        let mut state = self.lock();
        match state.pending.remove(request_id) {
            Some(tx) => {
                state.settle(request_id.to_string(), Settled::Resolved);
                if tx.send(Ok(TestRunOutcome::Cancelled)).is_ok() {
                    Delivery::Delivered
                } else {
                    Delivery::Discarded
                }
            }
            None => Delivery::Discarded,
        }
    }

    /// Fail every pending waiter, e.g. when the runner goes away.
    pub fn fail_all(&self, reason: &str) -> usize {
        let mut state = self.lock();
        let pending: Vec<_> = state.pending.drain().collect();
        let count = pending.len();
        for (request_id, tx) in pending {
            state.settle(request_id, Settled::Resolved);
            let _ = tx.send(Err(TestRunFailure::Channel(reason.to_string())));
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns `true` if the id was still pending.
    fn abandon(&self, request_id: &str) -> bool {
        let mut state = self.lock();
        if state.pending.remove(request_id).is_some() {
            state.settle(request_id.to_string(), Settled::Abandoned);
            true
        } else {
            false
        }
    }
}

/// A registered waiter. Dropping it abandons the request id.
pub struct PendingRun {
    request_id: String,
    rx: oneshot::Receiver<Settlement>,
    registry: Arc<PendingRuns>,
    finished: bool,
}

impl PendingRun {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the response, or give up after `timeout`.
    ///
    /// Whichever comes first wins. A response that lands after the deadline
    /// but before the id is abandoned is still honored.
    pub async fn wait(mut self, timeout: Duration) -> Settlement {
        let waited = tokio::time::timeout(timeout, &mut self.rx).await;
        self.finished = true;

        match waited {
            Ok(Ok(settlement)) => settlement,
            Ok(Err(_)) => Err(TestRunFailure::Channel(
                "correlation entry dropped without a response".to_string(),
            )),
            Err(_) => {
                if !self.registry.abandon(&self.request_id) {
                    if let Ok(settlement) = self.rx.try_recv() {
                        return settlement;
                    }
                }
                tracing::warn!(request_id = %self.request_id, "test run timed out");
                Err(TestRunFailure::Timeout {
                    request_id: self.request_id.clone(),
                    elapsed: timeout,
                })
            }
        }
    }
}

impl Drop for PendingRun {
    fn drop(&mut self) {
        if !self.finished {
            self.registry.abandon(&self.request_id);
        }
    }
}
