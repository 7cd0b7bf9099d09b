// Log volume provider: dispatches a count_over_time request and reduces the partial
// results into one stacked-bar frame per level. At most one upstream subscription
// per provider; a new get_data() releases the previous one.

pub mod aggregation;

use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tracing::{debug, info, warn};

use crate::error::QueryError;
use crate::models::{Frame, LogsVolume, QueryRequest, QueryResponse, to_frame};
use crate::query_client::{QueryClient, QueryResponseStream};
use crate::query_expr::volume_request;

pub use aggregation::aggregate_logs_volume;

enum SubscriptionState {
    /// Created, upstream not dispatched yet.
    Pending,
    Active(QueryResponseStream),
    /// Released; the upstream stream (if any) has been dropped.
    Released,
}

/// Handle to one upstream subscription, shared by the provider and the stream it returned.
/// Releasing drops the upstream stream immediately; further polls see the release.
#[derive(Clone)]
pub struct Subscription {
    state: Arc<Mutex<SubscriptionState>>,
}

impl Subscription {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubscriptionState::Pending)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SubscriptionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops delivery and frees the upstream. Idempotent.
    pub fn unsubscribe(&self) {
        let previous = std::mem::replace(&mut *self.lock(), SubscriptionState::Released);
        drop(previous);
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.lock(), SubscriptionState::Released)
    }

    /// Stores the dispatched upstream. Returns false (dropping it) if already released.
    fn attach(&self, upstream: QueryResponseStream) -> bool {
        let mut state = self.lock();
        match *state {
            SubscriptionState::Pending => {
                *state = SubscriptionState::Active(upstream);
                true
            }
            _ => false,
        }
    }

    /// `None` once the subscription is no longer active.
    fn poll_upstream(
        &self,
        cx: &mut Context<'_>,
    ) -> Option<Poll<Option<Result<QueryResponse, QueryError>>>> {
        match &mut *self.lock() {
            SubscriptionState::Active(upstream) => Some(upstream.poll_next_unpin(cx)),
            _ => None,
        }
    }
}

/// Provides log volume for one fixed base request.
pub struct LogsVolumeProvider {
    client: Arc<dyn QueryClient>,
    request: QueryRequest,
    current: Option<Subscription>,
}

impl LogsVolumeProvider {
    pub fn new(client: Arc<dyn QueryClient>, request: QueryRequest) -> Self {
        Self {
            client,
            request,
            current: None,
        }
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Subscription of the latest `get_data()` call, if any.
    pub fn current_subscription(&self) -> Option<&Subscription> {
        self.current.as_ref()
    }

    /// Lazy snapshot stream: loading first, then one terminal success or error snapshot.
    /// Supersedes (releases) the stream returned by the previous call.
    pub fn get_data(&mut self) -> LogsVolumeStream {
        if let Some(previous) = self.current.take() {
            previous.unsubscribe();
        }

        let request = volume_request(&self.request);
        let subscription = Subscription::new();
        self.current = Some(subscription.clone());

        LogsVolumeStream {
            client: self.client.clone(),
            request: Some(request),
            subscription,
            phase: Phase::Idle,
        }
    }
}

enum Phase {
    Idle,
    Accumulating(Vec<Frame>),
    Done,
}

/// Output of [`LogsVolumeProvider::get_data`]. Dropping it cancels the upstream request.
pub struct LogsVolumeStream {
    client: Arc<dyn QueryClient>,
    request: Option<QueryRequest>,
    subscription: Subscription,
    phase: Phase,
}

impl LogsVolumeStream {
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn finish(&mut self) {
        self.phase = Phase::Done;
        self.subscription.unsubscribe();
    }
}

impl Stream for LogsVolumeStream {
    type Item = LogsVolume;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<LogsVolume>> {
        let this = self.get_mut();
        loop {
            match &mut this.phase {
                Phase::Idle => {
                    let Some(request) = this.request.take() else {
                        this.finish();
                        return Poll::Ready(None);
                    };
                    if this.subscription.is_closed() {
                        this.finish();
                        return Poll::Ready(None);
                    }
                    info!(
                        request_id = %request.request_id,
                        targets = request.targets.len(),
                        "dispatching logs volume request"
                    );
                    let upstream = this.client.query(request);
                    if !this.subscription.attach(upstream) {
                        this.finish();
                        return Poll::Ready(None);
                    }
                    this.phase = Phase::Accumulating(Vec::new());
                    return Poll::Ready(Some(LogsVolume::loading()));
                }
                Phase::Accumulating(frames) => match this.subscription.poll_upstream(cx) {
                    None => {
                        debug!("logs volume subscription released before completion");
                        this.phase = Phase::Done;
                        return Poll::Ready(None);
                    }
                    Some(Poll::Pending) => return Poll::Pending,
                    Some(Poll::Ready(Some(Ok(response)))) => {
                        frames.extend(response.data.into_iter().map(to_frame));
                    }
                    Some(Poll::Ready(Some(Err(e)))) => {
                        warn!(error = %e, "logs volume query failed");
                        this.finish();
                        return Poll::Ready(Some(LogsVolume::failed(e)));
                    }
                    Some(Poll::Ready(None)) => {
                        let raw = std::mem::take(frames);
                        this.finish();
                        let data = aggregate_logs_volume(&raw);
                        debug!(
                            raw_frames = raw.len(),
                            levels = data.len(),
                            "logs volume aggregated"
                        );
                        return Poll::Ready(Some(LogsVolume::done(data)));
                    }
                },
                Phase::Done => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for LogsVolumeStream {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
