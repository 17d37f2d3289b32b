//! Single-flight, rate-limited refresh of the signed-in user's profile.
//!
//! Several UI events can react to the same authentication change at once.
//! Overlapping refreshes join the one already running, and no new refresh
//! starts within `min_interval` of the previous start; throttled callers get
//! the last profile that loaded successfully.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::orders::domain::Actor;

/// Profile resolved by the session layer.
pub type UserProfile = Actor;

type FlightResult<P> = Option<Result<P, RefreshError>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("profile source failed: {0}")]
    Source(String),
    #[error("in-flight profile refresh was abandoned")]
    Abandoned,
}

/// How a call to [`ProfileRefresher::refresh`] was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome<P> {
    /// This call ran the loader.
    Refreshed(P),
    /// This call waited on a refresh started by another caller.
    Joined(P),
    /// Too soon after the previous start; carries the last loaded profile.
    Throttled(Option<P>),
}

impl<P> RefreshOutcome<P> {
    pub fn profile(&self) -> Option<&P> {
        match self {
            RefreshOutcome::Refreshed(profile) | RefreshOutcome::Joined(profile) => Some(profile),
            RefreshOutcome::Throttled(profile) => profile.as_ref(),
        }
    }
}

struct RefreshState<P> {
    in_flight: Option<watch::Receiver<FlightResult<P>>>,
    last_started: Option<Instant>,
    last_profile: Option<P>,
}

pub struct ProfileRefresher<P = UserProfile> {
    state: Mutex<RefreshState<P>>,
    min_interval: Duration,
}

enum Entry<P> {
    Lead(watch::Sender<FlightResult<P>>),
    Join(watch::Receiver<FlightResult<P>>),
    Throttled(Option<P>),
}

impl<P: Clone> ProfileRefresher<P> {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: Mutex::new(RefreshState {
                in_flight: None,
                last_started: None,
                last_profile: None,
            }),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_profile(&self) -> Option<P> {
        self.lock().last_profile.clone()
    }

    /// Refresh through `load`, unless a refresh is already running or one
    /// started less than `min_interval` ago.
    pub async fn refresh<F, Fut>(&self, load: F) -> Result<RefreshOutcome<P>, RefreshError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, RefreshError>>,
    {
        let sender = match self.enter() {
            Entry::Lead(sender) => sender,
            Entry::Join(receiver) => {
                debug!("joining in-flight profile refresh");
                return wait_for(receiver).await.map(RefreshOutcome::Joined);
            }
            Entry::Throttled(profile) => {
                debug!(min_interval_ms = self.min_interval.as_millis() as u64, "profile refresh throttled");
                return Ok(RefreshOutcome::Throttled(profile));
            }
        };

        let result = load().await;

        {
            let mut state = self.lock();
            state.in_flight = None;
            if let Ok(profile) = &result {
                state.last_profile = Some(profile.clone());
            }
        }
        sender.send_replace(Some(result.clone()));

        result.map(RefreshOutcome::Refreshed)
    }

    fn enter(&self) -> Entry<P> {
        let mut state = self.lock();

        if let Some(receiver) = &state.in_flight {
            // A closed channel means the leader was dropped before finishing.
            if receiver.has_changed().is_ok() {
                return Entry::Join(receiver.clone());
            }
            state.in_flight = None;
        }

        let now = Instant::now();
        if let Some(started) = state.last_started {
            if now.duration_since(started) < self.min_interval {
                return Entry::Throttled(state.last_profile.clone());
            }
        }

        let (sender, receiver) = watch::channel(None);
        state.in_flight = Some(receiver);
        state.last_started = Some(now);
        Entry::Lead(sender)
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn wait_for<P: Clone>(
    mut receiver: watch::Receiver<FlightResult<P>>,
) -> Result<P, RefreshError> {
    loop {
        let current = (*receiver.borrow_and_update()).clone();
        if let Some(result) = current {
            return result;
        }
        if receiver.changed().await.is_err() {
            return Err(RefreshError::Abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::orders::domain::{Role, UserId};

    fn profile(user: &str) -> UserProfile {
        Actor {
            user_id: UserId(user.to_string()),
            role: Role::Employee,
            company_id: None,
        }
    }

    async fn slow_load(calls: Arc<AtomicUsize>, user: &'static str) -> Result<UserProfile, RefreshError> {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(profile(user))
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_collapse_into_one_load() {
        let refresher = ProfileRefresher::new(Duration::from_secs(2));
        let calls = Arc::new(AtomicUsize::new(0));

        let (first, second, third) = tokio::join!(
            refresher.refresh(|| slow_load(calls.clone(), "u-1")),
            refresher.refresh(|| slow_load(calls.clone(), "u-1")),
            refresher.refresh(|| slow_load(calls.clone(), "u-1")),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, Ok(RefreshOutcome::Refreshed(profile("u-1"))));
        assert_eq!(second, Ok(RefreshOutcome::Joined(profile("u-1"))));
        assert_eq!(third, Ok(RefreshOutcome::Joined(profile("u-1"))));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_within_min_interval_is_throttled() {
        let refresher = ProfileRefresher::new(Duration::from_secs(2));
        let calls = Arc::new(AtomicUsize::new(0));

        refresher
            .refresh(|| slow_load(calls.clone(), "u-1"))
            .await
            .expect("first refresh");

        let outcome = refresher
            .refresh(|| slow_load(calls.clone(), "u-2"))
            .await
            .expect("throttled refresh");
        assert_eq!(outcome, RefreshOutcome::Throttled(Some(profile("u-1"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;

        let outcome = refresher
            .refresh(|| slow_load(calls.clone(), "u-2"))
            .await
            .expect("refresh after interval");
        assert_eq!(outcome, RefreshOutcome::Refreshed(profile("u-2")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.last_profile(), Some(profile("u-2")));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_is_shared_and_keeps_previous_profile() {
        let refresher = ProfileRefresher::new(Duration::from_millis(500));
        refresher
            .refresh(|| async { Ok(profile("u-1")) })
            .await
            .expect("seed refresh");
        tokio::time::advance(Duration::from_millis(500)).await;

        let failing = || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(RefreshError::Source("auth backend offline".to_string()))
        };
        let (lead, joined) = tokio::join!(refresher.refresh(failing), refresher.refresh(failing));

        let expected = Err(RefreshError::Source("auth backend offline".to_string()));
        assert_eq!(lead, expected);
        assert_eq!(joined, expected);
        assert_eq!(refresher.last_profile(), Some(profile("u-1")));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_leader_does_not_wedge_later_refreshes() {
        let refresher = ProfileRefresher::new(Duration::from_millis(100));

        let abandoned = refresher.refresh(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(profile("never"))
        });
        // Poll the leader once, then drop it mid-flight.
        let _ = tokio::time::timeout(Duration::from_millis(10), abandoned).await;

        tokio::time::advance(Duration::from_millis(100)).await;
        let outcome = refresher
            .refresh(|| async { Ok(profile("u-3")) })
            .await
            .expect("fresh refresh");
        assert_eq!(outcome, RefreshOutcome::Refreshed(profile("u-3")));
    }
}
