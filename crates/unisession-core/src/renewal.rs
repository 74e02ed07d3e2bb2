//! Cancellable one-shot renewal timer.
//!
//! [`RenewalTimer`] holds at most one pending task. Arming it for a new
//! access token aborts whatever was pending; arming it again for the token
//! already pending is a no-op. A task that fires releases its slot before it
//! runs, so the task itself may arm the next timer.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::tokens::AccessToken;

/// Delay until renewal is due for a token expiring at `expiry`.
///
/// Returns [`Duration::ZERO`] when `expiry - lead` is already in the past.
pub fn renewal_delay(expiry: DateTime<Utc>, now: DateTime<Utc>, lead: Duration) -> Duration {
    let lead = TimeDelta::from_std(lead).unwrap_or(TimeDelta::MAX);
    expiry
        .signed_duration_since(now)
        .checked_sub(&lead)
        .and_then(|remaining| remaining.to_std().ok())
        .unwrap_or(Duration::ZERO)
}

/// A single-slot scheduler for proactive renewal.
#[derive(Default)]
pub struct RenewalTimer {
    slot: Arc<Mutex<Option<Armed>>>,
    generations: AtomicU64,
}

struct Armed {
    generation: u64,
    token: AccessToken,
    handle: JoinHandle<()>,
}

impl RenewalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` on behalf of `token`.
    ///
    /// Returns `false` if a timer for the same token is already pending, in
    /// which case `task` is dropped. Must be called from within a Tokio
    /// runtime.
    pub fn arm<F>(&self, token: &AccessToken, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(armed) = slot.as_ref()
            && armed.token == *token
            && !armed.handle.is_finished()
        {
            trace!("Renewal already pending for this token");
            return false;
        }

        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);

        let release = Arc::downgrade(&self.slot);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Detach before running so the task can re-arm without aborting itself
            if let Some(slot) = release.upgrade() {
                let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.as_ref().is_some_and(|armed| armed.generation == generation) {
                    slot.take();
                }
            }

            task.await;
        });

        *slot = Some(Armed {
            generation,
            token: token.clone(),
            handle,
        });
        true
    }

    /// Abort the pending timer, if any.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.take() {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a timer is pending.
    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|armed| !armed.handle.is_finished())
    }
}

impl Drop for RenewalTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for RenewalTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewalTimer")
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let shared = count.clone();
        let make = move || {
            let shared = shared.clone();
            Box::pin(async move {
                shared.fetch_add(1, Ordering::SeqCst);
            }) as std::pin::Pin<Box<dyn Future<Output = ()> + Send>>
        };
        (count, make)
    }

    #[test]
    fn delay_is_expiry_minus_lead() {
        let now = Utc::now();
        let expiry = now + TimeDelta::seconds(90);
        assert_eq!(
            renewal_delay(expiry, now, Duration::from_secs(60)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn delay_saturates_inside_lead_window() {
        let now = Utc::now();
        assert_eq!(
            renewal_delay(now + TimeDelta::seconds(59), now, Duration::from_secs(60)),
            Duration::ZERO
        );
        assert_eq!(
            renewal_delay(now - TimeDelta::hours(1), now, Duration::from_secs(60)),
            Duration::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let timer = RenewalTimer::new();
        let (count, task) = counter();

        assert!(timer.arm(&AccessToken::new("a"), Duration::from_secs(30), task()));
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn same_token_is_not_armed_twice() {
        let timer = RenewalTimer::new();
        let (count, task) = counter();
        let token = AccessToken::new("a");

        assert!(timer.arm(&token, Duration::from_secs(10), task()));
        assert!(!timer.arm(&token, Duration::from_secs(5), task()));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn new_token_replaces_pending_timer() {
        let timer = RenewalTimer::new();
        let (count, task) = counter();

        timer.arm(&AccessToken::new("old"), Duration::from_secs(10), task());
        timer.arm(&AccessToken::new("new"), Duration::from_secs(20), task());
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let timer = RenewalTimer::new();
        let (count, task) = counter();

        timer.arm(&AccessToken::new("a"), Duration::from_secs(10), task());
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn task_can_rearm_without_aborting_itself() {
        let timer = Arc::new(RenewalTimer::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let inner_timer = timer.clone();
        let inner_finished = finished.clone();
        timer.arm(&AccessToken::new("first"), Duration::from_secs(5), async move {
            inner_timer.arm(&AccessToken::new("second"), Duration::from_secs(60), async {});
            tokio::task::yield_now().await;
            inner_finished.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(timer.is_armed());
        assert!(!timer.arm(&AccessToken::new("second"), Duration::from_secs(1), async {}));
    }
}
