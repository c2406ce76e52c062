//! Debounced selection follower
//!
//! Moving a primary selection (say, the selected track) does not atomically
//! update the dependent secondary selection (the selected slot) in the
//! external application - there is observable latency, and re-asserting the
//! secondary selection immediately races the application's own update. The
//! follower captures the secondary index before navigation and re-applies it
//! in the background once the application has had time to settle, giving up
//! after a fixed timeout.

use crate::config::Timing;
use crate::debounce::Debouncer;
use crate::host::SelectionApi;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

struct FollowerState {
    /// Secondary index to restore; None when idle
    target_index: Option<usize>,
    /// Time of the most recent navigation edit
    last_edit: Option<Instant>,
}

/// Keeps a secondary selection eventually consistent across primary
/// navigation. One lock guards the target/timestamp pair; the retry task and
/// the navigation path never interleave inconsistently.
pub struct SelectionFollower {
    api: Arc<dyn SelectionApi>,
    state: Mutex<FollowerState>,
    debouncer: Debouncer,
    poll: Duration,
    settle: Duration,
    give_up: Duration,
}

impl SelectionFollower {
    pub fn new(api: Arc<dyn SelectionApi>, timing: &Timing) -> Arc<Self> {
        Arc::new(Self {
            api,
            state: Mutex::new(FollowerState {
                target_index: None,
                last_edit: None,
            }),
            debouncer: Debouncer::new(),
            poll: Duration::from_millis(timing.follower_poll_ms),
            settle: Duration::from_millis(timing.follower_settle_ms),
            give_up: Duration::from_millis(timing.follower_give_up_ms),
        })
    }

    /// Call before moving the primary selection. Captures the current
    /// secondary index unless a retry cycle is already chasing one.
    pub fn before_navigate(&self) {
        let mut state = self.state.lock();
        if state.target_index.is_none() {
            state.target_index = self.api.selected_index();
            trace!("follower captured target {:?}", state.target_index);
        }
    }

    /// Call after moving the primary selection. Stamps the edit time and
    /// (re)starts the retry task; a navigation burst collapses to the most
    /// recent submission.
    pub fn after_navigate(self: &Arc<Self>) {
        self.state.lock().last_edit = Some(Instant::now());
        let this = self.clone();
        self.debouncer.submit(async move {
            this.retry_loop().await;
        });
    }

    /// Secondary index the follower is currently chasing, None when idle
    pub fn pending_target(&self) -> Option<usize> {
        self.state.lock().target_index
    }

    async fn retry_loop(self: Arc<Self>) {
        loop {
            tokio::time::sleep(self.poll).await;

            let target = {
                let mut state = self.state.lock();
                let Some(target) = state.target_index else {
                    return; // nothing captured, nothing to chase
                };
                let elapsed = state
                    .last_edit
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);

                if elapsed > self.give_up {
                    debug!(
                        "follower giving up on index {} after {:?}",
                        target, elapsed
                    );
                    state.target_index = None;
                    return;
                }
                if elapsed <= self.settle {
                    continue; // still settling, check again next poll
                }
                target
            };

            if self.api.selected_index() == Some(target) {
                debug!("follower restored index {}", target);
                self.state.lock().target_index = None;
                return;
            }

            if self.api.exists(target) {
                trace!("follower re-applying index {}", target);
                self.api.select(target);
            }
            // Next pass observes whether the selection landed.
        }
    }
}
