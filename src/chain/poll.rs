//! Bounded polling
//!
//! The node only tells us a transaction was mined when we ask, so every wait
//! is a loop of "ask, sleep" with a deadline.

use std::future::Future;
use std::time::{Duration, Instant};

/// Interval between receipt lookups
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How often to ask and for how long
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub deadline: Duration,
}

impl PollSchedule {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

/// Run `attempt` until it yields a value or the deadline passes.
///
/// Returns `Ok(None)` on expiry. An attempt is only started while time
/// remains and is abandoned when the deadline passes, so the call returns
/// within `deadline + interval`. Errors from `attempt` end the loop
/// immediately.
pub async fn poll_until<T, E, F, Fut>(schedule: PollSchedule, mut attempt: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    while let Some(remaining) = schedule
        .deadline
        .checked_sub(start.elapsed())
        .filter(|r| !r.is_zero())
    {
        attempts += 1;
        match tokio::time::timeout(remaining, attempt()).await {
            Ok(result) => {
                if let Some(value) = result? {
                    log::debug!("poll satisfied after {} attempt(s)", attempts);
                    return Ok(Some(value));
                }
            }
            Err(_) => {
                log::debug!("poll attempt {} still running at the deadline", attempts);
                break;
            }
        }
        tokio::time::sleep(schedule.interval).await;
    }

    log::debug!(
        "poll gave up after {} attempt(s) in {:?}",
        attempts,
        start.elapsed()
    );
    Ok(None)
}
