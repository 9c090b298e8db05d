//! Polling schedule and progress reporting for [`Job::wait_until_completed`].
//!
//! The schedule is a capped exponential backoff: the first wait is
//! [`INITIAL_POLL_WAIT`], every following wait is the previous one times 1.5,
//! never exceeding the configured maximum. Fast jobs are noticed quickly and
//! slow jobs are not hammered with status requests.
//!
//! [`Job::wait_until_completed`]: crate::Job::wait_until_completed

use std::io::{self, Write};
use std::time::Duration;

use crate::job::{JobId, JobStatus};

/// Wait before the first re-poll.
pub const INITIAL_POLL_WAIT: Duration = Duration::from_millis(200);

/// Default ceiling for a single wait.
pub const DEFAULT_MAX_POLL_WAIT: Duration = Duration::from_secs(30);

/// Infinite iterator over successive poll waits.
///
/// Each item equals `min(previous * 1.5, max_wait)`; the first item is
/// `min(200ms, max_wait)`.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    next: Duration,
    max_wait: Duration,
}

impl PollBackoff {
    /// Create a schedule capped at `max_wait`.
    pub fn new(max_wait: Duration) -> Self {
        Self {
            next: INITIAL_POLL_WAIT.min(max_wait),
            max_wait,
        }
    }

    /// The wait the next call to `next()` will yield.
    pub fn peek(&self) -> Duration {
        self.next
    }

    /// Ceiling of the schedule.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POLL_WAIT)
    }
}

impl Iterator for PollBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = if current >= self.max_wait {
            self.max_wait
        } else {
            // x1.5 in integer nanoseconds keeps the schedule exact
            current
                .checked_mul(3)
                .map_or(self.max_wait, |tripled| (tripled / 2).min(self.max_wait))
        };
        Some(current)
    }
}

/// Options for [`Job::wait_until_completed`](crate::Job::wait_until_completed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Ceiling for a single wait between polls.
    pub max_poll_wait: Duration,
    /// Give up after this much time has passed since the wait started.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            max_poll_wait: DEFAULT_MAX_POLL_WAIT,
            timeout: None,
        }
    }
}

impl WaitOptions {
    /// Set the ceiling for a single wait.
    pub fn with_max_poll_wait(mut self, max_poll_wait: Duration) -> Self {
        self.max_poll_wait = max_poll_wait;
        self
    }

    /// Set the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The backoff schedule these options describe.
    pub fn backoff(&self) -> PollBackoff {
        PollBackoff::new(self.max_poll_wait)
    }
}

/// Receives one notification per poll of a non-terminal job.
///
/// Implementations are cosmetic: they must not fail the wait.
pub trait PollObserver: Send {
    /// Called before sleeping for `next_wait` because `status` is not terminal.
    fn on_poll(&mut self, job_id: &JobId, status: &JobStatus, next_wait: Duration);

    /// Called once when the wait ends, successfully or not, after `polls` polls.
    fn on_finish(&mut self, job_id: &JobId, status: &JobStatus, polls: usize);
}

/// Observer that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl PollObserver for NoProgress {
    fn on_poll(&mut self, _job_id: &JobId, _status: &JobStatus, _next_wait: Duration) {}

    fn on_finish(&mut self, _job_id: &JobId, _status: &JobStatus, _polls: usize) {}
}

/// Prints one `.` per poll and a closing newline if anything was printed.
#[derive(Debug)]
pub struct DotProgress<W> {
    out: W,
}

impl DotProgress<io::Stdout> {
    /// Report to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> DotProgress<W> {
    /// Report to an arbitrary writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> PollObserver for DotProgress<W> {
    fn on_poll(&mut self, _job_id: &JobId, _status: &JobStatus, _next_wait: Duration) {
        let _ = self.out.write_all(b".");
        let _ = self.out.flush();
    }

    fn on_finish(&mut self, _job_id: &JobId, _status: &JobStatus, polls: usize) {
        if polls > 0 {
            let _ = self.out.write_all(b"\n");
            let _ = self.out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_backoff_default_schedule() {
        let waits: Vec<Duration> = PollBackoff::default().take(4).collect();
        assert_eq!(waits[0], Duration::from_millis(200));
        assert_eq!(waits[1], Duration::from_millis(300));
        assert_eq!(waits[2], Duration::from_millis(450));
        assert_eq!(waits[3], Duration::from_millis(675));
    }

    #[test]
    fn test_backoff_reaches_and_stays_at_ceiling() {
        let max = Duration::from_secs(1);
        let waits: Vec<Duration> = PollBackoff::new(max).take(10).collect();
        // 0.2, 0.3, 0.45, 0.675, then capped
        assert_eq!(waits[4], max);
        assert!(waits[4..].iter().all(|w| *w == max));
    }

    #[test]
    fn test_backoff_ceiling_below_initial_wait() {
        let max = Duration::from_millis(50);
        let waits: Vec<Duration> = PollBackoff::new(max).take(3).collect();
        assert_eq!(waits, vec![max, max, max]);
    }

    #[test]
    fn test_backoff_survives_unbounded_ceiling() {
        let mut backoff = PollBackoff::new(Duration::MAX);
        for _ in 0..500 {
            backoff.next();
        }
        assert!(backoff.peek() <= Duration::MAX);
    }

    #[test]
    fn test_dot_progress_prints_newline_only_after_polls() {
        let id = JobId::new("j");
        let mut quiet = DotProgress::new(Vec::new());
        quiet.on_finish(&id, &JobStatus::Succeeded, 0);
        assert!(quiet.into_inner().is_empty());

        let mut chatty = DotProgress::new(Vec::new());
        chatty.on_poll(&id, &JobStatus::Waiting, Duration::from_millis(200));
        chatty.on_poll(&id, &JobStatus::Executing, Duration::from_millis(300));
        chatty.on_finish(&id, &JobStatus::Succeeded, 2);
        assert_eq!(chatty.into_inner(), b"..\n");
    }

    #[test]
    fn test_wait_options_builder() {
        let options = WaitOptions::default()
            .with_max_poll_wait(Duration::from_secs(5))
            .with_timeout(Duration::from_secs(60));
        assert_eq!(options.max_poll_wait, Duration::from_secs(5));
        assert_eq!(options.timeout, Some(Duration::from_secs(60)));
        assert_eq!(options.backoff().max_wait(), Duration::from_secs(5));
    }

    proptest! {
        #[test]
        fn test_backoff_monotone_and_bounded(max_ms in 1_u64..120_000, steps in 1_usize..60) {
            let max = Duration::from_millis(max_ms);
            let waits: Vec<Duration> = PollBackoff::new(max).take(steps).collect();

            prop_assert_eq!(waits[0], INITIAL_POLL_WAIT.min(max));
            for pair in waits.windows(2) {
                prop_assert!(pair[1] >= pair[0]);
                prop_assert_eq!(pair[1], (pair[0] * 3 / 2).min(max));
            }
            prop_assert!(waits.iter().all(|w| *w <= max));
        }
    }
}
