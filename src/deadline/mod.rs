//! Wall-clock deadlines for snippet execution
//!
//! A [`Deadline`] is armed once per invocation. Arming spawns a watchdog
//! thread that sleeps until either the deadline elapses, in which case it
//! cancels the invocation's [`CancelToken`], or the deadline is disarmed.
//!
//! The interpreter never blocks on the watchdog; it polls the token at its
//! checkpoints (statements, loop iterations, calls) and blocking built-ins
//! wait on the token through [`CancelToken::sleep`], so a fired deadline is
//! observed promptly even in `while True: pass` or `time.sleep(60)`.
//!
//! Every invocation owns its own token and watchdog; nothing here is
//! process-global.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Shared, one-way cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Cancel the token. Cancellation cannot be undone.
    pub fn cancel(&self) {
        let _guard = self.state.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.state.cancelled.store(true, Ordering::Release);
        self.state.wake.notify_all();
    }

    /// Block for `duration` unless the token is cancelled first.
    ///
    /// Returns `true` when the full duration elapsed, `false` on cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let until = Instant::now().checked_add(duration);
        let mut guard = self.state.lock.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            guard = match until {
                Some(until) if now >= until => return true,
                Some(until) => {
                    self.state
                        .wake
                        .wait_timeout(guard, until - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self.state.wake.wait(guard).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

/// Time budget for one invocation. A zero duration means no deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    duration: Duration,
}

impl Deadline {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_unbounded(&self) -> bool {
        self.duration.is_zero()
    }

    /// Start the watchdog. When the deadline elapses before [`ArmedDeadline::disarm`]
    /// is called, `token` is cancelled.
    pub fn arm(&self, token: CancelToken) -> io::Result<ArmedDeadline> {
        let disarm = Arc::new((Mutex::new(false), Condvar::new()));

        if self.is_unbounded() {
            tracing::trace!("no deadline armed");
            return Ok(ArmedDeadline {
                disarm,
                watchdog: None,
            });
        }

        let duration = self.duration;
        let signal = Arc::clone(&disarm);
        let watchdog = thread::Builder::new()
            .name("snipbox-deadline".to_string())
            .spawn(move || watch(duration, &signal, &token))?;

        tracing::trace!(timeout_ms = duration.as_millis() as u64, "deadline armed");
        Ok(ArmedDeadline {
            disarm,
            watchdog: Some(watchdog),
        })
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

fn watch(duration: Duration, signal: &(Mutex<bool>, Condvar), token: &CancelToken) {
    let (lock, wake) = signal;
    // Too far in the future to represent: wait for disarm only
    let until = Instant::now().checked_add(duration);
    let mut disarmed = lock.lock().unwrap_or_else(PoisonError::into_inner);

    while !*disarmed {
        let now = Instant::now();
        disarmed = match until {
            Some(until) if now >= until => {
                tracing::warn!(
                    timeout_ms = duration.as_millis() as u64,
                    "deadline elapsed, cancelling execution"
                );
                token.cancel();
                return;
            }
            Some(until) => {
                wake.wait_timeout(disarmed, until - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => wake.wait(disarmed).unwrap_or_else(PoisonError::into_inner),
        };
    }
}

/// A running watchdog. Dropping it disarms the deadline.
#[derive(Debug)]
pub struct ArmedDeadline {
    disarm: Arc<(Mutex<bool>, Condvar)>,
    watchdog: Option<JoinHandle<()>>,
}

impl ArmedDeadline {
    /// Stop the watchdog and wait for it to exit
    pub fn disarm(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(watchdog) = self.watchdog.take() else {
            return;
        };

        {
            let (lock, wake) = &*self.disarm;
            let mut disarmed = lock.lock().unwrap_or_else(PoisonError::into_inner);
            *disarmed = true;
            wake.notify_all();
        }

        if watchdog.join().is_err() {
            tracing::error!("deadline watchdog panicked");
        }
        tracing::trace!("deadline disarmed");
    }
}

impl Drop for ArmedDeadline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_cancels_token() {
        let token = CancelToken::new();
        let armed = Deadline::new(Duration::from_millis(50))
            .arm(token.clone())
            .unwrap();

        let started = Instant::now();
        while !token.is_cancelled() {
            assert!(started.elapsed() < Duration::from_secs(5), "token never cancelled");
            thread::yield_now();
        }
        armed.disarm();
    }

    #[test]
    fn test_disarm_before_deadline_leaves_token_alone() {
        let token = CancelToken::new();
        let armed = Deadline::new(Duration::from_secs(30))
            .arm(token.clone())
            .unwrap();

        let started = Instant::now();
        armed.disarm();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_drop_disarms() {
        let token = CancelToken::new();
        {
            let _armed = Deadline::new(Duration::from_secs(30))
                .arm(token.clone())
                .unwrap();
        }
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_zero_duration_is_unbounded() {
        let token = CancelToken::new();
        let deadline = Deadline::new(Duration::ZERO);
        assert!(deadline.is_unbounded());
        let armed = deadline.arm(token.clone()).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!token.is_cancelled());
        armed.disarm();
    }

    #[test]
    fn test_sleep_interrupted_by_cancel() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let started = Instant::now();
        let completed = token.sleep(Duration::from_secs(10));
        assert!(!completed);
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_sleep_completes() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn test_tokens_are_independent() {
        let first = CancelToken::new();
        let second = CancelToken::new();
        first.cancel();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }
}
