use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Stop request shared between a polling loop and whoever ends it.
///
/// The target watcher sleeps on this between discovery scans, so a Ctrl-C
/// handler stops it at once rather than after the next interval. The flag
/// lives under the same mutex the waiters park on; a trigger can never slip
/// in between a waiter's check and its wait.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// The flag stays valid across a poisoned lock.
    fn state(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Request shutdown and wake every waiter. Repeated calls are harmless.
    pub fn trigger(&self) {
        *self.state() = true;
        self.wake.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        *self.state()
    }

    /// Sleep for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` when shutdown was requested, before or during the wait.
    pub fn wait(&self, duration: Duration) -> bool {
        let guard = self.state();
        if *guard {
            return true;
        }

        match self.wake.wait_timeout_while(guard, duration, |stopped| !*stopped) {
            Ok((stopped, _)) => *stopped,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_trigger_is_sticky() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());

        signal.trigger();
        signal.trigger();
        assert!(signal.is_shutdown());
        assert!(signal.wait(Duration::from_secs(10)));
    }

    #[test]
    fn test_full_wait_reports_no_shutdown() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();

        assert!(!signal.wait(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn test_trigger_wakes_all_waiters() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let signal = Arc::clone(&signal);
                thread::spawn(move || {
                    let start = Instant::now();
                    (signal.wait(Duration::from_secs(10)), start.elapsed())
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        signal.trigger();

        for waiter in waiters {
            let (stopped, elapsed) = waiter.join().unwrap();
            assert!(stopped);
            assert!(elapsed < Duration::from_secs(2));
        }
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let signal = Arc::new(ShutdownSignal::new());
        let poisoner = Arc::clone(&signal);
        let _ = thread::spawn(move || {
            let _guard = poisoner.stopped.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(!signal.is_shutdown());
        signal.trigger();
        assert!(signal.wait(Duration::from_secs(10)));
    }
}
