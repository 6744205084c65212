//! Trailing-edge debouncer.

use std::time::Duration;

use tokio::time::Instant;

/// Coalesces bursts into a single firing once no new trigger arrived for
/// `window`.
///
/// Designed for a `tokio::select!` loop:
///
/// ```ignore
/// tokio::select! {
///     _ = debouncer.wait(), if debouncer.is_armed() => {
///         debouncer.reset();
///         watcher.tick(&mut doc);
///     }
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record activity, pushing the deadline out by a full window.
    pub fn trigger(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn reset(&mut self) {
        self.deadline = None;
    }

    /// Resolve at the current deadline; pends forever when disarmed.
    pub async fn wait(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_quiet_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.trigger();
        let start = Instant::now();
        debouncer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_extends_deadline() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(60)).await;
        debouncer.trigger();
        debouncer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_millis(160));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.trigger();
        debouncer.reset();
        assert!(!debouncer.is_armed());
        let fired = tokio::time::timeout(Duration::from_secs(5), debouncer.wait()).await;
        assert!(fired.is_err());
    }
}
