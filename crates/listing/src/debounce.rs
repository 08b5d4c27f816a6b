//! Trailing-edge debounce for rapidly changing values.
//!
//! The debounced value follows the input only once the input has stayed
//! unchanged for the whole delay. Each input change restarts the wait.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A value that lags its input by a quiet period.
///
/// Owns one background task holding at most one pending timer. The task is
/// aborted when the handle drops, so no timer outlives its owner.
pub struct Debounced<T> {
    input: watch::Sender<T>,
    output: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Debounced<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start debouncing with `initial` as both input and output.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input, input_rx) = watch::channel(initial.clone());
        let (output_tx, output) = watch::channel(initial);
        let task = tokio::spawn(run(input_rx, output_tx, delay));

        Self {
            input,
            output,
            task,
        }
    }

    /// Feed a new input value. Setting the current input again is a no-op.
    pub fn set(&self, value: T) {
        self.input.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Current debounced value.
    #[must_use]
    pub fn get(&self) -> T {
        self.output.borrow().clone()
    }

    /// The input differs from the debounced value.
    #[must_use]
    pub fn pending(&self) -> bool {
        *self.input.borrow() != *self.output.borrow()
    }

    /// Receiver notified on every debounced update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.clone()
    }
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Debounced<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounced")
            .field("input", &*self.input.borrow())
            .field("output", &*self.output.borrow())
            .finish()
    }
}

async fn run<T>(mut input: watch::Receiver<T>, output: watch::Sender<T>, delay: Duration)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    // Wait for the first change of a burst
    while input.changed().await.is_ok() {
        // Restart the timer on every further change until a full quiet period passes
        loop {
            tokio::select! {
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                () = tokio::time::sleep(delay) => break,
            }
        }

        let value = input.borrow_and_update().clone();
        output.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(400);

    #[tokio::test(start_paused = true)]
    async fn test_initial_value() {
        let debounced = Debounced::new("start".to_string(), DELAY);
        assert_eq!(debounced.get(), "start");
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_after_quiet_period() {
        let debounced = Debounced::new(String::new(), DELAY);
        debounced.set("phone".to_string());

        tokio::time::sleep(Duration::from_millis(399)).await;
        assert_eq!(debounced.get(), "");
        assert!(debounced.pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(debounced.get(), "phone");
        assert!(!debounced.pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_restarts_wait() {
        let debounced = Debounced::new(String::new(), DELAY);
        let mut updates = debounced.subscribe();

        debounced.set("phone".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debounced.set("phones".to_string());

        // 450ms after the first change, only 350ms after the second
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(debounced.get(), "");

        assert!(updates.changed().await.is_ok());
        assert_eq!(*updates.borrow_and_update(), "phones");
        assert_eq!(debounced.get(), "phones");

        // Exactly one observable update for the burst
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!updates.has_changed().unwrap_or(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_to_output_value_emits_nothing() {
        let debounced = Debounced::new("a".to_string(), DELAY);
        let updates = debounced.subscribe();

        debounced.set("b".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debounced.set("a".to_string());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(debounced.get(), "a");
        assert!(!updates.has_changed().unwrap_or(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay() {
        let debounced = Debounced::new(0_u32, Duration::ZERO);
        debounced.set(5);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(debounced.get(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_update() {
        let debounced = Debounced::new(0_u32, DELAY);
        let mut updates = debounced.subscribe();
        debounced.set(1);
        drop(debounced);

        // The task is gone, so the channel closes without ever emitting 1
        assert!(updates.changed().await.is_err());
        assert_eq!(*updates.borrow(), 0);
    }
}
