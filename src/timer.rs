//! One-shot timers that post a message back to the owning event loop.
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;

/// Handle to a scheduled one-shot task. `cancel` is the only control.
///
/// Dropping the handle does not cancel the task.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: AbortHandle,
}

impl ScheduledTask {
    /// Stop the timer if it has not fired yet. A message already posted
    /// stays in the channel, so receivers must tolerate stale firings.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns sleeps on the current tokio runtime that deliver `E` when due.
#[derive(Debug)]
pub struct Timers<E> {
    tx: UnboundedSender<E>,
}

impl<E> Clone for Timers<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> Timers<E> {
    pub fn new(tx: UnboundedSender<E>) -> Self {
        Self { tx }
    }

    pub fn after(&self, delay: Duration, message: E) -> ScheduledTask {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the loop shut down.
            let _ = tx.send(message);
        });
        ScheduledTask {
            handle: handle.abort_handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = Timers::new(tx);
        let _task = timers.after(Duration::from_millis(500), "due");

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().unwrap(), "due");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timers = Timers::new(tx);
        let task = timers.after(Duration::from_millis(500), "due");
        task.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        assert!(task.is_finished());
    }
}
