use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, warn};

/// A cancellable fixed-rate timer. The first tick fires one period after
/// spawning.
pub struct PeriodicTask {
    name: &'static str,
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    _ = ticker.tick() => tick(),
                }
            }
            debug!(task = name, "periodic task stopped");
        });

        Self {
            name,
            cancel_tx,
            handle,
        }
    }

    /// Asks the task to stop without waiting for it.
    pub fn signal(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub async fn cancel(self) {
        self.signal();
        if let Err(err) = self.handle.await {
            warn!(task = self.name, "periodic task ended abnormally: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use tokio::time::sleep;

    use super::PeriodicTask;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_cancelled() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = PeriodicTask::spawn("test", Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sleep(Duration::from_millis(1050)).await;
        task.cancel().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 10);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 10, "no ticks after cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_period() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = PeriodicTask::spawn("test", Duration::from_secs(3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sleep(Duration::from_millis(2900)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        task.cancel().await;
    }
}
