//! PeriodicJob - 停止可能な周期実行タイマー
//!
//! ジョブの Future は tick ループの中で直接 await されるので、
//! 前回の実行が終わるまで次の tick は処理されません（実行が重なることはない）。
//! 実行後にタイマーをリセットするため、次の実行は終了から 1 周期後です。
//!
//! - `request_shutdown()` で停止を要求（実行中のジョブは最後まで走る）
//! - `shutdown_and_join()` で停止を待つ

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

pub struct PeriodicJob {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl PeriodicJob {
    /// Spawns `job` to run every `period`, first run one period from now.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                debug!(job = name, "tick");
                job().await;
                // next run one full period after this one finished
                ticker.reset();

                if *shutdown_rx.borrow() {
                    break;
                }
            }
            debug!(job = name, "stopped");
        });

        Self {
            name,
            shutdown_tx,
            join,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_repeatedly_until_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let job = PeriodicJob::spawn("count", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        job.shutdown_and_join().await;

        let after_stop = runs.load(Ordering::SeqCst);
        assert!(after_stop >= 2, "ran {after_stop} times");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn overrunning_job_never_overlaps() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        let (a, m, r) = (active.clone(), max_active.clone(), runs.clone());
        let job = PeriodicJob::spawn("slow", Duration::from_millis(5), move || {
            let (a, m, r) = (a.clone(), m.clone(), r.clone());
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                r.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        job.shutdown_and_join().await;

        assert!(runs.load(Ordering::SeqCst) >= 2);
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn overrunning_job_waits_a_full_period_before_next_run() {
        let period = Duration::from_millis(40);
        let spans: Arc<std::sync::Mutex<Vec<(Instant, Instant)>>> = Arc::default();

        let recorded = spans.clone();
        let job = PeriodicJob::spawn("overrun", period, move || {
            let recorded = recorded.clone();
            async move {
                let start = Instant::now();
                tokio::time::sleep(Duration::from_millis(60)).await;
                recorded.lock().unwrap().push((start, Instant::now()));
            }
        });

        tokio::time::sleep(Duration::from_millis(400)).await;
        job.shutdown_and_join().await;

        let spans = spans.lock().unwrap();
        assert!(spans.len() >= 2, "ran {} times", spans.len());
        for pair in spans.windows(2) {
            let idle = pair[1].0 - pair[0].1;
            assert!(idle >= Duration::from_millis(35), "idle only {idle:?}");
        }
    }

    #[tokio::test]
    async fn shutdown_before_first_tick_runs_nothing() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let job = PeriodicJob::spawn("idle", Duration::from_secs(3600), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(job.name(), "idle");
        job.shutdown_and_join().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
