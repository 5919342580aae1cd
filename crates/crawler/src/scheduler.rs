use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

pub use ccrawler_common::config::OverlapPolicy;

/// One unit of scheduled work
#[async_trait]
pub trait Job: Send + Sync + 'static {
    type Error: fmt::Display + Send;

    async fn run(&self) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Once,
    /// Fixed rate: first run immediately, then on every interval boundary
    Every(Duration),
}

impl Schedule {
    /// 0 means a single run
    pub fn from_interval_secs(secs: u64) -> Self {
        if secs == 0 {
            Schedule::Once
        } else {
            Schedule::Every(Duration::from_secs(secs))
        }
    }
}

pub struct Scheduler {
    schedule: Schedule,
    overlap: OverlapPolicy,
}

impl Scheduler {
    pub fn new(schedule: Schedule, overlap: OverlapPolicy) -> Self {
        Self { schedule, overlap }
    }

    /// Drives `job`. Once mode returns the run's result; interval mode never
    /// returns and contains every run's failure to that run.
    pub async fn run<J: Job>(&self, job: Arc<J>) -> Result<(), J::Error> {
        match self.schedule {
            Schedule::Once => {
                info!("=> Crawling once");
                job.run().await
            }
            Schedule::Every(period) => {
                info!(?period, overlap = ?self.overlap, "=> Scheduling crawling");
                self.run_every(period, job).await
            }
        }
    }

    async fn run_every<J: Job>(&self, period: Duration, job: Arc<J>) -> Result<(), J::Error> {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let running = Arc::new(AtomicBool::new(false));
        let mut tick: u64 = 0;

        loop {
            ticker.tick().await;
            tick += 1;

            let guard = match self.overlap {
                OverlapPolicy::Allow => None,
                OverlapPolicy::Skip => match RunningGuard::acquire(&running) {
                    Some(guard) => Some(guard),
                    None => {
                        warn!(tick, "Previous run still active, skipping tick");
                        continue;
                    }
                },
            };

            let job = job.clone();
            tokio::spawn(async move {
                let _guard = guard;
                if let Err(e) = job.run().await {
                    warn!(tick, error = %e, "Tick failed");
                }
            });
        }
    }
}

/// Marks a run as active until dropped, panics included.
struct RunningGuard(Arc<AtomicBool>);

impl RunningGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag.clone()))
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::time::{sleep, timeout, Instant};

    /// Records when each run starts and how many overlap
    struct RecordingJob {
        work: Duration,
        fail: bool,
        starts: Mutex<Vec<Instant>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl RecordingJob {
        fn new(work: Duration) -> Self {
            Self {
                work,
                fail: false,
                starts: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }

        fn runs(&self) -> usize {
            self.starts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Job for RecordingJob {
        type Error = String;

        async fn run(&self) -> Result<(), String> {
            self.starts.lock().unwrap().push(Instant::now());
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);

            sleep(self.work).await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err("source unavailable".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_schedule_from_interval() {
        assert_eq!(Schedule::from_interval_secs(0), Schedule::Once);
        assert_eq!(
            Schedule::from_interval_secs(30),
            Schedule::Every(Duration::from_secs(30))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_runs_exactly_once_and_returns_result() {
        let mut job = RecordingJob::new(Duration::from_secs(1));
        job.fail = true;
        let job = Arc::new(job);

        let scheduler = Scheduler::new(Schedule::Once, OverlapPolicy::Skip);
        let result = scheduler.run(job.clone()).await;

        assert_eq!(result, Err("source unavailable".to_string()));
        assert_eq!(job.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_rate_ticks_on_interval_boundaries() {
        let job = Arc::new(RecordingJob::new(Duration::from_secs(1)));
        let scheduler = Scheduler::new(Schedule::Every(Duration::from_secs(30)), OverlapPolicy::Skip);
        let origin = Instant::now();

        let _ = timeout(Duration::from_secs(95), scheduler.run(job.clone())).await;

        let offsets: Vec<u64> = job
            .starts
            .lock()
            .unwrap()
            .iter()
            .map(|at| (*at - origin).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 30, 60, 90]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_does_not_stop_the_loop() {
        let mut job = RecordingJob::new(Duration::from_secs(1));
        job.fail = true;
        let job = Arc::new(job);
        let scheduler = Scheduler::new(Schedule::Every(Duration::from_secs(10)), OverlapPolicy::Skip);

        let _ = timeout(Duration::from_secs(35), scheduler.run(job.clone())).await;

        assert_eq!(job.runs(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_policy_drops_ticks_while_running() {
        // 70s runs on a 30s timer: 0 runs, 30 and 60 skipped, 90 runs
        let job = Arc::new(RecordingJob::new(Duration::from_secs(70)));
        let scheduler = Scheduler::new(Schedule::Every(Duration::from_secs(30)), OverlapPolicy::Skip);

        let _ = timeout(Duration::from_secs(100), scheduler.run(job.clone())).await;

        assert_eq!(job.runs(), 2);
        assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_allow_policy_lets_runs_overlap() {
        let job = Arc::new(RecordingJob::new(Duration::from_secs(70)));
        let scheduler = Scheduler::new(Schedule::Every(Duration::from_secs(30)), OverlapPolicy::Allow);

        let _ = timeout(Duration::from_secs(100), scheduler.run(job.clone())).await;

        assert_eq!(job.runs(), 4);
        assert!(job.max_active.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));

        let guard = RunningGuard::acquire(&flag).unwrap();
        assert!(RunningGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(RunningGuard::acquire(&flag).is_some());
    }
}
