use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub &'static str);

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: JobId,
    pub interval: Duration,
}

/// Owner of every recurring background job; one `shutdown` stops them all.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<RwLock<Inner>>,
    stopped: Arc<AtomicBool>,
}

struct Inner {
    shutdown_tx: broadcast::Sender<()>,
    jobs: Vec<JobId>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(8);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                shutdown_tx: tx,
                jobs: Vec::new(),
            })),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn `f` every `job.interval`. The first run happens one interval
    /// after spawning. Returns false if the scheduler was already shut down.
    pub async fn spawn_periodic<F, Fut>(&self, job: ScheduledJob, f: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.is_stopped() {
            return false;
        }
        let rx = {
            let mut inner = self.inner.write().await;
            inner.jobs.push(job.id.clone());
            inner.shutdown_tx.subscribe()
        };
        debug!(job = job.id.0, interval_ms = job.interval.as_millis() as u64, "scheduled job");
        tokio::spawn(run_periodic(job, rx, f));
        true
    }

    pub async fn jobs(&self) -> Vec<JobId> {
        self.inner.read().await.jobs.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let tx = {
            let mut inner = self.inner.write().await;
            inner.jobs.clear();
            inner.shutdown_tx.clone()
        };
        let _ = tx.send(());
        info!("scheduler stopped");
    }
}

async fn run_periodic<F, Fut>(job: ScheduledJob, mut shutdown_rx: broadcast::Receiver<()>, mut f: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + job.interval, job.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                f().await;
            }
            _ = shutdown_rx.recv() => {
                debug!(job = job.id.0, "job stopped");
                break;
            }
        }
    }
}
