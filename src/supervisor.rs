//! # Supervisor
//!
//! Keeps every pipeline worker alive for the life of the process.
//!
//! Each worker runs as its own task inside a `JoinSet`, so its exit (error,
//! unexpected return, or panic) is observed the moment it happens. The
//! replacement task is launched right away but holds off for one restart
//! interval before running the worker again, which keeps a dead device
//! from turning into a hot restart loop. Dropping the supervisor aborts
//! every worker task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{self, JoinSet};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::workers::Worker;

pub struct Supervisor {
    workers: Vec<Arc<dyn Worker>>,
    restart_delay: Duration,
    running: JoinSet<Result<()>>,
    /// Worker index of each running task
    slots: HashMap<task::Id, usize>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.workers.iter().map(|w| w.name()).collect();
        f.debug_struct("Supervisor")
            .field("workers", &names)
            .field("restart_delay", &self.restart_delay)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn new(restart_delay: Duration) -> Self {
        Self {
            workers: Vec::new(),
            restart_delay,
            running: JoinSet::new(),
            slots: HashMap::new(),
        }
    }

    /// Register a worker to be started by [`Supervisor::run`]
    pub fn with_worker(mut self, worker: Arc<dyn Worker>) -> Self {
        self.workers.push(worker);
        self
    }

    /// Names of the registered workers, in registration order
    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name()).collect()
    }

    fn launch(&mut self, index: usize, delay: Duration) {
        let worker = Arc::clone(&self.workers[index]);
        let handle = self.running.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            info!("Starting {}", worker.name());
            worker.run().await
        });
        self.slots.insert(handle.id(), index);
    }

    /// Start every worker and restart any that ends
    ///
    /// Only returns if no workers were registered.
    pub async fn run(mut self) {
        for index in 0..self.workers.len() {
            self.launch(index, Duration::ZERO);
        }

        while let Some(joined) = self.running.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, result)) => (id, Ok(result)),
                Err(e) => (e.id(), Err(e)),
            };
            let Some(index) = self.slots.remove(&id) else {
                error!("Unknown task {} ended", id);
                continue;
            };

            let name = self.workers[index].name();
            match outcome {
                Ok(Ok(())) => warn!("{} returned; restarting in {:?}", name, self.restart_delay),
                Ok(Err(e)) => warn!("{} died: {}; restarting in {:?}", name, e, self.restart_delay),
                Err(e) => error!("{} failed: {}; restarting in {:?}", name, e, self.restart_delay),
            }

            self.launch(index, self.restart_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SitchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(60);

    enum Behavior {
        RunForever,
        FailOnce,
        PanicOnce,
        AlwaysPanic,
        Tick,
    }

    /// Worker counting its starts
    struct CountingWorker {
        name: &'static str,
        behavior: Behavior,
        starts: AtomicUsize,
        ticks: AtomicUsize,
    }

    impl CountingWorker {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                starts: AtomicUsize::new(0),
                ticks: AtomicUsize::new(0),
            })
        }

        fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }

        fn ticks(&self) -> usize {
            self.ticks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Worker for CountingWorker {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self) -> Result<()> {
            let start = self.starts.fetch_add(1, Ordering::SeqCst) + 1;
            match self.behavior {
                Behavior::FailOnce if start == 1 => {
                    Err(SitchError::Modem("modem unplugged".to_string()))
                }
                Behavior::PanicOnce if start == 1 => panic!("worker bug"),
                Behavior::AlwaysPanic => panic!("worker bug"),
                Behavior::Tick => loop {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    self.ticks.fetch_add(1, Ordering::SeqCst);
                },
                _ => std::future::pending().await,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_worker_restarted_after_one_interval() {
        let radio = CountingWorker::new("radio", Behavior::RunForever);
        let modem = CountingWorker::new("modem", Behavior::FailOnce);
        let enricher = CountingWorker::new("enricher", Behavior::RunForever);
        let writer = CountingWorker::new("writer", Behavior::RunForever);

        let supervisor = Supervisor::new(INTERVAL)
            .with_worker(radio.clone())
            .with_worker(modem.clone())
            .with_worker(enricher.clone())
            .with_worker(writer.clone());
        let handle = tokio::spawn(supervisor.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        for worker in [&radio, &modem, &enricher, &writer] {
            assert_eq!(worker.starts(), 1, "{} should start once", worker.name);
        }

        // Not yet: the restart waits out the interval
        tokio::time::sleep(INTERVAL - Duration::from_secs(2)).await;
        assert_eq!(modem.starts(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(modem.starts(), 2, "dead worker should be running again");
        assert_eq!(radio.starts(), 1);
        assert_eq!(enricher.starts(), 1);
        assert_eq!(writer.starts(), 1);

        // The restarted worker stays up
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(modem.starts(), 2);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicked_worker_restarted() {
        let buggy = CountingWorker::new("buggy", Behavior::PanicOnce);
        let steady = CountingWorker::new("steady", Behavior::RunForever);

        let supervisor = Supervisor::new(INTERVAL)
            .with_worker(buggy.clone())
            .with_worker(steady.clone());
        let handle = tokio::spawn(supervisor.run());

        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(buggy.starts(), 2);
        assert_eq!(steady.starts(), 1);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_panics_keep_restarting() {
        let buggy = CountingWorker::new("buggy", Behavior::AlwaysPanic);

        let supervisor = Supervisor::new(INTERVAL).with_worker(buggy.clone());
        let handle = tokio::spawn(supervisor.run());

        tokio::time::sleep(INTERVAL * 3 + Duration::from_secs(1)).await;
        assert_eq!(buggy.starts(), 4);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborting_supervisor_stops_workers() {
        let ticker = CountingWorker::new("ticker", Behavior::Tick);

        let supervisor = Supervisor::new(INTERVAL).with_worker(ticker.clone());
        let handle = tokio::spawn(supervisor.run());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticker.ticks(), 3);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticker.ticks(), 3, "worker kept running after abort");
    }

    #[tokio::test]
    async fn test_run_without_workers_returns() {
        Supervisor::new(INTERVAL).run().await;
    }

    #[test]
    fn test_worker_names() {
        let supervisor = Supervisor::new(INTERVAL)
            .with_worker(CountingWorker::new("a", Behavior::RunForever))
            .with_worker(CountingWorker::new("b", Behavior::RunForever));
        assert_eq!(supervisor.worker_names(), vec!["a", "b"]);
    }
}
