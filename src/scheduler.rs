//! Fixed-delay periodic task runner. Two-phase lifecycle (register every worker, then start them
//! all) mirrors the teacher's `MessagePool::new` construction, which wires up
//! `republish_pending_messages`/`head_change` background tasks via `tokio::spawn` only after the
//! pool itself is fully constructed, rather than spawning mid-construction.
//!
//! Error handling follows the double-wrapped shape of §5/§7's fatal policy: a worker body is
//! expected to catch and log its own recoverable errors (a bad peer response, a timed-out read)
//! and only ever return `Err` for something that should not be survivable — the outer catch here
//! treats any such `Err` as fatal and takes the whole process down rather than let the node limp
//! along against state it can no longer reason about.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::error;

type BoxedTask = Box<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync>;

struct RegisteredWorker {
    name: &'static str,
    period: Duration,
    task: BoxedTask,
}

/// Collects periodic workers during node construction, then spawns them all together once the
/// node is ready to run.
#[derive(Default)]
pub struct Scheduler {
    workers: Vec<RegisteredWorker>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a worker that runs `task` every `period`, starting after one `period` has
    /// elapsed (never immediately on startup, matching the teacher's interval-based workers).
    pub fn register<F, Fut>(&mut self, name: &'static str, period: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.workers.push(RegisteredWorker {
            name,
            period,
            task: Box::new(move || Box::pin(task())),
        });
    }

    /// Spawns every registered worker as its own task, returning their join handles. Consumes
    /// the scheduler: once started, no further workers can be registered. A worker returning
    /// `Err` logs a "CRITICAL ERROR" banner and exits the process — this is the intended design,
    /// not a bug: the node fails loudly rather than silently corrupting chain state.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        self.workers
            .into_iter()
            .map(|worker| {
                tokio::spawn(async move {
                    let mut ticker = interval(worker.period);
                    loop {
                        ticker.tick().await;
                        if let Err(err) = (worker.task)().await {
                            error!(worker = worker.name, %err, "CRITICAL ERROR: periodic worker failed fatally");
                            std::process::exit(1);
                        }
                    }
                })
            })
            .collect()
    }
}
