use super::TaskQueue;
use crate::config::TasksConfig;
use crate::db::DbTask;
use crate::error::DirectoryError;
use crate::pwa::{PwaService, RefreshOutcome};
use futures::stream::StreamExt;
use governor::{Quota, RateLimiter};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::num::NonZeroU32;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
struct TaskResult {
    task: DbTask,
    result: Result<RefreshOutcome, DirectoryError>,
}

#[derive(Debug)]
enum TaskWorkerMessage {
    /// Poll the queue (interval driven, or on demand).
    Tick,
    Completed(TaskResult),
}

/// Handle for the background re-validation worker.
#[derive(Clone)]
pub struct TaskWorkerHandle {
    actor: ActorRef<TaskWorkerMessage>,
}

impl TaskWorkerHandle {
    pub async fn spawn(
        queue: TaskQueue,
        service: Arc<PwaService>,
        cfg: TasksConfig,
    ) -> Result<Self, ActorProcessingErr> {
        let (actor, _jh) = Actor::spawn(
            None,
            TaskWorker,
            (queue, service, cfg),
        )
        .await
        .map_err(|e| ActorProcessingErr::from(format!("TaskWorker spawn failed: {e}")))?;
        Ok(Self { actor })
    }

    /// Polls the queue now instead of waiting for the next interval.
    pub fn poll_now(&self) -> Result<(), DirectoryError> {
        ractor::cast!(self.actor, TaskWorkerMessage::Tick)
            .map_err(|e| DirectoryError::RactorError(format!("TaskWorker cast failed: {e}")))
    }

    pub fn stop(&self) {
        self.actor.stop(None);
    }
}

struct TaskWorkerState {
    queue: TaskQueue,
    job_tx: mpsc::Sender<DbTask>,
    in_flight: usize,
    batch_size: usize,
    max_attempts: i64,
}

struct TaskWorker;

#[ractor::async_trait]
impl Actor for TaskWorker {
    type Msg = TaskWorkerMessage;
    type State = TaskWorkerState;
    type Arguments = (TaskQueue, Arc<PwaService>, TasksConfig);

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        (queue, service, cfg): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let batch_size = cfg.batch_size.max(1);
        let per_minute = NonZeroU32::new(cfg.per_minute).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        let (job_tx, job_rx) = mpsc::channel::<DbTask>(batch_size * 2);
        let completions = myself.clone();

        tokio::spawn(async move {
            info!(
                "Task Pipeline Started: BufferUnordered={}, RateLimit={}/min",
                batch_size, per_minute
            );

            let mut pipeline = ReceiverStream::new(job_rx)
                .map(|task| {
                    let lim = limiter.clone();
                    let service = service.clone();
                    async move {
                        lim.until_ready().await;
                        let result = service.refresh(task.pwa_id).await;
                        TaskResult { task, result }
                    }
                })
                .buffer_unordered(batch_size);

            while let Some(outcome) = pipeline.next().await {
                if let Err(e) = ractor::cast!(completions, TaskWorkerMessage::Completed(outcome)) {
                    warn!("TaskWorker unreachable (channel closed), pipeline stopping: {}", e);
                    break;
                }
            }

            info!("Task Pipeline Stopped");
        });

        let poll_interval = Duration::from_secs(cfg.poll_interval_secs.max(1));
        let ticker = myself.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ractor::cast!(ticker, TaskWorkerMessage::Tick).is_err() {
                    break;
                }
            }
        });

        info!(
            poll_interval_secs = poll_interval.as_secs(),
            batch_size,
            per_minute = cfg.per_minute,
            max_attempts = cfg.max_attempts,
            "TaskWorker runtime config loaded"
        );

        Ok(TaskWorkerState {
            queue,
            job_tx,
            in_flight: 0,
            batch_size,
            max_attempts: cfg.max_attempts.max(1),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            TaskWorkerMessage::Tick => {
                // The previous batch is still running.
                if state.in_flight > 0 {
                    return Ok(());
                }
                let tasks = match state.queue.pop_batch(state.batch_size).await {
                    Ok(tasks) => tasks,
                    Err(e) => {
                        error!(error = %e, "Popping tasks failed");
                        return Ok(());
                    }
                };
                if !tasks.is_empty() {
                    debug!(count = tasks.len(), "Dispatching re-validation tasks");
                }
                for task in tasks {
                    if let Err(e) = state.job_tx.send(task).await {
                        error!("Task pipeline closed, requeueing: {}", e);
                        let _ = state.queue.requeue(e.0).await;
                        continue;
                    }
                    state.in_flight += 1;
                }
            }

            TaskWorkerMessage::Completed(TaskResult { task, result }) => {
                state.in_flight = state.in_flight.saturating_sub(1);
                on_completed(state, task, result).await;
            }
        }
        Ok(())
    }
}

async fn on_completed(
    state: &TaskWorkerState,
    task: DbTask,
    result: Result<RefreshOutcome, DirectoryError>,
) {
    let pwa_id = task.pwa_id;
    match result {
        Ok(RefreshOutcome::Updated(pwa)) => {
            info!(pwa_id, score = ?pwa.lighthouse_score, "Re-validation finished");
        }
        Ok(RefreshOutcome::Hidden { issues }) => {
            info!(pwa_id, issues = issues.len(), "Re-validation hid PWA");
        }
        Err(DirectoryError::NotFound(_)) => {
            debug!(pwa_id, "PWA gone, task dropped");
        }
        Err(e) => {
            let attempts = task.attempts + 1;
            if attempts < state.max_attempts {
                warn!(pwa_id, attempts, error = %e, "Re-validation failed, requeueing");
                if let Err(e) = state.queue.requeue(task).await {
                    error!(pwa_id, error = %e, "Requeueing task failed");
                }
            } else {
                error!(pwa_id, attempts, error = %e, "Re-validation failed, giving up");
            }
        }
    }
}
