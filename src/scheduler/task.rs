//! Recurring task actor
//!
//! One [`RecurringTask`] drives one unbounded loop: execute the action, then
//! suspend for the interval or until cancellation. The actor is controlled
//! through an mpsc command channel raced against the interval ticker, so a
//! shutdown is observed both while suspended and before the next execution.
//!
//! Action failures are retried within the iteration per the task's
//! [`RetryPolicy`](super::RetryPolicy); once attempts are exhausted the
//! failure is logged and the loop simply waits for the next tick. A transient
//! error never terminates a recurring task, only explicit cancellation does.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::retry::RetryPolicy;

/// Identity of a schedulable task
///
/// A closed enum so that cancel-all can enumerate every active task,
/// including the two singletons, without knowing endpoint ids up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// The probe loop for one monitored endpoint
    Endpoint(Uuid),

    /// The singleton metrics aggregation task
    Aggregate,

    /// The singleton retention cleanup task
    Cleanup,
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskId::Endpoint(id) => write!(f, "monitor-endpoint-{id}"),
            TaskId::Aggregate => write!(f, "aggregate-metrics"),
            TaskId::Cleanup => write!(f, "cleanup-old-data"),
        }
    }
}

/// One iteration's worth of work for a recurring task
#[async_trait]
pub trait TaskAction: Send + Sync + 'static {
    async fn run(&self) -> Result<()>;
}

/// Commands that can be sent to a RecurringTask
#[derive(Debug)]
pub enum TaskCommand {
    /// Trigger an immediate iteration, bypassing the interval timer
    RunNow {
        respond_to: oneshot::Sender<Result<()>>,
    },

    /// Stop the task at the next suspension point
    Shutdown,
}

/// Actor that executes one action on a fixed cadence
pub struct RecurringTask<A> {
    id: TaskId,
    action: A,
    interval: Duration,
    retry: RetryPolicy,
    command_rx: mpsc::Receiver<TaskCommand>,
}

impl<A: TaskAction> RecurringTask<A> {
    pub fn new(
        id: TaskId,
        action: A,
        interval: Duration,
        retry: RetryPolicy,
        command_rx: mpsc::Receiver<TaskCommand>,
    ) -> Self {
        Self {
            id,
            action,
            interval,
            retry,
            command_rx,
        }
    }

    /// Run the actor's main loop until shutdown or channel closure.
    ///
    /// The first tick fires immediately, so a freshly started task executes
    /// right away and then settles into its cadence. Missed ticks are delayed
    /// rather than bursted: an iteration that overruns pushes the next one
    /// out by a full interval.
    #[instrument(skip(self), fields(task = %self.id))]
    pub async fn run(mut self) {
        debug!("starting recurring task");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.execute().await {
                        error!("iteration failed after retries: {:#}", e);
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(TaskCommand::RunNow { respond_to }) => {
                            debug!("received RunNow command");
                            let result = self.execute().await;
                            let _ = respond_to.send(result);
                        }

                        Some(TaskCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        // All senders gone: nobody can ever stop this task
                        // again, so stop it now instead of ticking forever.
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("recurring task stopped");
    }

    /// One iteration: the action, retried per policy.
    async fn execute(&self) -> Result<()> {
        self.retry.run(|| self.action.run()).await
    }
}

/// Handle for controlling a spawned RecurringTask
pub struct TaskHandle {
    id: TaskId,
    sender: mpsc::Sender<TaskCommand>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn a recurring task and return its handle.
    pub fn spawn<A: TaskAction>(
        id: TaskId,
        action: A,
        interval: Duration,
        retry: RetryPolicy,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let task = RecurringTask::new(id, action, interval, retry, cmd_rx);
        let join = tokio::spawn(task.run());

        Self {
            id,
            sender: cmd_tx,
            join,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Whether the task loop is still running.
    pub fn is_active(&self) -> bool {
        !self.join.is_finished()
    }

    /// Clone of the command sender, for issuing commands without holding on
    /// to the handle itself.
    pub fn commands(&self) -> mpsc::Sender<TaskCommand> {
        self.sender.clone()
    }

    /// Trigger an immediate iteration and wait for its result.
    pub async fn run_now(&self) -> Result<()> {
        Self::run_now_via(&self.sender).await
    }

    /// Trigger an immediate iteration through a command sender.
    pub async fn run_now_via(sender: &mpsc::Sender<TaskCommand>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        sender
            .send(TaskCommand::RunNow { respond_to: tx })
            .await
            .context("failed to send RunNow command")?;

        rx.await.context("task dropped the RunNow response")??;
        Ok(())
    }

    /// Cancel the task and wait for the loop to terminate.
    pub async fn shutdown(self) {
        let _ = self.sender.send(TaskCommand::Shutdown).await;
        let _ = self.join.await;
    }
}
