//! The command bridge: run one worker invocation to a typed outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

use super::error::BridgeError;
use super::invocation::CommandInvocation;
use super::output::{extract_structured_result, ProcessOutcome, StructuredResult};
use super::process::{WorkerLaunch, WorkerProcess};
use super::state::{InvocationState, InvocationTracker};
use crate::config::WorkerConfig;

/// Outcome of one invocation.
pub type InvocationResult = Result<StructuredResult, BridgeError>;

type SharedInvocation = Shared<BoxFuture<'static, InvocationResult>>;
type InFlight = Arc<Mutex<HashMap<CommandInvocation, SharedInvocation>>>;

/// Default deadline for a single worker run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default time between SIGTERM and SIGKILL on timeout.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Anything that can turn a command invocation into a structured result.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// Produces exactly one outcome: the parsed result or a `BridgeError`.
    async fn invoke(&self, invocation: CommandInvocation) -> InvocationResult;
}

/// Settings shared by every run; cheap to clone into detached tasks.
#[derive(Debug, Clone)]
struct Executor {
    launch: Arc<WorkerLaunch>,
    timeout: Duration,
    kill_grace: Duration,
    limiter: Option<Arc<Semaphore>>,
}

impl Executor {
    async fn run(&self, invocation: &CommandInvocation) -> InvocationResult {
        let _permit = match &self.limiter {
            Some(limiter) => Some(Arc::clone(limiter).acquire_owned().await.map_err(|e| {
                BridgeError::Aborted {
                    command: invocation.command().to_string(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let span = tracing::info_span!(
            "invocation",
            command = invocation.command(),
            invocation_id = %Uuid::new_v4(),
        );
        self.run_unlimited(invocation).instrument(span).await
    }

    async fn run_unlimited(&self, invocation: &CommandInvocation) -> InvocationResult {
        let command = invocation.command().to_string();
        let started = Instant::now();
        let mut tracker = InvocationTracker::new();

        tracker.enter(InvocationState::Spawning);
        let mut process = match WorkerProcess::spawn(&self.launch, invocation) {
            Ok(process) => {
                tracker.enter(InvocationState::Running);
                process
            }
            Err(e) => {
                tracker.enter(InvocationState::SpawnFailed);
                tracing::error!(error = %e, program = self.launch.program(), "Worker failed to start");
                return Err(BridgeError::SpawnFailure {
                    command,
                    reason: e.to_string(),
                });
            }
        };
        tracing::debug!(pid = ?process.id(), "Worker started");

        let mut out = Vec::new();
        let mut err = Vec::new();
        let waited = tokio::time::timeout(
            self.timeout,
            process.collect_into(&mut out, &mut err),
        )
        .await;

        let exit_code = match waited {
            Ok(Ok(code)) => code,
            Ok(Err(e)) => {
                tracker.enter(InvocationState::Aborted);
                tracing::error!(error = %e, "Lost contact with worker");
                if let Err(kill_err) = process.terminate(self.kill_grace).await {
                    tracing::warn!(error = %kill_err, "Failed to terminate worker");
                }
                return Err(BridgeError::Aborted {
                    command,
                    reason: format!("failed to read worker output: {e}"),
                });
            }
            Err(_) => {
                tracker.enter(InvocationState::TimedOut);
                tracing::warn!(timeout_secs = self.timeout.as_secs_f64(), "Worker timed out, terminating");
                if let Err(kill_err) = process.terminate(self.kill_grace).await {
                    tracing::warn!(error = %kill_err, "Failed to terminate worker");
                }
                return Err(BridgeError::Timeout {
                    command,
                    after: self.timeout,
                    stderr: String::from_utf8_lossy(&err).into_owned(),
                });
            }
        };

        let outcome = ProcessOutcome::from_raw(exit_code, &out, &err);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracker.enter(InvocationState::Exited(outcome.exit_code));

        if !outcome.succeeded() {
            tracker.enter(InvocationState::ExitRejected);
            tracing::warn!(exit_code = ?outcome.exit_code, elapsed_ms, "Worker exited with failure");
            return Err(BridgeError::NonZeroExit {
                command,
                exit_code: outcome.exit_code,
                stderr: outcome.stderr,
            });
        }

        match extract_structured_result(&outcome.stdout) {
            Ok(result) => {
                tracker.enter(InvocationState::Parsed);
                tracing::info!(elapsed_ms, success = ?result.success(), "Worker finished");
                Ok(result)
            }
            Err(e) => {
                tracker.enter(InvocationState::ParseFailed);
                tracing::warn!(error = %e, elapsed_ms, "Worker output had no structured result");
                Err(BridgeError::UnparsableOutput {
                    command,
                    reason: e.to_string(),
                    stdout: outcome.stdout,
                })
            }
        }
    }
}

/// Process-backed [`CommandRunner`].
///
/// Each run happens in a detached task, so a caller that stops waiting does
/// not stop the worker. With single-flight enabled, concurrent invocations
/// that compare equal share one worker run and all receive its outcome.
#[derive(Clone)]
pub struct CommandBridge {
    executor: Executor,
    single_flight: bool,
    in_flight: InFlight,
}

impl CommandBridge {
    /// Create a bridge with default timeout, no concurrency cap and
    /// single-flight enabled.
    #[must_use]
    pub fn new(launch: WorkerLaunch) -> Self {
        Self {
            executor: Executor {
                launch: Arc::new(launch),
                timeout: DEFAULT_TIMEOUT,
                kill_grace: DEFAULT_KILL_GRACE,
                limiter: None,
            },
            single_flight: true,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build a bridge from the `[worker]` configuration section.
    #[must_use]
    pub fn from_config(config: &WorkerConfig) -> Self {
        let mut launch = WorkerLaunch::new(&config.program).leading_args(config.leading_args.clone());
        if let Some(dir) = &config.working_dir {
            launch = launch.working_dir(dir);
        }
        for (key, value) in &config.env {
            launch = launch.env(key, value);
        }

        Self::new(launch)
            .with_timeout(config.timeout())
            .with_kill_grace(config.kill_grace())
            .with_max_concurrent(config.max_concurrent)
            .with_single_flight(config.single_flight)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.executor.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.executor.kill_grace = grace;
        self
    }

    /// Cap concurrent worker processes; `None` leaves them unbounded.
    #[must_use]
    pub fn with_max_concurrent(mut self, limit: Option<usize>) -> Self {
        self.executor.limiter = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    #[must_use]
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.executor.timeout
    }

    /// Number of distinct invocations currently being coalesced.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    fn spawn_detached(&self, invocation: CommandInvocation, registry: Option<InFlight>) -> SharedInvocation {
        let executor = self.executor.clone();
        let command = invocation.command().to_string();
        let key = invocation.clone();
        let cleanup = registry.clone();

        let handle = tokio::spawn(async move {
            let result = executor.run(&invocation).await;
            if let Some(registry) = registry {
                registry.lock().await.remove(&invocation);
            }
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    if let Some(registry) = cleanup {
                        registry.lock().await.remove(&key);
                    }
                    tracing::error!(command = %command, error = %e, "Invocation task failed");
                    Err(BridgeError::Aborted {
                        command,
                        reason: e.to_string(),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for CommandBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBridge")
            .field("executor", &self.executor)
            .field("single_flight", &self.single_flight)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CommandRunner for CommandBridge {
    async fn invoke(&self, invocation: CommandInvocation) -> InvocationResult {
        if !self.single_flight {
            return self.spawn_detached(invocation, None).await;
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&invocation) {
                tracing::debug!(command = invocation.command(), "Joining in-flight invocation");
                existing.clone()
            } else {
                let run = self.spawn_detached(invocation.clone(), Some(Arc::clone(&self.in_flight)));
                in_flight.insert(invocation, run.clone());
                run
            }
        };

        shared.await
    }
}
