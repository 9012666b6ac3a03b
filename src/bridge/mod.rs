//! Command bridge: runs worker commands out of process and turns their
//! output into a structured result or a typed failure.

mod error;
mod invocation;
mod output;
mod process;
mod runner;
mod state;

pub use error::{BridgeError, InvalidInvocation};
pub use invocation::{CommandInvocation, GENERATE_REPORT, INIT_DB, SEND_EMAILS};
pub use output::{
    extract_structured_result, ExtractError, ProcessOutcome, ProjectData, ReportPayload,
    StructuredResult,
};
pub use process::{SpawnError, WorkerLaunch, WorkerProcess, UTF8_ENV};
pub use runner::{
    CommandBridge, CommandRunner, InvocationResult, DEFAULT_KILL_GRACE, DEFAULT_TIMEOUT,
};
pub use state::{IllegalTransition, InvocationState, InvocationTracker};
