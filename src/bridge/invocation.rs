//! Worker command invocations.

use std::fmt;

use super::error::InvalidInvocation;

/// Initialise the worker's own database tables.
pub const INIT_DB: &str = "init_db";
/// Build the weekly recruitment report.
pub const GENERATE_REPORT: &str = "generate_report";
/// Mail the most recent report to the configured client list.
pub const SEND_EMAILS: &str = "send_emails";

/// A named worker command plus its ordered arguments.
///
/// Immutable once built. Equality and hashing cover both the command and
/// its arguments, which is what single-flight coalescing keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandInvocation {
    command: String,
    arguments: Vec<String>,
}

impl CommandInvocation {
    /// Build an invocation, rejecting empty or whitespace-bearing names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInvocation` if the command name is unusable.
    pub fn new<I, S>(command: impl Into<String>, arguments: I) -> Result<Self, InvalidInvocation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(InvalidInvocation::EmptyCommand);
        }
        if command.chars().any(char::is_whitespace) {
            return Err(InvalidInvocation::Whitespace(command));
        }

        Ok(Self {
            command,
            arguments: arguments.into_iter().map(Into::into).collect(),
        })
    }

    fn well_known(command: &'static str) -> Self {
        Self {
            command: command.to_string(),
            arguments: Vec::new(),
        }
    }

    /// `init_db` with no arguments.
    #[must_use]
    pub fn init_db() -> Self {
        Self::well_known(INIT_DB)
    }

    /// `generate_report` with no arguments.
    #[must_use]
    pub fn generate_report() -> Self {
        Self::well_known(GENERATE_REPORT)
    }

    /// `send_emails` with no arguments.
    #[must_use]
    pub fn send_emails() -> Self {
        Self::well_known(SEND_EMAILS)
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Arguments handed to the worker after its entrypoint: the command
    /// name followed by the invocation arguments.
    #[must_use]
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.arguments.len() + 1);
        args.push(self.command.clone());
        args.extend(self.arguments.iter().cloned());
        args
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for arg in &self.arguments {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
