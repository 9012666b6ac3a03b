//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::WORKER_DB_FILE;

/// Default port for the HTTP server.
pub const DEFAULT_PORT: u16 = 3000;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
    /// Directory of static assets served for unmatched paths.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors_permissive: true,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// How to run the external worker program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Interpreter or binary to execute.
    pub program: String,
    /// Arguments placed before the command name (usually the script).
    pub leading_args: Vec<String>,
    /// Working directory for the worker; inherits ours when unset.
    pub working_dir: Option<PathBuf>,
    /// Seconds before a running worker is terminated.
    pub timeout_secs: u64,
    /// Seconds between SIGTERM and SIGKILL when terminating.
    pub kill_grace_secs: u64,
    /// Upper bound on concurrently running workers.
    pub max_concurrent: Option<usize>,
    /// Share one run between concurrent identical invocations.
    pub single_flight: bool,
    /// Extra environment variables for the worker.
    pub env: BTreeMap<String, String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            leading_args: vec!["web_integration.py".to_string()],
            working_dir: None,
            timeout_secs: 300,
            kill_grace_secs: 5,
            max_concurrent: None,
            single_flight: true,
            env: BTreeMap::new(),
        }
    }
}

impl WorkerConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}

/// Settings and log database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Explicit database path. When unset, the worker's own database file
    /// in its working directory is used.
    pub path: Option<PathBuf>,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Database shared with the worker.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        match (&self.storage.path, &self.worker.working_dir) {
            (Some(path), _) => path.clone(),
            (None, Some(dir)) => dir.join(WORKER_DB_FILE),
            (None, None) => PathBuf::from(WORKER_DB_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.cors_permissive);
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.program, "python3");
        assert_eq!(config.leading_args, vec!["web_integration.py"]);
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert_eq!(config.kill_grace(), Duration::from_secs(5));
        assert!(config.max_concurrent.is_none());
        assert!(config.single_flight);
    }

    #[test]
    fn test_app_config_deserialize_partial() {
        let toml = r#"
            [server]
            port = 8080

            [worker]
            program = "/opt/venv/bin/python"
            timeout_secs = 60
            max_concurrent = 2

            [worker.env]
            ANTHROPIC_LOG = "debug"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.worker.program, "/opt/venv/bin/python");
        assert_eq!(config.worker.timeout_secs, 60);
        assert_eq!(config.worker.max_concurrent, Some(2));
        assert_eq!(config.worker.leading_args, vec!["web_integration.py"]);
        assert_eq!(config.worker.env.get("ANTHROPIC_LOG").map(String::as_str), Some("debug"));
    }

    #[test]
    fn test_storage_path_deserialize() {
        let config: AppConfig = toml::from_str("[storage]\npath = \"/var/lib/recruit/web.db\"").unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/var/lib/recruit/web.db"));
    }

    #[test]
    fn test_store_path_follows_worker_dir() {
        let config: AppConfig = toml::from_str("[worker]\nworking_dir = \"/opt/recruitment\"").unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/opt/recruitment/recruitment_web.db"));

        assert_eq!(AppConfig::default().store_path(), PathBuf::from("recruitment_web.db"));
    }
}
