use crate::services::ports::{DEFAULT_END_PORT, DEFAULT_START_PORT};

pub const START_PORT_VAR: &str = "DEVPORTS_START_PORT";
pub const END_PORT_VAR: &str = "DEVPORTS_END_PORT";
pub const RUNNER_VAR: &str = "DEVPORTS_RUNNER";
pub const TASK_VAR: &str = "DEVPORTS_TASK";
pub const PRINT_ENV_VAR: &str = "DEVPORTS_PRINT_ENV";
pub const DEBUG_VAR: &str = "DEVPORTS_DEBUG";

const DEFAULT_RUNNER: &str = "turbo";
const DEFAULT_TASK: &str = "dev";

/// Orchestrator knobs read from `DEVPORTS_*` environment variables.
///
/// Command-line arguments are never consumed here; they belong to the task
/// runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevServerSettings {
    pub start_port: u16,
    pub end_port: u16,
    pub runner: String,
    pub task: String,
    pub print_env: bool,
    pub debug: bool,
}

impl Default for DevServerSettings {
    fn default() -> Self {
        Self {
            start_port: DEFAULT_START_PORT,
            end_port: DEFAULT_END_PORT,
            runner: DEFAULT_RUNNER.to_string(),
            task: DEFAULT_TASK.to_string(),
            print_env: false,
            debug: false,
        }
    }
}

impl DevServerSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup. Unparseable values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let start_port = text(START_PORT_VAR)
            .and_then(|v| parse_or_warn(START_PORT_VAR, &v, parse_port))
            .unwrap_or(defaults.start_port);
        let end_port = text(END_PORT_VAR)
            .and_then(|v| parse_or_warn(END_PORT_VAR, &v, parse_port))
            .unwrap_or(defaults.end_port);
        let print_env = text(PRINT_ENV_VAR)
            .and_then(|v| parse_or_warn(PRINT_ENV_VAR, &v, parse_bool))
            .unwrap_or(defaults.print_env);
        let debug = text(DEBUG_VAR)
            .and_then(|v| parse_or_warn(DEBUG_VAR, &v, parse_bool))
            .unwrap_or(defaults.debug);

        Self {
            start_port,
            end_port,
            runner: text(RUNNER_VAR).unwrap_or(defaults.runner),
            task: text(TASK_VAR).unwrap_or(defaults.task),
            print_env,
            debug,
        }
    }

    /// Whether debug logging was asked for. Read ahead of the full settings
    /// so logging is up before any setting is validated.
    pub fn debug_requested(lookup: impl Fn(&str) -> Option<String>) -> bool {
        lookup(DEBUG_VAR)
            .and_then(|v| parse_bool(v.trim()))
            .unwrap_or(false)
    }

    /// Arguments placed before the forwarded CLI arguments.
    pub fn runner_args(&self) -> Vec<String> {
        vec!["run".to_string(), self.task.clone()]
    }
}

fn parse_or_warn<T>(key: &str, value: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(value);
    if parsed.is_none() {
        tracing::warn!("ignoring invalid {key}={value:?}, using default");
    }
    parsed
}

/// Port 0 would bind an ephemeral port, so it is not a valid bound.
fn parse_port(value: &str) -> Option<u16> {
    value.parse::<u16>().ok().filter(|port| *port != 0)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
