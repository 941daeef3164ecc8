#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("no apps found and no devPorts config in package.json or turbo.json")]
    NoServices,

    #[error("no available port range of {ports_needed} ports between {start_port}-{end_port}")]
    PortRangeUnavailable {
        ports_needed: u16,
        start_port: u16,
        end_port: u16,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process failed: {0}")]
    Process(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
