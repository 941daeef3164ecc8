pub mod config;
pub mod env;
pub mod settings;

pub use config::{ConfigSource, DevPortsConfig, ServiceConfig};
pub use env::{GeneratedEnv, ServiceEndpoint};
pub use settings::DevServerSettings;
