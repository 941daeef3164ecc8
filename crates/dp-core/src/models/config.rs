use std::collections::BTreeMap;

use serde::Deserialize;

/// Ports reserved by a service when `portCount` is not declared.
pub const DEFAULT_PORT_COUNT: u16 = 2;

/// One orchestrated service as declared under `devPorts`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Position of the service inside the allocated block.
    pub offset: u16,
    /// Variable the service itself reads its port from. Generated variable
    /// names always derive from the service path, not from this field.
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub port_count: Option<u16>,
}

impl ServiceConfig {
    pub fn new(offset: u16) -> Self {
        Self {
            offset,
            env: None,
            port_count: None,
        }
    }

    pub fn port_count(&self) -> u16 {
        self.port_count.unwrap_or(DEFAULT_PORT_COUNT)
    }
}

/// Service path (e.g. `web/dashboard`) to service config, iterated in
/// lexicographic path order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DevPortsConfig {
    services: BTreeMap<String, ServiceConfig>,
}

impl DevPortsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, config: ServiceConfig) {
        self.services.insert(path.into(), config);
    }

    pub fn get(&self, path: &str) -> Option<&ServiceConfig> {
        self.services.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ServiceConfig)> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Width of the contiguous block covering every service's reserved ports.
    pub fn ports_needed(&self) -> u16 {
        self.services
            .values()
            .map(|c| c.offset.saturating_add(c.port_count()))
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<(String, ServiceConfig)> for DevPortsConfig {
    fn from_iter<I: IntoIterator<Item = (String, ServiceConfig)>>(iter: I) -> Self {
        Self {
            services: iter.into_iter().collect(),
        }
    }
}

/// Where the active `devPorts` map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    PackageJson,
    TurboJson,
    Generated,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PackageJson => f.write_str("package.json"),
            Self::TurboJson => f.write_str("turbo.json"),
            Self::Generated => f.write_str("apps/ scan"),
        }
    }
}
