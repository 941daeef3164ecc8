use std::collections::BTreeMap;

/// A service's allocated port, listed in the startup banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub name: String,
    pub port: u16,
    pub url: String,
}

/// Variables derived from a base port and the `devPorts` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedEnv {
    pub env: BTreeMap<String, String>,
    pub services: Vec<ServiceEndpoint>,
}
