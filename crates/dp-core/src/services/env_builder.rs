use crate::error::{OrchestratorError, Result};
use crate::models::{DevPortsConfig, GeneratedEnv, ServiceEndpoint};

const API_ALIAS: &str = "API_URL";

/// `web/dashboard` -> `WEB_DASHBOARD`.
pub fn canonical_env_name(service_path: &str) -> String {
    service_path.to_uppercase().replace(['/', '-'], "_")
}

pub fn service_url(port: u16) -> String {
    format!("http://localhost:{port}")
}

/// Derive `PORT_<NAME>`, `<NAME>_URL` and the `API_URL` alias for every
/// service. Services are visited in path order; when several paths contain
/// `api`, the last one visited owns `API_URL`.
pub fn build_env_vars(base_port: u16, config: &DevPortsConfig) -> Result<GeneratedEnv> {
    let mut generated = GeneratedEnv::default();

    for (service_path, service) in config.iter() {
        let port = base_port.checked_add(service.offset).ok_or_else(|| {
            OrchestratorError::InvalidConfig(format!(
                "offset {} of '{service_path}' overflows base port {base_port}",
                service.offset
            ))
        })?;
        let env_name = canonical_env_name(service_path);
        let url = service_url(port);

        generated
            .env
            .insert(format!("PORT_{env_name}"), port.to_string());
        generated.env.insert(format!("{env_name}_URL"), url.clone());

        if service_path.contains("api") {
            let previous = generated.env.insert(API_ALIAS.to_string(), url.clone());
            if let Some(previous) = previous.filter(|p| *p != url) {
                tracing::warn!(
                    "several services match \"api\"; {API_ALIAS} moves from {previous} to {url} ({service_path})"
                );
            }
        }

        generated.services.push(ServiceEndpoint {
            name: service_path.clone(),
            port,
            url,
        });
    }

    Ok(generated)
}
