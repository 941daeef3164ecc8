use std::path::{Path, PathBuf};

use crate::models::{ConfigSource, DevPortsConfig, ServiceConfig};

const ROOT_MARKERS: [&str; 2] = ["pnpm-workspace.yaml", "turbo.json"];
const PACKAGE_MANIFEST: &str = "package.json";
const TURBO_CONFIG: &str = "turbo.json";
const DEV_PORTS_KEY: &str = "devPorts";
const APPS_DIR: &str = "apps";
const DEFAULT_SERVICE_ENV: &str = "PORT";

/// Walk upward from `start_dir` to the first directory holding a workspace
/// marker. Falls back to `start_dir` itself.
pub fn find_monorepo_root(start_dir: &Path) -> PathBuf {
    start_dir
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|m| dir.join(m).is_file()))
        .unwrap_or(start_dir)
        .to_path_buf()
}

/// Read an explicit `devPorts` map from `package.json`, then `turbo.json`.
/// Unreadable or malformed files count as "no config".
pub fn load_dev_ports_config(root: &Path) -> Option<(DevPortsConfig, ConfigSource)> {
    [
        (PACKAGE_MANIFEST, ConfigSource::PackageJson),
        (TURBO_CONFIG, ConfigSource::TurboJson),
    ]
    .into_iter()
    .find_map(|(file, source)| read_dev_ports(&root.join(file)).map(|c| (c, source)))
}

fn read_dev_ports(path: &Path) -> Option<DevPortsConfig> {
    if !path.is_file() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            return None;
        }
    };
    let mut manifest: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("ignoring {}: {e}", path.display());
            return None;
        }
    };
    let section = manifest.get_mut(DEV_PORTS_KEY)?.take();
    match serde_json::from_value(section) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("ignoring malformed {DEV_PORTS_KEY} in {}: {e}", path.display());
            None
        }
    }
}

/// Derive a config from `apps/`: every directory that directly holds a
/// `package.json` becomes a service named by its path below `apps/`.
/// Offsets follow sorted service-path order.
pub fn generate_default_config(root: &Path) -> DevPortsConfig {
    let mut paths = Vec::new();
    let apps_dir = root.join(APPS_DIR);
    if apps_dir.is_dir() {
        scan_apps(&apps_dir, "", &mut paths);
    }
    paths.sort();

    paths
        .into_iter()
        .zip(0u16..)
        .map(|(path, offset)| {
            let config = ServiceConfig {
                offset,
                env: Some(DEFAULT_SERVICE_ENV.to_string()),
                port_count: None,
            };
            (path, config)
        })
        .collect()
}

fn scan_apps(dir: &Path, prefix: &str, found: &mut Vec<String>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!("skipping {}: {e}", dir.display());
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name == "node_modules" {
            continue;
        }
        let service_path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if path.join(PACKAGE_MANIFEST).is_file() {
            found.push(service_path);
        } else {
            scan_apps(&path, &service_path, found);
        }
    }
}

/// Explicit config when present, otherwise the `apps/` scan.
pub fn resolve_dev_ports_config(root: &Path) -> (DevPortsConfig, ConfigSource) {
    load_dev_ports_config(root)
        .unwrap_or_else(|| (generate_default_config(root), ConfigSource::Generated))
}
