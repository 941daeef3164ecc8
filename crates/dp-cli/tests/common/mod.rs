// Each test binary compiles this module independently and uses a different
// subset of helpers, so unused-function warnings are expected.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// A throwaway monorepo with a stub task runner script.
pub struct Monorepo {
    dir: TempDir,
    stub: PathBuf,
}

impl Monorepo {
    /// Repo whose root `package.json` declares the given `devPorts` entries.
    pub fn with_dev_ports(entries: &[(&str, u16)]) -> Self {
        let repo = Self::empty();
        let dev_ports: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(path, offset)| (path.to_string(), serde_json::json!({ "offset": offset })))
            .collect();
        let manifest = serde_json::json!({ "name": "mono", "private": true, "devPorts": dev_ports });
        repo.write("package.json", &manifest.to_string());
        repo
    }

    /// Repo with a `turbo.json` marker and nothing else.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join(".stub-runner.sh");
        let repo = Self { dir, stub };
        repo.write("turbo.json", r#"{ "tasks": { "dev": { "persistent": true } } }"#);
        repo
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    /// Install the body of the `sh` script that stands in for `turbo`.
    pub fn stub_runner(&self, body: &str) {
        fs::write(&self.stub, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&self.stub, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// `devports` started in `cwd`, scanning `[start_port, start_port + 100]`.
    pub fn devports_in(&self, cwd: &Path, start_port: u16) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_devports"));
        self.configure(&mut cmd, cwd, start_port);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// `devports` at the repo root with a pseudo-terminal as its controlling
    /// terminal, via util-linux `script`. Stdin feeds the terminal's input and
    /// stdout carries everything written to it.
    pub fn devports_on_pty(&self, start_port: u16) -> Command {
        let mut cmd = Command::new("script");
        cmd.arg("-qec")
            .arg(format!("'{}'", env!("CARGO_BIN_EXE_devports")))
            .arg("/dev/null")
            .env("SHELL", "/bin/sh");
        self.configure(&mut cmd, self.root(), start_port);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn configure(&self, cmd: &mut Command, cwd: &Path, start_port: u16) {
        cmd.current_dir(cwd)
            .env("DEVPORTS_RUNNER", &self.stub)
            .env("DEVPORTS_START_PORT", start_port.to_string())
            .env("DEVPORTS_END_PORT", (start_port + 100).to_string())
            .env_remove("DEVPORTS_TASK")
            .env_remove("DEVPORTS_PRINT_ENV")
            .env_remove("DEVPORTS_DEBUG")
            .env_remove("RUST_LOG");
    }

    pub fn devports(&self, start_port: u16) -> Command {
        self.devports_in(self.root(), start_port)
    }
}

/// Parse `env` output into a map.
pub fn parse_env_dump(dump: &str) -> BTreeMap<String, String> {
    dump.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Whether util-linux `script` is installed for pseudo-terminal tests.
pub fn has_script() -> bool {
    Command::new("script")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Poll until `path` exists.
pub fn wait_for(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", path.display());
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Wait for `child` to exit, killing it after `timeout`.
pub fn wait_timeout(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            panic!("process still running after {timeout:?}");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
