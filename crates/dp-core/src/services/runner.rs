use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use crate::error::{OrchestratorError, Result};
use crate::models::GeneratedEnv;

/// The command that starts every dev task in the monorepo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRunner {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self {
            program: "turbo".to_string(),
            args: vec!["run".to_string(), "dev".to_string()],
        }
    }
}

impl TaskRunner {
    pub fn label(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct RunnerOptions {
    /// Monorepo root; the runner's working directory.
    pub cwd: PathBuf,
    pub generated_env: GeneratedEnv,
    pub secrets: BTreeMap<String, String>,
    /// Snapshot of the orchestrator's own environment.
    pub ambient_env: BTreeMap<OsString, OsString>,
    pub runner: TaskRunner,
    /// Forwarded verbatim after the runner's own arguments.
    pub task_args: Vec<String>,
}

pub fn ambient_env() -> BTreeMap<OsString, OsString> {
    std::env::vars_os().collect()
}

/// Layer ambient < secrets < generated. Generated port variables always win.
pub fn merge_env(
    ambient: &BTreeMap<OsString, OsString>,
    secrets: &BTreeMap<String, String>,
    generated: &BTreeMap<String, String>,
) -> BTreeMap<OsString, OsString> {
    let mut merged = ambient.clone();
    for (key, value) in secrets.iter().chain(generated.iter()) {
        merged.insert(OsString::from(key), OsString::from(value));
    }
    merged
}

/// Run the task runner with the merged environment and inherited stdio.
///
/// On unix the child leads its own process group. When the orchestrator owns
/// the terminal, that group becomes the foreground group for the child's
/// lifetime, so the task can read the TTY and receives Ctrl-C from it
/// directly. Interrupt, terminate and hang-up signals sent to the
/// orchestrator are forwarded to the group. Resolves with the child's exit
/// code; a child killed by a signal reports `0`.
pub async fn run_dev(options: RunnerOptions) -> Result<i32> {
    let RunnerOptions {
        cwd,
        generated_env,
        secrets,
        ambient_env,
        runner,
        task_args,
    } = options;

    let env = merge_env(&ambient_env, &secrets, &generated_env.env);

    let mut cmd = Command::new(&runner.program);
    cmd.args(&runner.args);
    cmd.args(&task_args);
    cmd.current_dir(&cwd);
    cmd.env_clear();
    cmd.envs(&env);
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());
    #[cfg(unix)]
    let terminal = {
        cmd.process_group(0);
        let terminal = ForegroundTerminal::claim();
        if terminal.is_some() {
            // SAFETY: the hook only calls async-signal-safe libc functions.
            unsafe {
                cmd.pre_exec(|| {
                    // The new group takes the terminal before exec so the task
                    // never runs in the background, even briefly.
                    let _ = set_foreground_group(libc::getpgrp());
                    Ok(())
                });
            }
        }
        terminal
    };

    // Listeners exist before the child so an early Ctrl-C is forwarded
    // rather than killing the orchestrator.
    let signals = ForwardedSignals::install()?;

    let mut child = cmd.spawn().map_err(|source| OrchestratorError::Spawn {
        program: runner.program.clone(),
        source,
    })?;
    tracing::info!(pid = child.id(), "spawned {}", runner.label());

    let status = supervise(&mut child, signals).await?;
    #[cfg(unix)]
    drop(terminal);
    tracing::info!("{} exited: {status}", runner.label());
    Ok(exit_code(status))
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            tracing::warn!("child terminated by signal {signal}");
        }
    }
    0
}

/// The controlling terminal on stdin, held while the orchestrator is its
/// foreground group. Dropping it takes the terminal back.
#[cfg(unix)]
struct ForegroundTerminal {
    own_group: libc::pid_t,
}

#[cfg(unix)]
impl ForegroundTerminal {
    /// `None` when stdin is not a terminal or we run as a background job.
    fn claim() -> Option<Self> {
        // SAFETY: plain queries on fd 0 and our own process.
        let (is_tty, foreground, own_group) = unsafe {
            (
                libc::isatty(libc::STDIN_FILENO) == 1,
                libc::tcgetpgrp(libc::STDIN_FILENO),
                libc::getpgrp(),
            )
        };
        (is_tty && foreground == own_group).then_some(Self { own_group })
    }
}

#[cfg(unix)]
impl Drop for ForegroundTerminal {
    fn drop(&mut self) {
        match set_foreground_group(self.own_group) {
            Ok(()) => tracing::debug!("terminal returned to orchestrator"),
            Err(e) => tracing::warn!("failed to take back the terminal: {e}"),
        }
    }
}

/// Make `group` the terminal's foreground process group. SIGTTOU is ignored
/// for the call since the caller may itself be in the background.
#[cfg(unix)]
fn set_foreground_group(group: libc::pid_t) -> std::io::Result<()> {
    // SAFETY: async-signal-safe calls only; used both in the parent and in
    // the pre-exec hook of the child.
    unsafe {
        let previous = libc::signal(libc::SIGTTOU, libc::SIG_IGN);
        let rc = libc::tcsetpgrp(libc::STDIN_FILENO, group);
        let result = if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        };
        libc::signal(libc::SIGTTOU, previous);
        result
    }
}

#[cfg(unix)]
struct ForwardedSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ForwardedSignals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }
}

/// Wait for the child while relaying signals. The listeners are dropped on
/// return, so nothing keeps forwarding once the child is gone.
#[cfg(unix)]
async fn supervise(child: &mut Child, mut signals: ForwardedSignals) -> Result<ExitStatus> {
    let pid = child.id();
    loop {
        tokio::select! {
            status = child.wait() => {
                return status.map_err(|e| OrchestratorError::Process(format!("wait failed: {e}")));
            }
            Some(()) = signals.interrupt.recv() => forward_signal(pid, libc::SIGINT, "SIGINT"),
            Some(()) = signals.terminate.recv() => forward_signal(pid, libc::SIGTERM, "SIGTERM"),
            Some(()) = signals.hangup.recv() => forward_signal(pid, libc::SIGHUP, "SIGHUP"),
        }
    }
}

#[cfg(unix)]
fn forward_signal(pid: Option<u32>, signal: libc::c_int, name: &str) {
    let Some(pid) = pid else {
        return;
    };
    // The child leads its own process group, so `-pid` reaches every task it started.
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
    if rc == 0 {
        tracing::info!(pid, "forwarded {name} to child process group");
    } else {
        tracing::warn!(
            pid,
            "failed to forward {name}: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
struct ForwardedSignals;

#[cfg(not(unix))]
impl ForwardedSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }
}

/// The console delivers Ctrl-C to every attached process already; holding a
/// listener keeps the orchestrator alive until the child exits.
#[cfg(not(unix))]
async fn supervise(child: &mut Child, _signals: ForwardedSignals) -> Result<ExitStatus> {
    loop {
        tokio::select! {
            status = child.wait() => {
                return status.map_err(|e| OrchestratorError::Process(format!("wait failed: {e}")));
            }
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, waiting for child to exit");
            }
        }
    }
}
