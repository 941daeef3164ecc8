use color_eyre::eyre::{Report, WrapErr};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use dp_core::models::DevServerSettings;
use dp_core::services::ports::PortScanOptions;
use dp_core::services::runner::{self, RunnerOptions, TaskRunner};
use dp_core::services::{banner, env_builder, ports, secrets, workspace};
use dp_core::OrchestratorError;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let guard = setup_logging(DevServerSettings::debug_requested(|key| {
        std::env::var(key).ok()
    }));
    let settings = DevServerSettings::from_env();

    // Everything after our own name belongs to the task runner.
    let task_args: Vec<String> = std::env::args().skip(1).collect();

    let code = match run(&settings, task_args).await {
        Ok(code) => code,
        Err(report) => {
            report_failure(&report);
            1
        }
    };

    // `exit` skips destructors; flush the log writer first.
    drop(guard);
    std::process::exit(code);
}

/// Resolve services, allocate ports, and hand the terminal to the task runner.
/// Returns the runner's exit code.
async fn run(settings: &DevServerSettings, task_args: Vec<String>) -> color_eyre::Result<i32> {
    let cwd = std::env::current_dir().wrap_err("failed to read current directory")?;
    let root = workspace::find_monorepo_root(&cwd);
    tracing::debug!("monorepo root: {}", root.display());

    let (config, source) = workspace::resolve_dev_ports_config(&root);
    if config.is_empty() {
        return Err(OrchestratorError::NoServices.into());
    }
    tracing::info!(services = config.len(), "using devPorts from {source}");

    let scan = PortScanOptions {
        start_port: settings.start_port,
        end_port: settings.end_port,
        ports_needed: config.ports_needed(),
        ..PortScanOptions::default()
    };
    let base_port = ports::find_available_port_range(&scan).await?;
    tracing::info!(base_port, ports_needed = scan.ports_needed, "allocated port range");

    let generated_env = env_builder::build_env_vars(base_port, &config)?;
    let secrets = secrets::load_secrets(&root);

    let task_runner = TaskRunner {
        program: settings.runner.clone(),
        args: settings.runner_args(),
    };

    println!(
        "{}",
        banner::render_banner(base_port, &generated_env.services, &task_runner.label())
    );
    if settings.print_env {
        let listing = banner::render_env_listing(&generated_env.env);
        if !listing.is_empty() {
            println!("{listing}");
        }
    }

    let code = runner::run_dev(RunnerOptions {
        cwd: root,
        generated_env,
        secrets,
        ambient_env: runner::ambient_env(),
        runner: task_runner,
        task_args,
    })
    .await?;
    Ok(code)
}

fn report_failure(report: &Report) {
    eprintln!("error: {report:#}");
    if let Some(OrchestratorError::NoServices) = report.downcast_ref::<OrchestratorError>() {
        eprintln!("hint: add a devPorts config or create apps in the apps/ directory");
    }
}

/// Stderr logging by default; `DEVPORTS_DEBUG` switches to a debug log file
/// so orchestrator output never interleaves with the task runner's.
fn setup_logging(debug: bool) -> Option<WorkerGuard> {
    if debug {
        return Some(setup_debug_logging());
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();
    None
}

/// Configure file-based tracing to `.devports-debug.log` in CWD.
/// Returns the guard that must be held alive for the duration of the program.
fn setup_debug_logging() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::never(".", ".devports-debug.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .init();

    guard
}
