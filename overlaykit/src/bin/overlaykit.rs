//! overlaykit CLI.
//!
//! `overlaykit` builds once; `overlaykit run` builds, launches the host and
//! relaunches it on every source change until Ctrl-C.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use overlaykit::{
    BuildOptions, BuildOrchestrator, Collaborators, DevLoop, LaunchSpec, NotifyWatcher,
    OutputLayout, OverlayError, ProcessError, SubprocessLauncher, init_logging,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Build a browser overlay and drive the host runtime around it
#[derive(Parser)]
#[command(name = "overlaykit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build once, then launch the host and relaunch it on source changes
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            tracing::error!("{:#}", e);
            eprintln!("overlaykit: {:#}", e);
            ExitCode::from(code)
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let project_root = std::env::current_dir().context("Failed to resolve project root")?;
    let options = BuildOptions::load(&project_root)?;
    let layout = OutputLayout::new(&options);
    layout.prepare()?;
    init_logging(&layout)?;

    let collaborators = Collaborators::from_options(&options);
    let grace = Duration::from_millis(options.host.close_grace_ms);
    let orchestrator = BuildOrchestrator::new(options, collaborators)?;

    match cli.command {
        None => {
            let summary = orchestrator.build_once().await.map_err(OverlayError::from)?;
            tracing::info!(
                version = %summary.version,
                written = summary.written().len(),
                overlay = %orchestrator.layout().overlay_root().display(),
                "Overlay built"
            );
            Ok(())
        }
        Some(Command::Run) => {
            let launch_spec = LaunchSpec::new(orchestrator.layout(), &orchestrator.options().host);
            let watch_root = orchestrator.layout().source_root().to_path_buf();

            let mut dev = DevLoop::new(
                Arc::new(orchestrator),
                Arc::new(SubprocessLauncher::new(grace)),
                Arc::new(NotifyWatcher),
                launch_spec,
                watch_root,
            );
            dev.run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await?;
            Ok(())
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<OverlayError>() {
        Some(OverlayError::Build(_)) => 1,
        Some(OverlayError::Process(ProcessError::UnintendedTermination { .. })) => 2,
        _ => 3,
    }
}
