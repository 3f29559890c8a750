//! Subprocess spawning for the host executable.

use super::LaunchSpec;
use overlaykit_shared::ProcessError;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Spawns the host with `--profile <dir>` followed by the configured
/// arguments.
///
/// stdin is closed; stdout and stderr are inherited so host console output
/// stays visible next to the build log.
pub(crate) fn spawn_host(spec: &LaunchSpec) -> Result<Child, ProcessError> {
    let mut cmd = Command::new(&spec.executable);
    cmd.arg("--profile").arg(&spec.profile_dir).args(&spec.args);

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());
    cmd.kill_on_drop(true);

    cmd.spawn().map_err(|e| {
        let err_msg = format!(
            "Failed to spawn host process at {}: {}",
            spec.executable.display(),
            e
        );
        tracing::error!("{}", err_msg);
        ProcessError::Launch(err_msg)
    })
}
