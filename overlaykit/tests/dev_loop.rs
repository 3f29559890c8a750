//! Dev loop against real builds and real host processes.

#![cfg(unix)]

mod common;

use common::{write, write_project, write_runtime};
use overlaykit::{
    BuildOptions, BuildOrchestrator, Collaborators, DevLoop, DevState, LaunchSpec, NotifyWatcher,
    OverlayError, ProcessError, SourceWatcher, SubprocessLauncher,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(10);

struct Session {
    task: JoinHandle<overlaykit::OverlayResult<()>>,
    shutdown: oneshot::Sender<()>,
    state: watch::Receiver<DevState>,
}

fn start(options: BuildOptions, watcher: Arc<dyn SourceWatcher>) -> Session {
    let collaborators = Collaborators::from_options(&options);
    let orchestrator = BuildOrchestrator::new(options, collaborators).unwrap();
    let spec = LaunchSpec::new(orchestrator.layout(), &orchestrator.options().host);
    let watch_root = orchestrator.layout().source_root().to_path_buf();

    let mut dev = DevLoop::new(
        Arc::new(orchestrator),
        Arc::new(SubprocessLauncher::new(Duration::from_millis(500))),
        watcher,
        spec,
        watch_root,
    );
    let state = dev.subscribe();
    let (shutdown, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        dev.run_until(async move {
            let _ = rx.await;
        })
        .await
    });
    Session { task, shutdown, state }
}

async fn wait_for_lines(path: &Path, n: usize) {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let lines = std::fs::read_to_string(path)
            .map(|text| text.lines().count())
            .unwrap_or(0);
        if lines >= n {
            return;
        }
        assert!(tokio::time::Instant::now() < deadline, "expected {} launches", n);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_source_change_relaunches_host() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let options = write_project(root);
    let launches = root.join("launches.txt");
    write_runtime(
        root,
        &format!("echo started >> '{}'\nexec sleep 30", launches.display()),
    );

    let mut session = start(options, Arc::new(NotifyWatcher));
    wait_for_lines(&launches, 1).await;
    tokio::time::timeout(WAIT, session.state.wait_for(|s| *s == DevState::Running))
        .await
        .unwrap()
        .unwrap();
    // give the watcher time to arm
    tokio::time::sleep(Duration::from_millis(300)).await;

    write(root, "src/modules/c.ts", "export const c = 4;\n");
    wait_for_lines(&launches, 2).await;

    let rebuilt = std::fs::read_to_string(root.join("dist/noraneko/resource/modules/c.js")).unwrap();
    assert_eq!(rebuilt, "export const c = 4;\n");

    session.shutdown.send(()).unwrap();
    tokio::time::timeout(WAIT, session.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_host_exiting_on_its_own_ends_session() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let options = write_project(root);
    write_runtime(root, "sleep 0.2\nexit 3");

    let session = start(options, Arc::new(NotifyWatcher));

    let err = tokio::time::timeout(WAIT, session.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        OverlayError::Process(ProcessError::UnintendedTermination { .. })
    ));
    drop(session.shutdown);
}

#[tokio::test]
async fn test_shutdown_closes_running_host() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let options = write_project(root);
    let pid_file = root.join("host.pid");
    write_runtime(
        root,
        &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
    );

    let session = start(options, Arc::new(NotifyWatcher));
    wait_for_lines(&pid_file, 1).await;
    let pid: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();

    session.shutdown.send(()).unwrap();
    tokio::time::timeout(WAIT, session.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    // reaped by the supervisor, so the pid no longer exists
    let alive = unsafe { libc::kill(pid, 0) } == 0;
    assert!(!alive);
}
