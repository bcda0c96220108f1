//! Interrupt handling test.
//!
//! Signals are process-wide, so this lives in its own test binary.

#![cfg(unix)]

use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

use runcmd::{CommandRunner, CommandSpec, RunError, RunnerConfig, Status};

fn group_gone(pgid: u32) -> bool {
    // SAFETY: signal 0 only checks for existence.
    let rc = unsafe { libc::kill(-(pgid as libc::pid_t), 0) };
    rc == -1 && std::io::Error::last_os_error().raw_os_error() == Some(libc::ESRCH)
}

#[tokio::test]
async fn test_sigterm_interrupts_run() {
    let runner = CommandRunner::with_config(RunnerConfig {
        poll_interval: Duration::from_millis(50),
        kill_grace: Duration::from_millis(500),
        handle_signals: true,
        ..RunnerConfig::default()
    });

    tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(700)).await;
        // SAFETY: the runner has installed its handler by now; without one
        // the default action would end the test binary.
        unsafe {
            libc::kill(libc::getpid(), libc::SIGTERM);
        }
    });

    let pid_file = NamedTempFile::new().unwrap();
    let start = Instant::now();
    let spec = CommandSpec::new(format!(
        "echo $$ > '{}'; exec sleep 30",
        pid_file.path().display()
    ))
    .shell(true);
    let err = runner.run(&spec).await.unwrap_err();

    assert!(matches!(err, RunError::Interrupted { .. }), "got {:?}", err);
    assert_eq!(err.status(), Status::Interrupted);
    assert_eq!(err.status().code(), -3);
    assert!(err.message().contains("SIGTERM"));
    assert!(start.elapsed() < Duration::from_secs(5));

    let pid: u32 = std::fs::read_to_string(pid_file.path())
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(group_gone(pid), "process group {} survived", pid);
}
