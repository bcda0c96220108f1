//! Platform-specific process-group signalling.
//!
//! Both operations treat a group that no longer exists as success.

use std::io;

#[cfg(unix)]
fn signal_group(pgid: u32, signal: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: kill(2) with a negative pid only sends a signal; no memory is touched.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => Ok(()),
        _ => Err(err),
    }
}

/// Ask every process in the group to terminate.
#[cfg(unix)]
pub(super) fn terminate_group(pgid: u32) -> io::Result<()> {
    signal_group(pgid, libc::SIGTERM)
}

/// Forcefully kill every process left in the group.
#[cfg(unix)]
pub(super) fn kill_group(pgid: u32) -> io::Result<()> {
    signal_group(pgid, libc::SIGKILL)
}

/// Check whether any process is left in the group.
#[cfg(all(unix, test))]
pub(super) fn group_exists(pgid: u32) -> bool {
    // SAFETY: signal 0 performs permission and existence checks only.
    let rc = unsafe { libc::kill(-(pgid as libc::pid_t), 0) };
    rc == 0 || io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

/// Kill the process and all of its descendants.
///
/// Windows has no group-wide soft termination for console processes, so both
/// operations force-kill the tree.
#[cfg(windows)]
pub(super) fn terminate_group(pid: u32) -> io::Result<()> {
    let output = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdin(std::process::Stdio::null())
        .output()?;

    // 128: no such process
    if output.status.success() || output.status.code() == Some(128) {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "taskkill failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

#[cfg(windows)]
pub(super) fn kill_group(pid: u32) -> io::Result<()> {
    terminate_group(pid)
}
