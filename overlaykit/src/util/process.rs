//! Signal helpers for the host process.

/// Ask a process to exit with SIGTERM.
///
/// # Returns
/// * `true` - Signal delivered, or the process is already gone
/// * `false` - Delivery failed (permission denied)
pub fn terminate_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, libc::SIGTERM) == 0 || !is_process_alive(pid) }
}

/// Kill a process with SIGKILL.
///
/// # Returns
/// * `true` - Process was killed or doesn't exist
/// * `false` - Failed to kill (permission denied)
pub fn kill_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, libc::SIGKILL) == 0 || !is_process_alive(pid) }
}

/// Check if a process with the given PID exists.
///
/// Uses `libc::kill(pid, 0)`, which sends a null signal to check existence.
pub fn is_process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_is_process_alive_current() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn test_is_process_alive_invalid() {
        // u32::MAX becomes -1 as i32, which kill() treats as "every process"
        assert!(!is_process_alive(999999999));
    }

    #[test]
    fn test_terminate_stops_child() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();

        assert!(terminate_process(pid));
        let status = child.wait().unwrap();
        assert!(!status.success());

        let deadline = Instant::now() + Duration::from_secs(5);
        while is_process_alive(pid) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!is_process_alive(pid));
    }

    #[test]
    fn test_signalling_missing_process_reports_gone() {
        assert!(kill_process(999999999));
        assert!(terminate_process(999999999));
    }
}
