use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::error::Result;

/// Pid of the child the shell is currently blocked on; -1 means none.
/// Published atomically so the handlers always see a consistent value.
static FOREGROUND_PID: AtomicI32 = AtomicI32::new(-1);

pub fn set_foreground(pid: i32) {
    FOREGROUND_PID.store(pid, Ordering::SeqCst);
}

pub fn clear_foreground() {
    FOREGROUND_PID.store(-1, Ordering::SeqCst);
}

/// Relay terminal-originated SIGINT/SIGTSTP to the foreground child. Only
/// async-signal-safe calls in here: one atomic load, kill, write.
extern "C" fn forward_to_foreground(signo: libc::c_int) {
    let pid = FOREGROUND_PID.load(Ordering::SeqCst);
    if pid > 0 {
        unsafe {
            libc::kill(pid as libc::pid_t, signo);
        }
    }
    unsafe {
        libc::write(libc::STDOUT_FILENO, b"\n".as_ptr() as *const libc::c_void, 1);
    }
}

/// Installed once at startup. SA_RESTART keeps the line editor's blocking
/// reads running across handler invocations; SIGQUIT is ignored at the
/// shell.
pub fn install() -> Result<()> {
    let forward = SigAction::new(
        SigHandler::Handler(forward_to_foreground),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());

    unsafe {
        sigaction(Signal::SIGINT, &forward)?;
        sigaction(Signal::SIGTSTP, &forward)?;
        sigaction(Signal::SIGQUIT, &ignore)?;
    }
    Ok(())
}

/// Children put every disposition back to default before exec.
pub fn reset_for_child() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    unsafe {
        let _ = sigaction(Signal::SIGINT, &default);
        let _ = sigaction(Signal::SIGTSTP, &default);
        let _ = sigaction(Signal::SIGQUIT, &default);
    }
}
