use std::ffi::CString;
use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use log::debug;
use nix::fcntl::{open, OFlag};
use nix::sys::signal::{kill, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{execvp, fork, pipe, ForkResult, Pid};

use crate::ast::{AndOrList, Command, Connector, Segment, SegmentKind};
use crate::builtins;
use crate::jobs::JobStatus;
use crate::shell::Shell;
use crate::signals;

/// Run every segment of a line, left to right. The return value is the
/// status of the last segment executed.
pub fn execute_segments(shell: &mut Shell, segments: &[Segment]) -> i32 {
    let mut status = 0;
    for segment in segments {
        status = execute_segment(shell, segment);
    }
    status
}

fn execute_segment(shell: &mut Shell, segment: &Segment) -> i32 {
    if segment.background {
        return execute_background(shell, segment);
    }
    match &segment.kind {
        SegmentKind::AndOr(list) => execute_andor(shell, list),
        SegmentKind::Subshell(inner) => execute_subshell(shell, inner, &segment.text),
    }
}

/// Short-circuit evaluation: after each pipeline, an `&&` right-hand side
/// runs only on success and an `||` right-hand side only on failure.
fn execute_andor(shell: &mut Shell, list: &AndOrList) -> i32 {
    let mut status = execute_pipeline(shell, &list.first.stages);
    for (connector, pipeline) in &list.rest {
        let run = match connector {
            Connector::And => status == 0,
            Connector::Or => status != 0,
        };
        if run {
            status = execute_pipeline(shell, &pipeline.stages);
        }
    }
    status
}

fn execute_pipeline(shell: &mut Shell, stages: &[Command]) -> i32 {
    let status = match stages {
        [] => return 1,
        [single] => execute_simple(shell, single),
        _ => execute_multi(shell, stages),
    };
    shell.vars.last_status = status;
    status
}

/// A command with no pipe: variable assignment, in-process builtin with
/// stdio swapped around it, or fork/exec with a synchronous wait.
fn execute_simple(shell: &mut Shell, cmd: &Command) -> i32 {
    if let [word] = cmd.argv.as_slice() {
        if let Some(eq) = word.find('=') {
            if eq > 0 && crate::variables::VarStore::is_valid_name(&word[..eq]) {
                return match shell.vars.set(&word[..eq], &word[eq + 1..], false) {
                    Ok(()) => 0,
                    Err(e) => {
                        eprintln!("{}", e);
                        1
                    }
                };
            }
        }
    }

    debug!("executing: {:?}", cmd.argv);

    if builtins::is_builtin(&cmd.argv[0]) {
        return run_builtin_redirected(shell, cmd);
    }

    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            unsafe {
                libc::setpgid(0, 0);
            }
            signals::reset_for_child();
            if !install_redirections(cmd, true) {
                std::process::exit(1);
            }
            exec_external(&cmd.argv);
        }
        Ok(ForkResult::Parent { child }) => {
            wait_foreground(shell, child, &cmd.argv.join(" "))
        }
        Err(e) => {
            eprintln!("fork: {}", e);
            1
        }
    }
}

/// N >= 2 stages. All pipes exist before the first fork; every child is
/// forked before the parent waits; the parent ends up holding no pipe
/// descriptor at all.
fn execute_multi(shell: &mut Shell, stages: &[Command]) -> i32 {
    let n = stages.len();
    let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(n - 1);
    for _ in 0..n - 1 {
        match pipe() {
            Ok(ends) => pipes.push(ends),
            Err(e) => {
                eprintln!("pipe: {}", e);
                return 1;
            }
        }
    }

    let mut pids: Vec<Pid> = Vec::with_capacity(n);
    for (i, cmd) in stages.iter().enumerate() {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                unsafe {
                    libc::setpgid(0, 0);
                }
                signals::reset_for_child();

                if i == 0 {
                    if !install_input(cmd) {
                        std::process::exit(1);
                    }
                } else {
                    unsafe {
                        libc::dup2(pipes[i - 1].0.as_raw_fd(), libc::STDIN_FILENO);
                    }
                }

                if i == n - 1 {
                    if !install_output(cmd) {
                        std::process::exit(1);
                    }
                } else {
                    unsafe {
                        libc::dup2(pipes[i].1.as_raw_fd(), libc::STDOUT_FILENO);
                    }
                }

                // Close every inherited pipe endpoint. The child never
                // returns from this arm, so the owned fds are not dropped.
                for (read_end, write_end) in &pipes {
                    unsafe {
                        libc::close(read_end.as_raw_fd());
                        libc::close(write_end.as_raw_fd());
                    }
                }

                if builtins::is_builtin(&cmd.argv[0]) {
                    let code = builtins::run(shell, &cmd.argv);
                    let _ = std::io::stdout().flush();
                    std::process::exit(code);
                }
                exec_external(&cmd.argv);
            }
            Ok(ForkResult::Parent { child }) => pids.push(child),
            Err(e) => {
                eprintln!("fork: {}", e);
                for pid in &pids {
                    let _ = kill(*pid, Signal::SIGTERM);
                }
                return 1;
            }
        }
    }

    // Parent holds no pipe endpoint while waiting.
    drop(pipes);

    let last_pid = pids[n - 1];
    signals::set_foreground(last_pid.as_raw());

    // The pipeline's exit status is the last stage's; earlier failures
    // (a grep with no match mid-pipe) do not leak through. A signal is
    // the exception: the last signaled stage decides.
    let mut exit_status = 0;
    let mut last_signal: Option<i32> = None;
    let mut last_stopped = false;
    for pid in &pids {
        match waitpid(*pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(_, code)) => {
                if *pid == last_pid {
                    exit_status = code;
                }
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => last_signal = Some(sig as i32),
            Ok(WaitStatus::Stopped(stopped_pid, _)) => {
                // Only the last stage is tracked as a job.
                if stopped_pid == last_pid {
                    let text = stages[n - 1].argv.join(" ");
                    let id = shell.jobs.add(stopped_pid, text.clone(), JobStatus::Stopped);
                    println!("[{}] Stopped {}", id, text);
                    last_stopped = true;
                }
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("wait: {}", e);
                exit_status = 1;
            }
        }
    }
    signals::clear_foreground();

    if last_stopped {
        148
    } else if let Some(sig) = last_signal {
        128 + sig
    } else {
        exit_status
    }
}

/// A trailing `&` detaches the segment under a supervisor child: stdin
/// from the null device, default signal dispositions, and the segment's
/// status as the supervisor's exit code. The parent does not wait.
fn execute_background(shell: &mut Shell, segment: &Segment) -> i32 {
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            unsafe {
                libc::setpgid(0, 0);
            }
            if let Ok(fd) = open("/dev/null", OFlag::O_RDONLY, Mode::empty()) {
                unsafe {
                    libc::dup2(fd, libc::STDIN_FILENO);
                    libc::close(fd);
                }
            }
            signals::reset_for_child();
            let code = match &segment.kind {
                SegmentKind::AndOr(list) => execute_andor(shell, list),
                SegmentKind::Subshell(inner) => execute_segments(shell, inner),
            };
            std::process::exit(code);
        }
        Ok(ForkResult::Parent { child }) => {
            let id = shell
                .jobs
                .add(child, segment.text.clone(), JobStatus::Running);
            shell.vars.last_background_pid = child.as_raw();
            println!("[{}] {}", id, child);
            0
        }
        Err(e) => {
            eprintln!("fork: {}", e);
            1
        }
    }
}

/// A parenthesized group runs the enclosed list in a forked child; the
/// parent waits synchronously.
fn execute_subshell(shell: &mut Shell, inner: &[Segment], text: &str) -> i32 {
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            unsafe {
                libc::setpgid(0, 0);
            }
            signals::reset_for_child();
            let code = execute_segments(shell, inner);
            std::process::exit(code);
        }
        Ok(ForkResult::Parent { child }) => wait_foreground(shell, child, text),
        Err(e) => {
            eprintln!("fork: {}", e);
            1
        }
    }
}

/// Publish `pid` as the foreground process and block until it changes
/// state. A stop registers the command in the job table and yields the
/// conventional 148.
pub fn wait_foreground(shell: &mut Shell, pid: Pid, command: &str) -> i32 {
    signals::set_foreground(pid.as_raw());
    let status = match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
        Ok(WaitStatus::Exited(_, code)) => code,
        Ok(WaitStatus::Signaled(_, sig, _)) => 128 + sig as i32,
        Ok(WaitStatus::Stopped(_, _)) => {
            let id = shell.jobs.add(pid, command.to_string(), JobStatus::Stopped);
            println!("[{}] Stopped {}", id, command);
            148
        }
        Ok(_) => 1,
        Err(e) => {
            eprintln!("wait: {}", e);
            1
        }
    };
    signals::clear_foreground();
    status
}

/// Builtins run in the shell process; their redirections are installed
/// onto the real stdio and restored afterwards on every path.
fn run_builtin_redirected(shell: &mut Shell, cmd: &Command) -> i32 {
    let saved_in = unsafe { libc::dup(libc::STDIN_FILENO) };
    let saved_out = unsafe { libc::dup(libc::STDOUT_FILENO) };
    if saved_in < 0 || saved_out < 0 {
        eprintln!("dup: {}", std::io::Error::last_os_error());
        unsafe {
            if saved_in >= 0 {
                libc::close(saved_in);
            }
            if saved_out >= 0 {
                libc::close(saved_out);
            }
        }
        return 1;
    }

    let code = if install_redirections(cmd, false) {
        builtins::run(shell, &cmd.argv)
    } else {
        1
    };

    let _ = std::io::stdout().flush();
    unsafe {
        libc::dup2(saved_in, libc::STDIN_FILENO);
        libc::dup2(saved_out, libc::STDOUT_FILENO);
        libc::close(saved_in);
        libc::close(saved_out);
    }
    code
}

fn install_redirections(cmd: &Command, verbose: bool) -> bool {
    install_input_with(cmd, verbose) && install_output_with(cmd, verbose)
}

fn install_input(cmd: &Command) -> bool {
    install_input_with(cmd, true)
}

fn install_output(cmd: &Command) -> bool {
    install_output_with(cmd, true)
}

fn install_input_with(cmd: &Command, verbose: bool) -> bool {
    let Some(path) = &cmd.input_file else {
        return true;
    };
    match open(path.as_str(), OFlag::O_RDONLY, Mode::empty()) {
        Ok(fd) => {
            dup_onto(fd, libc::STDIN_FILENO);
            true
        }
        Err(e) => {
            if verbose {
                eprintln!("Error opening input file {}: {}", path, e);
            } else {
                eprintln!("No such file or directory");
            }
            false
        }
    }
}

fn install_output_with(cmd: &Command, verbose: bool) -> bool {
    let Some(path) = &cmd.output_file else {
        return true;
    };
    let mut flags = OFlag::O_WRONLY | OFlag::O_CREAT;
    flags |= if cmd.append {
        OFlag::O_APPEND
    } else {
        OFlag::O_TRUNC
    };
    match open(path.as_str(), flags, Mode::from_bits_truncate(0o644)) {
        Ok(fd) => {
            dup_onto(fd, libc::STDOUT_FILENO);
            true
        }
        Err(e) => {
            if verbose {
                eprintln!("Error opening output file {}: {}", path, e);
            } else {
                eprintln!("Unable to create file for writing");
            }
            false
        }
    }
}

fn dup_onto(fd: RawFd, target: RawFd) {
    unsafe {
        libc::dup2(fd, target);
        libc::close(fd);
    }
}

/// Replace the image with the program found on the path. Does not return;
/// a failed lookup exits the child with 127.
fn exec_external(argv: &[String]) -> ! {
    let program = CString::new(argv[0].as_str()).unwrap_or_default();
    let args: Vec<CString> = argv
        .iter()
        .map(|a| CString::new(a.as_str()).unwrap_or_default())
        .collect();
    let _ = execvp(&program, &args);
    eprintln!("{}: command not found", argv[0]);
    std::process::exit(127);
}
