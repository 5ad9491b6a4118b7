use std::fmt;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: u32,
    pub pid: Pid,
    pub command: String,
    pub status: JobStatus,
}

/// Background and stopped jobs in insertion order, keyed by a job id that
/// is never reused within a session.
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: u32,
}

impl JobTable {
    pub fn new() -> JobTable {
        JobTable {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, pid: Pid, command: String, status: JobStatus) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.push(Job {
            id,
            pid,
            command,
            status,
        });
        id
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn find_by_id(&self, id: u32) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn remove_by_pid(&mut self, pid: Pid) -> Option<Job> {
        let index = self.jobs.iter().position(|j| j.pid == pid)?;
        Some(self.jobs.remove(index))
    }

    pub fn set_status(&mut self, pid: Pid, status: JobStatus) {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.pid == pid) {
            job.status = status;
        }
    }

    /// Non-blocking drain, run just before each prompt. Announces every
    /// state transition and drops entries that reached a terminal state.
    pub fn reap(&mut self) {
        self.jobs.retain_mut(|job| {
            let flags =
                WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
            match waitpid(job.pid, Some(flags)) {
                Ok(WaitStatus::Exited(_, 0)) => {
                    println!("{} with pid {} exited normally", job.command, job.pid);
                    false
                }
                Ok(WaitStatus::Exited(_, _)) => {
                    println!("{} with pid {} exited abnormally", job.command, job.pid);
                    false
                }
                Ok(WaitStatus::Signaled(_, _, _)) => {
                    println!("{} with pid {} exited abnormally", job.command, job.pid);
                    false
                }
                Ok(WaitStatus::Stopped(_, _)) => {
                    println!("[{}] Stopped {}", job.id, job.command);
                    job.status = JobStatus::Stopped;
                    true
                }
                Ok(WaitStatus::Continued(_)) => {
                    println!("[{}] Continued {}", job.id, job.command);
                    job.status = JobStatus::Running;
                    true
                }
                Ok(_) => true, // still alive
                Err(Errno::ECHILD) => false,
                Err(_) => false,
            }
        });
    }
}
