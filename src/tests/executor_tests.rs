use std::fs;
use std::time::{Duration, Instant};

use tempfile::{tempdir, NamedTempFile};

use crate::shell::Shell;

#[test]
fn test_exit_status_conventions() {
    let mut shell = Shell::new();
    assert_eq!(shell.run_line("true"), 0);
    assert_eq!(shell.run_line("false"), 1);
    assert_eq!(shell.run_line("nosuchcommandanywhere"), 127);
}

#[test]
fn test_last_status_is_published() {
    let mut shell = Shell::new();
    shell.run_line("false");
    assert_eq!(shell.vars.last_status, 1);
    shell.run_line("true");
    assert_eq!(shell.vars.last_status, 0);
}

#[test]
fn test_and_or_short_circuit() {
    let mut shell = Shell::new();
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let c = dir.path().join("c");

    // Skipped pipelines spawn no processes.
    shell.run_line(&format!("false && touch {}", a.display()));
    assert!(!a.exists());

    shell.run_line(&format!("false || touch {}", b.display()));
    assert!(b.exists());

    shell.run_line(&format!("true && touch {}", c.display()));
    assert!(c.exists());
}

#[test]
fn test_and_or_is_left_associative() {
    let mut shell = Shell::new();
    let dir = tempdir().unwrap();
    let probe = dir.path().join("probe");

    // (false && X) fails, so the || side runs.
    let status = shell.run_line(&format!(
        "false && nosuchcommandanywhere || touch {}",
        probe.display()
    ));
    assert_eq!(status, 0);
    assert!(probe.exists());
}

#[test]
fn test_unsupported_expansion_degrades_to_literal_text() {
    let mut shell = Shell::new();
    let temp = NamedTempFile::new().unwrap();
    let path = temp.path().display().to_string();

    let status = shell.run_line(&format!(
        "echo $((not supported but treated literal)) > {p} && echo ok >> {p} || echo no >> {p}",
        p = path
    ));
    assert_eq!(status, 0);
    assert_eq!(
        fs::read_to_string(temp.path()).unwrap(),
        "(not supported but treated literal)\nok\n"
    );
}

#[test]
fn test_sequential_segments() {
    let mut shell = Shell::new();
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let c = dir.path().join("c");

    // Mirrors `false && echo a ; echo b || echo c`: only b happens.
    let status = shell.run_line(&format!(
        "false && touch {} ; touch {} || touch {}",
        a.display(),
        b.display(),
        c.display()
    ));
    assert_eq!(status, 0);
    assert!(!a.exists());
    assert!(b.exists());
    assert!(!c.exists());
}

#[test]
fn test_variable_assignment_word() {
    let mut shell = Shell::new();
    assert_eq!(shell.run_line("AISH_TEST_ASSIGN=42"), 0);
    assert_eq!(shell.vars.get("AISH_TEST_ASSIGN").as_deref(), Some("42"));

    let temp = NamedTempFile::new().unwrap();
    shell.run_line(&format!("echo $AISH_TEST_ASSIGN > {}", temp.path().display()));
    assert_eq!(fs::read_to_string(temp.path()).unwrap().trim(), "42");
}

#[test]
fn test_alias_resolves_to_program_and_args() {
    let mut shell = Shell::new();
    let temp = NamedTempFile::new().unwrap();

    shell.run_line("alias greet='echo hi from alias'");
    let status = shell.run_line(&format!("greet > {}", temp.path().display()));
    assert_eq!(status, 0);
    assert_eq!(
        fs::read_to_string(temp.path()).unwrap().trim(),
        "hi from alias"
    );
}

#[test]
fn test_subshell_runs_enclosed_list() {
    let mut shell = Shell::new();
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");

    let status = shell.run_line(&format!("(touch {} ; touch {})", a.display(), b.display()));
    assert_eq!(status, 0);
    assert!(a.exists());
    assert!(b.exists());
}

#[test]
fn test_subshell_status_propagates() {
    let mut shell = Shell::new();
    assert_eq!(shell.run_line("(true ; false)"), 1);
    assert_eq!(shell.run_line("(false ; true)"), 0);
}

#[test]
fn test_background_returns_immediately() {
    let mut shell = Shell::new();

    let started = Instant::now();
    let status = shell.run_line("sleep 2 &");
    assert_eq!(status, 0);
    assert!(started.elapsed() < Duration::from_millis(500));

    assert!(!shell.jobs.is_empty());
    assert!(shell.vars.last_background_pid > 0);

    let pid = shell.vars.last_background_pid;
    let job = shell.jobs.iter().next().unwrap();
    assert_eq!(job.pid.as_raw(), pid);

    // Clean up so the child does not outlive the test.
    shell.run_line(&format!("kill -9 {}", pid));
    std::thread::sleep(Duration::from_millis(100));
    shell.jobs.reap();
    assert!(shell.jobs.is_empty());
}

#[test]
fn test_background_job_is_reaped_at_prompt_boundary() {
    let mut shell = Shell::new();
    shell.run_line("sleep 0.2 &");
    assert!(!shell.jobs.is_empty());

    std::thread::sleep(Duration::from_millis(600));
    shell.jobs.reap();
    assert!(shell.jobs.is_empty());
}

#[test]
fn test_job_ids_are_monotonic() {
    let mut shell = Shell::new();
    shell.run_line("sleep 0.2 &");
    shell.run_line("sleep 0.2 &");
    let ids: Vec<u32> = shell.jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids[1] > ids[0]);

    std::thread::sleep(Duration::from_millis(600));
    shell.jobs.reap();
    assert!(shell.jobs.is_empty());
}

#[test]
fn test_builtin_statuses() {
    let mut shell = Shell::new();
    assert_eq!(shell.run_line("test 1 -lt 2"), 0);
    assert_eq!(shell.run_line("test 2 -lt 1"), 1);
    assert_eq!(shell.run_line("[ abc = abc ]"), 0);
    assert_eq!(shell.run_line("[ abc = def ]"), 1);
    assert_eq!(shell.run_line("[ abc = abc"), 2);
    assert_eq!(shell.run_line("test -d /tmp"), 0);
    assert_eq!(shell.run_line("test -f /tmp"), 1);
    assert_eq!(shell.run_line(":"), 0);
}

#[test]
fn test_syntax_error_discards_line() {
    let mut shell = Shell::new();
    let dir = tempdir().unwrap();
    let probe = dir.path().join("probe");

    let status = shell.run_line(&format!("touch {} ; | oops", probe.display()));
    assert_eq!(status, 2);
    // No partial execution of the valid prefix.
    assert!(!probe.exists());
    assert_eq!(shell.vars.last_status, 2);
}

#[test]
fn test_source_builtin_runs_file_lines() {
    let mut shell = Shell::new();
    let dir = tempdir().unwrap();
    let script = dir.path().join("script");
    let out = dir.path().join("out");
    fs::write(
        &script,
        format!("# comment\n\nAISH_SRC_VAR=ok\necho $AISH_SRC_VAR > {}\n", out.display()),
    )
    .unwrap();

    let status = shell.run_line(&format!("source {}", script.display()));
    assert_eq!(status, 0);
    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "ok");
}

#[test]
fn test_export_reaches_children() {
    let mut shell = Shell::new();
    let temp = NamedTempFile::new().unwrap();

    shell.run_line("export AISH_EXPORTED_VAR=visible");
    // The child reads it from its inherited environment.
    let status = shell.run_line(&format!(
        "printenv AISH_EXPORTED_VAR > {}",
        temp.path().display()
    ));
    assert_eq!(status, 0);
    assert_eq!(fs::read_to_string(temp.path()).unwrap().trim(), "visible");
}

#[test]
fn test_readonly_variable_refuses_assignment() {
    let mut shell = Shell::new();
    shell.run_line("AISH_RO_VAR=locked");
    shell.run_line("readonly AISH_RO_VAR");
    shell.run_line("AISH_RO_VAR=changed");
    assert_eq!(shell.vars.get("AISH_RO_VAR").as_deref(), Some("locked"));
}
