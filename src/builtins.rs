use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::{access, AccessFlags};

use crate::executor;
use crate::jobs::JobStatus;
use crate::shell::Shell;
use crate::utils;

type BuiltinFn = fn(&mut Shell, &[String]) -> i32;

struct Builtin {
    name: &'static str,
    func: BuiltinFn,
    help: &'static str,
}

/// Central registry. `history`/`log` and `source`/`.` are double-named
/// the way users expect.
static BUILTINS: &[Builtin] = &[
    Builtin { name: "cd", func: builtin_cd, help: "Change directory" },
    Builtin { name: "pwd", func: builtin_pwd, help: "Print working directory" },
    Builtin { name: "echo", func: builtin_echo, help: "Display a line of text" },
    Builtin { name: "exit", func: builtin_exit, help: "Exit the shell" },
    Builtin { name: "quit", func: builtin_exit, help: "Exit the shell (alias: exit)" },
    Builtin { name: "clear", func: builtin_clear, help: "Clear the terminal screen" },
    Builtin { name: "export", func: builtin_export, help: "Set environment variable" },
    Builtin { name: "unset", func: builtin_unset, help: "Unset a variable" },
    Builtin { name: "readonly", func: builtin_readonly, help: "Mark a variable read-only" },
    Builtin { name: "env", func: builtin_env, help: "Print environment variables" },
    Builtin { name: "set", func: builtin_set, help: "Show shell variables" },
    Builtin { name: "alias", func: builtin_alias, help: "Define or display aliases" },
    Builtin { name: "unalias", func: builtin_unalias, help: "Remove alias definitions" },
    Builtin { name: "type", func: builtin_type, help: "Indicate how a command would be interpreted" },
    Builtin { name: "which", func: builtin_which, help: "Locate a command" },
    Builtin { name: "source", func: builtin_source, help: "Execute commands from a file" },
    Builtin { name: ".", func: builtin_source, help: "Execute commands from a file" },
    Builtin { name: "history", func: builtin_history, help: "Show command history" },
    Builtin { name: "log", func: builtin_history, help: "Show command history (alias: history)" },
    Builtin { name: "jobs", func: builtin_jobs, help: "List background jobs" },
    Builtin { name: "fg", func: builtin_fg, help: "Move job to foreground" },
    Builtin { name: "bg", func: builtin_bg, help: "Move job to background" },
    Builtin { name: "kill", func: builtin_kill, help: "Send signal to process" },
    Builtin { name: "test", func: builtin_test, help: "Evaluate conditional expression" },
    Builtin { name: "[", func: builtin_bracket, help: "Evaluate conditional expression" },
    Builtin { name: "true", func: builtin_true, help: "Return success" },
    Builtin { name: "false", func: builtin_false, help: "Return failure" },
    Builtin { name: ":", func: builtin_colon, help: "Null command (no-op)" },
    Builtin { name: "help", func: builtin_help, help: "Display help for builtins" },
];

fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

pub fn names() -> Vec<&'static str> {
    BUILTINS.iter().map(|b| b.name).collect()
}

/// Dispatch an argv whose first word is a builtin name.
pub fn run(shell: &mut Shell, argv: &[String]) -> i32 {
    match lookup(&argv[0]) {
        Some(builtin) => (builtin.func)(shell, argv),
        None => {
            eprintln!("{}: builtin not found", argv[0]);
            1
        }
    }
}

fn builtin_cd(shell: &mut Shell, argv: &[String]) -> i32 {
    let targets: Vec<String> = if argv.len() == 1 {
        vec!["~".to_string()]
    } else {
        argv[1..].to_vec()
    };

    for arg in targets {
        let previous = env::current_dir().ok();
        let target: Option<PathBuf> = match arg.as_str() {
            "-" => {
                let dir = shell.previous_dir.clone();
                if let Some(dir) = &dir {
                    println!("{}", dir.display());
                }
                dir
            }
            _ => utils::expand_tilde(&arg).ok().map(PathBuf::from),
        };

        let changed = target
            .map(|t| env::set_current_dir(t).is_ok())
            .unwrap_or(false);
        if !changed {
            eprintln!("cd: {}: No such directory", arg);
            return 1;
        }
        shell.previous_dir = previous;
    }
    0
}

fn builtin_pwd(_shell: &mut Shell, _argv: &[String]) -> i32 {
    match env::current_dir() {
        Ok(dir) => {
            println!("{}", dir.display());
            0
        }
        Err(_) => {
            eprintln!("pwd: error retrieving current directory");
            1
        }
    }
}

fn builtin_echo(_shell: &mut Shell, argv: &[String]) -> i32 {
    let mut interpret_escapes = false;
    let mut no_newline = false;
    let mut start = 1;

    for arg in &argv[1..] {
        let bytes = arg.as_bytes();
        let is_option = bytes.len() > 1
            && bytes[0] == b'-'
            && bytes[1..].iter().all(|&b| matches!(b, b'n' | b'e' | b'E'));
        if !is_option {
            break;
        }
        for &b in &bytes[1..] {
            match b {
                b'n' => no_newline = true,
                b'e' => interpret_escapes = true,
                b'E' => interpret_escapes = false,
                _ => {}
            }
        }
        start += 1;
    }

    let mut out = String::new();
    for (i, arg) in argv[start..].iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if interpret_escapes {
            out.push_str(&interpret_echo_escapes(arg));
        } else {
            out.push_str(arg);
        }
    }
    if no_newline {
        print!("{}", out);
        use std::io::Write;
        let _ = std::io::stdout().flush();
    } else {
        println!("{}", out);
    }
    0
}

fn interpret_echo_escapes(arg: &str) -> String {
    let bytes = arg.as_bytes();
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i] as char);
            i += 1;
            continue;
        }
        i += 1;
        match bytes[i] {
            b'n' => out.push('\n'),
            b't' => out.push('\t'),
            b'r' => out.push('\r'),
            b'a' => out.push('\x07'),
            b'b' => out.push('\x08'),
            b'f' => out.push('\x0c'),
            b'v' => out.push('\x0b'),
            b'\\' => out.push('\\'),
            b'e' => out.push('\x1b'),
            b'0' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while digits < 3
                    && i + 1 < bytes.len()
                    && (b'0'..=b'7').contains(&bytes[i + 1])
                {
                    i += 1;
                    value = value * 8 + (bytes[i] - b'0') as u32;
                    digits += 1;
                }
                out.push((value as u8) as char);
            }
            b'x' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while digits < 2 && i + 1 < bytes.len() && bytes[i + 1].is_ascii_hexdigit() {
                    i += 1;
                    value = value * 16 + (bytes[i] as char).to_digit(16).unwrap_or(0);
                    digits += 1;
                }
                out.push((value as u8) as char);
            }
            other => {
                out.push('\\');
                out.push(other as char);
            }
        }
        i += 1;
    }
    out
}

fn builtin_exit(_shell: &mut Shell, argv: &[String]) -> i32 {
    let mut code = 0;
    if let Some(arg) = argv.get(1) {
        match arg.parse::<i64>() {
            Ok(value) => code = (value & 0xff) as i32,
            Err(_) => {
                eprintln!("exit: {}: numeric argument required", arg);
                code = 2;
            }
        }
    }
    std::process::exit(code);
}

fn builtin_clear(_shell: &mut Shell, _argv: &[String]) -> i32 {
    print!("\x1b[2J\x1b[H");
    use std::io::Write;
    let _ = std::io::stdout().flush();
    0
}

fn builtin_export(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() == 1 {
        for (name, value, _) in shell.vars.list(true) {
            println!("export {}=\"{}\"", name, value);
        }
        return 0;
    }

    let mut ret = 0;
    for arg in &argv[1..] {
        match arg.split_once('=') {
            Some((name, value)) => {
                if let Err(e) = shell.vars.set(name, value, true) {
                    eprintln!("export: {}", e);
                    ret = 1;
                }
            }
            None => shell.vars.export(arg),
        }
    }
    ret
}

fn builtin_unset(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() < 2 {
        eprintln!("unset: usage: unset NAME...");
        return 1;
    }
    let mut ret = 0;
    for arg in &argv[1..] {
        if let Err(e) = shell.vars.unset(arg) {
            eprintln!("unset: {}", e);
            ret = 1;
        }
    }
    ret
}

fn builtin_readonly(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() == 1 {
        for (name, value, flags) in shell.vars.list(false) {
            if flags.readonly {
                println!("readonly {}=\"{}\"", name, value);
            }
        }
        return 0;
    }

    let mut ret = 0;
    for arg in &argv[1..] {
        match arg.split_once('=') {
            Some((name, value)) => {
                if let Err(e) = shell.vars.set(name, value, false) {
                    eprintln!("readonly: {}", e);
                    ret = 1;
                    continue;
                }
                shell.vars.mark_readonly(name);
            }
            None => shell.vars.mark_readonly(arg),
        }
    }
    ret
}

fn builtin_env(_shell: &mut Shell, _argv: &[String]) -> i32 {
    for (name, value) in env::vars() {
        println!("{}={}", name, value);
    }
    0
}

fn builtin_set(shell: &mut Shell, _argv: &[String]) -> i32 {
    for (name, value, flags) in shell.vars.list(false) {
        if flags.exported {
            println!("export {}=\"{}\"", name, value);
        } else {
            println!("{}=\"{}\"", name, value);
        }
    }
    0
}

fn builtin_alias(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() == 1 {
        for (name, value) in shell.aliases.list() {
            println!("alias {}='{}'", name, value);
        }
        return 0;
    }

    for arg in &argv[1..] {
        match arg.split_once('=') {
            Some((name, value)) => shell.aliases.set(name, value),
            None => match shell.aliases.get(arg) {
                Some(value) => println!("alias {}='{}'", arg, value),
                None => {
                    eprintln!("alias: {}: not found", arg);
                    return 1;
                }
            },
        }
    }
    0
}

fn builtin_unalias(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() < 2 {
        eprintln!("unalias: usage: unalias NAME...");
        return 1;
    }
    let mut ret = 0;
    for arg in &argv[1..] {
        if arg == "-a" {
            shell.aliases.clear();
        } else if !shell.aliases.remove(arg) {
            eprintln!("unalias: {}: not found", arg);
            ret = 1;
        }
    }
    ret
}

fn builtin_type(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() < 2 {
        eprintln!("type: usage: type NAME...");
        return 1;
    }

    let mut ret = 0;
    for arg in &argv[1..] {
        if let Some(value) = shell.aliases.get(arg) {
            println!("{} is aliased to '{}'", arg, value);
            continue;
        }
        if is_builtin(arg) {
            println!("{} is a shell builtin", arg);
            continue;
        }
        let path = env::var("PATH").unwrap_or_default();
        if let Some(full) = utils::search_cmd(arg, &path) {
            println!("{} is {}", arg, full);
            continue;
        }
        eprintln!("type: {}: not found", arg);
        ret = 1;
    }
    ret
}

fn builtin_which(_shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() < 2 {
        eprintln!("which: usage: which NAME...");
        return 1;
    }

    let mut ret = 0;
    for arg in &argv[1..] {
        let path = env::var("PATH").unwrap_or_default();
        match utils::search_cmd(arg, &path) {
            Some(full) => println!("{}", full),
            None => {
                eprintln!("which: {}: not found", arg);
                ret = 1;
            }
        }
    }
    ret
}

fn builtin_source(shell: &mut Shell, argv: &[String]) -> i32 {
    let Some(path) = argv.get(1) else {
        eprintln!("source: usage: source FILENAME");
        return 1;
    };

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("source: {}: {}", path, e);
            return 1;
        }
    };

    let mut status = 0;
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        status = shell.run_line(trimmed);
    }
    status
}

fn builtin_history(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() == 1 {
        for (i, entry) in shell.history.iter().enumerate() {
            println!("{:5}  {}", i + 1, entry);
        }
        return 0;
    }

    let arg = &argv[1];

    // Last N entries, numbered as in the full listing.
    if let Ok(n) = arg.parse::<usize>() {
        if n > 0 {
            let total = shell.history.len();
            let offset = total.saturating_sub(n);
            for (i, entry) in shell.history.iter().enumerate().skip(offset) {
                println!("{:5}  {}", i + 1, entry);
            }
            return 0;
        }
    }

    if arg == "-c" || arg == "purge" {
        shell.history.clear();
        println!("History cleared");
        return 0;
    }

    // `!N` or `execute N`: re-run the original line through the full
    // expansion pipeline, never a cached token stream.
    let exec_index = if let Some(rest) = arg.strip_prefix('!') {
        rest.parse::<usize>().ok()
    } else if arg == "execute" {
        argv.get(2).and_then(|a| a.parse::<usize>().ok())
    } else {
        None
    };

    if let Some(index) = exec_index {
        if index == 0 || index > shell.history.len() {
            eprintln!("history: {}: event not found", index);
            return 1;
        }
        let line = shell
            .history
            .get(index - 1)
            .map(|s| s.to_string())
            .unwrap_or_default();
        println!("{}", line);
        return shell.run_line(&line);
    }

    eprintln!("history: usage: history [N | -c | !N]");
    1
}

fn builtin_jobs(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() != 1 {
        eprintln!("jobs: too many arguments");
        return 1;
    }
    for job in shell.jobs.iter() {
        println!("[{}] {} {} {}", job.id, job.pid, job.status, job.command);
    }
    0
}

fn parse_job_id(arg: &str) -> Option<u32> {
    arg.parse::<u32>().ok().filter(|id| *id > 0)
}

fn builtin_fg(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() != 2 {
        eprintln!("fg: usage: fg JOB_ID");
        return 1;
    }
    let job = parse_job_id(&argv[1]).and_then(|id| shell.jobs.find_by_id(id).cloned());
    let Some(job) = job else {
        eprintln!("fg: {}: no such job", argv[1]);
        return 1;
    };

    println!("{}", job.command);

    if job.status == JobStatus::Stopped {
        if let Err(e) = kill(job.pid, Signal::SIGCONT) {
            if e == Errno::ESRCH {
                eprintln!("fg: job has terminated");
            } else {
                eprintln!("fg: {}", e);
            }
            shell.jobs.remove_by_pid(job.pid);
            return 1;
        }
    }

    shell.jobs.remove_by_pid(job.pid);
    executor::wait_foreground(shell, job.pid, &job.command)
}

fn builtin_bg(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() != 2 {
        eprintln!("bg: usage: bg JOB_ID");
        return 1;
    }
    let job = parse_job_id(&argv[1]).and_then(|id| shell.jobs.find_by_id(id).cloned());
    let Some(job) = job else {
        eprintln!("bg: {}: no such job", argv[1]);
        return 1;
    };

    if job.status == JobStatus::Running {
        eprintln!("bg: job {} already in background", job.id);
        return 0;
    }

    if let Err(e) = kill(job.pid, Signal::SIGCONT) {
        if e == Errno::ESRCH {
            eprintln!("bg: job has terminated");
        } else {
            eprintln!("bg: {}", e);
        }
        shell.jobs.remove_by_pid(job.pid);
        return 1;
    }

    shell.jobs.set_status(job.pid, JobStatus::Running);
    println!("[{}] {} &", job.id, job.command);
    0
}

fn builtin_kill(_shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() < 2 {
        eprintln!("kill: usage: kill [-SIGNAL] PID...");
        return 1;
    }

    let mut signal = Signal::SIGTERM;
    let mut start = 1;
    if let Some(spec) = argv[1].strip_prefix('-') {
        match spec.parse::<i32>().ok().and_then(|n| Signal::try_from(n).ok()) {
            Some(sig) => signal = sig,
            None => {
                eprintln!("kill: {}: invalid signal specification", argv[1]);
                return 1;
            }
        }
        start = 2;
    }

    let mut ret = 0;
    for arg in &argv[start..] {
        let Ok(pid) = arg.parse::<i32>() else {
            eprintln!("kill: {}: arguments must be process ids", arg);
            ret = 1;
            continue;
        };
        if let Err(e) = kill(nix::unistd::Pid::from_raw(pid), signal) {
            eprintln!("kill: ({}) - {}", pid, e);
            ret = 1;
        }
    }
    ret
}

fn builtin_test(_shell: &mut Shell, argv: &[String]) -> i32 {
    test_eval(&argv[1..])
}

fn builtin_bracket(shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() < 2 || argv[argv.len() - 1] != "]" {
        eprintln!("[: missing ']'");
        return 2;
    }
    builtin_test(shell, &argv[..argv.len() - 1])
}

/// File, string and numeric predicates; 0 is true.
fn test_eval(args: &[String]) -> i32 {
    let truth = |b: bool| if b { 0 } else { 1 };

    match args.len() {
        0 => 1,
        1 => truth(!args[0].is_empty()),
        2 => {
            let op = args[0].as_str();
            let arg = args[1].as_str();
            let path = Path::new(arg);
            match op {
                "-e" => truth(path.exists()),
                "-f" => truth(path.is_file()),
                "-d" => truth(path.is_dir()),
                "-r" => truth(access(path, AccessFlags::R_OK).is_ok()),
                "-w" => truth(access(path, AccessFlags::W_OK).is_ok()),
                "-x" => truth(access(path, AccessFlags::X_OK).is_ok()),
                "-s" => truth(path.metadata().map(|m| m.len() > 0).unwrap_or(false)),
                "-z" => truth(arg.is_empty()),
                "-n" => truth(!arg.is_empty()),
                "!" => truth(arg.is_empty()),
                _ => {
                    eprintln!("test: unrecognized condition");
                    2
                }
            }
        }
        3 => {
            let left = args[0].as_str();
            let op = args[1].as_str();
            let right = args[2].as_str();
            match op {
                "=" | "==" => return truth(left == right),
                "!=" => return truth(left != right),
                _ => {}
            }
            let l = left.parse::<i64>().unwrap_or(0);
            let r = right.parse::<i64>().unwrap_or(0);
            match op {
                "-eq" => truth(l == r),
                "-ne" => truth(l != r),
                "-lt" => truth(l < r),
                "-le" => truth(l <= r),
                "-gt" => truth(l > r),
                "-ge" => truth(l >= r),
                _ => {
                    eprintln!("test: unrecognized condition");
                    2
                }
            }
        }
        _ => {
            eprintln!("test: unrecognized condition");
            2
        }
    }
}

fn builtin_true(_shell: &mut Shell, _argv: &[String]) -> i32 {
    0
}

fn builtin_false(_shell: &mut Shell, _argv: &[String]) -> i32 {
    1
}

fn builtin_colon(_shell: &mut Shell, _argv: &[String]) -> i32 {
    0
}

fn builtin_help(_shell: &mut Shell, argv: &[String]) -> i32 {
    if argv.len() == 1 {
        println!("aish builtins:");
        for builtin in BUILTINS {
            println!("  {:<10} {}", builtin.name, builtin.help);
        }
        return 0;
    }

    let mut ret = 0;
    for arg in &argv[1..] {
        match lookup(arg) {
            Some(builtin) => println!("{}: {}", builtin.name, builtin.help),
            None => {
                eprintln!("help: {}: not a builtin", arg);
                ret = 1;
            }
        }
    }
    ret
}
