use std::io::{self, Write};

use nix::sys::termios::{
    tcgetattr, tcsetattr, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg,
    SpecialCharacterIndices, Termios,
};

use crate::completion;
use crate::error::Result;
use crate::shell::Shell;

const MAX_LINE: usize = 4096;

const KEY_CTRL_A: u8 = 1;
const KEY_CTRL_B: u8 = 2;
const KEY_CTRL_C: u8 = 3;
const KEY_CTRL_D: u8 = 4;
const KEY_CTRL_E: u8 = 5;
const KEY_CTRL_F: u8 = 6;
const KEY_CTRL_H: u8 = 8;
const KEY_TAB: u8 = 9;
const KEY_CTRL_J: u8 = 10;
const KEY_CTRL_K: u8 = 11;
const KEY_CTRL_L: u8 = 12;
const KEY_ENTER: u8 = 13;
const KEY_CTRL_N: u8 = 14;
const KEY_CTRL_P: u8 = 16;
const KEY_CTRL_T: u8 = 20;
const KEY_CTRL_U: u8 = 21;
const KEY_CTRL_W: u8 = 23;
const KEY_CTRL_Y: u8 = 25;
const KEY_ESCAPE: u8 = 27;
const KEY_BACKSPACE: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Byte(u8),
    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    Delete,
    PageUp,
    PageDown,
}

/// Puts the terminal into raw mode and guarantees the original settings
/// come back on every control-flow exit, including errors.
struct RawModeGuard {
    saved: Termios,
}

impl RawModeGuard {
    fn new() -> Result<RawModeGuard> {
        let stdin = io::stdin();
        let saved = tcgetattr(&stdin)?;

        let mut raw = saved.clone();
        raw.input_flags &= !(InputFlags::BRKINT
            | InputFlags::ICRNL
            | InputFlags::INPCK
            | InputFlags::ISTRIP
            | InputFlags::IXON);
        raw.output_flags &= !OutputFlags::OPOST;
        raw.control_flags |= ControlFlags::CS8;
        raw.local_flags &=
            !(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        tcsetattr(&stdin, SetArg::TCSAFLUSH, &raw)?;
        Ok(RawModeGuard { saved })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = tcsetattr(&io::stdin(), SetArg::TCSAFLUSH, &self.saved);
    }
}

fn read_byte() -> Option<u8> {
    let mut byte = 0u8;
    loop {
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                &mut byte as *mut u8 as *mut libc::c_void,
                1,
            )
        };
        match n {
            1 => return Some(byte),
            0 => return None,
            _ => {
                if io::Error::last_os_error().raw_os_error() != Some(libc::EINTR) {
                    return None;
                }
            }
        }
    }
}

/// Decode one key press, folding the escape sequences of §6 into a single
/// value. An unrecognized sequence comes back as a bare escape byte the
/// main loop ignores.
fn read_key() -> Option<Key> {
    let byte = read_byte()?;
    if byte != KEY_ESCAPE {
        return Some(Key::Byte(byte));
    }

    let Some(first) = read_byte() else {
        return Some(Key::Byte(KEY_ESCAPE));
    };
    let Some(second) = read_byte() else {
        return Some(Key::Byte(KEY_ESCAPE));
    };

    let key = match (first, second) {
        (b'[', b'0'..=b'9') => {
            let Some(third) = read_byte() else {
                return Some(Key::Byte(KEY_ESCAPE));
            };
            match (second, third) {
                (b'1', b'~') | (b'7', b'~') => Key::Home,
                (b'3', b'~') => Key::Delete,
                (b'4', b'~') | (b'8', b'~') => Key::End,
                (b'5', b'~') => Key::PageUp,
                (b'6', b'~') => Key::PageDown,
                _ => Key::Byte(KEY_ESCAPE),
            }
        }
        (b'[', b'A') => Key::Up,
        (b'[', b'B') => Key::Down,
        (b'[', b'C') => Key::Right,
        (b'[', b'D') => Key::Left,
        (b'[', b'H') | (b'O', b'H') => Key::Home,
        (b'[', b'F') | (b'O', b'F') => Key::End,
        _ => Key::Byte(KEY_ESCAPE),
    };
    Some(key)
}

/// Prompt width in cells, ignoring the bytes between ESC `[` and the
/// terminating letter of an ANSI sequence.
pub(crate) fn display_width(prompt: &str) -> usize {
    let mut width = 0;
    let mut chars = prompt.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&n) = chars.peek() {
                    chars.next();
                    if n.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

/// The interactive line editor: a line buffer, a cursor, a history cursor
/// and a kill buffer, driven by single-byte reads in raw mode. The kill
/// buffer outlives individual lines.
pub struct Editor {
    kill_buffer: Vec<u8>,
}

impl Editor {
    pub fn new() -> Editor {
        Editor {
            kill_buffer: Vec::new(),
        }
    }

    /// Read one line. `Ok(None)` means end of session (EOF); Ctrl-C yields
    /// an empty line. Falls back to a plain buffered read when stdin is
    /// not a terminal.
    pub fn readline(&mut self, prompt: &str, shell: &Shell) -> Result<Option<String>> {
        if unsafe { libc::isatty(libc::STDIN_FILENO) } == 0 {
            return read_plain_line();
        }

        let mut out = io::stdout();
        out.write_all(prompt.as_bytes())?;
        out.flush()?;

        let _raw = RawModeGuard::new()?;
        let prompt_width = display_width(prompt);

        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = 0usize;
        let mut history_index = shell.history.len();

        loop {
            let Some(key) = read_key() else {
                write_raw("\r\n")?;
                return Ok(None);
            };

            match key {
                Key::Byte(KEY_ENTER) | Key::Byte(KEY_CTRL_J) => {
                    write_raw("\r\n")?;
                    return Ok(Some(String::from_utf8_lossy(&buffer).into_owned()));
                }
                Key::Byte(KEY_CTRL_D) => {
                    if buffer.is_empty() {
                        write_raw("\r\n")?;
                        return Ok(None);
                    }
                    if cursor < buffer.len() {
                        buffer.remove(cursor);
                    }
                }
                Key::Byte(KEY_CTRL_C) => {
                    write_raw("^C\r\n")?;
                    return Ok(Some(String::new()));
                }
                Key::Byte(KEY_BACKSPACE) | Key::Byte(KEY_CTRL_H) => {
                    if cursor > 0 {
                        cursor -= 1;
                        buffer.remove(cursor);
                    }
                }
                Key::Delete => {
                    if cursor < buffer.len() {
                        buffer.remove(cursor);
                    }
                }
                Key::Left | Key::Byte(KEY_CTRL_B) => {
                    if cursor > 0 {
                        cursor -= 1;
                    }
                }
                Key::Right | Key::Byte(KEY_CTRL_F) => {
                    if cursor < buffer.len() {
                        cursor += 1;
                    }
                }
                Key::Up | Key::Byte(KEY_CTRL_P) => {
                    if history_index > 0 {
                        history_index -= 1;
                        set_from_history(shell, history_index, &mut buffer, &mut cursor);
                    }
                }
                Key::Down | Key::Byte(KEY_CTRL_N) => {
                    if history_index < shell.history.len() {
                        history_index += 1;
                        if history_index == shell.history.len() {
                            buffer.clear();
                            cursor = 0;
                        } else {
                            set_from_history(shell, history_index, &mut buffer, &mut cursor);
                        }
                    }
                }
                Key::Home | Key::Byte(KEY_CTRL_A) => cursor = 0,
                Key::End | Key::Byte(KEY_CTRL_E) => cursor = buffer.len(),
                Key::Byte(KEY_CTRL_K) => {
                    if cursor < buffer.len() {
                        self.kill_buffer = buffer.split_off(cursor);
                    }
                }
                Key::Byte(KEY_CTRL_U) => {
                    if cursor > 0 {
                        self.kill_buffer = buffer.drain(..cursor).collect();
                        cursor = 0;
                    }
                }
                Key::Byte(KEY_CTRL_W) => {
                    if cursor > 0 {
                        let mut start = cursor;
                        while start > 0 && (buffer[start - 1] == b' ' || buffer[start - 1] == b'\t')
                        {
                            start -= 1;
                        }
                        while start > 0 && buffer[start - 1] != b' ' && buffer[start - 1] != b'\t' {
                            start -= 1;
                        }
                        self.kill_buffer = buffer.drain(start..cursor).collect();
                        cursor = start;
                    }
                }
                Key::Byte(KEY_CTRL_Y) => {
                    if !self.kill_buffer.is_empty()
                        && buffer.len() + self.kill_buffer.len() < MAX_LINE
                    {
                        for (offset, &b) in self.kill_buffer.iter().enumerate() {
                            buffer.insert(cursor + offset, b);
                        }
                        cursor += self.kill_buffer.len();
                    }
                }
                Key::Byte(KEY_CTRL_L) => {
                    write_raw("\x1b[2J\x1b[H")?;
                }
                Key::Byte(KEY_CTRL_T) => {
                    if cursor > 0 && cursor < buffer.len() {
                        buffer.swap(cursor - 1, cursor);
                        cursor += 1;
                    }
                }
                Key::Byte(KEY_TAB) => {
                    self.complete(shell, prompt, &mut buffer, &mut cursor)?;
                }
                Key::Byte(b) if (0x20..0x7f).contains(&b) => {
                    if buffer.len() < MAX_LINE - 1 {
                        buffer.insert(cursor, b);
                        cursor += 1;
                    }
                }
                _ => continue,
            }

            refresh_line(prompt, prompt_width, &buffer, cursor)?;
        }
    }

    /// Tab handling per the completion rules: insert a unique candidate
    /// (plus a space unless it is a directory), extend to a longer common
    /// prefix, or list everything in columns.
    fn complete(
        &mut self,
        shell: &Shell,
        prompt: &str,
        buffer: &mut Vec<u8>,
        cursor: &mut usize,
    ) -> Result<()> {
        if !buffer.is_ascii() {
            write_raw("\x07")?;
            return Ok(());
        }
        let line = String::from_utf8_lossy(buffer).into_owned();
        let result = completion::complete(&line, *cursor, shell);
        let start = completion::word_start(&line, *cursor);
        let word_len = *cursor - start;

        match result.candidates.len() {
            0 => {
                write_raw("\x07")?;
            }
            1 => {
                let mut replacement = result.candidates[0].clone();
                let is_dir = replacement.ends_with('/');
                if !is_dir {
                    replacement.push(' ');
                }
                replace_word(buffer, cursor, start, &replacement);
            }
            _ => {
                if result.common_prefix.len() > word_len {
                    let prefix = result.common_prefix.clone();
                    replace_word(buffer, cursor, start, &prefix);
                } else {
                    list_candidates(&result.candidates)?;
                    write_raw(prompt)?;
                }
            }
        }
        Ok(())
    }
}

fn set_from_history(shell: &Shell, index: usize, buffer: &mut Vec<u8>, cursor: &mut usize) {
    if let Some(entry) = shell.history.get(index) {
        *buffer = entry.as_bytes().to_vec();
        *cursor = buffer.len();
    }
}

fn replace_word(buffer: &mut Vec<u8>, cursor: &mut usize, start: usize, replacement: &str) {
    if buffer.len() - (*cursor - start) + replacement.len() >= MAX_LINE {
        return;
    }
    let tail: Vec<u8> = buffer.split_off(*cursor);
    buffer.truncate(start);
    buffer.extend_from_slice(replacement.as_bytes());
    *cursor = buffer.len();
    buffer.extend_from_slice(&tail);
}

/// Multi-column candidate listing, printed below the edit line.
fn list_candidates(candidates: &[String]) -> Result<()> {
    write_raw("\r\n")?;

    let max_len = candidates.iter().map(|c| c.len()).max().unwrap_or(0);
    let term_width = 80;
    let cols = (term_width / (max_len + 2)).max(1);

    let mut out = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        out.push_str(&format!("{:<width$}  ", candidate, width = max_len));
        if (i + 1) % cols == 0 || i == candidates.len() - 1 {
            out.push_str("\r\n");
        }
    }
    write_raw(&out)
}

/// Emit carriage-return, prompt, buffer, erase-to-end, then reposition
/// the cursor by absolute column.
fn refresh_line(prompt: &str, prompt_width: usize, buffer: &[u8], cursor: usize) -> Result<()> {
    let mut out = io::stdout();
    out.write_all(b"\r")?;
    out.write_all(prompt.as_bytes())?;
    out.write_all(buffer)?;
    out.write_all(b"\x1b[K")?;
    let column = prompt_width + cursor;
    if column > 0 {
        out.write_all(format!("\r\x1b[{}C", column).as_bytes())?;
    } else {
        out.write_all(b"\r")?;
    }
    out.flush()?;
    Ok(())
}

fn write_raw(s: &str) -> Result<()> {
    let mut out = io::stdout();
    out.write_all(s.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Non-interactive input: one buffered line, no prompt, no echo.
fn read_plain_line() -> Result<Option<String>> {
    let mut line = String::new();
    let n = io::stdin().read_line(&mut line)?;
    if n == 0 {
        return Ok(None);
    }
    if line.ends_with('\n') {
        line.pop();
    }
    Ok(Some(line))
}
