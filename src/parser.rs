use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::close;

use crate::ast::{AndOrList, Command, Connector, Pipeline, Segment, SegmentKind};
use crate::error::{Result, ShellError};
use crate::tokenizer::{Token, TokenKind};

// ---------------------------------------------------------------------------
// Grammar validation
//
//   list      := segment ((';' | '&') segment)* (';' | '&')?
//   segment   := andor | '(' list ')'
//   andor     := pipeline (('&&' | '||') pipeline)*
//   pipeline  := command ('|' command)*
//   command   := Word (Word | redir)*
//   redir     := ('<' | '>' | '>>' | '<<' | '<<<') Word
//
// The validator walks the slice with an index and allocates nothing. A
// failure discards the whole line before anything runs.
// ---------------------------------------------------------------------------

fn at_end(tokens: &[Token], pos: usize) -> bool {
    pos >= tokens.len()
        || tokens[pos].kind == TokenKind::Eof
        || tokens[pos].kind == TokenKind::Newline
}

fn validate_name(tokens: &[Token], pos: &mut usize) -> Result<()> {
    if at_end(tokens, *pos) || tokens[*pos].kind != TokenKind::Word {
        return Err(ShellError::Syntax);
    }
    *pos += 1;
    Ok(())
}

fn validate_command(tokens: &[Token], pos: &mut usize) -> Result<()> {
    validate_name(tokens, pos)?;

    while !at_end(tokens, *pos) {
        let token = &tokens[*pos];
        match token.kind {
            TokenKind::Word => validate_name(tokens, pos)?,
            _ if token.is_redirect() => {
                *pos += 1;
                validate_name(tokens, pos)?;
            }
            _ => break,
        }
    }
    Ok(())
}

fn validate_pipeline(tokens: &[Token], pos: &mut usize) -> Result<()> {
    if !at_end(tokens, *pos) && tokens[*pos].kind == TokenKind::Pipe {
        return Err(ShellError::Syntax);
    }
    validate_command(tokens, pos)?;

    while !at_end(tokens, *pos) && tokens[*pos].kind == TokenKind::Pipe {
        *pos += 1;
        // A pipe needs a command on its right-hand side.
        if at_end(tokens, *pos) || tokens[*pos].kind != TokenKind::Word {
            return Err(ShellError::Syntax);
        }
        validate_command(tokens, pos)?;
    }
    Ok(())
}

fn validate_andor(tokens: &[Token], pos: &mut usize) -> Result<()> {
    validate_pipeline(tokens, pos)?;

    while !at_end(tokens, *pos)
        && matches!(tokens[*pos].kind, TokenKind::And | TokenKind::Or)
    {
        *pos += 1;
        if at_end(tokens, *pos) {
            return Err(ShellError::Syntax);
        }
        validate_pipeline(tokens, pos)?;
    }
    Ok(())
}

fn validate_segment(tokens: &[Token], pos: &mut usize) -> Result<()> {
    if !at_end(tokens, *pos) && tokens[*pos].kind == TokenKind::LParen {
        *pos += 1;
        validate_list(tokens, pos, true)?;
        if at_end(tokens, *pos) || tokens[*pos].kind != TokenKind::RParen {
            return Err(ShellError::Syntax);
        }
        *pos += 1;
        return Ok(());
    }
    validate_andor(tokens, pos)
}

fn list_done(tokens: &[Token], pos: usize, in_group: bool) -> bool {
    at_end(tokens, pos) || (in_group && tokens[pos].kind == TokenKind::RParen)
}

fn validate_list(tokens: &[Token], pos: &mut usize, in_group: bool) -> Result<()> {
    if list_done(tokens, *pos, in_group) {
        // An empty group `()` is not a command.
        return if in_group { Err(ShellError::Syntax) } else { Ok(()) };
    }

    validate_segment(tokens, pos)?;
    while !list_done(tokens, *pos, in_group) {
        match tokens[*pos].kind {
            TokenKind::Semicolon | TokenKind::Ampersand => {
                *pos += 1;
                if list_done(tokens, *pos, in_group) {
                    return Ok(());
                }
                validate_segment(tokens, pos)?;
            }
            _ => return Err(ShellError::Syntax),
        }
    }
    Ok(())
}

/// Single pass/fail over the token stream. Rejects two operators in a row
/// (except a trailing `&` or `;`), a pipe with no right-hand command, a
/// redirection with no file word, and a leading operator.
pub fn validate(tokens: &[Token]) -> Result<()> {
    let mut pos = 0;
    validate_list(tokens, &mut pos, false)?;
    if !at_end(tokens, pos) {
        return Err(ShellError::Syntax);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command building
// ---------------------------------------------------------------------------

/// Open and immediately close every redirection target so a bad filename
/// fails the line before any process is spawned.
fn prevalidate_redirections(tokens: &[Token]) -> Result<()> {
    for (i, token) in tokens.iter().enumerate() {
        let target = match tokens.get(i + 1) {
            Some(t) if t.kind == TokenKind::Word => t.text.as_str(),
            _ => continue,
        };
        match token.kind {
            TokenKind::InputRedirect => {
                let fd = open(target, OFlag::O_RDONLY, Mode::empty()).map_err(|_| {
                    ShellError::Redirection("No such file or directory".to_string())
                })?;
                let _ = close(fd);
            }
            TokenKind::OutputRedirect | TokenKind::OutputAppend => {
                let mut flags = OFlag::O_WRONLY | OFlag::O_CREAT;
                flags |= if token.kind == TokenKind::OutputAppend {
                    OFlag::O_APPEND
                } else {
                    OFlag::O_TRUNC
                };
                let fd = open(target, flags, Mode::from_bits_truncate(0o644)).map_err(|_| {
                    ShellError::Redirection("Unable to create file for writing".to_string())
                })?;
                let _ = close(fd);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Fold one command's tokens. Words following a redirection operator become
/// the redirection target; the last one of each direction wins. Heredoc and
/// here-string targets are consumed and ignored (lexed but not executed).
fn build_command(tokens: &[Token]) -> Command {
    let mut cmd = Command::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::Word => {
                cmd.argv.push(token.text.clone());
                i += 1;
            }
            TokenKind::InputRedirect => {
                if let Some(t) = tokens.get(i + 1) {
                    cmd.input_file = Some(t.text.clone());
                }
                i += 2;
            }
            TokenKind::OutputRedirect | TokenKind::OutputAppend => {
                if let Some(t) = tokens.get(i + 1) {
                    cmd.output_file = Some(t.text.clone());
                    cmd.append = token.kind == TokenKind::OutputAppend;
                }
                i += 2;
            }
            TokenKind::Heredoc | TokenKind::HereString => {
                i += 2;
            }
            _ => i += 1,
        }
    }
    cmd
}

fn build_pipeline(tokens: &[Token]) -> Pipeline {
    let mut stages = Vec::new();
    let mut start = 0;
    for i in 0..=tokens.len() {
        if i == tokens.len() || tokens[i].kind == TokenKind::Pipe {
            if i > start {
                stages.push(build_command(&tokens[start..i]));
            }
            start = i + 1;
        }
    }
    Pipeline { stages }
}

fn build_andor(tokens: &[Token]) -> AndOrList {
    let mut pipelines = Vec::new();
    let mut connectors = Vec::new();
    let mut start = 0;
    for i in 0..=tokens.len() {
        if i == tokens.len()
            || matches!(tokens[i].kind, TokenKind::And | TokenKind::Or)
        {
            pipelines.push(build_pipeline(&tokens[start..i]));
            if i < tokens.len() {
                connectors.push(if tokens[i].kind == TokenKind::And {
                    Connector::And
                } else {
                    Connector::Or
                });
            }
            start = i + 1;
        }
    }
    let mut iter = pipelines.into_iter();
    let first = iter.next().unwrap_or(Pipeline { stages: Vec::new() });
    AndOrList {
        first,
        rest: connectors.into_iter().zip(iter).collect(),
    }
}

fn segment_text(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_segment(tokens: &[Token], background: bool) -> Result<Segment> {
    let text = segment_text(tokens);
    let kind = if tokens.first().map(|t| t.kind) == Some(TokenKind::LParen) {
        // The validator guarantees the matching close is the last token.
        let inner = &tokens[1..tokens.len() - 1];
        SegmentKind::Subshell(build_segments(inner)?)
    } else {
        SegmentKind::AndOr(build_andor(tokens))
    };
    Ok(Segment {
        kind,
        background,
        text,
    })
}

fn build_segments(tokens: &[Token]) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for i in 0..=tokens.len() {
        if i < tokens.len() {
            match tokens[i].kind {
                TokenKind::LParen => {
                    depth += 1;
                    continue;
                }
                TokenKind::RParen => {
                    depth = depth.saturating_sub(1);
                    continue;
                }
                _ => {}
            }
        }
        let boundary = i == tokens.len()
            || (depth == 0
                && matches!(tokens[i].kind, TokenKind::Semicolon | TokenKind::Ampersand));
        if boundary {
            if i > start {
                let background =
                    i < tokens.len() && tokens[i].kind == TokenKind::Ampersand;
                segments.push(build_segment(&tokens[start..i], background)?);
            }
            start = i + 1;
        }
    }
    Ok(segments)
}

/// Fold a validated token stream into the executable tree. Every redirection
/// filename in the line is pre-validated first; any failure fails the whole
/// line with no partial effects.
pub fn build_list(tokens: &[Token]) -> Result<Vec<Segment>> {
    let end = tokens
        .iter()
        .position(|t| matches!(t.kind, TokenKind::Eof | TokenKind::Newline))
        .unwrap_or(tokens.len());
    let tokens = &tokens[..end];

    prevalidate_redirections(tokens)?;
    build_segments(tokens)
}
