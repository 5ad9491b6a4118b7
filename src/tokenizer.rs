use crate::error::{Result, ShellError};

/// A single word may not grow past this many bytes.
pub const MAX_TOKEN_LENGTH: usize = 4096;
/// A single line may not produce more tokens than this.
pub const MAX_TOKENS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Pipe,           // |
    Semicolon,      // ;
    Ampersand,      // &
    And,            // &&
    Or,             // ||
    InputRedirect,  // <
    OutputRedirect, // >
    OutputAppend,   // >>
    Heredoc,        // <<
    HereString,     // <<<
    LParen,         // (
    RParen,         // )
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// True when any fragment of the word came from a quoted literal,
    /// which suppresses pathname expansion later.
    pub quoted: bool,
}

impl Token {
    fn op(kind: TokenKind, text: &str) -> Token {
        Token {
            kind,
            text: text.to_string(),
            quoted: false,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::InputRedirect
                | TokenKind::OutputRedirect
                | TokenKind::OutputAppend
                | TokenKind::Heredoc
                | TokenKind::HereString
        )
    }
}

/// Single-pass scanner over one logical line. Operators are matched
/// longest-first; quotes delimit literal fragments; `#` outside quotes
/// starts a comment that runs to end of input. The stream always ends
/// with an Eof token.
///
/// Parens are operators only where a subshell group can occur: `(` in
/// command position and `)` while a group is open. Anywhere else they are
/// ordinary word characters, so `echo (x)` passes `(x)` through as text.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        // Whitespace separates tokens.
        while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        if tokens.len() >= MAX_TOKENS {
            return Err(ShellError::Tokenizer(format!(
                "too many tokens (limit {})",
                MAX_TOKENS
            )));
        }

        let command_position = matches!(
            tokens.last().map(|t| t.kind),
            None | Some(
                TokenKind::Pipe
                    | TokenKind::Semicolon
                    | TokenKind::Ampersand
                    | TokenKind::And
                    | TokenKind::Or
                    | TokenKind::LParen
                    | TokenKind::Newline
            )
        );

        let c = chars[i];
        match c {
            '\n' => {
                tokens.push(Token::op(TokenKind::Newline, "\n"));
                i += 1;
            }
            '#' => {
                // Comment runs to end of input.
                break;
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::op(TokenKind::Or, "||"));
                    i += 2;
                } else {
                    tokens.push(Token::op(TokenKind::Pipe, "|"));
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::op(TokenKind::And, "&&"));
                    i += 2;
                } else {
                    tokens.push(Token::op(TokenKind::Ampersand, "&"));
                    i += 1;
                }
            }
            ';' => {
                tokens.push(Token::op(TokenKind::Semicolon, ";"));
                i += 1;
            }
            '(' if command_position => {
                tokens.push(Token::op(TokenKind::LParen, "("));
                depth += 1;
                i += 1;
            }
            ')' if depth > 0 => {
                tokens.push(Token::op(TokenKind::RParen, ")"));
                depth -= 1;
                i += 1;
            }
            '<' => {
                if chars.get(i + 1) == Some(&'<') {
                    if chars.get(i + 2) == Some(&'<') {
                        tokens.push(Token::op(TokenKind::HereString, "<<<"));
                        i += 3;
                    } else {
                        tokens.push(Token::op(TokenKind::Heredoc, "<<"));
                        i += 2;
                    }
                } else {
                    tokens.push(Token::op(TokenKind::InputRedirect, "<"));
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token::op(TokenKind::OutputAppend, ">>"));
                    i += 2;
                } else {
                    tokens.push(Token::op(TokenKind::OutputRedirect, ">"));
                    i += 1;
                }
            }
            _ => {
                let token = read_word(&chars, &mut i, depth > 0)?;
                tokens.push(token);
            }
        }
    }

    tokens.push(Token::op(TokenKind::Eof, ""));
    Ok(tokens)
}

/// Read one word starting at `*i`. Adjacent quoted and unquoted fragments
/// concatenate as long as no unquoted whitespace separates them. A `)`
/// ends the word only while a subshell group is open.
fn read_word(chars: &[char], i: &mut usize, rparen_ends: bool) -> Result<Token> {
    let mut text = String::new();
    let mut quoted = false;

    while *i < chars.len() {
        let c = chars[*i];
        match c {
            ' ' | '\t' | '\n' | '|' | '&' | ';' | '<' | '>' | '#' => break,
            ')' if rparen_ends => break,
            '\'' => {
                *i += 1;
                let start = *i;
                while *i < chars.len() && chars[*i] != '\'' {
                    *i += 1;
                }
                if *i >= chars.len() {
                    return Err(ShellError::Tokenizer("unterminated quote".to_string()));
                }
                text.extend(&chars[start..*i]);
                *i += 1; // closing quote
                quoted = true;
            }
            '"' => {
                *i += 1;
                read_double_quoted(chars, i, &mut text)?;
                quoted = true;
            }
            '\\' => {
                // A bare backslash quotes the following character. A
                // trailing backslash stays literal.
                if *i + 1 < chars.len() {
                    text.push(chars[*i + 1]);
                    *i += 2;
                } else {
                    text.push('\\');
                    *i += 1;
                }
            }
            _ => {
                text.push(c);
                *i += 1;
            }
        }
        if text.len() > MAX_TOKEN_LENGTH {
            return Err(ShellError::Tokenizer(format!(
                "token exceeds {} bytes",
                MAX_TOKEN_LENGTH
            )));
        }
    }

    Ok(Token {
        kind: TokenKind::Word,
        text,
        quoted,
    })
}

/// Body of a double-quoted fragment; `*i` sits just past the opening quote.
fn read_double_quoted(chars: &[char], i: &mut usize, text: &mut String) -> Result<()> {
    while *i < chars.len() {
        match chars[*i] {
            '"' => {
                *i += 1;
                return Ok(());
            }
            '\\' if *i + 1 < chars.len() => {
                let next = chars[*i + 1];
                match next {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    '\\' | '"' | '$' | '`' => text.push(next),
                    _ => {
                        // Unrecognized escape keeps the backslash.
                        text.push('\\');
                        text.push(next);
                    }
                }
                *i += 2;
            }
            c => {
                text.push(c);
                *i += 1;
            }
        }
    }
    Err(ShellError::Tokenizer("unterminated quote".to_string()))
}
