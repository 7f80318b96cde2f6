//! Tokenizer for derived expressions.

use std::fmt;

use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Question,
    Colon,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    /// `==`
    LooseEq,
    /// `!=`
    LooseNe,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
    And,
    Or,
    Coalesce,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Number(n) => return write!(f, "{n}"),
            TokenKind::Str(s) => return write!(f, "{s:?}"),
            TokenKind::Ident(name) => return f.write_str(name),
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Bang => "!",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::LooseEq => "==",
            TokenKind::LooseNe => "!=",
            TokenKind::StrictEq => "===",
            TokenKind::StrictNe => "!==",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Coalesce => "??",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the source.
    pub offset: usize,
}

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let prev = tokens.last().map(|t: &Token| &t.kind);
        // `tasks.0.title` indexes; it does not contain the number `.0`
        let after_dot = matches!(prev, Some(TokenKind::Dot));
        let after_value = matches!(
            prev,
            Some(
                TokenKind::Ident(_)
                    | TokenKind::Number(_)
                    | TokenKind::Str(_)
                    | TokenKind::RParen
                    | TokenKind::RBracket
            )
        );
        let digit_at = |at: usize| bytes.get(at).is_some_and(u8::is_ascii_digit);

        if c.is_ascii_digit() || (c == b'.' && !after_value && digit_at(i + 1)) {
            let mut seen_dot = false;
            while i < bytes.len() {
                if bytes[i].is_ascii_digit() {
                    i += 1;
                } else if bytes[i] == b'.' && !seen_dot && !after_dot && digit_at(i + 1) {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            let text = &source[start..i];
            let number = text.parse::<f64>().map_err(|_| ExprError::UnexpectedToken {
                found: text.to_string(),
                offset: start,
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(number),
                offset: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$')
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[start..i].to_string()),
                offset: start,
            });
            continue;
        }

        if c == b'\'' || c == b'"' {
            let (text, end) = string_literal(source, start)?;
            tokens.push(Token {
                kind: TokenKind::Str(text),
                offset: start,
            });
            i = end;
            continue;
        }

        let next = bytes.get(i + 1).copied();
        let next2 = bytes.get(i + 2).copied();
        let (kind, width) = match (c, next, next2) {
            (b'=', Some(b'='), Some(b'=')) => (TokenKind::StrictEq, 3),
            (b'!', Some(b'='), Some(b'=')) => (TokenKind::StrictNe, 3),
            (b'=', Some(b'='), _) => (TokenKind::LooseEq, 2),
            (b'!', Some(b'='), _) => (TokenKind::LooseNe, 2),
            (b'<', Some(b'='), _) => (TokenKind::Le, 2),
            (b'>', Some(b'='), _) => (TokenKind::Ge, 2),
            (b'&', Some(b'&'), _) => (TokenKind::And, 2),
            (b'|', Some(b'|'), _) => (TokenKind::Or, 2),
            (b'?', Some(b'?'), _) => (TokenKind::Coalesce, 2),
            (b'(', _, _) => (TokenKind::LParen, 1),
            (b')', _, _) => (TokenKind::RParen, 1),
            (b'[', _, _) => (TokenKind::LBracket, 1),
            (b']', _, _) => (TokenKind::RBracket, 1),
            (b'.', _, _) => (TokenKind::Dot, 1),
            (b',', _, _) => (TokenKind::Comma, 1),
            (b'?', _, _) => (TokenKind::Question, 1),
            (b':', _, _) => (TokenKind::Colon, 1),
            (b'!', _, _) => (TokenKind::Bang, 1),
            (b'+', _, _) => (TokenKind::Plus, 1),
            (b'-', _, _) => (TokenKind::Minus, 1),
            (b'*', _, _) => (TokenKind::Star, 1),
            (b'/', _, _) => (TokenKind::Slash, 1),
            (b'%', _, _) => (TokenKind::Percent, 1),
            (b'<', _, _) => (TokenKind::Lt, 1),
            (b'>', _, _) => (TokenKind::Gt, 1),
            _ => {
                let found = source[start..].chars().next().unwrap_or('\0');
                return Err(ExprError::UnexpectedChar {
                    found,
                    offset: start,
                });
            }
        };
        tokens.push(Token {
            kind,
            offset: start,
        });
        i += width;
    }

    Ok(tokens)
}

/// Read a quoted string starting at `start`. Returns the text and the offset
/// just past the closing quote.
fn string_literal(source: &str, start: usize) -> Result<(String, usize), ExprError> {
    let mut chars = source[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ExprError::UnexpectedEnd);
    };

    let mut text = String::new();
    while let Some((pos, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((text, start + pos + c.len_utf8())),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            c => text.push(c),
        }
    }
    Err(ExprError::UnterminatedString { offset: start })
}
