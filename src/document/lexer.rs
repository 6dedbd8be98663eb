//! Delimiter-aware tokenizer for Nix source.
//!
//! The lexer makes one pass over the text and keeps a stack of open
//! delimiters, strings and `${ }` interpolations. Comments are dropped and
//! every string literal (including whatever its interpolations contain)
//! becomes a single [`TokenKind::Str`] token, so structure words inside
//! strings or comments never reach the analyzer. The same pass doubles as
//! the balance check used by the validator.

use super::Span;
use super::text::line_col;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Dot,
    Assign,
    Semi,
    Colon,
    At,
    Comma,
    Question,
    Ellipsis,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    /// `${` outside of a string (dynamic attribute names)
    OpenInterp,
    Str,
    /// Path, search path (`<nixpkgs>`) or URI literal
    Path,
    Number,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        self.span.slice(src)
    }

    pub fn is_opener(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::OpenBrace | TokenKind::OpenBracket | TokenKind::OpenParen | TokenKind::OpenInterp
        )
    }

    pub fn is_closer(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::CloseBrace | TokenKind::CloseBracket | TokenKind::CloseParen
        )
    }

    pub fn is_keyword(&self, src: &str, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text(src) == word
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("'{0}' is never closed")]
    Unclosed(&'static str),
    #[error("unexpected '{0}' with nothing open")]
    UnexpectedCloser(char),
    #[error("'{found}' closes '{expected}'")]
    Mismatched { expected: &'static str, found: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (byte {offset})")]
pub struct ScanError {
    pub offset: usize,
    pub kind: ScanErrorKind,
}

impl ScanError {
    pub fn line_col(&self, src: &str) -> (usize, usize) {
        line_col(src, self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Double,
    Indented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Brace,
    Bracket,
    Paren,
    Interp,
    Str(StringKind),
}

impl Open {
    fn symbol(self) -> &'static str {
        match self {
            Open::Brace => "{",
            Open::Bracket => "[",
            Open::Paren => "(",
            Open::Interp => "${",
            Open::Str(StringKind::Double) => "\"",
            Open::Str(StringKind::Indented) => "''",
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    stack: Vec<(Open, usize)>,
    string_depth: usize,
    tokens: Vec<Token>,
}

/// Tokenize `src`, failing on the first unbalanced delimiter or unterminated
/// string/comment.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ScanError> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        stack: Vec::new(),
        string_depth: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'\'' | b'-')
}

fn is_path_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b'+')
}

fn is_uri_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'%' | b'/' | b'?' | b':' | b'@' | b'&' | b'=' | b'+' | b'$' | b',' | b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\''
        )
}

impl<'a> Lexer<'a> {
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn char_len_at(&self, pos: usize) -> usize {
        self.src[pos..].chars().next().map_or(1, char::len_utf8)
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize) {
        if self.string_depth == 0 {
            self.tokens.push(Token {
                kind,
                span: Span::new(start, end),
            });
        }
    }

    fn in_string(&self) -> Option<StringKind> {
        match self.stack.last() {
            Some((Open::Str(kind), _)) => Some(*kind),
            _ => None,
        }
    }

    fn run(&mut self) -> Result<(), ScanError> {
        while self.pos < self.bytes.len() {
            match self.in_string() {
                Some(kind) => self.string_step(kind)?,
                None => self.code_step()?,
            }
        }

        if let Some((open, offset)) = self.stack.last().copied() {
            let kind = match open {
                Open::Str(_) => ScanErrorKind::UnterminatedString,
                other => ScanErrorKind::Unclosed(other.symbol()),
            };
            return Err(ScanError { offset, kind });
        }
        Ok(())
    }

    fn open_string(&mut self, kind: StringKind, width: usize) {
        self.stack.push((Open::Str(kind), self.pos));
        self.string_depth += 1;
        self.pos += width;
    }

    fn close_string(&mut self, width: usize) {
        if let Some((_, start)) = self.stack.pop() {
            self.string_depth -= 1;
            self.pos += width;
            self.emit(TokenKind::Str, start, self.pos);
        }
    }

    fn string_step(&mut self, kind: StringKind) -> Result<(), ScanError> {
        let b = self.bytes[self.pos];
        match (kind, b) {
            (_, b'$') if self.peek(1) == Some(b'{') => {
                self.stack.push((Open::Interp, self.pos));
                self.pos += 2;
            }
            (_, b'$') if self.peek(1) == Some(b'$') => self.pos += 2,
            (StringKind::Double, b'\\') => {
                if self.pos + 1 >= self.bytes.len() {
                    self.pos += 1;
                } else {
                    self.pos += 1 + self.char_len_at(self.pos + 1);
                }
            }
            (StringKind::Double, b'"') => self.close_string(1),
            (StringKind::Indented, b'\'') if self.peek(1) == Some(b'\'') => match self.peek(2) {
                Some(b'\'') | Some(b'$') => self.pos += 3,
                Some(b'\\') => {
                    self.pos += 3;
                    if self.pos < self.bytes.len() {
                        self.pos += self.char_len_at(self.pos);
                    }
                }
                _ => self.close_string(2),
            },
            _ => self.pos += self.char_len_at(self.pos),
        }
        Ok(())
    }

    fn close(&mut self, found: char, kind: TokenKind) -> Result<(), ScanError> {
        let start = self.pos;
        let accepted: &[Open] = match found {
            '}' => &[Open::Brace, Open::Interp],
            ']' => &[Open::Bracket],
            _ => &[Open::Paren],
        };
        match self.stack.last().copied() {
            None => Err(ScanError {
                offset: start,
                kind: ScanErrorKind::UnexpectedCloser(found),
            }),
            Some((open, _)) if accepted.contains(&open) => {
                self.stack.pop();
                self.pos += 1;
                self.emit(kind, start, self.pos);
                Ok(())
            }
            Some((open, _)) => Err(ScanError {
                offset: start,
                kind: ScanErrorKind::Mismatched {
                    expected: open.symbol(),
                    found,
                },
            }),
        }
    }

    fn open(&mut self, open: Open, kind: TokenKind, width: usize) {
        let start = self.pos;
        self.stack.push((open, start));
        self.pos += width;
        self.emit(kind, start, self.pos);
    }

    fn single(&mut self, kind: TokenKind, width: usize) {
        let start = self.pos;
        self.pos += width;
        self.emit(kind, start, self.pos);
    }

    fn code_step(&mut self) -> Result<(), ScanError> {
        let b = self.bytes[self.pos];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
            b'#' => {
                self.pos = self.src[self.pos..]
                    .find('\n')
                    .map_or(self.bytes.len(), |i| self.pos + i);
            }
            b'/' if self.peek(1) == Some(b'*') => {
                let body = self.pos + 2;
                match self.src[body..].find("*/") {
                    Some(i) => self.pos = body + i + 2,
                    None => {
                        return Err(ScanError {
                            offset: self.pos,
                            kind: ScanErrorKind::UnterminatedComment,
                        });
                    }
                }
            }
            b'"' => self.open_string(StringKind::Double, 1),
            b'\'' if self.peek(1) == Some(b'\'') => self.open_string(StringKind::Indented, 2),
            b'$' if self.peek(1) == Some(b'{') => self.open(Open::Interp, TokenKind::OpenInterp, 2),
            b'{' => self.open(Open::Brace, TokenKind::OpenBrace, 1),
            b'[' => self.open(Open::Bracket, TokenKind::OpenBracket, 1),
            b'(' => self.open(Open::Paren, TokenKind::OpenParen, 1),
            b'}' => self.close('}', TokenKind::CloseBrace)?,
            b']' => self.close(']', TokenKind::CloseBracket)?,
            b')' => self.close(')', TokenKind::CloseParen)?,
            b'.' if self.peek(1) == Some(b'.') && self.peek(2) == Some(b'.') => {
                self.single(TokenKind::Ellipsis, 3)
            }
            b'.' | b'~' if self.starts_relative_path() => self.path(),
            b'/' if self.peek(1).is_some_and(is_path_char) => self.path(),
            b'<' if self.starts_search_path() => self.search_path(),
            b'.' => self.single(TokenKind::Dot, 1),
            b'=' if self.peek(1) == Some(b'=') => self.single(TokenKind::Operator, 2),
            b'=' => self.single(TokenKind::Assign, 1),
            b';' => self.single(TokenKind::Semi, 1),
            b':' => self.single(TokenKind::Colon, 1),
            b'@' => self.single(TokenKind::At, 1),
            b',' => self.single(TokenKind::Comma, 1),
            b'?' => self.single(TokenKind::Question, 1),
            b if b.is_ascii_digit() => self.number(),
            b if is_ident_start(b) => self.ident(),
            _ => {
                let width = self.char_len_at(self.pos);
                self.single(TokenKind::Operator, width);
            }
        }
        Ok(())
    }

    fn starts_relative_path(&self) -> bool {
        // ./x ../x ~/x
        match (self.peek(0), self.peek(1), self.peek(2)) {
            (Some(b'.'), Some(b'/'), _) | (Some(b'~'), Some(b'/'), _) => true,
            (Some(b'.'), Some(b'.'), Some(b'/')) => true,
            _ => false,
        }
    }

    fn starts_search_path(&self) -> bool {
        let rest = &self.bytes[self.pos + 1..];
        let len = rest
            .iter()
            .take_while(|b| is_path_char(**b) || **b == b'/')
            .count();
        len > 0 && rest.get(len) == Some(&b'>')
    }

    fn search_path(&mut self) {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'>' {
            self.pos += 1;
        }
        self.pos += 1;
        self.emit(TokenKind::Path, start, self.pos);
    }

    fn path(&mut self) {
        let start = self.pos;
        self.consume_path_chars();
        self.emit(TokenKind::Path, start, self.pos);
    }

    fn consume_path_chars(&mut self) {
        while let Some(b) = self.peek(0) {
            let slash_continues = b == b'/' && self.peek(1).is_some_and(is_path_char);
            if is_path_char(b) || b == b'~' || slash_continues {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn number(&mut self) {
        let start = self.pos;
        while let Some(b) = self.peek(0) {
            if b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.peek(0) == Some(b'/') && self.peek(1).is_some_and(is_path_char) {
            self.consume_path_chars();
            self.emit(TokenKind::Path, start, self.pos);
            return;
        }
        self.emit(TokenKind::Number, start, self.pos);
    }

    fn ident(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_char) {
            self.pos += 1;
        }

        // foo/bar is a relative path literal
        if self.peek(0) == Some(b'/') && self.peek(1).is_some_and(is_path_char) {
            self.consume_path_chars();
            self.emit(TokenKind::Path, start, self.pos);
            return;
        }

        // scheme:rest is a URI literal (a lambda needs whitespace after ':')
        let scheme_ok = self.src[start..self.pos]
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));
        if scheme_ok && self.peek(0) == Some(b':') && self.peek(1).is_some_and(|b| is_uri_char(b) && b != b':') {
            self.pos += 1;
            while self.peek(0).is_some_and(is_uri_char) {
                self.pos += 1;
            }
            self.emit(TokenKind::Path, start, self.pos);
            return;
        }

        self.emit(TokenKind::Ident, start, self.pos);
    }
}
