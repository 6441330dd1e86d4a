//! One-pass streaming lexer for Lox source.
//!
//! [`Scanner`] walks a byte slice and yields `Result<Token>` through its
//! `Iterator` impl: `Ok` for each recognized token (with exactly one `EOF`
//! at the end), `Err` for each malformed lexeme. Whitespace and `//`
//! comments are consumed silently. Lexemes are slices of the input buffer;
//! nothing is copied except string/number literal payloads.
//!
//! Keywords are resolved through a compile-time perfect-hash table, and
//! comment skipping scans for the next newline with `memchr` instead of
//! stepping byte by byte.

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Streaming scanner over a source buffer. `'a` ties emitted lexemes to
/// the buffer.
pub struct Scanner<'a> {
    src: &'a [u8],
    /// First byte of the lexeme currently being scanned.
    start: usize,
    /// One past the last byte examined.
    curr: usize,
    /// 1-based line counter, bumped on every `\n`.
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        info!("scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
        }
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Consume and return the current byte. Callers guard with
    /// [`is_at_end`](Self::is_at_end).
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte without consuming it; `0` past the end.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.src.get(self.curr).copied().unwrap_or(0)
    }

    /// Byte after [`peek`](Self::peek); `0` past the end.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.src.get(self.curr + 1).copied().unwrap_or(0)
    }

    /// Consume the current byte iff it equals `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.curr += 1;
            true
        } else {
            false
        }
    }

    /// Scan one lexeme starting at `self.start == self.curr`.
    ///
    /// Returns `Ok(Some(kind))` for a real token, `Ok(None)` for skipped
    /// trivia (whitespace, comments), `Err` for a malformed lexeme.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let kind = match b {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' => {
                if self.match_byte(b'/') {
                    // Comment runs to end of line; jump straight there.
                    match memchr(b'\n', &self.src[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.src.len(),
                    }

                    return Ok(None);
                }

                TokenType::SLASH
            }

            b'"' => return self.string().map(Some),

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Scan the rest of a `"`-delimited string. Newlines inside the
    /// literal are legal and counted.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // closing quote

        let contents = &self.src[self.start + 1..self.curr - 1];

        // The scanner only ever slices at ASCII boundaries it has itself
        // examined, so the slice stays valid UTF-8.
        let s = unsafe { std::str::from_utf8_unchecked(contents) };

        Ok(TokenType::STRING(s.to_owned()))
    }

    /// Scan the rest of a number literal: digits with one optional
    /// fractional part. A trailing `.` is not part of the number.
    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.curr += 1;
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.curr += 1;

            while self.peek().is_ascii_digit() {
                self.curr += 1;
            }
        }

        let lexeme = unsafe { std::str::from_utf8_unchecked(&self.src[self.start..self.curr]) };

        // Only digits and at most one dot can reach the parse.
        TokenType::NUMBER(lexeme.parse::<f64>().unwrap_or(0.0))
    }

    /// Scan the rest of an identifier and classify it against the keyword
    /// table.
    fn identifier(&mut self) -> TokenType {
        while {
            let b = self.peek();
            b.is_ascii_alphanumeric() || b == b'_'
        } {
            self.curr += 1;
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Emit one EOF, then fuse.
            if self.curr == self.src.len() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            if self.curr > self.src.len() {
                return None;
            }

            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(kind)) => {
                    let lexeme = unsafe {
                        std::str::from_utf8_unchecked(&self.src[self.start..self.curr])
                    };

                    debug!("scanned {:?} at line {}", kind, self.line);

                    return Some(Ok(Token::new(kind, lexeme, self.line)));
                }

                // Trivia; keep going.
                Ok(None) => {}
            }
        }
    }
}

impl FusedIterator for Scanner<'_> {}
