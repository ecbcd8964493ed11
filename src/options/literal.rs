//! Parser for the literal syntax of `array` parameters.
//!
//! Accepts nested `[...]` lists and `(...)` tuples of integers, floats,
//! quoted strings and `True`/`False`, e.g. `[[0, 10, 0, 10, 5, 7], (1, 2.5)]`.
//! A parenthesised value without a comma is grouping, not a tuple: `(1)` is
//! `1` and `(1,)` is a one-element sequence. Integers may carry `0x`/`0o`/`0b`
//! prefixes and `_` digit separators.

use thiserror::Error;

use super::value::OptionValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parse a complete literal. Trailing input other than whitespace is an error.
pub fn parse_literal(text: &str) -> Result<OptionValue, LiteralError> {
    let mut parser = Parser {
        src: text.as_bytes(),
        text,
        pos: 0,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<OptionValue, LiteralError> {
        match self.peek() {
            None => Err(self.error("expected a value")),
            Some(b'[') => self.sequence(b']'),
            Some(b'(') => self.parenthesised(),
            Some(q @ (b'\'' | b'"')) => self.string(q),
            Some(b'0'..=b'9' | b'+' | b'-' | b'.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    fn sequence(&mut self, close: u8) -> Result<OptionValue, LiteralError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(OptionValue::Sequence(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(OptionValue::Sequence(items));
                }
                None => return Err(self.error("unterminated sequence")),
                Some(_) => return Err(self.error("expected ',' or closing bracket")),
            }
        }
    }

    fn parenthesised(&mut self) -> Result<OptionValue, LiteralError> {
        let open = self.pos;
        self.pos += 1;
        self.skip_ws();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(OptionValue::Sequence(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        match self.peek() {
            Some(b')') => {
                self.pos += 1;
                Ok(first)
            }
            Some(b',') => {
                // Re-read as a tuple from the opening parenthesis.
                self.pos = open;
                self.sequence(b')')
            }
            None => Err(self.error("unterminated sequence")),
            Some(_) => Err(self.error("expected ',' or closing bracket")),
        }
    }

    fn string(&mut self, quote: u8) -> Result<OptionValue, LiteralError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        // Byte-wise scan is safe: quote and escape characters are ASCII and
        // never occur inside a multi-byte UTF-8 sequence.
        let mut run_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
                Some(c) if c == quote => {
                    out.push_str(&self.text[run_start..self.pos]);
                    self.pos += 1;
                    return Ok(OptionValue::Text(out));
                }
                Some(b'\\') => {
                    out.push_str(&self.text[run_start..self.pos]);
                    self.pos += 1;
                    let escaped = match self.peek() {
                        Some(b'n') => '\n',
                        Some(b't') => '\t',
                        Some(b'\\') => '\\',
                        Some(b'\'') => '\'',
                        Some(b'"') => '"',
                        _ => return Err(self.error("invalid escape sequence")),
                    };
                    out.push(escaped);
                    self.pos += 1;
                    run_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn number(&mut self) -> Result<OptionValue, LiteralError> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let radix = match (self.peek(), self.src.get(self.pos + 1).copied()) {
            (Some(b'0'), Some(b'x' | b'X')) => 16,
            (Some(b'0'), Some(b'o' | b'O')) => 8,
            (Some(b'0'), Some(b'b' | b'B')) => 2,
            _ => 10,
        };
        let parsed = if radix == 10 {
            self.decimal(start)
        } else {
            self.pos += 2;
            let digits_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                self.pos += 1;
            }
            // A separator may follow the prefix directly: `0x_ff`.
            let raw = &self.text[digits_start..self.pos];
            let digits = raw.strip_prefix('_').unwrap_or(raw);
            without_separators(digits, radix)
                .and_then(|d| i64::from_str_radix(&d, radix).ok())
                .map(|v| OptionValue::Int(if negative { -v } else { v }))
        };
        parsed.ok_or_else(|| LiteralError {
            offset: start,
            message: format!("invalid number '{}'", &self.text[start..self.pos]),
        })
    }

    /// Scan a decimal integer or float whose sign (if any) starts at `start`.
    fn decimal(&mut self, start: usize) -> Option<OptionValue> {
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' | b'_' => {}
                b'.' | b'e' | b'E' => is_float = true,
                b'+' | b'-' if matches!(self.src[self.pos - 1], b'e' | b'E') => {}
                _ => break,
            }
            self.pos += 1;
        }
        let token = &self.text[start..self.pos];
        let token = if token.contains('_') {
            without_separators(token, 10)?
        } else {
            token.to_string()
        };
        if is_float {
            token.parse::<f64>().ok().map(OptionValue::Float)
        } else {
            token.parse::<i64>().ok().map(OptionValue::Int)
        }
    }

    fn keyword(&mut self) -> Result<OptionValue, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        match &self.text[start..self.pos] {
            "True" => Ok(OptionValue::Bool(true)),
            "False" => Ok(OptionValue::Bool(false)),
            word => Err(LiteralError {
                offset: start,
                message: format!("unknown name '{word}'"),
            }),
        }
    }
}

/// Drop `_` separators, each of which must sit between two digits of `radix`.
fn without_separators(token: &str, radix: u32) -> Option<String> {
    let bytes = token.as_bytes();
    let is_digit = |i: usize| bytes.get(i).is_some_and(|&b| (b as char).is_digit(radix));
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'_' && (i == 0 || !is_digit(i - 1) || !is_digit(i + 1)) {
            return None;
        }
    }
    Some(token.replace('_', ""))
}
