//! Token scanner for the weights and training-set text formats.
//!
//! Whitespace between tokens is insignificant. Every failed match reports the
//! expected token and the byte offset where scanning stopped.

use crate::error::{BackpropError, Result};

pub(crate) struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error<T>(&self, expected: &str) -> Result<T> {
        Err(BackpropError::Parse {
            expected: expected.to_string(),
            offset: self.pos,
        })
    }

    /// Consume `token`, failing if the next non-blank text differs.
    pub(crate) fn expect(&mut self, token: &str) -> Result<()> {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            self.error(&format!("'{}'", token))
        }
    }

    /// Consume `token` if it is next; report whether it was.
    pub(crate) fn accept(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Consume `key: ` and return the unsigned integer that follows.
    pub(crate) fn field_usize(&mut self, key: &str) -> Result<usize> {
        self.expect(key)?;
        self.expect(":")?;
        self.usize()
    }

    pub(crate) fn usize(&mut self) -> Result<usize> {
        self.skip_whitespace();
        let digits = self.take_while(|c| c.is_ascii_digit());
        match digits.parse() {
            Ok(value) => Ok(value),
            Err(_) => self.error("unsigned integer"),
        }
    }

    pub(crate) fn f64(&mut self) -> Result<f64> {
        self.skip_whitespace();
        let start = self.pos;
        // Letters cover exponents as well as `NaN`, `inf` and `-inf`.
        let number =
            self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.'));
        match number.parse() {
            Ok(value) => Ok(value),
            Err(_) => {
                self.pos = start;
                self.error("floating point number")
            }
        }
    }

    /// A byte written as `0xNN`.
    pub(crate) fn hex_byte(&mut self) -> Result<u8> {
        self.skip_whitespace();
        let start = self.pos;
        if !(self.accept("0x") || self.accept("0X")) {
            return self.error("hex byte");
        }
        let digits = self.take_while(|c| c.is_ascii_hexdigit());
        match u8::from_str_radix(digits, 16) {
            Ok(value) => Ok(value),
            Err(_) => {
                self.pos = start;
                self.error("hex byte")
            }
        }
    }

    /// A bracketed, comma-separated list; `item` parses one element.
    pub(crate) fn list<T, F>(&mut self, mut item: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        self.expect("[")?;
        let mut items = Vec::new();
        if self.accept("]") {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.accept("]") {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }

    fn take_while<P: Fn(char) -> bool>(&mut self, predicate: P) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !predicate(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_and_lists() {
        let mut scanner = Scanner::new("{count: 12, data: [ 0x0A, 0xff ]}");
        scanner.expect("{").unwrap();
        assert_eq!(scanner.field_usize("count").unwrap(), 12);
        scanner.expect(",").unwrap();
        scanner.expect("data").unwrap();
        scanner.expect(":").unwrap();
        assert_eq!(scanner.list(Scanner::hex_byte).unwrap(), vec![0x0a, 0xff]);
        scanner.expect("}").unwrap();
    }

    #[test]
    fn test_floats() {
        let mut scanner = Scanner::new("[ -0.5, 3, 1e-7 ]");
        assert_eq!(scanner.list(Scanner::f64).unwrap(), vec![-0.5, 3.0, 1e-7]);
    }

    #[test]
    fn test_error_reports_offset() {
        let mut scanner = Scanner::new("  {x_size: a}");
        scanner.expect("{").unwrap();
        match scanner.field_usize("x_size") {
            Err(BackpropError::Parse { offset, .. }) => assert_eq!(offset, 11),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_list() {
        let mut scanner = Scanner::new("[ ]");
        assert!(scanner.list(Scanner::hex_byte).unwrap().is_empty());
    }
}
