//! Whitespace-separated model text format.
//!
//! ```text
//! 2
//! Dense
//! relu
//! 2 3
//! 0.5 -1 0.25
//! 1 2 3
//! 0 0 0
//! Softmax
//! ```
//!
//! Floats are written with `{}` formatting, which is the shortest
//! representation that parses back to the same bits.

use std::fmt::Display;
use std::io::Write;
use std::str::{FromStr, SplitWhitespace};

use crate::error::{Error, Result};

/// Sequential reader over the tokens of a model file.
pub(crate) struct TokenReader<'a> {
    tokens: SplitWhitespace<'a>,
}

impl<'a> TokenReader<'a> {
    pub(crate) fn new(text: &'a str) -> TokenReader<'a> {
        TokenReader { tokens: text.split_whitespace() }
    }

    /// Next raw token; `what` names the expected field in the error.
    pub(crate) fn word(&mut self, what: &str) -> Result<&'a str> {
        self.tokens
            .next()
            .ok_or_else(|| Error::MalformedModel(format!("unexpected end of file, expected {what}")))
    }

    pub(crate) fn parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.word(what)?;
        token
            .parse()
            .map_err(|_| Error::MalformedModel(format!("expected {what}, found `{token}`")))
    }

    pub(crate) fn floats(&mut self, count: usize, what: &str) -> Result<Vec<f64>> {
        (0..count).map(|_| self.parse::<f64>(what)).collect()
    }

    pub(crate) fn is_done(&mut self) -> bool {
        self.tokens.clone().next().is_none()
    }
}

/// Writes `values` on one line, separated by single spaces.
pub(crate) fn write_row<W: Write, T: Display>(out: &mut W, values: &[T]) -> Result<()> {
    let mut first = true;
    for v in values {
        if !first {
            write!(out, " ")?;
        }
        write!(out, "{v}")?;
        first = false;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_typed_tokens() {
        let mut r = TokenReader::new("3\nDense  relu\n 0.5 -1e-3 ");
        assert_eq!(r.parse::<usize>("count").unwrap(), 3);
        assert_eq!(r.word("tag").unwrap(), "Dense");
        assert_eq!(r.word("activation").unwrap(), "relu");
        assert_eq!(r.floats(2, "weight").unwrap(), vec![0.5, -1e-3]);
        assert!(r.is_done());
        assert!(matches!(r.word("bias"), Err(Error::MalformedModel(_))));
    }

    #[test]
    fn reports_bad_tokens() {
        let mut r = TokenReader::new("two");
        let err = r.parse::<usize>("layer count").unwrap_err();
        assert_eq!(err.to_string(), "malformed model file: expected layer count, found `two`");
    }

    #[test]
    fn shortest_float_formatting_round_trips() {
        let values = [0.1, -2.2, 1.0 / 3.0, 6.02214076e23, f64::MIN_POSITIVE];
        let mut buf = Vec::new();
        write_row(&mut buf, &values).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let back = TokenReader::new(&text).floats(values.len(), "value").unwrap();
        for (a, b) in values.iter().zip(back) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
