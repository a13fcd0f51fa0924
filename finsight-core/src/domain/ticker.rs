//! Ticker symbol newtype.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A normalized ticker symbol (trimmed, upper-case, non-empty).
///
/// Construct through [`Ticker::parse`] so every ticker in the system has gone
/// through the same normalization. Two inputs that differ only in case or
/// surrounding whitespace map to the same key in every store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    #[error("ticker is empty")]
    Empty,

    #[error("ticker '{ticker}' contains invalid character '{ch}'")]
    InvalidCharacter { ticker: String, ch: char },
}

impl Ticker {
    /// Normalize and validate a raw symbol.
    pub fn parse(raw: &str) -> Result<Self, TickerError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(TickerError::Empty);
        }
        if let Some(ch) = normalized.chars().find(|c| !is_symbol_char(*c)) {
            return Err(TickerError::InvalidCharacter {
                ticker: normalized,
                ch,
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Exchange suffixes (BRK.B), index (^GSPC) and FX/futures (EURUSD=X) symbols.
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ticker {
    type Err = TickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Ticker {
    type Error = TickerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
