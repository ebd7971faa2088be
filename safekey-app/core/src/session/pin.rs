//! The app-lock PIN.

use std::fmt;
use std::str::FromStr;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::SafeKeyError;

/// Number of digits in a PIN.
pub const PIN_LENGTH: usize = 4;

/// A validated 4-digit PIN.
///
/// Digits are wiped from memory on drop and comparisons run in constant
/// time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Pin(String);

impl Pin {
    /// Parse a PIN, rejecting anything but exactly four ASCII digits.
    pub fn parse(input: &str) -> Result<Self, SafeKeyError> {
        if input.len() != PIN_LENGTH || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SafeKeyError::InvalidInput(format!(
                "PIN must be {} digits.",
                PIN_LENGTH
            )));
        }
        Ok(Self(input.to_string()))
    }

    /// The digits, for persistence only.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Pin {
    type Err = SafeKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for Pin {}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never log the digits
        f.write_str("Pin([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_four_digits() {
        assert_eq!(Pin::parse("0420").unwrap().as_str(), "0420");
        assert_eq!("9999".parse::<Pin>().unwrap(), Pin::parse("9999").unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "123", "12345", "12a4", " 123", "١٢٣٤"] {
            assert!(Pin::parse(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_debug_is_redacted() {
        let pin = Pin::parse("4242").unwrap();
        assert!(!format!("{:?}", pin).contains("4242"));
    }

    #[test]
    fn test_inequality() {
        assert_ne!(Pin::parse("1234").unwrap(), Pin::parse("1235").unwrap());
    }
}
