//! Validated mobile numbers and the digit arithmetic used by search.
//!
//! An [`Msisdn`] is a ten-digit subscriber number stored in compact form.
//! All pattern-based search features (digit sum, digital root, repetition
//! limits) are defined here so the query layer and the import pipeline share
//! one implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A validated ten-digit mobile number.
///
/// Construction rejects anything that is not exactly ten ASCII digits after
/// trimming surrounding whitespace. The inner representation has no
/// separators, so prefix/suffix/substring matching works on raw digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Msisdn(String);

impl Msisdn {
    /// Parses and validates a mobile number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] unless the trimmed input is exactly ten
    /// ASCII digits.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.len() != 10 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::validation(format!(
                "mobile number must be exactly 10 digits, got '{trimmed}'"
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the number as a digit string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the digits as numeric values.
    pub fn digits(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.bytes().map(|b| u32::from(b - b'0'))
    }

    /// The plain sum of all ten digits.
    #[must_use]
    pub fn digit_sum(&self) -> u32 {
        self.digits().sum()
    }

    /// The digital root: the digit sum iterated until a single digit remains.
    #[must_use]
    pub fn digital_root(&self) -> u32 {
        let mut n = self.digit_sum();
        while n > 9 {
            n = n / 10 + n % 10;
        }
        n
    }

    /// The highest occurrence count of any single digit.
    ///
    /// `9999911111` yields 5; a number with all-distinct digits yields 1.
    #[must_use]
    pub fn max_digit_frequency(&self) -> u32 {
        let mut counts = [0u32; 10];
        for d in self.digits() {
            counts[d as usize] += 1;
        }
        counts.into_iter().max().unwrap_or(0)
    }

    /// Whether every digit of the number belongs to `allowed`.
    ///
    /// An empty `allowed` set matches nothing.
    #[must_use]
    pub fn uses_only(&self, allowed: &[u32]) -> bool {
        !allowed.is_empty() && self.digits().all(|d| allowed.contains(&d))
    }
}

impl fmt::Display for Msisdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Msisdn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for Msisdn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ten_digits_and_trims() {
        let m = Msisdn::new(" 9876543210 ").unwrap();
        assert_eq!(m.as_str(), "9876543210");
    }

    #[test]
    fn rejects_wrong_length_and_non_digits() {
        assert!(Msisdn::new("12345").is_err());
        assert!(Msisdn::new("98765432100").is_err());
        assert!(Msisdn::new("98765-4321").is_err());
        assert!(Msisdn::new("").is_err());
    }

    #[test]
    fn digit_sum_is_plain_sum() {
        let m = Msisdn::new("9999999999").unwrap();
        assert_eq!(m.digit_sum(), 90);
    }

    #[test]
    fn digital_root_iterates_to_single_digit() {
        // 9+8+7+6+5+4+3+2+1+0 = 45 -> 9
        let m = Msisdn::new("9876543210").unwrap();
        assert_eq!(m.digit_sum(), 45);
        assert_eq!(m.digital_root(), 9);

        let m = Msisdn::new("0000000001").unwrap();
        assert_eq!(m.digital_root(), 1);
    }

    #[test]
    fn max_digit_frequency_counts_repeats() {
        assert_eq!(Msisdn::new("9999911111").unwrap().max_digit_frequency(), 5);
        assert_eq!(Msisdn::new("9876543210").unwrap().max_digit_frequency(), 1);
        assert_eq!(Msisdn::new("7777777777").unwrap().max_digit_frequency(), 10);
    }

    #[test]
    fn uses_only_checks_allowed_set() {
        let m = Msisdn::new("9898989898").unwrap();
        assert!(m.uses_only(&[8, 9]));
        assert!(!m.uses_only(&[9]));
        assert!(!m.uses_only(&[]));
    }
}
