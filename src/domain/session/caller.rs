//! Caller number normalization

use crate::domain::shared::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A North American caller number in display form, `+1-AAA-BBB-CCCC`.
///
/// Built from whatever the platform sends (`+14155550123`,
/// `(415) 555-0123`, `1 415 555 0123`): every non-digit is stripped, an
/// 11-digit number must start with the country code `1`, and the remaining
/// ten digits are grouped 3-3-4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerNumber(String);

impl CallerNumber {
    pub fn parse(raw: &str) -> Result<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        let national = match digits.len() {
            10 => digits.as_str(),
            11 if digits.starts_with('1') => &digits[1..],
            _ => return Err(RelayError::InvalidCallerNumber(raw.to_string())),
        };

        Ok(Self(format!(
            "+1-{}-{}-{}",
            &national[0..3],
            &national[3..6],
            &national[6..]
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
