//! Transaction amount (tag 54)
//!
//! Amounts are whole Rupiah. There is no minor unit anywhere in this crate:
//! "15000" in tag 54 is Rp 15.000, never Rp 150.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::locate::{MAX_AMOUNT_DIGITS, TAG_AMOUNT};
use crate::tlv::encode_field;
use crate::QrisError;

/// Largest amount accepted for a dynamic payload.
pub const MAX_AMOUNT: i64 = 999_999_999;

/// A validated transaction amount in whole Rupiah (1..=999_999_999).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, QrisError> {
        if value <= 0 || value > MAX_AMOUNT {
            return Err(QrisError::InvalidAmount(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The complete tag-54 field, e.g. `"540515000"`.
    pub fn to_field(&self) -> Result<String, QrisError> {
        encode_field(TAG_AMOUNT, &self.0.to_string())
            .map_err(|e| QrisError::Internal(format!("amount field: {}", e)))
    }
}

impl TryFrom<i64> for Amount {
    type Error = QrisError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_rupiah(self.0))
    }
}

/// Parse a tag-54 value. Only plain digit runs are accepted; decimals and
/// leading zeros are not produced by this crate and are rejected here.
pub fn parse_amount_value(value: &str) -> Option<i64> {
    let valid = !value.is_empty()
        && value.len() <= MAX_AMOUNT_DIGITS
        && value.bytes().all(|b| b.is_ascii_digit())
        && !(value.len() > 1 && value.starts_with('0'));
    if !valid {
        return None;
    }
    value.parse().ok()
}

/// `"Rp 15.000"`, with the Indonesian thousands separator.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}
