//! Cheap checks and debugging helpers around payload strings

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::amount::parse_amount_value;
use crate::dynamic::{MAX_PAYLOAD_LEN, MIN_PAYLOAD_LEN, PAYLOAD_PREFIX};
use crate::locate::{find_amount_field, TAG_AMOUNT};
use crate::tlv::read_fields;

/// Gross shape check before attempting generation: `"00020"` prefix and
/// a length strictly between 100 and 1000. Does not verify the checksum.
pub fn is_valid_payload(payload: &str) -> bool {
    payload.starts_with(PAYLOAD_PREFIX)
        && payload.len() > MIN_PAYLOAD_LEN
        && payload.len() < MAX_PAYLOAD_LEN
}

/// Amount in whole Rupiah from the payload's tag 54, if there is a
/// well-formed one. Any top-level tag 54 counts; payloads that don't
/// tokenize are only searched before the tag 58/59 anchor.
pub fn extract_amount(payload: &str) -> Option<i64> {
    let range = amount_range(payload)?;
    let field = payload.get(range)?;
    let declared: usize = field.get(2..4)?.parse().ok()?;
    let value = &field[4..];
    if value.len() != declared {
        return None;
    }
    parse_amount_value(value)
}

fn amount_range(payload: &str) -> Option<Range<usize>> {
    match read_fields(payload) {
        Ok(fields) => fields
            .iter()
            .find(|f| f.is(TAG_AMOUNT))
            .map(|f| f.offset..f.end()),
        Err(_) => find_amount_field(payload),
    }
}

fn has_amount_field(payload: &str) -> bool {
    amount_range(payload).is_some()
}

fn trailing_checksum(payload: &str) -> String {
    let start = payload.len().saturating_sub(4);
    payload.get(start..).unwrap_or_default().to_string()
}

/// Side by side view of a static payload and the dynamic one made from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumComparison {
    pub original_length: usize,
    pub dynamic_length: usize,
    pub length_diff: i64,
    pub original_crc: String,
    pub dynamic_crc: String,
    pub original_has_amount: bool,
    pub dynamic_has_amount: bool,
    pub original_amount: Option<i64>,
    pub dynamic_amount: Option<i64>,
}

/// Troubleshooting only. Not part of the generation path.
pub fn compare_checksums(original: &str, dynamic: &str) -> ChecksumComparison {
    ChecksumComparison {
        original_length: original.len(),
        dynamic_length: dynamic.len(),
        length_diff: dynamic.len() as i64 - original.len() as i64,
        original_crc: trailing_checksum(original),
        dynamic_crc: trailing_checksum(dynamic),
        original_has_amount: has_amount_field(original),
        dynamic_has_amount: has_amount_field(dynamic),
        original_amount: extract_amount(original),
        dynamic_amount: extract_amount(dynamic),
    }
}
