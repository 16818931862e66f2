//! Locating the amount field (tag 54) and its anchor (tag 58 / tag 59)
//!
//! The amount always goes right before the country code, or before the
//! merchant name when an issuer omits tag 58. Anything before that anchor is
//! the only region an existing amount may be stripped from; merchant names
//! and additional data routinely contain "54..." digit runs.
//!
//! Payloads that tokenize cleanly are handled field by field. Some issuer
//! payloads carry templates with wrong declared lengths, so those fall back
//! to a marker scan over the raw text.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::tlv::{read_fields, TlvField};
use crate::QrisError;

pub const TAG_CURRENCY: &str = "53";
pub const TAG_AMOUNT: &str = "54";
pub const TAG_COUNTRY: &str = "58";
pub const TAG_MERCHANT_NAME: &str = "59";

/// Longest amount value accepted when reading an existing tag 54.
pub const MAX_AMOUNT_DIGITS: usize = 13;

/// Which field the amount is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorKind {
    /// `58 02 <ISO 3166 alpha-2>`
    CountryCode,
    /// `59 LL <merchant name>`
    MerchantName,
}

/// Insertion point for the amount field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub offset: usize,
}

/// Find the anchor the amount field must precede.
pub fn find_anchor(data: &str) -> Option<Anchor> {
    match read_fields(data) {
        Ok(fields) => anchor_in_fields(&fields),
        Err(e) => {
            log::debug!("Payload is not clean TLV ({}), scanning for markers", e);
            scan_anchor(data.as_bytes())
        }
    }
}

/// Byte range of the amount field before the anchor, if any.
pub fn find_amount_field(data: &str) -> Option<Range<usize>> {
    match read_fields(data) {
        Ok(fields) => {
            let anchor = anchor_in_fields(&fields)?;
            fields
                .iter()
                .take_while(|f| f.offset < anchor.offset)
                .find(|f| f.is(TAG_AMOUNT))
                .map(|f| f.offset..f.end())
        }
        Err(_) => {
            let anchor = scan_anchor(data.as_bytes())?;
            scan_amount_before(data.as_bytes(), anchor.offset)
        }
    }
}

/// Remove an existing tag-54 field from the region before the tag 58/59
/// anchor. Every byte outside the removed field is kept as is.
///
/// Fails with [`QrisError::MalformedPayload`] when neither anchor exists,
/// since the amount field cannot be scoped.
pub fn strip_amount_field(payload: &str) -> Result<String, QrisError> {
    let fields = read_fields(payload).ok();

    let anchor = match &fields {
        Some(fields) => anchor_in_fields(fields),
        None => scan_anchor(payload.as_bytes()),
    }
    .ok_or_else(|| {
        QrisError::MalformedPayload("no tag 58 or tag 59 to scope the amount field".to_string())
    })?;

    let mut out = String::with_capacity(payload.len());
    match fields {
        Some(fields) => {
            let mut removed = 0;
            for field in &fields {
                if field.offset < anchor.offset && field.is(TAG_AMOUNT) {
                    log::debug!("Removing existing tag 54 \"{}\" at {}", field.value, field.offset);
                    removed += 1;
                    continue;
                }
                out.push_str(&payload[field.offset..field.end()]);
            }
            if removed > 1 {
                log::warn!("Payload carried {} amount fields before the anchor", removed);
            }
        }
        None => match scan_amount_before(payload.as_bytes(), anchor.offset) {
            Some(range) => {
                log::debug!("Removing existing tag 54 \"{}\" at {}", &payload[range.clone()], range.start);
                out.push_str(&payload[..range.start]);
                out.push_str(&payload[range.end..]);
            }
            None => out.push_str(payload),
        },
    }

    Ok(out)
}

fn anchor_in_fields(fields: &[TlvField<'_>]) -> Option<Anchor> {
    let country = fields
        .iter()
        .find(|f| f.is(TAG_COUNTRY) && is_country_code(f.value.as_bytes()));
    if let Some(field) = country {
        return Some(Anchor {
            kind: AnchorKind::CountryCode,
            offset: field.offset,
        });
    }

    fields.iter().find(|f| f.is(TAG_MERCHANT_NAME)).map(|f| Anchor {
        kind: AnchorKind::MerchantName,
        offset: f.offset,
    })
}

fn is_country_code(value: &[u8]) -> bool {
    value.len() == 2 && value.iter().all(u8::is_ascii_uppercase)
}

/// First `5802[A-Z]{2}`, else first `59\d{2}`.
fn scan_anchor(data: &[u8]) -> Option<Anchor> {
    let country = data
        .windows(6)
        .position(|w| w.starts_with(b"5802") && is_country_code(&w[4..]));
    if let Some(offset) = country {
        return Some(Anchor {
            kind: AnchorKind::CountryCode,
            offset,
        });
    }

    data.windows(4)
        .position(|w| w.starts_with(b"59") && w[2..].iter().all(u8::is_ascii_digit))
        .map(|offset| Anchor {
            kind: AnchorKind::MerchantName,
            offset,
        })
}

/// Raw scan for an amount field before the anchor. A `54 LL <digits>` run
/// right after a `5303ddd` currency field wins wherever it ends. Otherwise
/// take the first run followed only by tip/fee fields (55-57) up to the
/// anchor, which includes a run ending exactly at the anchor.
fn scan_amount_before(data: &[u8], anchor: usize) -> Option<Range<usize>> {
    let candidates: Vec<Range<usize>> = (0..anchor)
        .filter_map(|start| amount_field_at(data, start, anchor))
        .collect();

    candidates
        .iter()
        .find(|r| follows_currency(data, r.start))
        .or_else(|| candidates.iter().find(|r| only_fee_fields(&data[r.end..anchor])))
        .cloned()
}

fn amount_field_at(data: &[u8], start: usize, limit: usize) -> Option<Range<usize>> {
    let header = data.get(start..start + 4)?;
    if !header.starts_with(TAG_AMOUNT.as_bytes()) || !header[2..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let len = ((header[2] - b'0') * 10 + (header[3] - b'0')) as usize;
    let end = start + 4 + len;
    if len == 0 || len > MAX_AMOUNT_DIGITS || end > limit {
        return None;
    }
    data[start + 4..end]
        .iter()
        .all(u8::is_ascii_digit)
        .then_some(start..end)
}

fn only_fee_fields(tail: &[u8]) -> bool {
    std::str::from_utf8(tail)
        .ok()
        .and_then(|s| read_fields(s).ok())
        .map_or(false, |fields| fields.iter().all(|f| (55..=57).contains(&f.id())))
}

fn follows_currency(data: &[u8], start: usize) -> bool {
    start >= 7 && {
        let field = &data[start - 7..start];
        field.starts_with(b"5303") && field[4..].iter().all(u8::is_ascii_digit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tag 26 declares 67 bytes but carries 49, so this only works via the scan.
    const LOOSE: &str = "00020101021226670016ID.CO.SHOPEE.WWW011893600915123456780303UME51440014ID.CO.QRIS.WWW0215ID102000001234503033605802ID5909TestMerch6007Jakarta610512345";

    #[test]
    fn test_anchor_prefers_country_code() {
        let data = "0002015303360540410005802ID5903ABC";
        let anchor = find_anchor(data).unwrap();
        assert_eq!(anchor.kind, AnchorKind::CountryCode);
        assert_eq!(&data[anchor.offset..anchor.offset + 6], "5802ID");
    }

    #[test]
    fn test_anchor_falls_back_to_merchant_name() {
        let data = "0002015303360590412346007JAKARTA";
        let anchor = find_anchor(data).unwrap();
        assert_eq!(anchor.kind, AnchorKind::MerchantName);
        assert_eq!(anchor.offset, 13);
    }

    #[test]
    fn test_country_code_must_be_letters() {
        // "5802" followed by digits is not a country field
        let data = "000201530336058021259031236007JAKARTA";
        assert!(read_fields(data).is_ok());
        let anchor = find_anchor(data).unwrap();
        assert_eq!(anchor.kind, AnchorKind::MerchantName);
    }

    #[test]
    fn test_strip_removes_amount_before_anchor() {
        let data = "00020153033605405150005802ID5903ABC";
        assert_eq!(strip_amount_field(data).unwrap(), "00020153033605802ID5903ABC");
    }

    #[test]
    fn test_strip_keeps_amount_like_text_after_anchor() {
        let data = "00020153033605802ID5909AB5405123";
        assert_eq!(strip_amount_field(data).unwrap(), data);
    }

    #[test]
    fn test_strip_ignores_54_inside_templates() {
        let data = "000201261202085403123453033605802ID5903ABC";
        assert_eq!(strip_amount_field(data).unwrap(), data);
    }

    #[test]
    fn test_strip_without_anchor_is_malformed() {
        let err = strip_amount_field("0002015303360540515000").unwrap_err();
        assert!(matches!(err, QrisError::MalformedPayload(_)));
    }

    #[test]
    fn test_scan_path_on_loose_payload() {
        assert!(read_fields(LOOSE).is_err());
        assert_eq!(strip_amount_field(LOOSE).unwrap(), LOOSE);

        let anchor = find_anchor(LOOSE).unwrap();
        let dynamic = format!("{}540515000{}", &LOOSE[..anchor.offset], &LOOSE[anchor.offset..]);
        let range = find_amount_field(&dynamic).unwrap();
        assert_eq!(&dynamic[range], "540515000");
        assert_eq!(strip_amount_field(&dynamic).unwrap(), LOOSE);
    }

    #[test]
    fn test_scan_finds_amount_before_tip_field() {
        let anchor = find_anchor(LOOSE).unwrap();
        let dynamic = format!(
            "{}540515000550201{}",
            &LOOSE[..anchor.offset],
            &LOOSE[anchor.offset..]
        );
        assert!(read_fields(&dynamic).is_err());
        let range = find_amount_field(&dynamic).unwrap();
        assert_eq!(&dynamic[range], "540515000");
        let expected = format!("{}550201{}", &LOOSE[..anchor.offset], &LOOSE[anchor.offset..]);
        assert_eq!(strip_amount_field(&dynamic).unwrap(), expected);
    }

    #[test]
    fn test_scan_takes_field_after_currency_wherever_it_ends() {
        // tag 52 after the amount is out of the usual order
        let data = "26990016ID.CO.QRIS.WWW53033605405150005204581258";
        let range = scan_amount_before(data.as_bytes(), data.len()).unwrap();
        assert_eq!(&data[range], "540515000");
    }

    #[test]
    fn test_scan_ignores_amount_followed_by_other_fields() {
        let data = "26990016ID.CO.QRIS.WWW5405150005204581258";
        assert_eq!(scan_amount_before(data.as_bytes(), data.len()), None);
    }

    #[test]
    fn test_scan_prefers_field_after_currency() {
        // "5401" + "7" and "5412" + 12 digits both end at the anchor
        let data = "XX5412530336054017";
        let range = scan_amount_before(data.as_bytes(), data.len()).unwrap();
        assert_eq!(range, 13..18);
    }
}
