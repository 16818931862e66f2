//! Static → dynamic QRIS conversion
//!
//! The merchant's static payload is the source of truth. A dynamic payload is
//! always rebuilt from it: drop the CRC field, drop any tag 54, insert the new
//! tag 54 before tag 58 (or 59), then append a fresh CRC field.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::crc::compute_checksum;
use crate::locate::{find_anchor, strip_amount_field, AnchorKind};
use crate::payload::verify_checksum;
use crate::QrisError;

/// Fixed payload format indicator prefix (`00 02 01`, truncated as issuers do).
pub const PAYLOAD_PREFIX: &str = "00020";
/// Tag 63 with its fixed length.
pub const CRC_HEADER: &str = "6304";
/// `"6304"` + 4 hex digits.
pub const CRC_FIELD_LEN: usize = 8;

pub const MIN_PAYLOAD_LEN: usize = 100;
pub const MAX_PAYLOAD_LEN: usize = 1000;

/// Generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Reject static payloads whose own checksum does not verify
    pub verify_input_checksum: bool,
    /// Anchor on tag 59 when the payload has no tag 58
    pub allow_merchant_name_anchor: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            verify_input_checksum: false,
            allow_merchant_name_anchor: true,
        }
    }
}

/// Dynamic payload generator
#[derive(Debug, Clone, Default)]
pub struct DynamicQris {
    config: GeneratorConfig,
}

impl DynamicQris {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Embed `amount` (whole Rupiah) into `static_payload`.
    ///
    /// Do not feed a previous result back in for a new amount. Keep the
    /// static payload and call this again with it.
    pub fn generate(&self, static_payload: &str, amount: i64) -> Result<String, QrisError> {
        validate_static(static_payload)?;
        let amount = Amount::new(amount)?;

        if self.config.verify_input_checksum {
            verify_checksum(static_payload)?;
        }

        let body_len = static_payload.len() - CRC_FIELD_LEN;
        if !static_payload[body_len..].starts_with(CRC_HEADER) {
            log::warn!(
                "Static payload does not end with a 6304 CRC field: {:?}",
                &static_payload[body_len..]
            );
        }
        let body = &static_payload[..body_len];

        // Anchor first so a payload without 58/59 reports the missing field.
        self.anchor_offset(body)?;
        let stripped = strip_amount_field(body)?;
        let insert_at = self.anchor_offset(&stripped)?;

        let amount_field = amount.to_field()?;
        log::debug!("Amount {} → field {} at {}", amount.value(), amount_field, insert_at);

        let mut data = String::with_capacity(stripped.len() + amount_field.len() + CRC_FIELD_LEN);
        data.push_str(&stripped[..insert_at]);
        data.push_str(&amount_field);
        data.push_str(&stripped[insert_at..]);
        data.push_str(CRC_HEADER);

        let crc = compute_checksum(&data);
        log::debug!("CRC over {} bytes: {}", data.len(), crc);
        data.push_str(&crc);

        check_generated(&data)?;
        Ok(data)
    }

    fn anchor_offset(&self, data: &str) -> Result<usize, QrisError> {
        match find_anchor(data) {
            Some(anchor) if anchor.kind == AnchorKind::CountryCode => Ok(anchor.offset),
            Some(anchor) if self.config.allow_merchant_name_anchor => {
                log::warn!("No tag 58 in payload, anchoring amount on tag 59 at {}", anchor.offset);
                Ok(anchor.offset)
            }
            _ => Err(QrisError::MissingRequiredField(
                "cannot find proper position for amount field (no tag 58 or 59)".to_string(),
            )),
        }
    }
}

/// [`DynamicQris::generate`] with the default configuration.
pub fn generate_dynamic_payload(static_payload: &str, amount: i64) -> Result<String, QrisError> {
    DynamicQris::new().generate(static_payload, amount)
}

fn validate_static(payload: &str) -> Result<(), QrisError> {
    if payload.len() < MIN_PAYLOAD_LEN {
        return Err(QrisError::InvalidPayloadFormat(format!(
            "too short: {} characters",
            payload.len()
        )));
    }
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(QrisError::InvalidPayloadFormat(format!(
            "too long: {} characters",
            payload.len()
        )));
    }
    if !payload.starts_with(PAYLOAD_PREFIX) {
        return Err(QrisError::InvalidPayloadFormat(
            "must start with 00020".to_string(),
        ));
    }
    if !payload.is_ascii() {
        return Err(QrisError::InvalidPayloadFormat(
            "contains non-ASCII characters".to_string(),
        ));
    }
    Ok(())
}

fn check_generated(payload: &str) -> Result<(), QrisError> {
    if payload.len() < MIN_PAYLOAD_LEN || !payload.starts_with(PAYLOAD_PREFIX) {
        log::error!("Generated payload failed postconditions: {}", payload);
        return Err(QrisError::Internal(format!(
            "generated payload failed shape check ({} characters)",
            payload.len()
        )));
    }
    Ok(())
}
