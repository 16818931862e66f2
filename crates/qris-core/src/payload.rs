use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::amount::parse_amount_value;
use crate::crc::compute_checksum;
use crate::dynamic::{CRC_FIELD_LEN, CRC_HEADER};
use crate::locate::{TAG_AMOUNT, TAG_COUNTRY, TAG_CURRENCY, TAG_MERCHANT_NAME};
use crate::tlv::{read_fields, TlvField};
use crate::QrisError;

/// Point of Initiation Method (01)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointOfInitiation {
    /// "11": the same code is shown for every transaction
    Static,
    /// "12": the code is generated per transaction
    Dynamic,
    Other,
}

impl PointOfInitiation {
    fn from_value(value: &str) -> Self {
        match value {
            "11" => PointOfInitiation::Static,
            "12" => PointOfInitiation::Dynamic,
            _ => PointOfInitiation::Other,
        }
    }
}

/// Parsed QRIS payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrisPayload {
    pub raw_data: String,
    pub pfi: String, // Payload Format Indicator (00)
    pub point_of_initiation: Option<PointOfInitiation>, // (01)
    /// Templates 02-51, keyed by tag, each with its sub-fields when they parse.
    pub merchant_account_information: BTreeMap<String, BTreeMap<String, String>>,
    pub merchant_category_code: Option<String>, // (52)
    pub transaction_currency: Option<String>, // (53)
    pub transaction_amount: Option<i64>, // (54)
    pub tip_indicator: Option<String>, // (55)
    pub country_code: Option<String>, // (58)
    pub merchant_name: Option<String>, // (59)
    pub merchant_city: Option<String>, // (60)
    pub postal_code: Option<String>, // (61)
    pub additional_data: BTreeMap<String, String>, // (62)
    pub crc: String, // (63)
    pub unparsed_tags: BTreeMap<String, String>,
}

impl QrisPayload {
    /// Verify the trailing checksum, then tokenize and map every field.
    pub fn parse(raw: &str) -> Result<Self, QrisError> {
        verify_checksum(raw)?;

        let fields = read_fields(raw)?;
        let mut payload = QrisPayload {
            raw_data: raw.to_string(),
            pfi: String::new(),
            point_of_initiation: None,
            merchant_account_information: BTreeMap::new(),
            merchant_category_code: None,
            transaction_currency: None,
            transaction_amount: None,
            tip_indicator: None,
            country_code: None,
            merchant_name: None,
            merchant_city: None,
            postal_code: None,
            additional_data: BTreeMap::new(),
            crc: String::new(),
            unparsed_tags: BTreeMap::new(),
        };
        let mut has_pfi = false;

        for field in &fields {
            let value = field.value.to_string();
            match field.tag {
                "00" => {
                    payload.pfi = value;
                    has_pfi = true;
                }
                "01" => payload.point_of_initiation = Some(PointOfInitiation::from_value(field.value)),
                "52" => payload.merchant_category_code = Some(value),
                TAG_CURRENCY => payload.transaction_currency = Some(value),
                TAG_AMOUNT => {
                    let amount = parse_amount_value(field.value).ok_or_else(|| {
                        QrisError::MalformedPayload(format!("invalid amount {:?}", field.value))
                    })?;
                    payload.transaction_amount = Some(amount);
                }
                "55" => payload.tip_indicator = Some(value),
                TAG_COUNTRY => payload.country_code = Some(value),
                TAG_MERCHANT_NAME => payload.merchant_name = Some(value),
                "60" => payload.merchant_city = Some(value),
                "61" => payload.postal_code = Some(value),
                "62" => payload.additional_data = sub_fields(field),
                "63" => payload.crc = value,
                _ if (2..=51).contains(&field.id()) => {
                    payload
                        .merchant_account_information
                        .insert(field.tag.to_string(), sub_fields(field));
                }
                _ => {
                    payload.unparsed_tags.insert(field.tag.to_string(), value);
                }
            }
        }

        if !has_pfi {
            return Err(QrisError::MalformedPayload("missing tag 00".to_string()));
        }
        Ok(payload)
    }

    /// ISO 4217 alpha code for the transaction currency.
    pub fn currency_alpha(&self) -> Option<&'static str> {
        self.transaction_currency
            .as_deref()
            .and_then(currency_code_to_alpha)
    }

    /// Reverse-domain identifiers (sub-tag 00) of every merchant account
    /// template, e.g. `ID.CO.QRIS.WWW`.
    pub fn acquirers(&self) -> Vec<&str> {
        self.merchant_account_information
            .values()
            .filter_map(|sub| sub.get("00").map(String::as_str))
            .collect()
    }

    pub fn is_dynamic(&self) -> bool {
        self.transaction_amount.is_some()
    }
}

fn sub_fields(field: &TlvField<'_>) -> BTreeMap<String, String> {
    match field.children() {
        Ok(children) => children
            .iter()
            .map(|c| (c.tag.to_string(), c.value.to_string()))
            .collect(),
        Err(e) => {
            log::debug!("Template {} is not nested TLV: {}", field.tag, e);
            BTreeMap::from([(String::new(), field.value.to_string())])
        }
    }
}

fn currency_code_to_alpha(code: &str) -> Option<&'static str> {
    match code {
        "360" => Some("IDR"),
        "458" => Some("MYR"),
        "702" => Some("SGD"),
        "764" => Some("THB"),
        "840" => Some("USD"),
        _ => None,
    }
}

/// Check that the payload ends in a `6304` field whose value is the
/// CRC-16/CCITT-FALSE of everything before it.
pub fn verify_checksum(raw: &str) -> Result<(), QrisError> {
    if raw.len() < CRC_FIELD_LEN || !raw.is_ascii() {
        return Err(QrisError::MalformedPayload(
            "payload too short or not ASCII".to_string(),
        ));
    }

    let len = raw.len();
    if &raw[len - CRC_FIELD_LEN..len - 4] != CRC_HEADER {
        return Err(QrisError::MalformedPayload(
            "missing checksum (tag 63)".to_string(),
        ));
    }

    let provided = &raw[len - 4..];
    let calculated = compute_checksum(&raw[..len - 4]);
    if !provided.eq_ignore_ascii_case(&calculated) {
        return Err(QrisError::ChecksumMismatch {
            expected: calculated,
            actual: provided.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIC_QRIS: &str = "00020101021126630016ID.CO.SHOPEE.WWW0118936009151234567890021054031234560303UME51440014ID.CO.QRIS.WWW0215ID10200000123450303UME5204581253033605802ID5919TOKO KOPI 5405 JAYA6013JAKARTA PUSAT61051011062120708K54-TOKO63042EEC";
    const DYNAMIC_15000: &str = "00020101021126630016ID.CO.SHOPEE.WWW0118936009151234567890021054031234560303UME51440014ID.CO.QRIS.WWW0215ID10200000123450303UME5204581253033605405150005802ID5919TOKO KOPI 5405 JAYA6013JAKARTA PUSAT61051011062120708K54-TOKO6304BB2F";

    #[test]
    fn test_parse_static() {
        let parsed = QrisPayload::parse(STATIC_QRIS).expect("Should parse");
        assert_eq!(parsed.pfi, "01");
        assert_eq!(parsed.point_of_initiation, Some(PointOfInitiation::Static));
        assert_eq!(parsed.merchant_category_code.as_deref(), Some("5812"));
        assert_eq!(parsed.currency_alpha(), Some("IDR"));
        assert_eq!(parsed.transaction_amount, None);
        assert_eq!(parsed.country_code.as_deref(), Some("ID"));
        assert_eq!(parsed.merchant_name.as_deref(), Some("TOKO KOPI 5405 JAYA"));
        assert_eq!(parsed.merchant_city.as_deref(), Some("JAKARTA PUSAT"));
        assert_eq!(parsed.postal_code.as_deref(), Some("10110"));
        assert_eq!(parsed.additional_data.get("07").map(String::as_str), Some("K54-TOKO"));
        assert_eq!(parsed.crc, "2EEC");
        assert_eq!(parsed.acquirers(), vec!["ID.CO.SHOPEE.WWW", "ID.CO.QRIS.WWW"]);
        assert!(!parsed.is_dynamic());
    }

    #[test]
    fn test_parse_dynamic_amount_is_whole_rupiah() {
        let parsed = QrisPayload::parse(DYNAMIC_15000).unwrap();
        assert_eq!(parsed.transaction_amount, Some(15000));
        assert!(parsed.is_dynamic());
    }

    #[test]
    fn test_verify_checksum() {
        assert!(verify_checksum(STATIC_QRIS).is_ok());
        assert!(verify_checksum(&STATIC_QRIS.replace("63042EEC", "63042eec")).is_ok());

        let err = verify_checksum(&STATIC_QRIS.replace("63042EEC", "6304D113")).unwrap_err();
        assert_eq!(
            err,
            QrisError::ChecksumMismatch {
                expected: "2EEC".to_string(),
                actual: "D113".to_string()
            }
        );
    }

    #[test]
    fn test_missing_crc_field() {
        let err = verify_checksum("0002010102115802ID").unwrap_err();
        assert!(matches!(err, QrisError::MalformedPayload(_)));
    }
}
