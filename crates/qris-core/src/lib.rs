//! QRIS Core - динамические QRIS-коды
//!
//! Библиотека превращает статический QRIS мерчанта (EMVCo MPM) в
//! динамический с конкретной суммой транзакции:
//! - Разбор TLV без построения полной структуры
//! - Удаление старого и вставка нового поля суммы (тег 54) перед тегом 58/59
//! - Пересчёт контрольной суммы CRC-16/CCITT-FALSE (тег 63)
//! - Структурный разбор и проверка контрольной суммы
//! - Отрисовка QR (feature `render`)
//!
//! Все функции чистые и синхронные, без общего состояния.

pub mod amount;
pub mod crc;
pub mod dynamic;
pub mod inspect;
pub mod locate;
pub mod payload;
#[cfg(feature = "render")]
pub mod render;
pub mod tlv;

pub use amount::{format_rupiah, Amount, MAX_AMOUNT};
pub use crc::{compute_checksum, crc16_ccitt_false, probe_variants, Crc16Variant, VariantMatch};
pub use dynamic::{generate_dynamic_payload, DynamicQris, GeneratorConfig};
pub use inspect::{compare_checksums, extract_amount, is_valid_payload, ChecksumComparison};
pub use locate::{find_anchor, strip_amount_field, Anchor, AnchorKind};
pub use payload::{verify_checksum, PointOfInitiation, QrisPayload};
#[cfg(feature = "render")]
pub use render::{render, RenderFormat, RenderOptions};
pub use tlv::{TlvError, TlvField, TlvReader};

use thiserror::Error;

/// Ошибки кодека. Все детерминированы входными данными, повтор не поможет.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QrisError {
    #[error("Invalid QRIS payload format: {0}")]
    InvalidPayloadFormat(String),

    #[error("Invalid amount {0}: must be between 1 and 999,999,999")]
    InvalidAmount(i64),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid CRC: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Internal codec error: {0}")]
    Internal(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl From<TlvError> for QrisError {
    fn from(e: TlvError) -> Self {
        QrisError::MalformedPayload(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tlv_error_maps_to_malformed() {
        let err: QrisError = TlvError::TruncatedHeader(4).into();
        assert_eq!(
            err,
            QrisError::MalformedPayload("Truncated field header at offset 4".to_string())
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            QrisError::InvalidAmount(0).to_string(),
            "Invalid amount 0: must be between 1 and 999,999,999"
        );
    }
}
