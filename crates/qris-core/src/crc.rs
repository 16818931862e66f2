//! CRC16 engine for the QRIS checksum field (tag 63)
//!
//! QRIS uses CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF, not reflected and
//! no final XOR. The XOR-out variant produces plausible looking checksums that
//! every banking app rejects, so it only exists here for the variant probe.

use serde::{Deserialize, Serialize};

const POLY_CCITT: u16 = 0x1021;
const POLY_CCITT_REFLECTED: u16 = 0x8408;
const POLY_MODBUS_REFLECTED: u16 = 0xA001;

/// Compute the QRIS checksum of `data` as 4 uppercase hex digits.
///
/// The caller passes everything the checksum covers, including the `"6304"`
/// header of the CRC field itself.
pub fn compute_checksum(data: &str) -> String {
    format!("{:04X}", crc16_ccitt_false(data.as_bytes()))
}

/// CRC-16/CCITT-FALSE over raw bytes.
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLY_CCITT;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// CRC16 variants seen in the wild when checking issuer payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crc16Variant {
    /// poly 0x1021, init 0xFFFF, no XOR out. The QRIS variant.
    CcittFalse,
    /// Same as `CcittFalse` but XORed with 0xFFFF at the end.
    CcittXorOut,
    /// Reflected 0x1021 (0x8408), init 0xFFFF, XOR out 0xFFFF.
    X25,
    /// Reflected 0x8005 (0xA001), init 0xFFFF.
    Modbus,
    /// poly 0x1021, init 0x0000.
    Xmodem,
}

impl Crc16Variant {
    pub const ALL: [Crc16Variant; 5] = [
        Crc16Variant::CcittFalse,
        Crc16Variant::CcittXorOut,
        Crc16Variant::X25,
        Crc16Variant::Modbus,
        Crc16Variant::Xmodem,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Crc16Variant::CcittFalse => "CRC-16/CCITT-FALSE",
            Crc16Variant::CcittXorOut => "CRC-16/CCITT (xor out)",
            Crc16Variant::X25 => "CRC-16/X-25",
            Crc16Variant::Modbus => "CRC-16/MODBUS",
            Crc16Variant::Xmodem => "CRC-16/XMODEM",
        }
    }

    pub fn checksum(&self, data: &[u8]) -> u16 {
        match self {
            Crc16Variant::CcittFalse => crc16_ccitt_false(data),
            Crc16Variant::CcittXorOut => crc16_ccitt_false(data) ^ 0xFFFF,
            Crc16Variant::X25 => reflected(data, POLY_CCITT_REFLECTED, 0xFFFF) ^ 0xFFFF,
            Crc16Variant::Modbus => reflected(data, POLY_MODBUS_REFLECTED, 0xFFFF),
            Crc16Variant::Xmodem => forward(data, POLY_CCITT, 0x0000),
        }
    }

    pub fn checksum_hex(&self, data: &[u8]) -> String {
        format!("{:04X}", self.checksum(data))
    }
}

fn forward(data: &[u8], poly: u16, init: u16) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ poly } else { crc << 1 };
        }
    }
    crc
}

fn reflected(data: &[u8], poly: u16, init: u16) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 0x0001 != 0 { (crc >> 1) ^ poly } else { crc >> 1 };
        }
    }
    crc
}

/// Result of checking one variant against a payload's trailing checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMatch {
    pub variant: Crc16Variant,
    pub computed: String,
    pub matches: bool,
}

/// Recompute the trailing checksum of `payload` with every known variant.
///
/// The checksum window is everything but the last 4 characters. Returns an
/// empty list when the payload is too short or not ASCII.
pub fn probe_variants(payload: &str) -> Vec<VariantMatch> {
    if payload.len() < 8 || !payload.is_ascii() {
        return Vec::new();
    }
    let (data, provided) = payload.split_at(payload.len() - 4);
    let provided = provided.to_ascii_uppercase();

    Crc16Variant::ALL
        .iter()
        .map(|variant| {
            let computed = variant.checksum_hex(data.as_bytes());
            let matches = computed == provided;
            log::debug!("{}: computed {} (provided {})", variant.name(), computed, provided);
            VariantMatch {
                variant: *variant,
                computed,
                matches,
            }
        })
        .collect()
}
