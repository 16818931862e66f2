//! EMV MPM TLV tokenizer
//!
//! Every field is `tag (2 digits) + length (2 digits) + value`. Tags 26-51
//! and 62 carry nested TLV in their value, parsed with the same reader.

use thiserror::Error;

/// Tokenizer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlvError {
    #[error("Truncated field header at offset {0}")]
    TruncatedHeader(usize),
    #[error("Invalid tag at offset {0}")]
    InvalidTag(usize),
    #[error("Invalid length at offset {0}")]
    InvalidLength(usize),
    #[error("Field at offset {offset} declares {declared} bytes, only {available} left")]
    TruncatedValue {
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("Value too long for a 2-digit length: {0} bytes")]
    ValueTooLong(usize),
}

/// One top-level field, borrowed from the payload it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvField<'a> {
    pub tag: &'a str,
    pub value: &'a str,
    /// Byte offset of the tag within the scanned string.
    pub offset: usize,
}

impl<'a> TlvField<'a> {
    /// Length of the whole field, header included.
    pub fn encoded_len(&self) -> usize {
        4 + self.value.len()
    }

    /// Offset of the first byte after this field.
    pub fn end(&self) -> usize {
        self.offset + self.encoded_len()
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Numeric tag id, always 0..=99 for a field produced by the reader.
    pub fn id(&self) -> u8 {
        self.tag.bytes().fold(0, |acc, b| acc * 10 + (b - b'0'))
    }

    /// Parse the value as nested TLV (templates 26-51, 62).
    pub fn children(&self) -> Result<Vec<TlvField<'a>>, TlvError> {
        read_fields(self.value)
    }
}

/// Reads TLV fields from an ASCII payload.
pub struct TlvReader<'a> {
    data: &'a str,
    offset: usize,
    failed: bool,
}

impl<'a> TlvReader<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    fn read_field(&mut self) -> Result<TlvField<'a>, TlvError> {
        let start = self.offset;
        let bytes = self.data.as_bytes();

        if bytes.len() - start < 4 {
            return Err(TlvError::TruncatedHeader(start));
        }
        if !bytes[start..start + 2].iter().all(u8::is_ascii_digit) {
            return Err(TlvError::InvalidTag(start));
        }
        let header = &bytes[start + 2..start + 4];
        if !header.iter().all(u8::is_ascii_digit) {
            return Err(TlvError::InvalidLength(start));
        }
        let declared = ((header[0] - b'0') * 10 + (header[1] - b'0')) as usize;

        let value_start = start + 4;
        let available = bytes.len() - value_start;
        if declared > available {
            return Err(TlvError::TruncatedValue {
                offset: start,
                declared,
                available,
            });
        }

        // Non-ASCII content can split a char; treat it like a truncated value.
        let value = self
            .data
            .get(value_start..value_start + declared)
            .ok_or(TlvError::TruncatedValue {
                offset: start,
                declared,
                available,
            })?;

        self.offset = value_start + declared;
        Ok(TlvField {
            tag: &self.data[start..start + 2],
            value,
            offset: start,
        })
    }
}

impl<'a> Iterator for TlvReader<'a> {
    type Item = Result<TlvField<'a>, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let field = self.read_field();
        if field.is_err() {
            self.failed = true;
        }
        Some(field)
    }
}

/// Tokenize the whole string. Fails unless every byte belongs to a field.
pub fn read_fields(data: &str) -> Result<Vec<TlvField<'_>>, TlvError> {
    TlvReader::new(data).collect()
}

/// Build `tag + LL + value`.
pub fn encode_field(tag: &str, value: &str) -> Result<String, TlvError> {
    if tag.len() != 2 || !tag.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TlvError::InvalidTag(0));
    }
    if value.len() > 99 {
        return Err(TlvError::ValueTooLong(value.len()));
    }
    Ok(format!("{}{:02}{}", tag, value.len(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_top_level_fields() {
        let fields = read_fields("0002015802ID5903ABC").unwrap();
        let tags: Vec<_> = fields.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec!["00", "58", "59"]);
        assert_eq!(fields[1].value, "ID");
        assert_eq!(fields[1].offset, 6);
        assert_eq!(fields[1].end(), 12);
        assert_eq!(fields[2].id(), 59);
    }

    #[test]
    fn test_empty_input() {
        assert!(read_fields("").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_value() {
        let err = read_fields("000201590910CHAR").unwrap_err();
        assert_eq!(
            err,
            TlvError::TruncatedValue {
                offset: 6,
                declared: 9,
                available: 6
            }
        );
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(read_fields("00020158").unwrap_err(), TlvError::TruncatedHeader(6));
    }

    #[test]
    fn test_non_digit_length() {
        assert_eq!(read_fields("00020158AB").unwrap_err(), TlvError::InvalidLength(6));
        assert_eq!(read_fields("000201X802ID").unwrap_err(), TlvError::InvalidTag(6));
    }

    #[test]
    fn test_reader_stops_after_error() {
        let mut reader = TlvReader::new("0002015X");
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_nested_template() {
        let fields = read_fields("26300016ID.CO.SHOPEE.WWW0206123456").unwrap();
        let children = fields[0].children().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].value, "ID.CO.SHOPEE.WWW");
        assert_eq!(children[1].tag, "02");
    }

    #[test]
    fn test_encode_field() {
        assert_eq!(encode_field("54", "15000").unwrap(), "540515000");
        assert_eq!(encode_field("59", "").unwrap(), "5900");
        assert_eq!(encode_field("5", "x"), Err(TlvError::InvalidTag(0)));
        assert_eq!(
            encode_field("62", &"A".repeat(100)),
            Err(TlvError::ValueTooLong(100))
        );
    }
}
