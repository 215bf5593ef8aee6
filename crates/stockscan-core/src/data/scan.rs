//! Scan values, targets and the barcode-shape rule.

use crate::constants::{BARCODE_LENGTH, BARCODE_PREFIX};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// A decoded barcode or QR payload.
///
/// Always non-empty with surrounding whitespace removed. Equality is exact
/// string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScanValue(String);

impl ScanValue {
    /// Build a scan value, rejecting blank input.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyScan);
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// The value as text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this value has the catalog barcode shape
    pub fn is_barcode(&self) -> bool {
        is_barcode_shaped(&self.0)
    }

    /// Pick the lookup key for this value.
    pub fn lookup_key(&self) -> LookupKey {
        LookupKey::classify(&self.0)
    }

    /// Consume into the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ScanValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScanValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ScanValue {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ScanValue {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScanValue> for String {
    fn from(value: ScanValue) -> Self {
        value.0
    }
}

/// Logical input the next scanned value populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanTarget {
    /// The field that identifies the item (code or search box).
    #[default]
    Primary,
    /// The follow-up field (location or barcode, depending on the screen).
    Secondary,
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// How an item is addressed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum LookupKey {
    /// Internal item code
    Code(String),
    /// Catalog barcode (13 digits starting with 69)
    Barcode(String),
}

impl LookupKey {
    /// Choose the key kind from the value's shape.
    pub fn classify(value: &str) -> Self {
        let value = value.trim();
        if is_barcode_shaped(value) {
            LookupKey::Barcode(value.to_string())
        } else {
            LookupKey::Code(value.to_string())
        }
    }

    /// The raw key text
    pub fn value(&self) -> &str {
        match self {
            LookupKey::Code(v) | LookupKey::Barcode(v) => v,
        }
    }

    /// True for barcode keys
    pub fn is_barcode(&self) -> bool {
        matches!(self, LookupKey::Barcode(_))
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupKey::Code(v) => write!(f, "code {}", v),
            LookupKey::Barcode(v) => write!(f, "barcode {}", v),
        }
    }
}

/// Exactly 13 ASCII digits starting with "69".
pub fn is_barcode_shaped(value: &str) -> bool {
    value.len() == BARCODE_LENGTH
        && value.starts_with(BARCODE_PREFIX)
        && value.bytes().all(|b| b.is_ascii_digit())
}

/// Turn barcodes that came back in floating-point notation into plain digits.
///
/// Some catalog rows store barcodes as numbers, so they arrive as
/// `"6912345678905.0"` or `"6.912345678905E12"`. Anything that is not a
/// whole number is returned trimmed but otherwise untouched.
pub fn normalize_barcode(raw: &str) -> String {
    let raw = raw.trim();
    if !raw.contains(&['.', 'e', 'E'][..]) {
        return raw.to_string();
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n < 9.0e15 => {
            format!("{}", n as u64)
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scan_value_trims_and_rejects_blank() {
        assert_eq!(ScanValue::new("  P100 \n").unwrap().as_str(), "P100");
        assert_eq!(ScanValue::new("   "), Err(ValidationError::EmptyScan));
        assert_eq!(ScanValue::new(""), Err(ValidationError::EmptyScan));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            LookupKey::classify("6912345678905"),
            LookupKey::Barcode("6912345678905".into())
        );
        assert_eq!(LookupKey::classify("ABC123"), LookupKey::Code("ABC123".into()));
        // Right length, wrong prefix
        assert_eq!(
            LookupKey::classify("7012345678905"),
            LookupKey::Code("7012345678905".into())
        );
        // Right prefix, one digit short
        assert!(!is_barcode_shaped("691234567890"));
        assert!(!is_barcode_shaped("69123456789a5"));
    }

    #[test]
    fn test_normalize_barcode() {
        assert_eq!(normalize_barcode("6912345678905.0"), "6912345678905");
        assert_eq!(normalize_barcode("6.912345678905E12"), "6912345678905");
        assert_eq!(normalize_barcode(" 6912345678905 "), "6912345678905");
        assert_eq!(normalize_barcode("A-12.5"), "A-12.5");
        assert_eq!(normalize_barcode("12.5"), "12.5");
    }

    #[test]
    fn test_scan_value_serde_is_plain_string() {
        let v = ScanValue::new("P100").unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"P100\"");
        assert!(serde_json::from_str::<ScanValue>("\"  \"").is_err());
    }

    proptest! {
        #[test]
        fn prop_69_prefixed_13_digits_are_barcodes(rest in "[0-9]{11}") {
            let value = format!("69{}", rest);
            prop_assert!(is_barcode_shaped(&value));
            prop_assert!(LookupKey::classify(&value).is_barcode());
        }

        #[test]
        fn prop_other_lengths_are_codes(digits in "69[0-9]{0,10}|69[0-9]{12,20}") {
            prop_assert!(!LookupKey::classify(&digits).is_barcode());
        }

        #[test]
        fn prop_non_digit_payloads_are_codes(value in "69[0-9]{5}[A-Za-z-][0-9]{5}") {
            prop_assert_eq!(value.len(), 13);
            prop_assert!(!is_barcode_shaped(&value));
        }

        #[test]
        fn prop_other_prefixes_are_codes(first in "[0-57-9]", rest in "[0-9]{12}") {
            let value = format!("{}{}", first, rest);
            prop_assert!(!is_barcode_shaped(&value));
        }
    }
}
