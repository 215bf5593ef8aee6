//! Catalog wire types
//!
//! JSON bodies exchanged with the catalog server. Field names follow the
//! server's schema; conversion into the core types happens here so nothing
//! above the HTTP layer sees wire names.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use stockscan_core::{normalize_barcode, LookupKey, LookupResult, NewItem};

/// A product as the server describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDto {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "loose_string")]
    pub code: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specs: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "loose_int")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "location_code")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "loose_string")]
    pub barcode: Option<String>,
}

impl ProductDto {
    /// Convert into a found lookup result
    pub fn into_lookup(self) -> LookupResult {
        LookupResult {
            found: true,
            code: self.code.unwrap_or_default(),
            barcode: self
                .barcode
                .map(|b| normalize_barcode(&b))
                .filter(|b| !b.is_empty()),
            name: self.name,
            specs: self.specs,
            quantity: self.stock.unwrap_or(0),
            location: self.location.filter(|l| !l.trim().is_empty()),
            cost: self.cost,
        }
    }
}

impl From<&NewItem> for ProductDto {
    fn from(item: &NewItem) -> Self {
        fn non_blank(value: &str) -> Option<String> {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }

        Self {
            code: non_blank(&item.code),
            name: item.name.trim().to_string(),
            specs: item.specs.trim().to_string(),
            stock: item.stock,
            location: item.location.as_deref().and_then(non_blank),
            cost: item.cost,
            link: item.link.as_deref().and_then(non_blank),
            barcode: item.barcode.as_deref().and_then(non_blank),
        }
    }
}

/// Body of a product lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductResponse {
    #[serde(default)]
    pub product: Option<ProductDto>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Generic acknowledgement used by the mutating endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiResponse {
    /// Business-level success: the `success` flag when present, otherwise
    /// a `status` of "success" or "ok"
    pub fn is_success(&self) -> bool {
        match (self.success, self.status.as_deref()) {
            (Some(flag), _) => flag,
            (None, Some(status)) => {
                status.eq_ignore_ascii_case("success") || status.eq_ignore_ascii_case("ok")
            }
            (None, None) => false,
        }
    }
}

/// Reply to a barcode registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BarcodeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub product_code: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub barcode: Option<String>,
}

/// Stock receive body.
#[derive(Debug, Clone, Serialize)]
pub struct InStockRequest {
    #[serde(flatten)]
    pub key: KeyField,
    pub quantity: u32,
    #[serde(rename = "location_code", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Stock issue body.
#[derive(Debug, Clone, Serialize)]
pub struct OutStockRequest {
    #[serde(flatten)]
    pub key: KeyField,
    pub quantity: u32,
}

/// Relocation body.
#[derive(Debug, Clone, Serialize)]
pub struct MoveStockRequest {
    #[serde(flatten)]
    pub key: KeyField,
    #[serde(rename = "location_code")]
    pub location: String,
}

/// Barcode registration body.
#[derive(Debug, Clone, Serialize)]
pub struct BarcodeRequest {
    pub code: String,
    pub barcode: String,
}

/// Identifies an item by exactly one of `code` or `barcode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyField {
    Code(String),
    Barcode(String),
}

impl From<&LookupKey> for KeyField {
    fn from(key: &LookupKey) -> Self {
        match key {
            LookupKey::Code(code) => KeyField::Code(code.clone()),
            LookupKey::Barcode(barcode) => KeyField::Barcode(barcode.clone()),
        }
    }
}

/// Accepts a string or a number; numbers in exponent form are expanded back
/// to their digits.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(normalize_barcode(&n.to_string())),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

/// Accepts an integer, a float or a numeric string.
fn loose_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_with_numeric_barcode() {
        let body = r#"{
            "product": {"code": "P100", "name": "Bolt", "specs": "M6",
                        "stock": 5, "location_code": "A-12", "cost": 0.5,
                        "barcode": 6.912345678905E12},
            "success": true
        }"#;
        let response: ProductResponse = serde_json::from_str(body).unwrap();
        let result = response.product.unwrap().into_lookup();
        assert!(result.found);
        assert_eq!(result.code, "P100");
        assert_eq!(result.barcode.as_deref(), Some("6912345678905"));
        assert_eq!(result.quantity, 5);
        assert_eq!(result.known_location(), Some("A-12"));
    }

    #[test]
    fn test_null_product_parses() {
        let response: ProductResponse =
            serde_json::from_str(r#"{"product": null, "success": false}"#).unwrap();
        assert!(response.product.is_none());
        assert_eq!(response.success, Some(false));
    }

    #[test]
    fn test_missing_stock_is_zero() {
        let dto: ProductDto =
            serde_json::from_str(r#"{"code": "P1", "name": "n", "specs": "s", "stock": null}"#)
                .unwrap();
        assert_eq!(dto.into_lookup().quantity, 0);
    }

    #[test]
    fn test_ack_success_rules() {
        let parse = |s: &str| serde_json::from_str::<ApiResponse>(s).unwrap();
        assert!(parse(r#"{"status": "success", "message": "ok"}"#).is_success());
        assert!(parse(r#"{"status": "OK"}"#).is_success());
        assert!(!parse(r#"{"status": "error", "message": "no stock"}"#).is_success());
        assert!(!parse(r#"{"status": "success", "success": false}"#).is_success());
        assert!(!parse("{}").is_success());
    }

    #[test]
    fn test_requests_carry_one_key() {
        let body = serde_json::to_value(InStockRequest {
            key: KeyField::from(&LookupKey::Code("P100".into())),
            quantity: 3,
            location: Some("A-12".into()),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"code": "P100", "quantity": 3, "location_code": "A-12"})
        );

        let body = serde_json::to_value(OutStockRequest {
            key: KeyField::from(&LookupKey::Barcode("6912345678905".into())),
            quantity: 1,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"barcode": "6912345678905", "quantity": 1})
        );
    }

    #[test]
    fn test_new_item_drops_blank_optionals() {
        let item = NewItem {
            code: " ".into(),
            name: "Bolt".into(),
            specs: "M6".into(),
            location: Some("".into()),
            barcode: Some("6912345678905".into()),
            ..Default::default()
        };
        let body = serde_json::to_value(ProductDto::from(&item)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"name": "Bolt", "specs": "M6", "barcode": "6912345678905"})
        );
    }
}
