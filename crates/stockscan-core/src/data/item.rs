//! Catalog item snapshots.

use serde::{Deserialize, Serialize};

/// What a catalog lookup returned.
///
/// Coordinators copy what they need out of this; it is never shared
/// mutably.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LookupResult {
    /// Whether the item exists in the catalog.
    pub found: bool,
    /// Internal item code.
    pub code: String,
    /// Registered barcode, if any.
    pub barcode: Option<String>,
    /// Display name.
    pub name: String,
    /// Free-form specification text.
    pub specs: String,
    /// Units currently held.
    pub quantity: i64,
    /// Storage location code.
    pub location: Option<String>,
    /// Unit cost.
    pub cost: Option<f64>,
}

impl LookupResult {
    /// A result meaning "no such item"
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Whether the item holds any stock
    pub fn in_stock(&self) -> bool {
        self.found && self.quantity > 0
    }

    /// Location, if one is set and not blank
    pub fn known_location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// A catalog entry to be created.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewItem {
    /// Internal item code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Specification text.
    pub specs: String,
    /// Opening stock.
    pub stock: Option<i64>,
    /// Storage location code.
    pub location: Option<String>,
    /// Unit cost.
    pub cost: Option<f64>,
    /// Product page link.
    pub link: Option<String>,
    /// Barcode to register with the item.
    pub barcode: Option<String>,
}

/// Product details from the third-party barcode information service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BarcodeInfo {
    /// Product name.
    pub name: String,
    /// Specification text.
    pub specs: String,
    /// Suggested price.
    pub price: Option<f64>,
    /// Product image URL.
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_empty() {
        let r = LookupResult::not_found();
        assert!(!r.found);
        assert!(!r.in_stock());
        assert_eq!(r.known_location(), None);
    }

    #[test]
    fn test_known_location_ignores_blank() {
        let mut r = LookupResult {
            found: true,
            quantity: 3,
            location: Some("  ".into()),
            ..Default::default()
        };
        assert!(r.in_stock());
        assert_eq!(r.known_location(), None);

        r.location = Some(" A-12 ".into());
        assert_eq!(r.known_location(), Some("A-12"));
    }
}
