//! Catalog service interface
//!
//! Every operation reports failure through [`CatalogError`]: transport
//! problems, non-success HTTP statuses and business-level rejections are all
//! surfaced, never swallowed. A lookup for an item that does not exist is
//! not an error; it returns a [`LookupResult`] with `found == false`.

use async_trait::async_trait;
use stockscan_core::{CatalogError, LookupKey, LookupResult, NewItem};

/// Remote stock catalog operations.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Look an item up by its internal code
    async fn find_by_code(&self, code: &str) -> Result<LookupResult, CatalogError>;

    /// Look an item up by barcode
    async fn find_by_barcode(&self, barcode: &str) -> Result<LookupResult, CatalogError>;

    /// Look an item up by whichever key kind was chosen
    async fn lookup(&self, key: &LookupKey) -> Result<LookupResult, CatalogError> {
        match key {
            LookupKey::Code(code) => self.find_by_code(code).await,
            LookupKey::Barcode(barcode) => self.find_by_barcode(barcode).await,
        }
    }

    /// Create a new item; returns the server's confirmation message
    async fn create(&self, item: &NewItem) -> Result<String, CatalogError>;

    /// Add stock, optionally setting the location for a new item
    async fn receive_stock(
        &self,
        key: &LookupKey,
        quantity: u32,
        location: Option<&str>,
    ) -> Result<String, CatalogError>;

    /// Remove stock
    async fn issue_stock(&self, key: &LookupKey, quantity: u32) -> Result<String, CatalogError>;

    /// Change an item's storage location
    async fn move_location(&self, key: &LookupKey, location: &str)
        -> Result<String, CatalogError>;

    /// Attach a barcode to the item with the given code
    async fn register_barcode(&self, code: &str, barcode: &str) -> Result<String, CatalogError>;

    /// Check the server is reachable and healthy
    async fn health(&self) -> Result<String, CatalogError>;
}
