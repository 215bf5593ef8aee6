//! HTTP catalog client
//!
//! [`HttpCatalogClient`] speaks the catalog server's JSON API over reqwest.
//! Response handling is split into pure functions ([`interpret_lookup`],
//! [`interpret_ack`], [`interpret_barcode`]) that take a status and a body,
//! so the rules can be tested without a server.

use crate::client::CatalogService;
use crate::model::{
    ApiResponse, BarcodeRequest, BarcodeResponse, InStockRequest, KeyField, MoveStockRequest,
    OutStockRequest, ProductDto, ProductResponse,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use stockscan_core::{CatalogError, LookupKey, LookupResult, NewItem};
use stockscan_settings::{validate_server_address, ServerSettings};

/// Catalog client backed by an HTTP server.
pub struct HttpCatalogClient {
    client: Client,
    base_url: RwLock<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalogClient")
            .field("base_url", &*self.base_url.read())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpCatalogClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        validate_address(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Connection {
                reason: e.to_string(),
            })?;

        tracing::info!("Catalog client created for {}", base_url);

        Ok(Self {
            client,
            base_url: RwLock::new(base_url.trim().to_string()),
            timeout,
        })
    }

    /// Create a client from the server section of the configuration
    pub fn from_settings(server: &ServerSettings) -> Result<Self, CatalogError> {
        Self::new(&server.address, Duration::from_millis(server.timeout_ms))
    }

    /// Point later requests at a different server
    pub fn set_base_url(&self, base_url: &str) -> Result<(), CatalogError> {
        validate_address(base_url)?;
        *self.base_url.write() = base_url.trim().to_string();
        tracing::info!("Catalog server changed to {}", base_url);
        Ok(())
    }

    /// The server requests go to
    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.read(), path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), CatalogError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        tracing::debug!("Catalog answered {} ({} bytes)", status, body.len());
        Ok((status, body))
    }

    async fn find(&self, field: &str, value: &str) -> Result<LookupResult, CatalogError> {
        tracing::debug!("Looking up {}={}", field, value);
        let request = self
            .client
            .get(self.url("api/products"))
            .query(&[(field, value)]);
        let (status, body) = self.send(request).await?;
        interpret_lookup(status, &body)
    }

    async fn post_ack<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        what: &str,
    ) -> Result<String, CatalogError> {
        let request = self.client.post(self.url(path)).json(body);
        let (status, text) = self.send(request).await?;
        interpret_ack(status, &text, what)
    }

    fn transport_error(&self, e: reqwest::Error) -> CatalogError {
        let err = map_transport_error(&e, self.timeout);
        tracing::warn!("Catalog request failed: {}", err);
        err
    }
}

#[async_trait]
impl CatalogService for HttpCatalogClient {
    async fn find_by_code(&self, code: &str) -> Result<LookupResult, CatalogError> {
        self.find("code", code).await
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<LookupResult, CatalogError> {
        self.find("barcode", barcode).await
    }

    async fn create(&self, item: &NewItem) -> Result<String, CatalogError> {
        let body = ProductDto::from(item);
        self.post_ack("api/add-product", &body, &format!("item {}", item.name))
            .await
    }

    async fn receive_stock(
        &self,
        key: &LookupKey,
        quantity: u32,
        location: Option<&str>,
    ) -> Result<String, CatalogError> {
        let body = InStockRequest {
            key: KeyField::from(key),
            quantity,
            location: location
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        };
        self.post_ack("api/instock", &body, &key.to_string()).await
    }

    async fn issue_stock(&self, key: &LookupKey, quantity: u32) -> Result<String, CatalogError> {
        let body = OutStockRequest {
            key: KeyField::from(key),
            quantity,
        };
        self.post_ack("api/outstock", &body, &key.to_string()).await
    }

    async fn move_location(
        &self,
        key: &LookupKey,
        location: &str,
    ) -> Result<String, CatalogError> {
        let body = MoveStockRequest {
            key: KeyField::from(key),
            location: location.trim().to_string(),
        };
        self.post_ack("api/move-stock", &body, &key.to_string()).await
    }

    async fn register_barcode(&self, code: &str, barcode: &str) -> Result<String, CatalogError> {
        let body = BarcodeRequest {
            code: code.to_string(),
            barcode: barcode.to_string(),
        };
        let request = self.client.post(self.url("api/scan-barcode")).json(&body);
        let (status, text) = self.send(request).await?;
        interpret_barcode(status, &text, &format!("code {}", code))
    }

    async fn health(&self) -> Result<String, CatalogError> {
        let request = self.client.get(self.url("api/health"));
        let (status, text) = self.send(request).await?;
        interpret_ack(status, &text, "health endpoint")
    }
}

fn validate_address(address: &str) -> Result<(), CatalogError> {
    validate_server_address(address.trim()).map_err(|_| CatalogError::InvalidAddress {
        address: address.to_string(),
    })
}

/// Classify a reqwest failure
pub fn map_transport_error(e: &reqwest::Error, timeout: Duration) -> CatalogError {
    if e.is_timeout() {
        return CatalogError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        };
    }
    if e.is_builder() {
        return CatalogError::InvalidAddress {
            address: e.url().map(|u| u.to_string()).unwrap_or_default(),
        };
    }
    if e.is_decode() || e.is_body() {
        return CatalogError::Decode {
            reason: e.to_string(),
        };
    }
    if e.is_connect() && is_dns_failure(e) {
        return CatalogError::UnknownHost {
            host: e
                .url()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default(),
        };
    }
    CatalogError::Connection {
        reason: e.to_string(),
    }
}

fn is_dns_failure(e: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = source {
        let text = err.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        source = err.source();
    }
    false
}

/// Map a non-success status to an error, `what` naming the subject
pub fn check_status(status: StatusCode, body: &str, what: &str) -> Result<(), CatalogError> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status {
        StatusCode::NOT_FOUND => CatalogError::NotFound {
            what: what.to_string(),
        },
        StatusCode::UNAUTHORIZED => CatalogError::Unauthorized,
        other => CatalogError::HttpStatus {
            status: other.as_u16(),
            message: error_message(body)
                .or_else(|| other.canonical_reason().map(str::to_string))
                .unwrap_or_default(),
        },
    })
}

/// Interpret a product lookup reply
///
/// A 404, a `null` product or `success: false` all mean the item does not
/// exist.
pub fn interpret_lookup(status: StatusCode, body: &str) -> Result<LookupResult, CatalogError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(LookupResult::not_found());
    }
    check_status(status, body, "item")?;

    let response: ProductResponse = parse(body)?;
    match response.product {
        Some(product) if response.success != Some(false) => Ok(product.into_lookup()),
        _ => Ok(LookupResult::not_found()),
    }
}

/// Interpret the acknowledgement of a mutating request
pub fn interpret_ack(status: StatusCode, body: &str, what: &str) -> Result<String, CatalogError> {
    check_status(status, body, what)?;
    let response: ApiResponse = parse(body)?;
    let message = response.message.clone().unwrap_or_default();
    if response.is_success() {
        Ok(if message.is_empty() {
            "OK".to_string()
        } else {
            message
        })
    } else {
        Err(CatalogError::Rejected {
            message: if message.is_empty() {
                "Request was rejected".to_string()
            } else {
                message
            },
        })
    }
}

/// Interpret a barcode registration reply
pub fn interpret_barcode(
    status: StatusCode,
    body: &str,
    what: &str,
) -> Result<String, CatalogError> {
    check_status(status, body, what)?;
    let response: BarcodeResponse = parse(body)?;
    let message = response.message.unwrap_or_default();
    if response.success {
        Ok(if message.is_empty() {
            format!(
                "Barcode {} registered",
                response.barcode.unwrap_or_default()
            )
        } else {
            message
        })
    } else {
        Err(CatalogError::Rejected {
            message: if message.is_empty() {
                "Barcode was not registered".to_string()
            } else {
                message
            },
        })
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, CatalogError> {
    serde_json::from_str(body).map_err(|e| CatalogError::Decode {
        reason: e.to_string(),
    })
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|m| m.as_str()))
        .map(str::to_string)
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty() && text.len() < 200).then(|| text.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_found() {
        let body = r#"{"product": {"code": "P100", "name": "Bolt", "specs": "M6",
                       "stock": 4, "location_code": "A-12"}, "success": true}"#;
        let result = interpret_lookup(StatusCode::OK, body).unwrap();
        assert!(result.found);
        assert_eq!(result.code, "P100");
        assert_eq!(result.quantity, 4);
    }

    #[test]
    fn test_lookup_not_found_forms() {
        assert!(!interpret_lookup(StatusCode::NOT_FOUND, "").unwrap().found);
        assert!(
            !interpret_lookup(StatusCode::OK, r#"{"product": null, "success": false}"#)
                .unwrap()
                .found
        );
        assert!(
            !interpret_lookup(
                StatusCode::OK,
                r#"{"product": {"code": "P1", "name": "", "specs": ""}, "success": false}"#
            )
            .unwrap()
            .found
        );
    }

    #[test]
    fn test_lookup_server_error_surfaces() {
        let err = interpret_lookup(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message": "db down"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::HttpStatus {
                status: 500,
                message: "db down".into()
            }
        );
        assert!(matches!(
            interpret_lookup(StatusCode::OK, "<html>"),
            Err(CatalogError::Decode { .. })
        ));
    }

    #[test]
    fn test_ack_statuses() {
        assert_eq!(
            interpret_ack(StatusCode::OK, r#"{"status": "success", "message": "Stock added"}"#, "x")
                .unwrap(),
            "Stock added"
        );
        assert_eq!(
            interpret_ack(StatusCode::OK, r#"{"status": "error", "message": "Insufficient stock"}"#, "x"),
            Err(CatalogError::Rejected {
                message: "Insufficient stock".into()
            })
        );
        assert_eq!(
            interpret_ack(StatusCode::NOT_FOUND, "", "code P9"),
            Err(CatalogError::NotFound {
                what: "code P9".into()
            })
        );
        assert_eq!(
            interpret_ack(StatusCode::UNAUTHORIZED, "", "x"),
            Err(CatalogError::Unauthorized)
        );
    }

    #[test]
    fn test_ack_plain_text_error_body() {
        let err = interpret_ack(StatusCode::BAD_REQUEST, "bad quantity", "x").unwrap_err();
        // Not JSON, so the reason phrase is used
        assert_eq!(
            err,
            CatalogError::HttpStatus {
                status: 400,
                message: "Bad Request".into()
            }
        );
    }

    #[test]
    fn test_barcode_registration() {
        let ok = r#"{"success": true, "message": "Barcode added",
                     "product_code": "P100", "barcode": 6912345678905}"#;
        assert_eq!(
            interpret_barcode(StatusCode::OK, ok, "code P100").unwrap(),
            "Barcode added"
        );

        let taken = r#"{"success": false, "message": "Barcode already in use",
                        "product_code": "P100", "barcode": "6912345678905"}"#;
        assert_eq!(
            interpret_barcode(StatusCode::OK, taken, "code P100"),
            Err(CatalogError::Rejected {
                message: "Barcode already in use".into()
            })
        );
    }

    #[test]
    fn test_address_validation() {
        assert!(HttpCatalogClient::new("http://10.0.2.2:5000/", Duration::from_secs(1)).is_ok());
        assert!(matches!(
            HttpCatalogClient::new("10.0.2.2:5000", Duration::from_secs(1)),
            Err(CatalogError::InvalidAddress { .. })
        ));

        let client = HttpCatalogClient::new("http://a.local/", Duration::from_secs(1)).unwrap();
        assert!(client.set_base_url("ftp://b.local/").is_err());
        assert_eq!(client.base_url(), "http://a.local/");
        client.set_base_url("https://b.local/").unwrap();
        assert_eq!(client.url("/api/health"), "https://b.local/api/health");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 on localhost is closed on test machines
        let client = HttpCatalogClient::new("http://127.0.0.1:9/", Duration::from_secs(2)).unwrap();
        let err = client.find_by_code("P100").await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {:?}", err);
    }
}
