//! Third-party barcode information
//!
//! Used to prefill a new item's name, specs, cost and link from a scanned
//! retail barcode. The service needs an app code credential, sent as an
//! `Authorization: APPCODE <code>` header.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use stockscan_core::{BarcodeInfo, CatalogError};

const SERVICE_NAME: &str = "barcode lookup";

/// Product information keyed by retail barcode.
#[async_trait]
pub trait BarcodeInfoService: Send + Sync {
    /// Fetch details for `barcode` using `app_code` as the credential
    async fn fetch(&self, barcode: &str, app_code: &str) -> Result<BarcodeInfo, CatalogError>;
}

/// ShowAPI barcode service client.
#[derive(Debug, Clone)]
pub struct ShowApiBarcodeInfo {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl ShowApiBarcodeInfo {
    /// Create a client for `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Connection {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// The service URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BarcodeInfoService for ShowApiBarcodeInfo {
    async fn fetch(&self, barcode: &str, app_code: &str) -> Result<BarcodeInfo, CatalogError> {
        let app_code = app_code.trim();
        if app_code.is_empty() {
            return Err(CatalogError::CredentialMissing {
                service: SERVICE_NAME.to_string(),
            });
        }

        tracing::debug!("Fetching barcode info for {}", barcode);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("code", barcode)])
            .header("Authorization", format!("APPCODE {}", app_code))
            .send()
            .await
            .map_err(|e| crate::http::map_transport_error(&e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| crate::http::map_transport_error(&e, self.timeout))?;
        crate::http::check_status(status, &body, &format!("barcode {}", barcode))?;
        parse_showapi(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ShowApiEnvelope {
    showapi_res_code: i64,
    #[serde(default)]
    showapi_res_error: Option<String>,
    #[serde(default)]
    showapi_res_body: Option<ShowApiBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShowApiBody {
    #[serde(default)]
    goods_name: Option<String>,
    #[serde(default)]
    spec: Option<String>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    img: Option<String>,
}

/// Parse a ShowAPI reply body
///
/// A price of "0.0" (or anything unparsable) means no price.
pub fn parse_showapi(body: &str) -> Result<BarcodeInfo, CatalogError> {
    let envelope: ShowApiEnvelope =
        serde_json::from_str(body).map_err(|e| CatalogError::Decode {
            reason: e.to_string(),
        })?;

    if envelope.showapi_res_code != 0 {
        return Err(CatalogError::Rejected {
            message: envelope
                .showapi_res_error
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    let body = envelope.showapi_res_body.unwrap_or_default();
    let price = match body.price {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|p| *p > 0.0);

    Ok(BarcodeInfo {
        name: body.goods_name.unwrap_or_default().trim().to_string(),
        specs: body.spec.unwrap_or_default().trim().to_string(),
        price,
        image_url: body.img.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    })
}
