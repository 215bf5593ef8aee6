//! HTTP client against a canned local server

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use stockscan_catalog::{CatalogService, HttpCatalogClient};
use stockscan_core::{CatalogError, LookupKey, NewItem};
use tokio::net::TcpListener;

/// One request as the server saw it.
#[derive(Debug, Clone)]
struct Seen {
    method: String,
    target: String,
    body: String,
}

impl Seen {
    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

type Route = Arc<dyn Fn(&str, &str) -> (u16, String) + Send + Sync>;

#[derive(Clone)]
struct Canned {
    route: Route,
    seen: Arc<Mutex<Vec<Seen>>>,
}

struct CannedServer {
    base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl CannedServer {
    /// Serve every request with `route(method, path_and_query)`
    async fn start<F>(route: F) -> Self
    where
        F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/", listener.local_addr().unwrap());
        let canned = Canned {
            route: Arc::new(route),
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let seen = canned.seen.clone();

        let app = Router::new().fallback(answer).with_state(canned);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url, seen }
    }

    fn client(&self) -> HttpCatalogClient {
        HttpCatalogClient::new(&self.base_url, Duration::from_secs(5)).unwrap()
    }

    fn last(&self) -> Seen {
        self.seen.lock().last().cloned().expect("a request was made")
    }
}

async fn answer(
    State(canned): State<Canned>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> impl IntoResponse {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let (status, reply) = (canned.route)(method.as_str(), &target);
    canned.seen.lock().push(Seen {
        method: method.to_string(),
        target,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        reply,
    )
}

#[tokio::test]
async fn test_lookup_by_code_maps_product() {
    let server = CannedServer::start(|_, _| {
        (
            200,
            r#"{"success":true,"product":{"code":"P100","name":"Hex bolt","specs":"M3x10",
                "stock":"5","location_code":"A-1","barcode":6912345678905.0}}"#
                .to_string(),
        )
    })
    .await;

    let item = server.client().find_by_code("P100").await.unwrap();
    assert!(item.found);
    assert_eq!(item.code, "P100");
    assert_eq!(item.name, "Hex bolt");
    assert_eq!(item.quantity, 5);
    assert_eq!(item.known_location(), Some("A-1"));
    assert_eq!(item.barcode.as_deref(), Some("6912345678905"));

    let seen = server.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.target, "/api/products?code=P100");
}

#[tokio::test]
async fn test_lookup_by_barcode_404_is_not_found() {
    let server =
        CannedServer::start(|_, _| (404, r#"{"message":"Product not found"}"#.to_string())).await;

    let client = server.client();
    let item = client
        .lookup(&LookupKey::Barcode("6912345678905".into()))
        .await
        .unwrap();
    assert!(!item.found);
    assert_eq!(server.last().target, "/api/products?barcode=6912345678905");
}

#[tokio::test]
async fn test_receive_posts_key_quantity_and_location() {
    let server = CannedServer::start(|_, _| {
        (200, r#"{"status":"success","message":"Stock in done"}"#.to_string())
    })
    .await;

    let message = server
        .client()
        .receive_stock(&LookupKey::Code("P100".into()), 2, Some(" A-12 "))
        .await
        .unwrap();
    assert_eq!(message, "Stock in done");

    let seen = server.last();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.target, "/api/instock");
    assert_eq!(
        seen.json(),
        serde_json::json!({"code": "P100", "quantity": 2, "location_code": "A-12"})
    );
}

#[tokio::test]
async fn test_issue_and_move_bodies() {
    let server =
        CannedServer::start(|_, _| (200, r#"{"success":true}"#.to_string())).await;
    let client = server.client();

    let message = client
        .issue_stock(&LookupKey::Barcode("6912345678905".into()), 1)
        .await
        .unwrap();
    assert_eq!(message, "OK");
    let seen = server.last();
    assert_eq!(seen.target, "/api/outstock");
    assert_eq!(
        seen.json(),
        serde_json::json!({"barcode": "6912345678905", "quantity": 1})
    );

    client
        .move_location(&LookupKey::Code("P200".into()), "B-7")
        .await
        .unwrap();
    let seen = server.last();
    assert_eq!(seen.target, "/api/move-stock");
    assert_eq!(
        seen.json(),
        serde_json::json!({"code": "P200", "location_code": "B-7"})
    );
}

#[tokio::test]
async fn test_create_sends_product_body() {
    let server = CannedServer::start(|_, _| {
        (200, r#"{"success":true,"message":"Product added"}"#.to_string())
    })
    .await;

    let item = NewItem {
        code: "P300".into(),
        name: "Washer".into(),
        specs: "M3".into(),
        stock: Some(40),
        location: Some("C-2".into()),
        cost: None,
        link: Some(String::new()),
        barcode: None,
    };
    assert_eq!(server.client().create(&item).await.unwrap(), "Product added");

    let seen = server.last();
    assert_eq!(seen.target, "/api/add-product");
    let body = seen.json();
    assert_eq!(body["code"], "P300");
    assert_eq!(body["specs"], "M3");
    assert_eq!(body["stock"], 40);
    assert_eq!(body["location_code"], "C-2");
    assert!(body.get("cost").is_none());
    assert!(body.get("link").is_none());
}

#[tokio::test]
async fn test_business_failure_is_rejected() {
    let server = CannedServer::start(|_, _| {
        (200, r#"{"success":false,"message":"Insufficient stock"}"#.to_string())
    })
    .await;

    let err = server
        .client()
        .issue_stock(&LookupKey::Code("P100".into()), 9)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CatalogError::Rejected {
            message: "Insufficient stock".into()
        }
    );
    assert_eq!(err.user_message(), "Insufficient stock");
}

#[tokio::test]
async fn test_status_mapping() {
    let server = CannedServer::start(|_, target| {
        if target.contains("code=SECRET") {
            (401, String::new())
        } else {
            (500, r#"{"error":"database offline"}"#.to_string())
        }
    })
    .await;
    let client = server.client();

    assert_eq!(
        client.find_by_code("SECRET").await.unwrap_err(),
        CatalogError::Unauthorized
    );
    match client.find_by_code("P100").await.unwrap_err() {
        CatalogError::HttpStatus { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database offline");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_register_barcode_and_health() {
    let server = CannedServer::start(|_, target| {
        if target == "/api/health" {
            (200, r#"{"status":"ok","message":"healthy"}"#.to_string())
        } else {
            (
                200,
                r#"{"success":true,"product_code":"P100","barcode":"6912345678905"}"#.to_string(),
            )
        }
    })
    .await;
    let client = server.client();

    let message = client
        .register_barcode("P100", "6912345678905")
        .await
        .unwrap();
    assert_eq!(message, "Barcode 6912345678905 registered");
    let seen = server.last();
    assert_eq!(seen.target, "/api/scan-barcode");
    assert_eq!(
        seen.json(),
        serde_json::json!({"code": "P100", "barcode": "6912345678905"})
    );

    assert_eq!(client.health().await.unwrap(), "healthy");
}

#[tokio::test]
async fn test_base_url_can_be_switched() {
    let first = CannedServer::start(|_, _| (200, r#"{"status":"ok"}"#.to_string())).await;
    let second =
        CannedServer::start(|_, _| (200, r#"{"status":"ok","message":"second"}"#.to_string()))
            .await;

    let client = first.client();
    assert_eq!(client.health().await.unwrap(), "OK");

    client.set_base_url(&second.base_url).unwrap();
    assert_eq!(client.health().await.unwrap(), "second");
    assert!(matches!(
        client.set_base_url("ftp://nowhere"),
        Err(CatalogError::InvalidAddress { .. })
    ));
    assert_eq!(client.base_url(), second.base_url);
}
