use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use assert_matches::assert_matches;

use seatable_catalog::domain::Session;
use seatable_catalog::error::CatalogError;
use seatable_catalog::seatable::{ROWS_PAGE_LIMIT, SeatableClient, SeatableHttpClient};

type Handler = Arc<dyn Fn(&str) -> (u16, String) + Send + Sync>;

/// Minimal HTTP/1.1 server: one response per connection, request heads are
/// recorded lowercased.
struct TestServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    fn start(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|window| window == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(read) => head.extend_from_slice(&buf[..read]),
                    }
                }
                let head = String::from_utf8_lossy(&head).to_string();
                let target = head
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                recorded.lock().unwrap().push(head.to_lowercase());

                let (status, body) = handler(&target);
                let reason = if status < 400 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self { base_url, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn session() -> Session {
    Session {
        access_token: "short-lived".to_string(),
        base_id: "uuid-1".to_string(),
    }
}

#[test]
fn authenticate_presents_api_token() {
    let server = TestServer::start(Arc::new(|_target: &str| {
        (
            200,
            r#"{"app_name":"catalog","access_token":"short-lived","dtable_uuid":"uuid-1","dtable_server":"x"}"#
                .to_string(),
        )
    }));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    let session = client.authenticate().unwrap();

    assert_eq!(session.access_token, "short-lived");
    assert_eq!(session.base_id, "uuid-1");
    let requests = server.requests();
    assert!(requests[0].starts_with("get /api/v2.1/dtable/app-access-token/ "));
    assert!(requests[0].contains("authorization: token api-secret"));
    assert!(requests[0].contains("user-agent: seatable-catalog/"));
}

#[test]
fn rejected_token_is_an_auth_error() {
    let server =
        TestServer::start(Arc::new(|_target: &str| (403, r#"{"detail":"bad token"}"#.to_string())));
    let client = SeatableHttpClient::new(&server.base_url, "wrong").unwrap();

    assert_matches!(
        client.authenticate(),
        Err(CatalogError::AuthStatus { status: 403, message }) if message.contains("bad token")
    );
}

#[test]
fn malformed_token_body_is_an_auth_error() {
    let server = TestServer::start(Arc::new(|_target: &str| (200, "{}".to_string())));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    assert_matches!(client.authenticate(), Err(CatalogError::Auth(_)));
}

#[test]
fn metadata_uses_bearer_token() {
    let server = TestServer::start(Arc::new(|_target: &str| {
        (
            200,
            r#"{"metadata":{"tables":[{"_id":"0000","name":"Works","columns":[
                {"key":"a","name":"Name","type":"text"},
                {"key":"b","name":"Image","type":"image"},
                {"key":"c","name":"Status","type":"single-select","data":{"options":[]}}
            ]}]}}"#
                .to_string(),
        )
    }));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    let schema = client.fetch_metadata(&session()).unwrap();

    assert_eq!(schema.tables.len(), 1);
    assert_eq!(schema.tables[0].columns.len(), 3);
    assert_eq!(schema.tables[0].image_column().unwrap().name, "Image");
    let requests = server.requests();
    assert!(requests[0].starts_with("get /dtable-server/api/v1/dtables/uuid-1/metadata/ "));
    assert!(requests[0].contains("authorization: bearer short-lived"));
}

#[test]
fn rows_follow_pages_until_short_page() {
    let server = TestServer::start(Arc::new(|target: &str| {
        let count = if target.contains("start=0&") {
            ROWS_PAGE_LIMIT
        } else {
            3
        };
        let rows = (0..count)
            .map(|idx| format!(r#"{{"_id":"r{idx}","Name":"Work {idx}"}}"#))
            .collect::<Vec<_>>()
            .join(",");
        (200, format!(r#"{{"rows":[{rows}]}}"#))
    }));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    let rows = client
        .fetch_rows(&session(), "Works & Exhibits", Some("Produced Works"))
        .unwrap();

    assert_eq!(rows.len(), ROWS_PAGE_LIMIT + 3);
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains("table_name=works+%26+exhibits"));
    assert!(requests[0].contains("view_name=produced+works"));
    assert!(requests[1].contains(&format!("start={ROWS_PAGE_LIMIT}&")));
}

#[test]
fn rows_stop_when_server_ignores_offset() {
    let server = TestServer::start(Arc::new(|_target: &str| {
        let rows = (0..ROWS_PAGE_LIMIT)
            .map(|idx| format!(r#"{{"_id":"r{idx}"}}"#))
            .collect::<Vec<_>>()
            .join(",");
        (200, format!(r#"{{"rows":[{rows}]}}"#))
    }));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    let rows = client.fetch_rows(&session(), "Works", None).unwrap();

    assert_eq!(rows.len(), ROWS_PAGE_LIMIT);
    assert_eq!(server.requests().len(), 2);
}

#[test]
fn oversized_page_ends_paging() {
    let server = TestServer::start(Arc::new(|target: &str| {
        let count = if target.contains("start=0&") {
            ROWS_PAGE_LIMIT + 5
        } else {
            1
        };
        let rows = (0..count)
            .map(|idx| format!(r#"{{"_id":"r{idx}"}}"#))
            .collect::<Vec<_>>()
            .join(",");
        (200, format!(r#"{{"rows":[{rows}]}}"#))
    }));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    let rows = client.fetch_rows(&session(), "Works", None).unwrap();

    assert_eq!(rows.len(), ROWS_PAGE_LIMIT + 5);
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn token_with_line_break_fails_client_setup() {
    let result = SeatableHttpClient::new("http://127.0.0.1:1", "bad\ntoken");

    let err = result.err().unwrap();
    assert_matches!(&err, CatalogError::Client(_));
    assert!(!err.is_remote());
    assert!(!err.is_config());
}

#[test]
fn rows_failure_is_a_fetch_error() {
    let server = TestServer::start(Arc::new(|_target: &str| (404, "view not found".to_string())));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    assert_matches!(
        client.fetch_rows(&session(), "Works", Some("Missing")),
        Err(CatalogError::FetchStatus { status: 404, .. })
    );
}

#[test]
fn download_link_then_asset_bytes() {
    let server = TestServer::start(Arc::new(|target: &str| {
        if target.starts_with("/api/v2.1/dtable/app-download-link/") {
            (200, r#"{"download_link":"LINK"}"#.to_string())
        } else {
            (200, "raw-image-bytes".to_string())
        }
    }));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    let link = client.download_link("/images/2021-07/Sun Study.jpg").unwrap();
    assert_eq!(link, "LINK");

    let mut bytes = Vec::new();
    let copied = client
        .fetch_asset(&format!("{}/seafhttp/files/abc/sun.jpg", server.base_url), &mut bytes)
        .unwrap();
    assert_eq!(copied, 15);
    assert_eq!(bytes, b"raw-image-bytes");

    let requests = server.requests();
    assert!(requests[0].contains("path=%2fimages%2f2021-07%2fsun+study.jpg"));
    assert!(requests[0].contains("authorization: token api-secret"));
    assert!(!requests[1].contains("authorization:"));
}

#[test]
fn failed_link_exchange_is_a_resolve_error() {
    let server = TestServer::start(Arc::new(|_target: &str| (400, "path invalid".to_string())));
    let client = SeatableHttpClient::new(&server.base_url, "api-secret").unwrap();

    assert_matches!(
        client.download_link("/images/x.jpg"),
        Err(CatalogError::ResolveStatus { status: 400, .. })
    );
}
