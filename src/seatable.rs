use std::io::Write;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{Record, Schema, Session};
use crate::error::CatalogError;

pub const DEFAULT_SERVER_URL: &str = "https://cloud.seatable.io";
pub const ROWS_PAGE_LIMIT: usize = 1000;

/// Remote side of the pipeline. The credential lives inside the client.
pub trait SeatableClient: Send + Sync {
    fn authenticate(&self) -> Result<Session, CatalogError>;
    fn fetch_metadata(&self, session: &Session) -> Result<Schema, CatalogError>;
    fn fetch_rows(
        &self,
        session: &Session,
        table_name: &str,
        view_name: Option<&str>,
    ) -> Result<Vec<Record>, CatalogError>;
    /// Exchanges an in-base asset path (`/images/...`) for a time-limited URL.
    fn download_link(&self, asset_path: &str) -> Result<String, CatalogError>;
    /// Streams the body behind `url` into `destination`, returning the byte count.
    fn fetch_asset(&self, url: &str, destination: &mut dyn Write) -> Result<u64, CatalogError>;
}

#[derive(Deserialize)]
struct MetadataEnvelope {
    metadata: Schema,
}

#[derive(Deserialize)]
struct RowsEnvelope {
    #[serde(default)]
    rows: Vec<Record>,
}

#[derive(Deserialize)]
struct DownloadLink {
    download_link: String,
}

#[derive(Clone)]
pub struct SeatableHttpClient {
    client: Client,
    server_url: String,
    token_header: HeaderValue,
}

impl SeatableHttpClient {
    pub fn new(server_url: &str, api_token: &str) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("seatable-catalog/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CatalogError::Client(err.to_string()))?,
        );
        let mut token_header = HeaderValue::from_str(&format!("Token {api_token}"))
            .map_err(|_| CatalogError::Client("API token is not a valid header value".to_string()))?;
        token_header.set_sensitive(true);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| CatalogError::Client(err.to_string()))?;
        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            token_header,
        })
    }

    fn access_token_url(&self) -> String {
        format!("{}/api/v2.1/dtable/app-access-token/", self.server_url)
    }

    fn metadata_url(&self, base_id: &str) -> String {
        format!(
            "{}/dtable-server/api/v1/dtables/{base_id}/metadata/",
            self.server_url
        )
    }

    fn rows_url(&self, base_id: &str) -> String {
        format!(
            "{}/dtable-server/api/v1/dtables/{base_id}/rows/",
            self.server_url
        )
    }

    fn download_link_url(&self) -> String {
        format!("{}/api/v2.1/dtable/app-download-link/", self.server_url)
    }

    fn with_token(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, self.token_header.clone())
    }

    fn with_bearer(request: RequestBuilder, session: &Session) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Bearer {}", session.access_token))
    }
}

fn status_parts(response: Response) -> Result<Response, (u16, String)> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "SeaTable request failed".to_string());
    Err((status, message))
}

impl SeatableClient for SeatableHttpClient {
    fn authenticate(&self) -> Result<Session, CatalogError> {
        let url = self.access_token_url();
        debug!(%url, "requesting base access token");
        let response = self
            .with_token(self.client.get(&url))
            .send()
            .map_err(|err| CatalogError::Auth(err.to_string()))?;
        let response = status_parts(response)
            .map_err(|(status, message)| CatalogError::AuthStatus { status, message })?;
        response
            .json::<Session>()
            .map_err(|err| CatalogError::Auth(err.to_string()))
    }

    fn fetch_metadata(&self, session: &Session) -> Result<Schema, CatalogError> {
        let url = self.metadata_url(&session.base_id);
        debug!(%url, "requesting base metadata");
        let response = Self::with_bearer(self.client.get(&url), session)
            .send()
            .map_err(|err| CatalogError::Metadata(err.to_string()))?;
        let response = status_parts(response)
            .map_err(|(status, message)| CatalogError::MetadataStatus { status, message })?;
        let envelope: MetadataEnvelope = response
            .json()
            .map_err(|err| CatalogError::Metadata(err.to_string()))?;
        Ok(envelope.metadata)
    }

    fn fetch_rows(
        &self,
        session: &Session,
        table_name: &str,
        view_name: Option<&str>,
    ) -> Result<Vec<Record>, CatalogError> {
        let url = self.rows_url(&session.base_id);
        let mut rows = Vec::new();
        let mut start = 0usize;
        let mut previous_first: Option<Record> = None;
        loop {
            let mut query = vec![
                ("table_name", table_name.to_string()),
                ("start", start.to_string()),
                ("limit", ROWS_PAGE_LIMIT.to_string()),
            ];
            if let Some(view) = view_name {
                query.push(("view_name", view.to_string()));
            }
            debug!(%url, start, "requesting rows page");
            let response = Self::with_bearer(self.client.get(&url).query(&query), session)
                .send()
                .map_err(|err| CatalogError::Fetch(err.to_string()))?;
            let response = status_parts(response)
                .map_err(|(status, message)| CatalogError::FetchStatus { status, message })?;
            let page: RowsEnvelope = response
                .json()
                .map_err(|err| CatalogError::Fetch(err.to_string()))?;
            let count = page.rows.len();
            // A server that ignores `start` hands back the same page forever.
            if count > 0 && page.rows.first() == previous_first.as_ref() {
                warn!(start, "rows page repeats the previous one, stopping");
                break;
            }
            previous_first = page.rows.first().cloned();
            rows.extend(page.rows);
            if count != ROWS_PAGE_LIMIT {
                break;
            }
            start += count;
        }
        Ok(rows)
    }

    fn download_link(&self, asset_path: &str) -> Result<String, CatalogError> {
        let url = self.download_link_url();
        debug!(%url, asset_path, "requesting download link");
        let response = self
            .with_token(self.client.get(&url).query(&[("path", asset_path)]))
            .send()
            .map_err(|err| CatalogError::Resolve {
                reference: asset_path.to_string(),
                reason: err.to_string(),
            })?;
        let response = status_parts(response)
            .map_err(|(status, message)| CatalogError::ResolveStatus { status, message })?;
        let link: DownloadLink = response.json().map_err(|err| CatalogError::Resolve {
            reference: asset_path.to_string(),
            reason: err.to_string(),
        })?;
        Ok(link.download_link)
    }

    fn fetch_asset(&self, url: &str, destination: &mut dyn Write) -> Result<u64, CatalogError> {
        debug!(%url, "downloading asset");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| CatalogError::Transfer(err.to_string()))?;
        let mut response = status_parts(response)
            .map_err(|(status, message)| CatalogError::TransferStatus { status, message })?;
        std::io::copy(&mut response, destination)
            .map_err(|err| CatalogError::Transfer(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_trim_trailing_slash() {
        let client = SeatableHttpClient::new("https://seatable.example/", "secret").unwrap();
        assert_eq!(
            client.access_token_url(),
            "https://seatable.example/api/v2.1/dtable/app-access-token/"
        );
        assert_eq!(
            client.metadata_url("uuid-1"),
            "https://seatable.example/dtable-server/api/v1/dtables/uuid-1/metadata/"
        );
        assert_eq!(
            client.rows_url("uuid-1"),
            "https://seatable.example/dtable-server/api/v1/dtables/uuid-1/rows/"
        );
        assert_eq!(
            client.download_link_url(),
            "https://seatable.example/api/v2.1/dtable/app-download-link/"
        );
    }
}
