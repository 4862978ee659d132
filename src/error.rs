use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("authentication failed: {0}")]
    #[diagnostic(help("check the API token of the base (SEATABLE_API_TOKEN or --token)"))]
    Auth(String),

    #[error("access token exchange returned status {status}: {message}")]
    AuthStatus { status: u16, message: String },

    #[error("metadata request failed: {0}")]
    Metadata(String),

    #[error("metadata request returned status {status}: {message}")]
    MetadataStatus { status: u16, message: String },

    #[error("row request failed: {0}")]
    Fetch(String),

    #[error("row request returned status {status}: {message}")]
    FetchStatus { status: u16, message: String },

    #[error("cannot resolve asset {reference}: {reason}")]
    Resolve { reference: String, reason: String },

    #[error("download link request returned status {status}: {message}")]
    ResolveStatus { status: u16, message: String },

    #[error("asset transfer failed: {0}")]
    Transfer(String),

    #[error("asset transfer returned status {status}: {message}")]
    TransferStatus { status: u16, message: String },

    #[error("no API token configured")]
    #[diagnostic(help("set SEATABLE_API_TOKEN, pass --token, or add api_token to catalog.json"))]
    MissingCredential,

    #[error("base has no tables")]
    NoTables,

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("no image column in table {0}")]
    NoImageColumn(String),

    #[error("config file not found: {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to set up HTTP client: {0}")]
    Client(String),
}

impl CatalogError {
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            CatalogError::MissingCredential
                | CatalogError::NoTables
                | CatalogError::TableNotFound(_)
                | CatalogError::NoImageColumn(_)
                | CatalogError::MissingConfig(_)
                | CatalogError::ConfigRead(_)
                | CatalogError::ConfigParse(_)
        )
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CatalogError::Auth(_)
                | CatalogError::AuthStatus { .. }
                | CatalogError::Metadata(_)
                | CatalogError::MetadataStatus { .. }
                | CatalogError::Fetch(_)
                | CatalogError::FetchStatus { .. }
        )
    }
}
