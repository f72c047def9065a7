pub mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Reasons a script fetch produced no usable body
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with something other than 200
    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Connection, DNS, TLS or timeout failure
    #[error("GET {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("invalid script URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::InvalidUrl { url, .. } => url,
        }
    }
}

/// Fetches script source text over the network
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the response body as text
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}
