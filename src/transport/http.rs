//! reqwest-backed transport.

use super::{FetchError, Transport};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::{ParseError, Url};

/// Default user agent for script requests.
pub const USER_AGENT_VALUE: &str = concat!("scriptcache/", env!("CARGO_PKG_VERSION"));

/// HTTP(S) transport for script fetches.
///
/// Relative script URLs are resolved against `base_url` when one is set.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpTransport {
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        base_url: Option<&str>,
    ) -> Result<Self, FetchError> {
        let mut default_headers = HeaderMap::new();
        let agent = HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let base_url = base_url
            .map(|base| {
                Url::parse(base).map_err(|e| FetchError::InvalidUrl {
                    url: base.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self { client, base_url })
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        let invalid = |e: ParseError| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        };

        match Url::parse(url) {
            Ok(parsed) => Ok(parsed),
            Err(ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(url).map_err(invalid),
                None => Err(FetchError::InvalidUrl {
                    url: url.to_string(),
                    message: "relative URL without a configured base_url".to_string(),
                }),
            },
            Err(e) => Err(invalid(e)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let target = self.resolve(url)?;
        debug!(url = %target, "fetching script");

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: format!("failed to read response body: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(base: Option<&str>) -> HttpTransport {
        HttpTransport::new(Duration::from_secs(5), USER_AGENT_VALUE, base).unwrap()
    }

    #[tokio::test]
    async fn test_get_text_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lib.js"))
            .and(header("user-agent", USER_AGENT_VALUE))
            .respond_with(ResponseTemplate::new(200).set_body_string("window.lib = 1;"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let body = transport(None)
            .get_text(&format!("{}/lib.js", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "window.lib = 1;");
    }

    #[tokio::test]
    async fn test_relative_url_uses_base() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/static/lib.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let base = format!("{}/", mock_server.uri());
        let body = transport(Some(&base))
            .get_text("/static/lib.js")
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_relative_url_without_base_is_rejected() {
        let err = transport(None).get_text("/lib.js").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert_eq!(err.url(), "/lib.js");
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let mock_server = MockServer::start().await;

        for (route, code) in [("/missing.js", 404), ("/boom.js", 500), ("/empty.js", 204)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(code))
                .mount(&mock_server)
                .await;

            let url = format!("{}{}", mock_server.uri(), route);
            let err = transport(None).get_text(&url).await.unwrap_err();
            match err {
                FetchError::Status { url: failed, status } => {
                    assert_eq!(failed, url);
                    assert_eq!(status, code);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
