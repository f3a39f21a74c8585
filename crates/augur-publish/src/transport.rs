//! The boundary to the remote modeling service.

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use augur_core::Document;

use crate::auth::{self, JSON_CONTENT_TYPE};
use crate::config::{Credentials, DEFAULT_API_URL};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("service rejected the workspace: {0}")]
    Rejected(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    #[error("could not sign request: {0}")]
    Signing(String),
}

/// Moves documents to and from the service. One call is one attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn put_workspace(
        &self,
        credentials: &Credentials,
        document: &Document,
    ) -> Result<(), TransportError>;

    async fn get_workspace(&self, credentials: &Credentials) -> Result<Document, TransportError>;
}

/// Acknowledgement body of a write.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn workspace_url(&self, workspace_id: u64) -> Result<Url, TransportError> {
        let raw = format!("{}/workspace/{}", self.base_url.trim_end_matches('/'), workspace_id);
        Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))
    }

    async fn send(
        &self,
        method: Method,
        credentials: &Credentials,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, TransportError> {
        let url = self.workspace_url(credentials.workspace_id)?;
        let headers = auth::sign(
            credentials,
            method.as_str(),
            url.path(),
            &body,
            content_type,
            &auth::nonce(),
        )?;
        debug!(%method, path = url.path(), credentials = %credentials.masked(), "sending request");

        let mut request = self
            .client
            .request(method, url)
            .header("X-Authorization", headers.authorization)
            .header("Nonce", headers.nonce);
        if !body.is_empty() {
            request = request
                .header("Content-MD5", headers.content_md5)
                .header("Content-Type", headers.content_type)
                .body(body);
        }
        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(status = status.as_u16(), body = %text, "service error");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn put_workspace(
        &self,
        credentials: &Credentials,
        document: &Document,
    ) -> Result<(), TransportError> {
        let body = serde_json::to_vec(document)?;
        let text = self
            .send(Method::PUT, credentials, body, JSON_CONTENT_TYPE)
            .await?;

        // An empty or non-JSON 2xx body counts as success.
        if let Ok(reply) = serde_json::from_str::<ApiResponse>(&text) {
            if !reply.success {
                return Err(TransportError::Rejected(reply.message));
            }
        }
        Ok(())
    }

    async fn get_workspace(&self, credentials: &Credentials) -> Result<Document, TransportError> {
        let text = self.send(Method::GET, credentials, Vec::new(), "").await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_core::{Location, Workspace};
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials::new(42, "key", "secret")
    }

    fn document() -> Document {
        let mut ws = Workspace::new("Published", "");
        ws.model.add_person("User", "", Location::Internal).unwrap();
        ws.to_document()
    }

    #[tokio::test]
    async fn put_sends_one_signed_request() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new().with_base_url(mock_server.uri());

        Mock::given(method("PUT"))
            .and(path("/workspace/42"))
            .and(header_exists("X-Authorization"))
            .and(header_exists("Nonce"))
            .and(header_exists("Content-MD5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "OK",
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        transport.put_workspace(&credentials(), &document()).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        let header = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let expected = auth::sign(
            &credentials(),
            "PUT",
            "/workspace/42",
            &request.body,
            JSON_CONTENT_TYPE,
            &header("Nonce"),
        )
        .unwrap();
        assert_eq!(header("X-Authorization"), expected.authorization);
        assert_eq!(header("Content-MD5"), expected.content_md5);

        let sent: Document = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(sent, document());
    }

    #[tokio::test]
    async fn server_error_is_surfaced_without_retry() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new().with_base_url(mock_server.uri());

        Mock::given(method("PUT"))
            .and(path("/workspace/42"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = transport
            .put_workspace(&credentials(), &document())
            .await
            .unwrap_err();
        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unsuccessful_reply_is_a_rejection() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new().with_base_url(mock_server.uri());

        Mock::given(method("PUT"))
            .and(path("/workspace/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "message": "Workspace is locked",
            })))
            .mount(&mock_server)
            .await;

        let err = transport
            .put_workspace(&credentials(), &document())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(m) if m == "Workspace is locked"));
    }

    #[tokio::test]
    async fn get_parses_the_document() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new().with_base_url(mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/workspace/42"))
            .and(header_exists("X-Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetched = transport.get_workspace(&credentials()).await.unwrap();
        assert_eq!(fetched.name, "Published");
        assert_eq!(fetched.model.elements.len(), 1);
    }

    #[tokio::test]
    async fn truncated_reply_is_an_http_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises a longer body than it sends, then hangs up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"success\":")
                .await;
        });

        let transport = HttpTransport::new().with_base_url(format!("http://{addr}"));
        let err = transport
            .put_workspace(&credentials(), &document())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)), "unexpected error: {err}");
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let transport = HttpTransport::new().with_base_url("http://localhost:8080/api/");
        let url = transport.workspace_url(7).unwrap();
        assert_eq!(url.path(), "/api/workspace/7");
    }
}
