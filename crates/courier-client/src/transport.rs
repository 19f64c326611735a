//! Invoker transport: one encoded request out, one encoded result back.

use std::time::Duration;

use async_trait::async_trait;
use courier_proto::WireFormat;
use tracing::debug;

use crate::error::ClientError;

/// Boundary between the proxy and the wire. One call is one exchange; pairing
/// is strict and there is no pipelining or retry at this layer.
#[async_trait]
pub trait InvokerTransport: Send + Sync {
    /// Sends an encoded request body and returns the encoded result body.
    async fn exchange(&self, format: WireFormat, body: Vec<u8>) -> Result<Vec<u8>, ClientError>;
}

/// HTTP POST transport for the remoting endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Creates a transport posting to `endpoint`'s `/remoting` route.
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!("{}/remoting", endpoint.trim_end_matches('/')),
        }
    }

    /// Target URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").field("url", &self.url).finish()
    }
}

#[async_trait]
impl InvokerTransport for HttpTransport {
    async fn exchange(&self, format: WireFormat, body: Vec<u8>) -> Result<Vec<u8>, ClientError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, format.content_type())
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("connection error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %self.url, status = %status, "remoting endpoint refused request");
            return Err(ClientError::transport(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(format!("read error: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_normalization() {
        let t = HttpTransport::new("http://localhost:8077", Duration::from_secs(5));
        assert_eq!(t.url(), "http://localhost:8077/remoting");
        let t = HttpTransport::new("http://localhost:8077/", Duration::from_secs(5));
        assert_eq!(t.url(), "http://localhost:8077/remoting");
    }
}
