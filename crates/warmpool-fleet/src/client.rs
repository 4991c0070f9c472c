//! HTTP client for the fleet manager API.
//!
//! One TCP connection per call, HTTP/1.1, JSON body. The call is bounded by
//! a timeout; connection failures and timeouts are transient.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use bytes::Bytes;
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tracing::debug;

use warmpool_core::CompletionRequest;

use crate::error::{FleetError, FleetResult};
use crate::manager::{BoxFuture, FleetManager};
use crate::wire::{ACTION_HEADER, COMPLETE_LIFECYCLE_ACTION, classify};

/// Completes lifecycle actions against a remote fleet manager.
#[derive(Clone)]
pub struct HttpFleetClient {
    /// `host:port` to connect to.
    authority: String,
    /// Request target (path and query).
    target: String,
    /// Bearer credential, read once and shared.
    credential: Option<Arc<str>>,
    timeout: Duration,
}

impl HttpFleetClient {
    /// Create a client for an `http://` endpoint.
    pub fn new(
        endpoint: &str,
        credential: Option<Arc<str>>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let uri: Uri = endpoint
            .parse()
            .with_context(|| format!("invalid fleet endpoint {endpoint:?}"))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => bail!("unsupported fleet endpoint scheme {other:?}"),
            None => bail!("fleet endpoint {endpoint:?} has no scheme"),
        }

        let authority = uri
            .authority()
            .with_context(|| format!("fleet endpoint {endpoint:?} has no host"))?;
        let port = authority.port_u16().unwrap_or(80);
        let target = uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            authority: format!("{}:{port}", authority.host()),
            target,
            credential,
            timeout,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    async fn send(&self, request: &CompletionRequest) -> FleetResult<()> {
        let body = serde_json::to_vec(request)
            .map_err(|e| FleetError::Rejected(format!("failed to encode request: {e}")))?;

        let (status, bytes) = tokio::time::timeout(self.timeout, self.post(body))
            .await
            .map_err(|_| {
                FleetError::Transient(format!(
                    "no response from {} within {:?}",
                    self.authority, self.timeout
                ))
            })??;

        debug!(
            status,
            instance = %request.instance_id,
            authority = %self.authority,
            "fleet manager responded"
        );
        classify(status, &bytes)
    }

    async fn post(&self, body: Vec<u8>) -> FleetResult<(u16, Bytes)> {
        let stream = tokio::net::TcpStream::connect(&self.authority)
            .await
            .map_err(|e| FleetError::Transient(format!("connect {}: {e}", self.authority)))?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| FleetError::Transient(format!("handshake failed: {e}")))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(self.target.as_str())
            .header("host", self.authority.as_str())
            .header("content-type", "application/json")
            .header("user-agent", "warmpool-reactor/0.1")
            .header(ACTION_HEADER, COMPLETE_LIFECYCLE_ACTION);
        if let Some(credential) = &self.credential {
            builder = builder.header("authorization", format!("Bearer {credential}"));
        }
        let req = builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| FleetError::Rejected(format!("failed to build request: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| FleetError::Transient(format!("request failed: {e}")))?;
        let status = resp.status().as_u16();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| FleetError::Transient(format!("failed to read response: {e}")))?
            .to_bytes();

        Ok((status, bytes))
    }
}

impl FleetManager for HttpFleetClient {
    fn complete_lifecycle_action<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, FleetResult<()>> {
        Box::pin(self.send(request))
    }
}
