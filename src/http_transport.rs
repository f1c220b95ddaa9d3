use crate::{
    ConfigError,
    DeliveryConfig,
    Endpoint,
};
use bytes::Bytes;
use reqwest::{
    header::{
        HeaderValue,
        AUTHORIZATION,
        CONTENT_LENGTH,
        CONTENT_TYPE,
    },
    redirect,
    StatusCode,
};
use std::future::Future;

/// Sent with every request.
pub const USER_AGENT: &str = concat!("metrics-backend-librato/", env!("CARGO_PKG_VERSION"));

/// Why a delivery attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// No response was received: connect, TLS, timeout or I/O failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server error: status={status} {body}")]
    Server { status: StatusCode, body: String },
    #[error("request rejected: status={status} {body}")]
    Client { status: StatusCode, body: String },
    #[error("failed to encode payload: {0}")]
    Encode(#[from] metrics_backend_librato_core::Error),
}

impl DeliveryError {
    /// Transport and server failures may succeed on a later attempt, client
    /// errors never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Transport(_) | DeliveryError::Server { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DeliveryError::Server { status, .. } | DeliveryError::Client { status, .. } => Some(*status),
            DeliveryError::Transport(_) | DeliveryError::Encode(_) => None,
        }
    }
}

pub trait Transport {
    /// Issue one request carrying `body`. Any status below 400 is a success.
    fn send(&self, body: Bytes) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(&self, body: Bytes) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        self.as_ref().send(body)
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Posts JSON payloads to the configured endpoint.
///
/// An `https` endpoint gets a client that refuses plaintext connections, an
/// `http` endpoint a plain one. Redirects are not followed, so a 3xx answer
/// counts as delivered.
#[derive(Debug, Clone)]
pub struct HttpPostTransport {
    client: reqwest::Client,
    endpoint: Endpoint,
    authorization: HeaderValue,
}

impl HttpPostTransport {
    pub fn from_config(config: &DeliveryConfig) -> Result<Self, ConfigError> {
        let mut authorization = HeaderValue::try_from(config.authorization())?;
        authorization.set_sensitive(true);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .https_only(config.endpoint.is_tls())
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            authorization,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Transport for HttpPostTransport {
    fn send(&self, body: Bytes) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        let req = self
            .client
            .post(self.endpoint.url().clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(body);

        async move {
            let res = req.send().await.map_err(DeliveryError::Transport)?;
            let status = res.status();
            if status.as_u16() < 400 {
                return Ok(());
            }

            let body = res.text().await.unwrap_or_default();
            if status.is_server_error() {
                Err(DeliveryError::Server { status, body })
            } else {
                Err(DeliveryError::Client { status, body })
            }
        }
    }
}
