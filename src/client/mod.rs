//! An HTTP client for the `banque/comptes` collection and the list screen built on it.
//!
//! Every call takes a [RequestConfig] that says which wire format to use, so
//! one [CompteClient] can serve JSON and XML requests side by side.

mod view;

use std::time::Duration;

use reqwest::{
    RequestBuilder, StatusCode, Url,
    header::{ACCEPT, CONTENT_TYPE},
};

use crate::{
    Compte, CompteId, ComptePayload,
    endpoints,
    format::{CodecError, Format},
};

pub use view::{ActionOutcome, ComptesView, Notification, RefreshOutcome, RefreshTicket};

/// The settings for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestConfig {
    /// The format of request bodies and the format asked for in `Accept`.
    pub format: Format,
    /// How long to wait for the whole request. `None` leaves it to the HTTP client.
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// A config for `format` with the HTTP client's default timeout.
    pub fn new(format: Format) -> Self {
        Self {
            format,
            timeout: None,
        }
    }

    /// Return a copy of this config that gives up after `timeout`.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }
}

/// The ways a request to the accounts API can fail.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The base URL could not be parsed or cannot have a path.
    #[error("invalid base URL \"{0}\"")]
    InvalidBaseUrl(String),

    /// No response was received, e.g. the connection was refused or timed out.
    #[error("no response from the server: {0}")]
    Transport(#[source] reqwest::Error),

    /// A response was received but its status is not a success.
    #[error("the server responded with {0}")]
    Status(StatusCode),

    /// The response was successful but had no body where one was expected.
    #[error("the server responded without a body")]
    EmptyBody,

    /// The response body was not a valid account or list of accounts.
    #[error("could not decode the response: {0}")]
    Decode(#[source] CodecError),

    /// The account could not be encoded for the request body.
    #[error("could not encode the request: {0}")]
    Encode(#[source] CodecError),
}

/// A client for the accounts collection of one server.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct CompteClient {
    http: reqwest::Client,
    comptes_url: Url,
}

impl CompteClient {
    /// Create a client for the server at `base_url`, e.g. `http://localhost:8080/`.
    ///
    /// # Errors
    /// Returns [ClientError::InvalidBaseUrl] if `base_url` is not an absolute
    /// URL that can have a path.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    /// Create a client that sends its requests through `http`.
    ///
    /// # Errors
    /// Returns [ClientError::InvalidBaseUrl] if `base_url` is not an absolute
    /// URL that can have a path.
    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let invalid = |_| ClientError::InvalidBaseUrl(base_url.to_owned());

        let mut base = Url::parse(base_url).map_err(invalid)?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_owned()));
        }
        // Without the trailing slash `join` would replace the last path segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let comptes_url = base
            .join(endpoints::COMPTES.trim_start_matches('/'))
            .map_err(invalid)?;

        Ok(Self { http, comptes_url })
    }

    /// The URL of the accounts collection.
    pub fn comptes_url(&self) -> &Url {
        &self.comptes_url
    }

    fn compte_url(&self, id: CompteId) -> Url {
        let mut url = self.comptes_url.clone();
        // The constructor rejects URLs that cannot be a base, so this always succeeds.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(&id.to_string());
        }

        url
    }

    /// Fetch every account, in the order the server returns them.
    ///
    /// An empty collection is an empty list, but an empty body is
    /// [ClientError::EmptyBody].
    pub async fn list(&self, config: &RequestConfig) -> Result<Vec<Compte>, ClientError> {
        let request = self.http.get(self.comptes_url.clone());
        let body = self.send(config, request).await?;

        config
            .format
            .decode_comptes(&non_empty(body)?)
            .map_err(ClientError::Decode)
    }

    /// Fetch the account `id`.
    pub async fn get(&self, config: &RequestConfig, id: CompteId) -> Result<Compte, ClientError> {
        let request = self.http.get(self.compte_url(id));
        let body = self.send(config, request).await?;

        config
            .format
            .decode_compte(&non_empty(body)?)
            .map_err(ClientError::Decode)
    }

    /// Create an account from `payload` and return it with its server-assigned ID.
    pub async fn create(
        &self,
        config: &RequestConfig,
        payload: &ComptePayload,
    ) -> Result<Compte, ClientError> {
        let body = config
            .format
            .encode_payload(payload)
            .map_err(ClientError::Encode)?;
        let request = self
            .http
            .post(self.comptes_url.clone())
            .header(CONTENT_TYPE, config.format.mime())
            .body(body);
        let body = self.send(config, request).await?;

        config
            .format
            .decode_compte(&non_empty(body)?)
            .map_err(ClientError::Decode)
    }

    /// Replace every field of the account `id` with those of `compte`.
    ///
    /// Returns the account as stored by the server.
    pub async fn update(
        &self,
        config: &RequestConfig,
        id: CompteId,
        compte: &Compte,
    ) -> Result<Compte, ClientError> {
        let body = config
            .format
            .encode_compte(compte)
            .map_err(ClientError::Encode)?;
        let request = self
            .http
            .put(self.compte_url(id))
            .header(CONTENT_TYPE, config.format.mime())
            .body(body);
        let body = self.send(config, request).await?;

        config
            .format
            .decode_compte(&non_empty(body)?)
            .map_err(ClientError::Decode)
    }

    /// Delete the account `id`.
    pub async fn delete(&self, config: &RequestConfig, id: CompteId) -> Result<(), ClientError> {
        let request = self.http.delete(self.compte_url(id));
        self.send(config, request).await?;

        Ok(())
    }

    /// Send `request` with the `Accept` header and timeout from `config`,
    /// returning the body of a successful response.
    async fn send(
        &self,
        config: &RequestConfig,
        request: RequestBuilder,
    ) -> Result<String, ClientError> {
        let mime = config.format.mime();
        let mut request = request.header(ACCEPT, mime);
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        let request = request.build().map_err(ClientError::Transport)?;
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!("Sending {method} {url} as {mime}");

        let response = self.http.execute(request).await.map_err(|error| {
            tracing::warn!("{method} {url} failed: {error}");
            ClientError::Transport(error)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{method} {url} responded with {status}");
            return Err(ClientError::Status(status));
        }

        response.text().await.map_err(ClientError::Transport)
    }
}

fn non_empty(body: String) -> Result<String, ClientError> {
    if body.trim().is_empty() {
        Err(ClientError::EmptyBody)
    } else {
        Ok(body)
    }
}
