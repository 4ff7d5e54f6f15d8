use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use ear_core::model::FinishedSession;

use crate::error::RemoteSaveError;

/// Sends finished sessions to a remote store.
#[async_trait]
pub trait SessionUploader: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteSaveError` if the payload is invalid or the upload fails.
    async fn upload(&self, session: &FinishedSession) -> Result<(), RemoteSaveError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSaveConfig {
    base_url: Url,
    token: Option<String>,
}

impl RemoteSaveConfig {
    /// # Errors
    ///
    /// Returns `RemoteSaveError::InvalidConfig` if `base_url` is not an
    /// absolute http(s) URL.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, RemoteSaveError> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|e| RemoteSaveError::InvalidConfig(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RemoteSaveError::InvalidConfig(format!(
                "{base_url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }
        let token = token.filter(|t| !t.trim().is_empty());
        Ok(Self {
            base_url: parsed,
            token,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Where finished sessions are posted.
    ///
    /// # Errors
    ///
    /// Returns `RemoteSaveError::InvalidConfig` if the joined URL is invalid.
    pub fn endpoint(&self) -> Result<Url, RemoteSaveError> {
        let raw = format!(
            "{}/practice-sessions",
            self.base_url.as_str().trim_end_matches('/')
        );
        Url::parse(&raw).map_err(|e| RemoteSaveError::InvalidConfig(format!("{raw}: {e}")))
    }
}

/// Posts the session JSON with an optional bearer token.
#[derive(Clone, Debug)]
pub struct HttpSessionUploader {
    client: Client,
    config: RemoteSaveConfig,
}

impl HttpSessionUploader {
    #[must_use]
    pub fn new(config: RemoteSaveConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RemoteSaveConfig {
        &self.config
    }
}

#[async_trait]
impl SessionUploader for HttpSessionUploader {
    async fn upload(&self, session: &FinishedSession) -> Result<(), RemoteSaveError> {
        session.validate()?;
        let endpoint = self.config.endpoint()?;

        let mut request = self.client.post(endpoint.clone()).json(session);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            tracing::warn!(
                url = %endpoint,
                status = %response.status(),
                "remote session save rejected"
            );
            return Err(RemoteSaveError::HttpStatus(response.status()));
        }
        tracing::info!(url = %endpoint, exercise = %session.exercise, "session uploaded");
        Ok(())
    }
}
