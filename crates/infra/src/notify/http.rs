//! Advisor notification over HTTP: POST the camelCase request body as JSON,
//! optionally with a bearer token. Any 2xx counts as delivered.
//!
//! The pipeline owns the timeout; this adapter adds no retries so a slow
//! endpoint cannot outlive the notify window.

use tracing::debug;
use url::Url;

use intake_wizard::{NotificationRequest, Notifier, NotifyError};

#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpNotifier {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        let mut req = self.client.post(self.endpoint.clone()).json(request);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            debug!(endpoint = %self.endpoint, status = status.as_u16(), "notification accepted");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
