//! Telegram Bot API transport over reqwest. Production code posts to api.telegram.org; tests point
//! `api_url` at a mock server.

use async_trait::async_trait;
use dispatch_core::{mask_token, DispatchError, DispatchRequest, MediaItem, Result, Transport};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::DispatchConfig;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Envelope of every Bot API reply.
#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Posts form requests to `{api_url}/bot{token}/{method}`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    api_url: String,
    bot_token: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("api_url", &self.api_url)
            .field("bot_token", &mask_token(&self.bot_token))
            .finish()
    }
}

fn http_error(e: reqwest::Error) -> DispatchError {
    // The URL carries the bot token.
    DispatchError::Http(e.without_url().to_string())
}

impl HttpTransport {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            bot_token: bot_token.into(),
        }
    }

    /// Sends requests to another Bot API server (self-hosted, or a mock in tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Builds a transport from config, applying the optional request timeout.
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        Ok(Self::new(config.bot_token.clone())
            .with_api_url(config.telegram_api_url.clone())
            .with_client(config.http_client()?))
    }

    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_url.trim_end_matches('/'),
            self.bot_token,
            method
        )
    }

    /// Fails on non-success status, or on a JSON body with `"ok": false`.
    async fn check_response(method: &str, response: Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await.map_err(http_error)?;
        if !status.is_success() {
            return Err(DispatchError::Api {
                method: method.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        if let Ok(reply) = serde_json::from_str::<ApiReply>(&body) {
            if !reply.ok {
                if let Some(description) = reply.description {
                    warn!(method, %description, "Telegram API rejected the call");
                }
                return Err(DispatchError::Api {
                    method: method.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }
        }
        debug!(method, status = status.as_u16(), "Telegram API call succeeded");
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(chat_id = %request.chat_id))]
    async fn send_message(&self, request: &DispatchRequest) -> Result<()> {
        let method = "sendMessage";
        info!(
            method,
            bot = %mask_token(&self.bot_token),
            text_len = request.caption.len(),
            "Sending Telegram message"
        );
        let response = self
            .client
            .post(self.method_url(method))
            .form(&request.form_fields("text"))
            .send()
            .await
            .map_err(http_error)?;
        Self::check_response(method, response).await
    }

    #[instrument(skip(self, request, item), fields(chat_id = %request.chat_id, kind = %item.kind))]
    async fn send_media(&self, request: &DispatchRequest, item: &MediaItem) -> Result<()> {
        let method = item.kind.method();
        let bytes = tokio::fs::read(&item.path).await?;
        info!(
            method,
            bot = %mask_token(&self.bot_token),
            file = %item.path.display(),
            size = bytes.len(),
            "Sending Telegram media"
        );

        let mut form = Form::new();
        for (name, value) in request.form_fields("caption") {
            form = form.text(name, value);
        }
        form = form.part(
            item.kind.field_name(),
            Part::bytes(bytes).file_name(item.file_name()),
        );

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(http_error)?;
        Self::check_response(method, response).await
    }
}
