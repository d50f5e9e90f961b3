use hookpipe_core::{
    Error, MessagePayload, Result, ServiceError, WebhookBackend, WebhookIdentity, WebhookInfo,
    WebhookUpdate, DEFAULT_API_BASE,
};
use std::time::{Duration, Instant};

/// Tracing target for webhook HTTP traffic.
pub const TRACING_TARGET: &str = "hookpipe_local";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root the `/webhooks/<id>/<token>` path is appended to.
    pub api_base: String,
    /// Whole-request timeout. `None` leaves only the connect timeout in place.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("hookpipe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A body that could not be decoded into the shape its status promised.
#[derive(Debug, thiserror::Error)]
#[error("malformed HTTP {status} response body: {source}")]
pub struct MalformedResponse {
    pub status: u16,
    #[source]
    pub source: serde_json::Error,
}

/// Classify a finished exchange: 200/201/204 succeed, anything else must carry a
/// service error object.
pub fn check_response(status: u16, body: &[u8]) -> Result<()> {
    match status {
        200 | 201 | 204 => Ok(()),
        _ => match ServiceError::from_body(status, body) {
            Ok(e) => Err(Error::Service(e)),
            Err(source) => Err(Error::transport(MalformedResponse { status, source })),
        },
    }
}

/// Webhook client over `reqwest`. One request per operation, no retries.
#[derive(Clone)]
pub struct HttpWebhookClient {
    client: reqwest::Client,
    identity: WebhookIdentity,
    endpoint: url::Url,
}

impl std::fmt::Debug for HttpWebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWebhookClient")
            .field("identity", &self.identity)
            .field("host", &self.endpoint.host_str())
            .finish_non_exhaustive()
    }
}

impl HttpWebhookClient {
    pub fn new(identity: WebhookIdentity, config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::transport)?;
        Self::with_client(client, identity, &config.api_base)
    }

    /// Reuse an existing `reqwest::Client` (connection pool, proxy settings).
    pub fn with_client(
        client: reqwest::Client,
        identity: WebhookIdentity,
        api_base: &str,
    ) -> Result<Self> {
        let endpoint =
            url::Url::parse(&identity.endpoint_url_on(api_base)).map_err(Error::transport)?;
        Ok(Self {
            client,
            identity,
            endpoint,
        })
    }

    pub fn identity(&self) -> &WebhookIdentity {
        &self.identity
    }

    /// Contains the webhook token; do not log it.
    pub fn endpoint_url(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn execute(&self, op: &'static str, rb: reqwest::RequestBuilder) -> Result<Vec<u8>> {
        let t0 = Instant::now();
        let webhook_id = self.identity.id();
        tracing::debug!(target: TRACING_TARGET, webhook_id, op, "Sending webhook request");

        let resp = rb.send().await.map_err(|e| {
            let e = e.without_url();
            tracing::debug!(
                target: TRACING_TARGET,
                webhook_id,
                op,
                error = %e,
                elapsed_ms = t0.elapsed().as_millis(),
                "Webhook request failed in transport"
            );
            Error::transport(e)
        })?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::transport(e.without_url()))?
            .to_vec();

        let checked = check_response(status, &body);
        match &checked {
            Ok(()) => tracing::debug!(
                target: TRACING_TARGET,
                webhook_id,
                op,
                status,
                elapsed_ms = t0.elapsed().as_millis(),
                "Webhook request succeeded"
            ),
            Err(e) => tracing::debug!(
                target: TRACING_TARGET,
                webhook_id,
                op,
                status,
                error = %e,
                elapsed_ms = t0.elapsed().as_millis(),
                "Webhook request rejected"
            ),
        }
        checked.map(|()| body)
    }

    fn parse_info(body: &[u8]) -> Result<WebhookInfo> {
        serde_json::from_slice(body)
            .map_err(|source| Error::transport(MalformedResponse { status: 200, source }))
    }
}

#[async_trait::async_trait]
impl WebhookBackend for HttpWebhookClient {
    async fn send_message(&self, payload: &MessagePayload) -> Result<()> {
        payload.validate()?;
        let rb = self.client.post(self.endpoint.clone()).json(payload);
        self.execute("send_message", rb).await.map(|_| ())
    }

    async fn send_file(
        &self,
        file: &[u8],
        filename: &str,
        payload: &MessagePayload,
    ) -> Result<()> {
        if filename.trim().is_empty() {
            return Err(Error::InvalidPayload("attachment needs a file name".to_string()));
        }
        payload.validate_content_len()?;
        let payload_json =
            serde_json::to_string(payload).map_err(|e| Error::InvalidPayload(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(file.to_vec()).file_name(filename.to_string()),
            )
            .text("payload_json", payload_json);
        let rb = self.client.post(self.endpoint.clone()).multipart(form);
        self.execute("send_file", rb).await.map(|_| ())
    }

    async fn fetch(&self) -> Result<WebhookInfo> {
        let body = self
            .execute("fetch", self.client.get(self.endpoint.clone()))
            .await?;
        Self::parse_info(&body)
    }

    async fn update(&self, update: &WebhookUpdate) -> Result<WebhookInfo> {
        if update.is_empty() {
            return Err(Error::InvalidPayload(
                "update needs a name or an avatar".to_string(),
            ));
        }
        let rb = self.client.patch(self.endpoint.clone()).json(update);
        let body = self.execute("update", rb).await?;
        Self::parse_info(&body)
    }

    async fn remove(&self) -> Result<()> {
        self.execute("remove", self.client.delete(self.endpoint.clone()))
            .await
            .map(|_| ())
    }
}
