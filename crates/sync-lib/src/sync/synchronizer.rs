//! Paginate, transform and forward loop

use crate::config::{join_segments, SyncConfig, REPOS_PATH};
use crate::error::{ConfigurationError, Result, SyncError};
use crate::models::{PageCursor, RawRecord, RepoRecord, SyncOutcome};
use crate::observability::SyncLogger;
use crate::transport::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use url::Url;

/// User agent sent to the upstream API
pub const USER_AGENT: &str = concat!("repo-sync/", env!("CARGO_PKG_VERSION"));

/// Header carrying the destination API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// One-way synchronizer from the upstream organization to the destination API
///
/// Pages are fetched, transformed and forwarded strictly in cursor order; page
/// N+1 is never requested before page N has been forwarded. The run ends on
/// the first empty page.
pub struct Synchronizer {
    config: SyncConfig,
    transport: Arc<dyn HttpTransport>,
    logger: SyncLogger,
    save_url: Url,
    cursor: PageCursor,
}

impl Synchronizer {
    /// Validate raw `sync` settings and build a synchronizer
    ///
    /// Fails before any request is made when the settings are invalid.
    pub fn create(
        settings: &Value,
        transport: Arc<dyn HttpTransport>,
        logger: SyncLogger,
    ) -> std::result::Result<Self, ConfigurationError> {
        let config = SyncConfig::from_settings(settings)?;
        Ok(Self::new(config, transport, logger))
    }

    pub fn new(config: SyncConfig, transport: Arc<dyn HttpTransport>, logger: SyncLogger) -> Self {
        let save_url = join_segments(&config.destination.base_url, [REPOS_PATH]);
        Self {
            config,
            transport,
            logger,
            save_url,
            cursor: PageCursor::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Page offset the next fetch will request
    pub fn cursor(&self) -> u32 {
        self.cursor.value()
    }

    /// Destination write URL
    pub fn save_url(&self) -> &str {
        self.save_url.as_str()
    }

    /// Upstream URL for one page of organization repositories
    pub fn page_url(&self, offset: u32) -> String {
        self.build_page_url(offset, &self.config.upstream.client_secret)
            .into()
    }

    fn build_page_url(&self, offset: u32, client_secret: &str) -> Url {
        let upstream = &self.config.upstream;
        let mut url = join_segments(
            &upstream.base_url,
            ["orgs", upstream.organization.as_str(), "repos"],
        );
        url.query_pairs_mut()
            .append_pair("page", &offset.to_string())
            .append_pair("per_page", &upstream.batch_size.to_string())
            .append_pair("client_id", &upstream.client_id)
            .append_pair("client_secret", client_secret);
        url
    }

    /// Fetch one upstream page and return its raw body
    pub async fn fetch_page(&self, offset: u32) -> Result<Vec<u8>> {
        let url = self.page_url(offset);
        self.logger.log_request(
            HttpMethod::Get.as_str(),
            self.build_page_url(offset, "***").as_str(),
            Some(offset),
        );

        let request = HttpRequest::get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json");
        let response = self.send(request).await?;
        Ok(response.body)
    }

    /// Fetch and parse the page at the cursor, then advance the cursor
    ///
    /// A failed fetch leaves the cursor on the same page; an unparseable
    /// body still moves it.
    pub async fn get_batch(&mut self) -> Result<Vec<RawRecord>> {
        let page = self.cursor.value();
        let body = self.fetch_page(page).await?;
        self.cursor.advance();

        serde_json::from_slice(&body).map_err(|source| {
            self.logger
                .log_parse_error(page, &String::from_utf8_lossy(&body), &source);
            SyncError::Parse { page, source }
        })
    }

    /// Project one upstream record onto the forwarded fields
    pub fn transform(record: &RawRecord) -> Option<RepoRecord> {
        RepoRecord::project(record)
    }

    /// Transform a whole page; any record that is not an object fails the page
    pub fn transform_batch(&self, page: u32, batch: &[RawRecord]) -> Result<Vec<RepoRecord>> {
        batch
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                Self::transform(raw).ok_or_else(|| {
                    self.logger.log_transform_error(page, index, raw);
                    SyncError::Transform {
                        page,
                        index,
                        reason: format!("expected an object, found {}", json_kind(raw)),
                    }
                })
            })
            .collect()
    }

    /// POST a batch of records to the destination
    pub async fn forward_batch(&self, records: &[RepoRecord]) -> Result<HttpResponse> {
        let body = serde_json::to_vec(records).map_err(SyncError::Serialize)?;
        self.logger
            .log_request(HttpMethod::Post.as_str(), self.save_url.as_str(), None);

        let mut request = HttpRequest::post(self.save_url.as_str(), body)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.config.destination.api_key {
            request = request.header(API_KEY_HEADER, key.as_str());
        }

        self.send(request).await
    }

    /// Run until the upstream returns an empty page
    pub async fn run(&mut self) -> Result<SyncOutcome> {
        self.run_loop(None).await
    }

    /// Like [`run`](Self::run), but stops before the next fetch once
    /// `shutdown` fires
    pub async fn run_until_shutdown(
        &mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<SyncOutcome> {
        self.run_loop(Some(&mut shutdown)).await
    }

    async fn run_loop(
        &mut self,
        mut shutdown: Option<&mut broadcast::Receiver<()>>,
    ) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome {
            final_cursor: self.cursor.value(),
            pages_forwarded: 0,
            records_forwarded: 0,
            completed: false,
        };

        loop {
            if let Some(rx) = shutdown.as_deref_mut() {
                if shutdown_requested(rx) {
                    outcome.final_cursor = self.cursor.value();
                    self.logger.log_shutdown("shutdown signal", outcome.final_cursor);
                    return Ok(outcome);
                }
            }

            let page = self.cursor.value();
            let batch = self.get_batch().await?;
            outcome.final_cursor = self.cursor.value();

            if batch.is_empty() {
                outcome.completed = true;
                self.logger.log_complete(
                    outcome.final_cursor,
                    outcome.pages_forwarded,
                    outcome.records_forwarded,
                );
                return Ok(outcome);
            }

            let records = self.transform_batch(page, &batch)?;
            self.forward_batch(&records).await?;

            outcome.pages_forwarded += 1;
            outcome.records_forwarded += records.len();
            self.logger.log_batch_forwarded(page, records.len());
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = self.loggable_url(&request.url);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| self.redact_transport_error(e))?;

        if !response.is_success() {
            return Err(SyncError::UnexpectedStatus {
                method: method.as_str(),
                url,
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }

    /// Transport error with the client secret masked in any URL it carries
    fn redact_transport_error(&self, err: HttpError) -> HttpError {
        match err {
            HttpError::Timeout { url } => HttpError::Timeout {
                url: self.loggable_url(&url),
            },
            HttpError::Transport(message) => HttpError::Transport(self.loggable_url(&message)),
            #[cfg(test)]
            HttpError::NoMockResponse { method, url } => HttpError::NoMockResponse {
                method,
                url: self.loggable_url(&url),
            },
        }
    }

    /// Request URL with the client secret masked
    fn loggable_url(&self, url: &str) -> String {
        url.replace(
            &format!("client_secret={}", self.encoded_secret()),
            "client_secret=***",
        )
    }

    fn encoded_secret(&self) -> String {
        url::form_urlencoded::byte_serialize(self.config.upstream.client_secret.as_bytes())
            .collect()
    }
}

fn shutdown_requested(rx: &mut broadcast::Receiver<()>) -> bool {
    match rx.try_recv() {
        Ok(()) | Err(TryRecvError::Lagged(_)) => true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
