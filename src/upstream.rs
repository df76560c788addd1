//! # Upstream Proxy
//!
//! Forwards sync-task calls to the KDocs AirScript API.
//!
//! ## Request Shape
//!
//! ```text
//! POST https://365.kdocs.cn/api/v3/ide/file/{file_id}/script/{task_id}/sync_task
//! Origin: .kdocs.cn
//! Content-Type: application/json
//! AirScript-Token: <token>
//!
//! <payload, serialized verbatim>
//! ```
//!
//! ## Failure Translation
//!
//! - Non-2xx reply: `UpstreamStatus` carrying the status and raw body text
//! - Transport fault, timeout, or a 2xx body that is not JSON: `UpstreamTransport`
//!
//! Nothing is retried; the first failure is returned to the caller.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{select, Either};
use futures::pin_mut;
use serde_json::Value;
use worker::wasm_bindgen::JsValue;
use worker::{AbortController, Delay, Fetch, Headers, Method, Request, RequestInit, RequestRedirect};

use crate::constants::{CONTENT_TYPE_JSON, HEADER_AIRSCRIPT_TOKEN, UPSTREAM_ORIGIN};
use crate::errors::{AppError, AppResult};

/// Fully built outbound call.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

/// Raw upstream reply, before status translation.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a JSON POST and returns whatever the upstream answered.
///
/// Implementations report only transport faults as errors; HTTP error statuses
/// come back as an ordinary [`UpstreamReply`].
#[async_trait(?Send)]
pub trait UpstreamClient {
    async fn post(&self, request: UpstreamRequest) -> AppResult<UpstreamReply>;
}

/// Builds sync-task calls and translates their outcome.
pub struct UpstreamProxy<'a> {
    client: &'a dyn UpstreamClient,
    endpoint: &'a str,
}

impl<'a> UpstreamProxy<'a> {
    pub fn new(client: &'a dyn UpstreamClient, endpoint: &'a str) -> Self {
        Self { client, endpoint }
    }

    pub fn build_request(
        &self,
        file_id: &str,
        task_id: &str,
        payload: &Value,
        token: &str,
    ) -> UpstreamRequest {
        let url = self
            .endpoint
            .replace("{file_id}", file_id)
            .replace("{task_id}", task_id);
        UpstreamRequest {
            url,
            headers: vec![
                ("Origin", UPSTREAM_ORIGIN.to_string()),
                ("Content-Type", CONTENT_TYPE_JSON.to_string()),
                (HEADER_AIRSCRIPT_TOKEN, token.to_string()),
            ],
            body: payload.to_string(),
        }
    }

    /// Sends `payload` upstream and returns the decoded JSON reply.
    pub async fn forward(
        &self,
        file_id: &str,
        task_id: &str,
        payload: &Value,
        token: &str,
    ) -> AppResult<Value> {
        let request = self.build_request(file_id, task_id, payload, token);
        let reply = self.client.post(request).await?;

        if !reply.is_success() {
            return Err(AppError::UpstreamStatus {
                status: reply.status,
                body: reply.body,
            });
        }

        serde_json::from_str(&reply.body).map_err(|e| {
            AppError::UpstreamTransport(format!("response body is not valid JSON: {e}"))
        })
    }
}

/// Races `fut` against `deadline`. A deadline that fires first is reported
/// as an upstream transport failure.
pub async fn within<F, D>(fut: F, deadline: D, timeout: Duration) -> AppResult<F::Output>
where
    F: Future,
    D: Future,
{
    pin_mut!(fut, deadline);
    match select(fut, deadline).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(_) => Err(AppError::UpstreamTransport(format!(
            "no response within {}s",
            timeout.as_secs()
        ))),
    }
}

/// [`UpstreamClient`] using the Workers `fetch` API, bounded by a timeout.
pub struct FetchClient {
    timeout: Duration,
}

impl FetchClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait(?Send)]
impl UpstreamClient for FetchClient {
    async fn post(&self, request: UpstreamRequest) -> AppResult<UpstreamReply> {
        let transport = |e: worker::Error| AppError::UpstreamTransport(e.to_string());

        let headers = Headers::new();
        for (name, value) in &request.headers {
            headers.set(name, value).map_err(transport)?;
        }

        let mut init = RequestInit::new();
        init.with_method(Method::Post)
            .with_headers(headers)
            .with_redirect(RequestRedirect::Follow)
            .with_body(Some(JsValue::from_str(&request.body)));
        let outbound = Request::new_with_init(&request.url, &init).map_err(transport)?;

        let controller = AbortController::default();
        let signal = controller.signal();
        let fetch = Fetch::Request(outbound);
        let sent = within(
            fetch.send_with_signal(&signal),
            Delay::from(self.timeout),
            self.timeout,
        )
        .await;

        let mut response = match sent {
            Ok(result) => result.map_err(transport)?,
            Err(e) => {
                controller.abort();
                return Err(e);
            }
        };

        let status = response.status_code();
        let body = response.text().await.map_err(transport)?;
        Ok(UpstreamReply { status, body })
    }
}
