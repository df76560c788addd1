//! # Sync Task Handlers
//!
//! `POST /v1/wo/file/{fileId}/script/{taskId}/sync_task` forwards the JSON body
//! to the upstream API and relays its JSON reply with status `200`.

use http::StatusCode;
use serde_json::Value;

use crate::config::Config;
use crate::envelope::{GatewayRequest, GatewayResponse};
use crate::errors::{AppError, AppResult};
use crate::log_data;
use crate::logging::Logger;
use crate::upstream::{UpstreamClient, UpstreamProxy};

/// Proxies one sync-task call.
///
/// # Errors
///
/// - `Internal`: body is not valid JSON, or no upstream token is configured
/// - `UpstreamStatus` / `UpstreamTransport`: the upstream call failed
pub async fn handle_sync_task(
    req: &GatewayRequest,
    file_id: &str,
    task_id: &str,
    config: &Config,
    client: &dyn UpstreamClient,
    logger: &Logger,
) -> AppResult<GatewayResponse> {
    let payload: Value = req
        .json()
        .map_err(|e| AppError::Internal(format!("invalid JSON body: {e}")))?;

    let token = config
        .upstream_token
        .as_deref()
        .ok_or_else(|| AppError::Internal("upstream token is not configured".to_string()))?;

    logger.info(
        "Forwarding sync task",
        log_data!("file_id" => file_id, "task_id" => task_id),
    );

    let proxy = UpstreamProxy::new(client, &config.upstream_endpoint);
    let result = proxy.forward(file_id, task_id, &payload, token).await?;

    Ok(GatewayResponse::json(StatusCode::OK, &result))
}
