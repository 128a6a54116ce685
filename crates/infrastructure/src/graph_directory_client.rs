use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, header};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use staleguard_application::DirectoryClient;
use staleguard_core::{AppError, AppResult};
use staleguard_domain::{DeviceId, DeviceRecord, InactivityCutoff};

const DEVICE_SELECT: &str = "id,displayName,approximateLastSignInDateTime";
const PAGE_SIZE: &str = "999";
const MAX_RETRY_AFTER_SECONDS: u64 = 60;

/// Graph error code returned when the object or one of its referenced
/// properties is gone.
const RESOURCE_NOT_FOUND_CODE: &str = "Request_ResourceNotFound";

/// Connection settings for [`GraphDirectoryClient`].
#[derive(Debug, Clone)]
pub struct GraphDirectoryConfig {
    /// Graph API root, e.g. `https://graph.microsoft.com/v1.0`.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub access_token: String,
    /// Attempts per request for throttled or unavailable responses.
    pub max_attempts: u8,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
}

/// Directory adapter for the Microsoft Graph `devices` collection.
pub struct GraphDirectoryClient {
    http_client: reqwest::Client,
    base_url: Url,
    access_token: String,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
struct DevicePage {
    #[serde(default)]
    value: Vec<GraphDevice>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDevice {
    id: String,
    display_name: Option<String>,
    approximate_last_sign_in_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl GraphDirectoryClient {
    /// Creates a Graph directory client.
    pub fn new(http_client: reqwest::Client, config: GraphDirectoryConfig) -> AppResult<Self> {
        let mut base_url = Url::parse(config.base_url.trim()).map_err(|error| {
            AppError::Validation(format!(
                "invalid Graph base url '{}': {error}",
                config.base_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "Graph base url '{}' cannot carry a path",
                config.base_url
            )));
        }
        base_url.set_query(None);

        if config.access_token.trim().is_empty() {
            return Err(AppError::Validation(
                "Graph access token must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            http_client,
            base_url,
            access_token: config.access_token,
            max_attempts: config.max_attempts.max(1),
            retry_backoff_ms: config.retry_backoff_ms.max(50),
        })
    }

    fn devices_url(&self, device_id: Option<&DeviceId>) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                AppError::Internal("Graph base url cannot carry a path".to_owned())
            })?;
            segments.pop_if_empty().push("devices");
            if let Some(device_id) = device_id {
                segments.push(device_id.as_str());
            }
        }

        Ok(url)
    }

    fn stale_devices_url(&self, cutoff: &InactivityCutoff) -> AppResult<Url> {
        let mut url = self.devices_url(None)?;
        url.query_pairs_mut()
            .append_pair(
                "$filter",
                format!("approximateLastSignInDateTime le {cutoff}").as_str(),
            )
            .append_pair("$select", DEVICE_SELECT)
            .append_pair("$count", "true")
            .append_pair("$top", PAGE_SIZE);
        Ok(url)
    }

    async fn send_with_retry<F>(&self, operation: &str, mut build: F) -> AppResult<reqwest::Response>
    where
        F: FnMut(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_u8;
        let mut last_error: Option<AppError> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = build(&self.http_client)
                .bearer_auth(self.access_token.as_str())
                .send()
                .await;

            let mut delay = Duration::from_millis(
                self.retry_backoff_ms.saturating_mul(u64::from(attempt)),
            );

            match response {
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == StatusCode::TOO_MANY_REQUESTS =>
                {
                    let status = response.status();
                    if let Some(retry_after) = retry_after(&response) {
                        delay = retry_after;
                    }
                    debug!(
                        operation = operation,
                        attempt = attempt,
                        status = status.as_u16(),
                        "transient Graph response"
                    );
                    last_error = Some(if status == StatusCode::TOO_MANY_REQUESTS {
                        AppError::RateLimited(format!("Graph throttled {operation}"))
                    } else {
                        AppError::Internal(format!(
                            "Graph returned status {} for {operation}",
                            status.as_u16()
                        ))
                    });
                }
                Ok(response) => return Ok(response),
                Err(error) => {
                    debug!(
                        operation = operation,
                        attempt = attempt,
                        error = %error,
                        "Graph transport error"
                    );
                    last_error = Some(AppError::Internal(format!(
                        "Graph transport error during {operation}: {error}"
                    )));
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::Internal(format!("Graph request for {operation} exhausted retries"))
        }))
    }

    async fn fetch_page(&self, url: &str) -> AppResult<DevicePage> {
        let response = self
            .send_with_retry("list devices", |client| {
                client
                    .get(url)
                    .header("ConsistencyLevel", "eventual")
                    .header(header::ACCEPT, "application/json")
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(classify_failure(status, body.as_str(), "list devices"));
        }

        response.json::<DevicePage>().await.map_err(|error| {
            AppError::Internal(format!("failed to parse Graph device page: {error}"))
        })
    }
}

#[async_trait]
impl DirectoryClient for GraphDirectoryClient {
    async fn list_stale(&self, cutoff: &InactivityCutoff) -> AppResult<Vec<DeviceRecord>> {
        let mut next_url = Some(self.stale_devices_url(cutoff)?.to_string());
        let mut devices = Vec::new();
        let mut pages = 0_u32;

        while let Some(url) = next_url.take() {
            let page = self.fetch_page(url.as_str()).await?;
            pages = pages.saturating_add(1);
            debug!(page = pages, devices = page.value.len(), "fetched Graph device page");

            for device in page.value {
                devices.push(DeviceRecord::new(
                    device.id,
                    device.display_name.unwrap_or_default(),
                    device.approximate_last_sign_in_date_time,
                )?);
            }
            next_url = page.next_link;
        }

        info!(
            cutoff = %cutoff,
            pages = pages,
            candidates = devices.len(),
            "listed stale devices"
        );

        Ok(devices)
    }

    async fn delete_device(&self, id: &DeviceId) -> AppResult<()> {
        let url = self.devices_url(Some(id))?;
        let response = self
            .send_with_retry("delete device", |client| client.delete(url.clone()))
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<response body unavailable>".to_owned());
        Err(classify_failure(
            status,
            body.as_str(),
            format!("delete device '{id}'").as_str(),
        ))
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|seconds| Duration::from_secs(seconds.min(MAX_RETRY_AFTER_SECONDS)))
}

fn classify_failure(status: StatusCode, body: &str, operation: &str) -> AppError {
    let graph_error = serde_json::from_str::<GraphErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);
    let detail = graph_error.as_ref().map_or_else(
        || body.to_owned(),
        |error| format!("{}: {}", error.code, error.message),
    );
    let message = format!("{operation} failed with status {}: {detail}", status.as_u16());

    let resource_missing = graph_error
        .as_ref()
        .is_some_and(|error| error.code == RESOURCE_NOT_FOUND_CODE);

    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ if resource_missing => AppError::NotFound(message),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::Internal(message),
    }
}
