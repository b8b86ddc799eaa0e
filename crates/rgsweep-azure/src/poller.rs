//! Long-running operation polling for resource group deletion

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use rgsweep_cloud_api::{CloudError, CloudResult};
use rgsweep_util::error_chain;
use std::time::Duration;
use tracing::debug;

use crate::client::{ArmClient, api_error};
use crate::wire::AsyncOperationStatus;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Interval used when the service sends no usable `Retry-After`
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Where to poll for the outcome of an accepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollTarget {
    /// Status resource returning `{ "status": ... }`
    AsyncOperation(String),
    /// Original resource location, 202 until done
    Location(String),
}

impl PollTarget {
    fn url(&self) -> &str {
        match self {
            PollTarget::AsyncOperation(url) | PollTarget::Location(url) => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OperationState {
    InProgress,
    Succeeded,
    Failed(String),
}

/// `Azure-AsyncOperation` is preferred over `Location` when both are present
pub(crate) fn poll_target(headers: &HeaderMap) -> Option<PollTarget> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header(AZURE_ASYNC_OPERATION)
        .map(PollTarget::AsyncOperation)
        .or_else(|| header(LOCATION.as_str()).map(PollTarget::Location))
}

/// Delay requested by the service, in whole seconds
pub(crate) fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or(DEFAULT_POLL_INTERVAL)
}

pub(crate) fn operation_state(status: &str) -> OperationState {
    if status.eq_ignore_ascii_case("succeeded") {
        OperationState::Succeeded
    } else if status.eq_ignore_ascii_case("failed") || status.eq_ignore_ascii_case("canceled") {
        OperationState::Failed(status.to_string())
    } else {
        OperationState::InProgress
    }
}

/// Poll an accepted request until it reaches a terminal state
pub(crate) async fn wait_for_completion(
    client: &ArmClient,
    accepted: &HeaderMap,
    operation: &'static str,
) -> CloudResult<()> {
    let Some(target) = poll_target(accepted) else {
        debug!(operation, "Accepted without a status URL, treating as complete");
        return Ok(());
    };

    let mut delay = retry_after(accepted);
    loop {
        debug!(operation, delay_secs = delay.as_secs(), "Waiting for long-running operation");
        tokio::time::sleep(delay).await;

        let response = client.authorized_get(target.url(), operation).await?;
        let status = response.status();
        delay = retry_after(response.headers());

        match &target {
            PollTarget::AsyncOperation(_) => {
                if !status.is_success() {
                    return Err(api_error(operation, response).await);
                }
                let body: AsyncOperationStatus = response
                    .json()
                    .await
                    .map_err(|e| CloudError::decode(operation, error_chain(&e)))?;

                match operation_state(&body.status) {
                    OperationState::InProgress => continue,
                    OperationState::Succeeded => return Ok(()),
                    OperationState::Failed(state) => {
                        let message = body
                            .error
                            .map(|e| format!("{}: {}", e.code, e.message))
                            .unwrap_or_default();
                        return Err(CloudError::OperationFailed {
                            operation,
                            status: state,
                            message,
                        });
                    }
                }
            }
            PollTarget::Location(_) => {
                if status == StatusCode::ACCEPTED {
                    continue;
                }
                if status.is_success() {
                    return Ok(());
                }
                return Err(api_error(operation, response).await);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn prefers_async_operation_header() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("https://arm/location"));
        assert_eq!(
            poll_target(&headers),
            Some(PollTarget::Location("https://arm/location".into()))
        );

        headers.insert("azure-asyncoperation", HeaderValue::from_static("https://arm/op"));
        assert_eq!(
            poll_target(&headers),
            Some(PollTarget::AsyncOperation("https://arm/op".into()))
        );

        assert_eq!(poll_target(&HeaderMap::new()), None);
    }

    #[test]
    fn retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), DEFAULT_POLL_INTERVAL);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        assert_eq!(retry_after(&headers), Duration::from_secs(5));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("0"));
        assert_eq!(retry_after(&headers), Duration::from_secs(1));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn operation_states() {
        assert_eq!(operation_state("InProgress"), OperationState::InProgress);
        assert_eq!(operation_state("Succeeded"), OperationState::Succeeded);
        assert_eq!(
            operation_state("Canceled"),
            OperationState::Failed("Canceled".into())
        );
        assert_eq!(
            operation_state("Failed"),
            OperationState::Failed("Failed".into())
        );
    }
}
