//! Resource Manager REST client

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use rgsweep_api::{ChildResource, LockInfo, ResourceGroupView, SubscriptionInfo};
use rgsweep_cloud_api::{
    AccessToken, CloudClient, CloudError, CloudResult, CloudStream, TokenCredential,
};
use rgsweep_config::CleanupConfig;
use rgsweep_util::{error_chain, mask_identifier, system_now};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::AzureEndpoints;
use crate::poller;
use crate::wire::{
    ErrorResponse, GenericResourceWire, LockWire, Page, ResourceGroupWire, SubscriptionWire,
    TagsPatch,
};

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
const RESOURCE_GROUPS_API_VERSION: &str = "2022-09-01";
const LOCKS_API_VERSION: &str = "2016-09-01";
const RESOURCES_API_VERSION: &str = "2021-04-01";

/// Tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN_MINUTES: i64 = 5;

/// Resource Manager client bound to one subscription
pub struct ArmClient {
    http: reqwest::Client,
    base: Url,
    endpoints: AzureEndpoints,
    subscription_id: String,
    credential: Box<dyn TokenCredential>,
    token: Mutex<Option<AccessToken>>,
}

impl ArmClient {
    pub fn new(
        endpoints: AzureEndpoints,
        subscription_id: impl Into<String>,
        credential: Box<dyn TokenCredential>,
    ) -> CloudResult<Self> {
        let base = Url::parse(endpoints.resource_manager)
            .map_err(|e| CloudError::transport("configure client", e))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("rgsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CloudError::transport("configure client", error_chain(&e)))?;

        Ok(Self {
            http,
            base,
            endpoints,
            subscription_id: subscription_id.into(),
            credential,
            token: Mutex::new(None),
        })
    }

    /// Build a client for the configured cloud and acquire the first token.
    ///
    /// Credential failures surface here, before any group is touched.
    pub async fn connect(
        config: &CleanupConfig,
        credential: Box<dyn TokenCredential>,
    ) -> CloudResult<Self> {
        let endpoints = AzureEndpoints::for_instance(config.cloud_instance);
        let client = Self::new(endpoints, config.subscription_id.clone(), credential)?;
        client.bearer().await?;

        info!(
            cloud = %config.cloud_instance,
            endpoint = endpoints.resource_manager,
            subscription = %mask_identifier(&config.subscription_id),
            credential = client.credential.name(),
            "Connected to Resource Manager"
        );
        Ok(client)
    }

    pub fn endpoints(&self) -> &AzureEndpoints {
        &self.endpoints
    }

    /// Absolute URL under the management endpoint
    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> CloudResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CloudError::transport("build request", "management endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn group_url(
        &self,
        group: &ResourceGroupView,
        suffix: &[&str],
        query: &[(&str, &str)],
    ) -> CloudResult<Url> {
        let mut segments = vec!["subscriptions", self.subscription_id.as_str(), "resourcegroups", group.name.as_str()];
        segments.extend_from_slice(suffix);
        self.url(&segments, query)
    }

    async fn bearer(&self) -> CloudResult<String> {
        let mut cached = self.token.lock().await;

        let margin = chrono::Duration::minutes(TOKEN_REFRESH_MARGIN_MINUTES);
        match cached.as_ref() {
            Some(token) if !token.expires_within(margin, system_now()) => {
                return Ok(token.token.clone());
            }
            _ => {}
        }

        debug!(credential = self.credential.name(), "Refreshing access token");
        let token = self.credential.get_token(&self.endpoints.scope()).await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Send with a bearer token; non-success statuses become API errors
    async fn send(&self, request: RequestBuilder, operation: &'static str) -> CloudResult<Response> {
        let token = self.bearer().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CloudError::transport(operation, error_chain(&e)))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(operation, response).await)
        }
    }

    /// GET with a bearer token, returning the response whatever its status
    pub(crate) async fn authorized_get(&self, url: &str, operation: &'static str) -> CloudResult<Response> {
        let token = self.bearer().await?;
        self.http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CloudError::transport(operation, error_chain(&e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, operation: &'static str) -> CloudResult<T> {
        debug!(operation, url, "GET");
        let response = self.send(self.http.get(url), operation).await?;
        response
            .json()
            .await
            .map_err(|e| CloudError::decode(operation, error_chain(&e)))
    }

    /// Follow `nextLink` pages lazily, one request per page pulled
    fn paged<'a, W, T>(&'a self, first: CloudResult<Url>, operation: &'static str) -> CloudStream<'a, T>
    where
        W: DeserializeOwned + Into<T> + Send + 'a,
        T: Send + 'a,
    {
        let first = match first {
            Ok(url) => url.to_string(),
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        stream::try_unfold(Some(first), move |next| async move {
            let Some(url) = next else {
                return Ok::<_, CloudError>(None);
            };
            let page: Page<W> = self.get_json(&url, operation).await?;
            let next = page.next();
            Ok(Some((page.value, next)))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(|item| Ok::<T, CloudError>(item.into()))))
        .try_flatten()
        .boxed()
    }
}

/// Turn an unsuccessful response into an API error, decoding ARM's error body when present
pub(crate) async fn api_error(operation: &'static str, response: Response) -> CloudError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => CloudError::api(operation, status.as_u16(), parsed.error.code, parsed.error.message),
        Err(_) => CloudError::api(
            operation,
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            body,
        ),
    }
}

#[async_trait]
impl CloudClient for ArmClient {
    async fn default_subscription(&self) -> CloudResult<SubscriptionInfo> {
        let url = self.url(
            &["subscriptions", self.subscription_id.as_str()],
            &[("api-version", SUBSCRIPTIONS_API_VERSION)],
        )?;
        let wire: SubscriptionWire = self.get_json(url.as_str(), "get subscription").await?;
        Ok(wire.into())
    }

    fn list_resource_groups(&self) -> CloudStream<'_, ResourceGroupView> {
        let url = self.url(
            &["subscriptions", self.subscription_id.as_str(), "resourcegroups"],
            &[("api-version", RESOURCE_GROUPS_API_VERSION)],
        );
        self.paged::<ResourceGroupWire, _>(url, "list resource groups")
    }

    fn list_locks<'a>(&'a self, group: &ResourceGroupView) -> CloudStream<'a, LockInfo> {
        let url = self.group_url(
            group,
            &["providers", "Microsoft.Authorization", "locks"],
            &[("api-version", LOCKS_API_VERSION)],
        );
        self.paged::<LockWire, _>(url, "list locks")
    }

    fn list_child_resources<'a>(&'a self, group: &ResourceGroupView) -> CloudStream<'a, ChildResource> {
        let url = self.group_url(
            group,
            &["resources"],
            &[("$expand", "createdTime"), ("api-version", RESOURCES_API_VERSION)],
        );
        self.paged::<GenericResourceWire, _>(url, "list resources")
    }

    async fn set_tags(&self, group: &ResourceGroupView, tags: HashMap<String, String>) -> CloudResult<()> {
        let operation = "update tags";
        let url = self.group_url(group, &[], &[("api-version", RESOURCE_GROUPS_API_VERSION)])?;
        debug!(group = %group.name, "PATCH tags");
        self.send(self.http.patch(url).json(&TagsPatch { tags: &tags }), operation)
            .await?;
        Ok(())
    }

    async fn delete_resource_group(&self, group: &ResourceGroupView) -> CloudResult<()> {
        let operation = "delete resource group";
        let url = self.group_url(group, &[], &[("api-version", RESOURCE_GROUPS_API_VERSION)])?;
        debug!(group = %group.name, "DELETE");
        let response = self.send(self.http.delete(url), operation).await?;

        match response.status() {
            StatusCode::ACCEPTED => {
                let headers: HeaderMap = response.headers().clone();
                poller::wait_for_completion(self, &headers, operation).await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rgsweep_cloud_api::CredentialResult;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCredential {
        calls: Arc<AtomicUsize>,
        lifetime_minutes: i64,
    }

    #[async_trait]
    impl TokenCredential for CountingCredential {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn get_token(&self, _scope: &str) -> CredentialResult<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::new(
                format!("token-{}", n),
                Utc::now() + chrono::Duration::minutes(self.lifetime_minutes),
            ))
        }
    }

    fn test_client(lifetime_minutes: i64) -> (ArmClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let credential = CountingCredential {
            calls: calls.clone(),
            lifetime_minutes,
        };
        let client = ArmClient::new(
            AzureEndpoints::PUBLIC,
            "0f3c2a9e-1111-2222-3333-444455556666",
            Box::new(credential),
        )
        .unwrap();
        (client, calls)
    }

    #[test]
    fn builds_group_scoped_urls() {
        let (client, _) = test_client(60);
        let group = ResourceGroupView::new("my rg");

        let url = client
            .group_url(
                &group,
                &["providers", "Microsoft.Authorization", "locks"],
                &[("api-version", LOCKS_API_VERSION)],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/0f3c2a9e-1111-2222-3333-444455556666/resourcegroups/my%20rg/providers/Microsoft.Authorization/locks?api-version=2016-09-01"
        );

        let url = client
            .group_url(&group, &["resources"], &[("$expand", "createdTime"), ("api-version", RESOURCES_API_VERSION)])
            .unwrap();
        assert!(url.path().ends_with("/resourcegroups/my%20rg/resources"));
        assert!(url.query().unwrap().contains("createdTime"));
    }

    #[test]
    fn sovereign_cloud_base() {
        let client = ArmClient::new(
            AzureEndpoints::CHINA,
            "sub",
            Box::new(CountingCredential {
                calls: Arc::new(AtomicUsize::new(0)),
                lifetime_minutes: 60,
            }),
        )
        .unwrap();
        let url = client.url(&["subscriptions", "sub"], &[]).unwrap();
        assert_eq!(url.as_str(), "https://management.chinacloudapi.cn/subscriptions/sub");
        assert_eq!(client.endpoints().authority, "https://login.chinacloudapi.cn");
    }

    #[tokio::test]
    async fn transport_errors_keep_their_causes() {
        let endpoints = AzureEndpoints {
            resource_manager: "http://127.0.0.1:1",
            ..AzureEndpoints::PUBLIC
        };
        let client = ArmClient::new(
            endpoints,
            "sub",
            Box::new(CountingCredential {
                calls: Arc::new(AtomicUsize::new(0)),
                lifetime_minutes: 60,
            }),
        )
        .unwrap();

        let err = client
            .list_locks(&ResourceGroupView::new("g"))
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();

        match err {
            CloudError::Transport { operation, message } => {
                assert_eq!(operation, "list locks");
                // reqwest's own message only names the URL; the connect failure is in its sources
                assert!(message.contains("127.0.0.1:1"), "{}", message);
                assert!(message.to_lowercase().contains("connect"), "{}", message);
            }
            other => panic!("expected transport error, got {}", other),
        }
    }

    #[tokio::test]
    async fn token_is_cached_until_near_expiry() {
        let (client, calls) = test_client(60);
        assert_eq!(client.bearer().await.unwrap(), "token-0");
        assert_eq!(client.bearer().await.unwrap(), "token-0");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Tokens inside the refresh margin are replaced on every use
        let (client, calls) = test_client(2);
        assert_eq!(client.bearer().await.unwrap(), "token-0");
        assert_eq!(client.bearer().await.unwrap(), "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
