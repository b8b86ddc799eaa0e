//! Mock cloud client for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rgsweep_api::{ChildResource, LockInfo, LockLevel, ResourceGroupView, SubscriptionInfo};
use rgsweep_util::GroupName;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{CloudClient, CloudError, CloudResult, CloudStream};

/// A resource group as seen by the mock, with its locks and contents
#[derive(Debug, Clone)]
pub struct MockGroup {
    pub view: ResourceGroupView,
    pub locks: Vec<LockInfo>,
    pub children: Vec<ChildResource>,
    pub fail_locks: bool,
    pub fail_children: bool,
}

impl MockGroup {
    pub fn new(view: ResourceGroupView) -> Self {
        Self {
            view,
            locks: Vec::new(),
            children: Vec::new(),
            fail_locks: false,
            fail_children: false,
        }
    }

    pub fn with_lock(mut self, level: LockLevel) -> Self {
        self.locks.push(LockInfo::new(level));
        self
    }

    pub fn with_child(mut self, created_on: Option<DateTime<Utc>>) -> Self {
        let id = format!("{}/providers/Mock.Provider/items/item{}", self.view.id, self.children.len());
        self.children.push(ChildResource::new(id, created_on));
        self
    }

    /// Lock listing for this group yields a transport error
    pub fn failing_locks(mut self) -> Self {
        self.fail_locks = true;
        self
    }

    /// Child listing for this group yields a transport error
    pub fn failing_children(mut self) -> Self {
        self.fail_children = true;
        self
    }
}

/// Mock cloud client for unit/integration testing
pub struct MockCloud {
    subscription: SubscriptionInfo,
    groups: Arc<Mutex<Vec<MockGroup>>>,
    child_pulls: AtomicUsize,

    /// Groups successfully deleted, in order
    pub deleted: Arc<Mutex<Vec<GroupName>>>,

    /// Every successful tag write, in order
    pub tag_writes: Arc<Mutex<Vec<(GroupName, HashMap<String, String>)>>>,

    /// Groups whose locks were queried, in order
    pub lock_queries: Arc<Mutex<Vec<GroupName>>>,

    /// Configure subscription lookup to fail
    pub fail_subscription: Arc<Mutex<bool>>,

    /// Configure group enumeration to fail after this many groups
    pub fail_listing_after: Arc<Mutex<Option<usize>>>,

    /// Groups whose tag write fails
    pub fail_tags: Arc<Mutex<Vec<GroupName>>>,

    /// Groups whose delete fails
    pub fail_delete: Arc<Mutex<Vec<GroupName>>>,

    /// Artificial latency for delete calls
    pub delete_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self {
            subscription: SubscriptionInfo {
                subscription_id: "00000000-0000-0000-0000-000000000000".into(),
                display_name: "mock subscription".into(),
            },
            groups: Arc::new(Mutex::new(Vec::new())),
            child_pulls: AtomicUsize::new(0),
            deleted: Arc::new(Mutex::new(Vec::new())),
            tag_writes: Arc::new(Mutex::new(Vec::new())),
            lock_queries: Arc::new(Mutex::new(Vec::new())),
            fail_subscription: Arc::new(Mutex::new(false)),
            fail_listing_after: Arc::new(Mutex::new(None)),
            fail_tags: Arc::new(Mutex::new(Vec::new())),
            fail_delete: Arc::new(Mutex::new(Vec::new())),
            delete_delay: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_group(self, group: MockGroup) -> Self {
        self.add_group(group);
        self
    }

    pub fn add_group(&self, group: MockGroup) {
        self.groups.lock().unwrap().push(group);
    }

    /// Names of groups still present
    pub fn remaining_groups(&self) -> Vec<GroupName> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .map(|g| g.view.name.clone())
            .collect()
    }

    /// Current tags on a group
    pub fn tags_of(&self, name: &str) -> Option<HashMap<String, String>> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.view.name.as_str() == name)
            .and_then(|g| g.view.tags.clone())
    }

    pub fn deleted_groups(&self) -> Vec<GroupName> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn tag_write_count(&self) -> usize {
        self.tag_writes.lock().unwrap().len()
    }

    pub fn lock_query_count(&self) -> usize {
        self.lock_queries.lock().unwrap().len()
    }

    /// Number of child resources pulled from listing streams so far
    pub fn child_pulls(&self) -> usize {
        self.child_pulls.load(Ordering::SeqCst)
    }

    pub fn set_delete_delay(&self, delay: Option<Duration>) {
        *self.delete_delay.lock().unwrap() = delay;
    }

    fn find(&self, name: &GroupName) -> Option<MockGroup> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| &g.view.name == name)
            .cloned()
    }
}

impl Default for MockCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudClient for MockCloud {
    async fn default_subscription(&self) -> CloudResult<SubscriptionInfo> {
        if *self.fail_subscription.lock().unwrap() {
            return Err(CloudError::api("get subscription", 403, "AuthorizationFailed", "Mock subscription failure"));
        }
        Ok(self.subscription.clone())
    }

    fn list_resource_groups(&self) -> CloudStream<'_, ResourceGroupView> {
        let views: Vec<ResourceGroupView> = self
            .groups
            .lock()
            .unwrap()
            .iter()
            .map(|g| g.view.clone())
            .collect();

        let mut items: Vec<CloudResult<ResourceGroupView>> = views.into_iter().map(Ok).collect();
        if let Some(after) = *self.fail_listing_after.lock().unwrap() {
            items.truncate(after);
            items.push(Err(CloudError::transport("list resource groups", "Mock listing failure")));
        }

        stream::iter(items).boxed()
    }

    fn list_locks<'a>(&'a self, group: &ResourceGroupView) -> CloudStream<'a, LockInfo> {
        self.lock_queries.lock().unwrap().push(group.name.clone());

        match self.find(&group.name) {
            Some(g) if g.fail_locks => {
                stream::once(async { Err(CloudError::transport("list locks", "Mock lock failure")) }).boxed()
            }
            Some(g) => stream::iter(g.locks.into_iter().map(Ok)).boxed(),
            None => stream::once(async { Err(CloudError::api("list locks", 404, "ResourceGroupNotFound", "Mock group not found")) }).boxed(),
        }
    }

    fn list_child_resources<'a>(&'a self, group: &ResourceGroupView) -> CloudStream<'a, ChildResource> {
        let Some(g) = self.find(&group.name) else {
            return stream::once(async {
                Err(CloudError::api("list resources", 404, "ResourceGroupNotFound", "Mock group not found"))
            })
            .boxed();
        };

        if g.fail_children {
            return stream::once(async { Err(CloudError::transport("list resources", "Mock resource listing failure")) }).boxed();
        }

        // Counted as they are pulled so callers can observe early termination
        let pulls = &self.child_pulls;
        stream::iter(g.children)
            .map(move |child| {
                pulls.fetch_add(1, Ordering::SeqCst);
                Ok(child)
            })
            .boxed()
    }

    async fn set_tags(&self, group: &ResourceGroupView, tags: HashMap<String, String>) -> CloudResult<()> {
        if self.fail_tags.lock().unwrap().contains(&group.name) {
            return Err(CloudError::api("update tags", 409, "Conflict", "Mock tag failure"));
        }

        let mut groups = self.groups.lock().unwrap();
        let Some(g) = groups.iter_mut().find(|g| g.view.name == group.name) else {
            return Err(CloudError::api("update tags", 404, "ResourceGroupNotFound", "Mock group not found"));
        };
        g.view.tags = Some(tags.clone());
        self.tag_writes.lock().unwrap().push((group.name.clone(), tags));
        Ok(())
    }

    async fn delete_resource_group(&self, group: &ResourceGroupView) -> CloudResult<()> {
        let delay = *self.delete_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_delete.lock().unwrap().contains(&group.name) {
            return Err(CloudError::OperationFailed {
                operation: "delete resource group",
                status: "Failed".into(),
                message: "Mock delete failure".into(),
            });
        }

        let mut groups = self.groups.lock().unwrap();
        let before = groups.len();
        groups.retain(|g| g.view.name != group.name);
        if groups.len() == before {
            return Err(CloudError::api("delete resource group", 404, "ResourceGroupNotFound", "Mock group not found"));
        }
        self.deleted.lock().unwrap().push(group.name.clone());
        Ok(())
    }
}
