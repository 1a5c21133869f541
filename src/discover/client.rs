use std::collections::HashSet;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIGroup, APIResourceList};
use kube::{Client, Error as KubeError};

use crate::{
    catalog::{CatalogSource, Discovered, GroupVersionBucket, ResourceDescriptor},
    error::DiscoveryError,
    retry::{RetryPolicy, retry_with_policy},
};

/// Live [`CatalogSource`] backed by the discovery endpoints of a cluster.
///
/// The core group is listed first, followed by every API group in the order
/// the server reports them. Within a group the preferred version comes first;
/// other versions only contribute resources the group did not serve yet.
#[derive(Clone)]
pub struct DiscoverClient {
    client: Client,
    retry: RetryPolicy,
}

impl DiscoverClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetches the preferred resources of every group.
    ///
    /// A group-version whose resources cannot be fetched is reported in the
    /// returned error while the remaining ones are still fetched.
    pub async fn server_preferred_resources(&self) -> Discovered {
        let mut buckets = Vec::new();
        let mut errors = Vec::new();
        let mut failed_groups = Vec::new();

        match retry_with_policy(&self.retry, || self.client.list_core_api_versions()).await {
            Ok(core) => {
                let mut seen = HashSet::new();
                for version in &core.versions {
                    match retry_with_policy(&self.retry, || {
                        self.client.list_core_api_resources(version)
                    })
                    .await
                    {
                        Ok(list) => push_unseen(&mut buckets, list, &mut seen),
                        Err(err) => failed_groups.push((version.clone(), err)),
                    }
                }
            }
            Err(err) => errors.push(DiscoveryError::ListGroups(err)),
        }

        match retry_with_policy(&self.retry, || self.client.list_api_groups()).await {
            Ok(groups) => {
                for group in &groups.groups {
                    self.fetch_group(group, &mut buckets, &mut failed_groups)
                        .await;
                }
            }
            Err(err) => errors.push(DiscoveryError::ListGroups(err)),
        }

        if !failed_groups.is_empty() {
            tracing::warn!(
                failed = failed_groups.len(),
                "some API groups could not be discovered"
            );
            errors.push(DiscoveryError::GroupsFailed(failed_groups));
        }

        tracing::debug!(group_versions = buckets.len(), "discovered API resources");
        Discovered {
            buckets,
            error: DiscoveryError::aggregate(errors),
        }
    }

    async fn fetch_group(
        &self,
        group: &APIGroup,
        buckets: &mut Vec<GroupVersionBucket>,
        failed_groups: &mut Vec<(String, KubeError)>,
    ) {
        let Some(preferred) = group
            .preferred_version
            .as_ref()
            .or_else(|| group.versions.first())
        else {
            tracing::debug!(group = %group.name, "group has no versions");
            return;
        };
        let versions = std::iter::once(preferred).chain(
            group
                .versions
                .iter()
                .filter(|version| version.group_version != preferred.group_version),
        );

        let mut seen = HashSet::new();
        for version in versions {
            let group_version = version.group_version.as_str();
            match retry_with_policy(&self.retry, || {
                self.client.list_api_group_resources(group_version)
            })
            .await
            {
                Ok(list) => push_unseen(buckets, list, &mut seen),
                Err(err) => failed_groups.push((group_version.to_string(), err)),
            }
        }
    }
}

/// Appends the resources of `list` whose names are not in `seen` yet.
/// Subresources such as `pods/log` are not listed as separate types.
fn push_unseen(
    buckets: &mut Vec<GroupVersionBucket>,
    list: APIResourceList,
    seen: &mut HashSet<String>,
) {
    let bucket = GroupVersionBucket::new(
        list.group_version,
        list.resources
            .into_iter()
            .map(ResourceDescriptor::from)
            .filter(|resource| !resource.is_subresource() && seen.insert(resource.name.clone())),
    );
    if !bucket.is_empty() {
        buckets.push(bucket);
    }
}

impl CatalogSource for DiscoverClient {
    async fn fetch_preferred_resources(&mut self) -> Discovered {
        self.server_preferred_resources().await
    }

    /// Every fetch already goes to the server.
    fn invalidate(&mut self) {}
}
