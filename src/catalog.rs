use std::{fmt, future::Future, str::FromStr};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};
use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

/// An API group and version, e.g. `apps/v1` or the core group's `v1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupVersion {
    /// Empty for the core group.
    pub group: String,
    pub version: String,
}

/// A group-version string with more than one `/`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected GroupVersion string: {0}")]
pub struct ParseGroupVersionError(String);

impl FromStr for GroupVersion {
    type Err = ParseGroupVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "/" {
            return Ok(GroupVersion::default());
        }
        match s.split_once('/') {
            None => Ok(GroupVersion {
                group: String::new(),
                version: s.to_string(),
            }),
            Some((group, version)) if !version.contains('/') => Ok(GroupVersion {
                group: group.to_string(),
                version: version.to_string(),
            }),
            Some(_) => Err(ParseGroupVersionError(s.to_string())),
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

/// One discoverable API resource, as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Plural name, unique within a group-version.
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub singular_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,
    pub kind: String,
    /// Group as reported by the server; informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Version as reported by the server; informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub namespaced: bool,
    /// In server order.
    pub verbs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

impl ResourceDescriptor {
    /// Whether every verb in `required` is supported.
    pub fn supports_all_verbs<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .all(|verb| self.verbs.iter().any(|v| v == verb.as_ref()))
    }

    /// Whether the resource belongs to every category in `required`.
    pub fn in_all_categories<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .all(|category| self.categories.iter().any(|c| c == category.as_ref()))
    }

    pub fn is_subresource(&self) -> bool {
        self.name.contains('/')
    }
}

impl From<APIResource> for ResourceDescriptor {
    fn from(resource: APIResource) -> Self {
        ResourceDescriptor {
            name: resource.name,
            singular_name: resource.singular_name,
            short_names: resource.short_names.unwrap_or_default(),
            kind: resource.kind,
            group: resource.group,
            version: resource.version,
            namespaced: resource.namespaced,
            verbs: resource.verbs,
            categories: resource.categories.unwrap_or_default(),
        }
    }
}

/// The resources a server reports under a single group-version.
///
/// Resources without any verb are dropped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawBucket")]
pub struct GroupVersionBucket {
    group_version: String,
    resources: Vec<ResourceDescriptor>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBucket {
    group_version: String,
    #[serde(default)]
    resources: Vec<ResourceDescriptor>,
}

impl From<RawBucket> for GroupVersionBucket {
    fn from(raw: RawBucket) -> Self {
        GroupVersionBucket::new(raw.group_version, raw.resources)
    }
}

impl GroupVersionBucket {
    pub fn new(
        group_version: impl Into<String>,
        resources: impl IntoIterator<Item = ResourceDescriptor>,
    ) -> Self {
        GroupVersionBucket {
            group_version: group_version.into(),
            resources: resources
                .into_iter()
                .filter(|resource| !resource.verbs.is_empty())
                .collect(),
        }
    }

    /// The group-version string exactly as the server reported it.
    pub fn group_version(&self) -> &str {
        &self.group_version
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl From<APIResourceList> for GroupVersionBucket {
    fn from(list: APIResourceList) -> Self {
        GroupVersionBucket::new(
            list.group_version,
            list.resources.into_iter().map(ResourceDescriptor::from),
        )
    }
}

/// Result of one catalog fetch.
///
/// A failed fetch may still carry the buckets that were fetched before (or
/// besides) the failure.
#[derive(Debug, Default)]
pub struct Discovered {
    pub buckets: Vec<GroupVersionBucket>,
    pub error: Option<DiscoveryError>,
}

impl Discovered {
    pub fn complete(buckets: Vec<GroupVersionBucket>) -> Self {
        Discovered {
            buckets,
            error: None,
        }
    }

    pub fn partial(buckets: Vec<GroupVersionBucket>, error: DiscoveryError) -> Self {
        Discovered {
            buckets,
            error: Some(error),
        }
    }
}

/// Supplier of the server's preferred resources, grouped by group-version.
pub trait CatalogSource {
    /// Fetches the preferred resource lists.
    fn fetch_preferred_resources(&mut self) -> impl Future<Output = Discovered>;

    /// Drops any cached data so the next fetch goes to the server.
    /// Calling it repeatedly has the same effect as calling it once.
    fn invalidate(&mut self);
}
