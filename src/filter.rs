use crate::catalog::{GroupVersion, GroupVersionBucket, ResourceDescriptor};

/// A resource that survived filtering, together with the group-version it was
/// reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredEntry {
    /// Parsed group name, empty for the core group.
    pub group: String,
    /// Canonical group-version string, e.g. `apps/v1` or `v1`.
    pub group_version: String,
    pub resource: ResourceDescriptor,
}

impl FilteredEntry {
    /// `<name>.<group>`, or just `<name>` for the core group.
    pub fn qualified_name(&self) -> String {
        if self.group.is_empty() {
            self.resource.name.clone()
        } else {
            format!("{}.{}", self.resource.name, self.group)
        }
    }
}

/// Predicates applied to every discovered resource. All active predicates
/// must hold for a resource to be kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    /// Exact API group to keep. `None` keeps every group.
    pub api_group: Option<String>,
    /// Scope to keep. `None` keeps both namespaced and cluster-scoped resources.
    pub namespaced: Option<bool>,
    /// Verbs every kept resource must support.
    pub verbs: Vec<String>,
    /// Categories every kept resource must belong to.
    pub categories: Vec<String>,
}

impl ResourceFilter {
    pub fn with_api_group(mut self, group: impl Into<String>) -> Self {
        self.api_group = Some(group.into());
        self
    }

    pub fn with_namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = Some(namespaced);
        self
    }

    pub fn with_verbs<I, S>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verbs = verbs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Checks a single resource reported under `group`.
    pub fn matches(&self, group: &str, resource: &ResourceDescriptor) -> bool {
        if resource.verbs.is_empty() {
            return false;
        }
        if self.api_group.as_deref().is_some_and(|g| g != group) {
            return false;
        }
        if self.namespaced.is_some_and(|ns| ns != resource.namespaced) {
            return false;
        }
        resource.supports_all_verbs(&self.verbs) && resource.in_all_categories(&self.categories)
    }

    /// Flattens the buckets into the entries that pass the filter, in the
    /// order the buckets and their resources were reported.
    ///
    /// Buckets with an unparsable group-version are skipped.
    pub fn apply(&self, buckets: &[GroupVersionBucket]) -> Vec<FilteredEntry> {
        let mut entries = Vec::new();
        for bucket in buckets {
            if bucket.is_empty() {
                continue;
            }
            let gv: GroupVersion = match bucket.group_version().parse() {
                Ok(gv) => gv,
                Err(err) => {
                    tracing::debug!(%err, "skipping resource list");
                    continue;
                }
            };
            let group_version = gv.to_string();
            entries.extend(
                bucket
                    .resources()
                    .iter()
                    .filter(|resource| self.matches(&gv.group, resource))
                    .map(|resource| FilteredEntry {
                        group: gv.group.clone(),
                        group_version: group_version.clone(),
                        resource: resource.clone(),
                    }),
            );
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, kind: &str, namespaced: bool, verbs: &[&str]) -> ResourceDescriptor {
        ResourceDescriptor {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced,
            verbs: verbs.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    fn catalog() -> Vec<GroupVersionBucket> {
        let mut pods = resource("pods", "Pod", true, &["get", "list", "delete"]);
        pods.categories = vec!["all".into()];
        let mut deployments = resource("deployments", "Deployment", true, &["get", "list"]);
        deployments.categories = vec!["all".into()];
        vec![
            GroupVersionBucket::new(
                "v1",
                [
                    pods,
                    resource("namespaces", "Namespace", false, &["get", "list"]),
                ],
            ),
            GroupVersionBucket::new("apps/v1", [deployments]),
            GroupVersionBucket::new(
                "rbac.authorization.k8s.io/v1",
                [resource("clusterroles", "ClusterRole", false, &["get"])],
            ),
        ]
    }

    fn names(entries: &[FilteredEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.resource.name.as_str()).collect()
    }

    #[test]
    fn keeps_everything_without_predicates() {
        let entries = ResourceFilter::default().apply(&catalog());
        assert_eq!(
            names(&entries),
            vec!["pods", "namespaces", "deployments", "clusterroles"]
        );
        assert_eq!(entries[0].group, "");
        assert_eq!(entries[0].group_version, "v1");
        assert_eq!(entries[2].group, "apps");
        assert_eq!(entries[2].group_version, "apps/v1");
    }

    #[test]
    fn filters_by_exact_group() {
        let entries = ResourceFilter::default()
            .with_api_group("apps")
            .apply(&catalog());
        assert_eq!(names(&entries), vec!["deployments"]);

        let entries = ResourceFilter::default()
            .with_api_group("apps/v1")
            .apply(&catalog());
        assert!(entries.is_empty());

        let entries = ResourceFilter::default().with_api_group("").apply(&catalog());
        assert_eq!(names(&entries), vec!["pods", "namespaces"]);
    }

    #[test]
    fn filters_by_scope() {
        let namespaced = ResourceFilter::default()
            .with_namespaced(true)
            .apply(&catalog());
        assert_eq!(names(&namespaced), vec!["pods", "deployments"]);

        let cluster = ResourceFilter::default()
            .with_namespaced(false)
            .apply(&catalog());
        assert_eq!(names(&cluster), vec!["namespaces", "clusterroles"]);
    }

    #[test]
    fn requires_all_verbs_and_categories() {
        let entries = ResourceFilter::default()
            .with_verbs(["get", "delete"])
            .apply(&catalog());
        assert_eq!(names(&entries), vec!["pods"]);

        let entries = ResourceFilter::default()
            .with_categories(["all"])
            .apply(&catalog());
        assert_eq!(names(&entries), vec!["pods", "deployments"]);

        let entries = ResourceFilter::default()
            .with_verbs(["list"])
            .with_categories(["all"])
            .with_namespaced(true)
            .with_api_group("apps")
            .apply(&catalog());
        assert_eq!(names(&entries), vec!["deployments"]);
    }

    #[test]
    fn every_entry_satisfies_active_predicates() {
        let filters = [
            ResourceFilter::default().with_namespaced(false),
            ResourceFilter::default().with_verbs(["get"]),
            ResourceFilter::default().with_api_group("").with_categories(["all"]),
            ResourceFilter::default().with_verbs(["list"]).with_namespaced(true),
        ];
        for filter in filters {
            for entry in filter.apply(&catalog()) {
                assert!(filter.matches(&entry.group, &entry.resource), "{filter:?}");
                assert!(!entry.resource.verbs.is_empty());
            }
        }
    }

    #[test]
    fn skips_malformed_group_versions() {
        let mut buckets = catalog();
        buckets.insert(
            0,
            GroupVersionBucket::new(
                "metrics.k8s.io/v1beta1/extra",
                [resource("nodes", "NodeMetrics", false, &["get"])],
            ),
        );
        let entries = ResourceFilter::default().apply(&buckets);
        assert_eq!(
            names(&entries),
            vec!["pods", "namespaces", "deployments", "clusterroles"]
        );
    }

    #[test]
    fn empty_catalog_yields_no_entries() {
        assert!(ResourceFilter::default().apply(&[]).is_empty());
    }

    #[test]
    fn qualified_names() {
        let entries = ResourceFilter::default().apply(&catalog());
        assert_eq!(entries[0].qualified_name(), "pods");
        assert_eq!(entries[2].qualified_name(), "deployments.apps");
    }
}
