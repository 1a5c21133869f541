use std::io::{BufWriter, Write};

use crate::{
    catalog::CatalogSource,
    error::Error,
    filter::ResourceFilter,
    output::{OutputOptions, ResourcePrinter},
    sort::{SortKey, sort_entries},
};

/// Raw settings of one api-resources invocation, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiResourcesArgs {
    /// Empty keeps every group.
    pub api_group: String,
    pub namespaced: Option<bool>,
    pub verbs: Vec<String>,
    pub categories: Vec<String>,
    /// One of `""`, `name` or `kind`.
    pub sort_by: String,
    /// Serve the catalog from the cache when it is fresh.
    pub cached: bool,
    pub output: OutputOptions,
    /// Positional arguments; the command takes none.
    pub args: Vec<String>,
}

/// Validated settings of one invocation.
pub struct ApiResourcesOptions {
    pub filter: ResourceFilter,
    pub sort_by: SortKey,
    pub cached: bool,
    printer: Box<dyn ResourcePrinter>,
}

impl TryFrom<ApiResourcesArgs> for ApiResourcesOptions {
    type Error = Error;

    /// Rejects positional arguments, unknown sort keys and unknown output
    /// formats. Nothing is fetched here.
    fn try_from(args: ApiResourcesArgs) -> Result<Self, Self::Error> {
        if !args.args.is_empty() {
            return Err(Error::UnexpectedArguments(args.args));
        }
        let sort_by = args.sort_by.parse()?;
        let printer = args.output.to_printer()?;

        Ok(Self {
            filter: ResourceFilter {
                api_group: Some(args.api_group).filter(|group| !group.is_empty()),
                namespaced: args.namespaced,
                verbs: args.verbs,
                categories: args.categories,
            },
            sort_by,
            cached: args.cached,
            printer,
        })
    }
}

impl ApiResourcesOptions {
    pub fn printer(&self) -> &dyn ResourcePrinter {
        self.printer.as_ref()
    }

    /// Fetches, filters, sorts and prints the catalog of `source` into `out`.
    ///
    /// A discovery failure does not stop the entries that were fetched from
    /// being printed; it is returned once the output has been written. Write
    /// failures abort immediately.
    pub async fn run<S, W>(&self, source: &mut S, out: W) -> Result<(), Error>
    where
        S: CatalogSource,
        W: Write,
    {
        let mut out = BufWriter::new(out);

        if !self.cached {
            source.invalidate();
        }

        let discovered = source.fetch_preferred_resources().await;
        if let Some(err) = &discovered.error {
            tracing::warn!("continuing with partial discovery results: {err}");
        }

        let mut entries = self.filter.apply(&discovered.buckets);
        sort_entries(&mut entries, self.sort_by);
        tracing::debug!(
            entries = entries.len(),
            sort_by = %self.sort_by,
            format = %self.printer.render_format(),
            "printing API resources"
        );

        self.printer.print(&entries, &mut out)?;
        out.flush()?;

        match discovered.error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Discovered, GroupVersionBucket, ResourceDescriptor},
        error::DiscoveryError,
    };

    #[derive(Default)]
    struct StaticCatalog {
        buckets: Vec<GroupVersionBucket>,
        error: Option<String>,
        fetches: usize,
        invalidations: usize,
    }

    impl CatalogSource for StaticCatalog {
        async fn fetch_preferred_resources(&mut self) -> Discovered {
            self.fetches += 1;
            Discovered {
                buckets: self.buckets.clone(),
                error: self.error.clone().map(DiscoveryError::Other),
            }
        }

        fn invalidate(&mut self) {
            self.invalidations += 1;
        }
    }

    fn resource(name: &str, kind: &str, namespaced: bool) -> ResourceDescriptor {
        ResourceDescriptor {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced,
            verbs: vec!["get".into(), "list".into()],
            ..Default::default()
        }
    }

    fn cluster() -> StaticCatalog {
        StaticCatalog {
            buckets: vec![
                GroupVersionBucket::new("apps/v1", [resource("deployments", "Deployment", true)]),
                GroupVersionBucket::new("v1", [resource("namespaces", "Namespace", false)]),
            ],
            ..Default::default()
        }
    }

    fn options(args: ApiResourcesArgs) -> ApiResourcesOptions {
        ApiResourcesOptions::try_from(args).expect("valid options")
    }

    async fn run(args: ApiResourcesArgs, source: &mut StaticCatalog) -> (String, Result<(), Error>) {
        let mut out = Vec::new();
        let result = options(args).run(source, &mut out).await;
        (String::from_utf8(out).unwrap(), result)
    }

    fn first_column(output: &str) -> Vec<&str> {
        output
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .collect()
    }

    #[tokio::test]
    async fn orders_by_group_by_default() {
        let (output, result) = run(ApiResourcesArgs::default(), &mut cluster()).await;
        result.unwrap();
        assert_eq!(first_column(&output), vec!["NAME", "namespaces", "deployments"]);
        let rows: Vec<Vec<&str>> = output
            .lines()
            .map(|line| line.split_whitespace().collect())
            .collect();
        assert_eq!(rows[1], vec!["namespaces", "v1", "false", "Namespace"]);
        assert_eq!(rows[2], vec!["deployments", "apps/v1", "true", "Deployment"]);
    }

    #[tokio::test]
    async fn filters_namespaced_resources() {
        let args = ApiResourcesArgs {
            namespaced: Some(true),
            ..Default::default()
        };
        let (output, result) = run(args, &mut cluster()).await;
        result.unwrap();
        assert_eq!(first_column(&output), vec!["NAME", "deployments"]);
    }

    #[tokio::test]
    async fn prints_headers_when_nothing_matches() {
        let args = ApiResourcesArgs {
            verbs: vec!["delete".into()],
            ..Default::default()
        };
        let (output, result) = run(args, &mut cluster()).await;
        result.unwrap();
        assert_eq!(first_column(&output), vec!["NAME"]);

        let args = ApiResourcesArgs {
            verbs: vec!["delete".into()],
            output: OutputOptions {
                format: "json".into(),
                no_headers: false,
            },
            ..Default::default()
        };
        let (output, result) = run(args, &mut cluster()).await;
        result.unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["resources"], serde_json::json!([]));
    }

    #[test]
    fn rejects_bad_configuration_before_fetching() {
        let err = ApiResourcesOptions::try_from(ApiResourcesArgs {
            sort_by: "bogus".into(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::InvalidSortKey(_)));

        let err = ApiResourcesOptions::try_from(ApiResourcesArgs {
            output: OutputOptions {
                format: "xml".into(),
                no_headers: false,
            },
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::NoCompatiblePrinter { .. }));

        let err = ApiResourcesOptions::try_from(ApiResourcesArgs {
            args: vec!["pods".into()],
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::UnexpectedArguments(_)));
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn prints_qualified_names() {
        let args = ApiResourcesArgs {
            output: OutputOptions {
                format: "name".into(),
                no_headers: false,
            },
            ..Default::default()
        };
        let (output, result) = run(args, &mut cluster()).await;
        result.unwrap();
        assert_eq!(output, "namespaces\ndeployments.apps\n");
    }

    #[tokio::test]
    async fn empty_group_filter_keeps_everything() {
        let opts = options(ApiResourcesArgs::default());
        assert_eq!(opts.filter.api_group, None);

        let args = ApiResourcesArgs {
            api_group: "apps".into(),
            output: OutputOptions {
                format: "name".into(),
                no_headers: false,
            },
            ..Default::default()
        };
        let (output, _) = run(args, &mut cluster()).await;
        assert_eq!(output, "deployments.apps\n");
    }

    #[tokio::test]
    async fn invalidates_unless_cached() {
        let mut source = cluster();
        run(ApiResourcesArgs::default(), &mut source).await.1.unwrap();
        assert_eq!(source.invalidations, 1);

        let args = ApiResourcesArgs {
            cached: true,
            ..Default::default()
        };
        run(args, &mut source).await.1.unwrap();
        assert_eq!(source.invalidations, 1);
        assert_eq!(source.fetches, 2);
    }

    #[tokio::test]
    async fn reports_fetch_errors_after_printing() {
        let mut source = cluster();
        source.error = Some("the server is currently unable to handle the request".into());
        let args = ApiResourcesArgs {
            sort_by: "name".into(),
            output: OutputOptions {
                format: "name".into(),
                no_headers: false,
            },
            ..Default::default()
        };
        let (output, result) = run(args, &mut source).await;
        assert_eq!(output, "deployments.apps\nnamespaces\n");
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
        assert!(!err.is_config());
    }

    #[tokio::test]
    async fn renders_empty_catalog() {
        let mut source = StaticCatalog::default();
        let (output, result) = run(ApiResourcesArgs::default(), &mut source).await;
        result.unwrap();
        assert_eq!(first_column(&output), vec!["NAME"]);

        let args = ApiResourcesArgs {
            output: OutputOptions {
                format: "yaml".into(),
                no_headers: false,
            },
            ..Default::default()
        };
        let (output, result) = run(args, &mut source).await;
        result.unwrap();
        let list: crate::output::ResourceList = serde_yaml::from_str(&output).unwrap();
        assert!(list.resources.is_empty());
    }
}
