#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use clap_complete;
pub use k8s_openapi;
pub use kube;

pub mod catalog;
pub use catalog::{CatalogSource, Discovered, GroupVersion, GroupVersionBucket, ResourceDescriptor};
pub mod claputil;
pub use claputil::{api_group_value_completer, context_value_completer};
pub mod discover;
pub mod error;
pub use error::{DiscoveryError, Error};
pub mod filter;
pub use filter::{FilteredEntry, ResourceFilter};
pub mod output;
pub use output::{OutputOptions, RenderFormat, ResourcePrinter};
pub mod pipeline;
pub use pipeline::{ApiResourcesArgs, ApiResourcesOptions};
pub mod retry;
pub mod sort;
pub use sort::SortKey;

use kube::config::Kubeconfig;

/// Detects the Kubernetes context based on the provided `context` argument.
///
/// Context determination follows this priority:
/// 1. Uses the context if explicitly specified.
/// 2. Retrieves the current context from the kubeconfig file.
///
/// # Errors
/// Returns an error if the kubeconfig file cannot be read or if no current context is set in the kubeconfig.
pub fn determine_context(context: &Option<String>) -> anyhow::Result<String> {
    match context {
        Some(context) => Ok(context.to_string()),
        _ => {
            let kubeconfig = Kubeconfig::read()?;
            Ok(kubeconfig
                .current_context
                .ok_or_else(|| anyhow::anyhow!("current_context is not set"))?)
        }
    }
}

/// Builds a client for `context` from the active kubeconfig.
pub async fn client_for_context(context: &str) -> anyhow::Result<kube::Client> {
    let options = kube::config::KubeConfigOptions {
        context: Some(context.to_string()),
        ..Default::default()
    };
    let config = kube::Config::from_kubeconfig(&options).await?;
    Ok(kube::Client::try_from(config)?)
}
