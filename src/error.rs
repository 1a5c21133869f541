use std::io;

use kube::Error as KubeError;

/// Errors raised by the api-resources pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `--sort-by` was given a value other than `name` or `kind`.
    #[error("--sort-by accepts only name or kind, got {0:?}")]
    InvalidSortKey(String),

    /// No printer accepts the requested output format.
    #[error(
        "unable to match a printer suitable for the output format {format:?}, allowed formats are: {}",
        .allowed.join(",")
    )]
    NoCompatiblePrinter {
        format: String,
        allowed: Vec<&'static str>,
    },

    /// Positional arguments were passed to a command that takes none.
    #[error("unexpected arguments: {}", .0.join(" "))]
    UnexpectedArguments(Vec<String>),

    /// The catalog source could not return the complete list of resources.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),

    #[error("failed to encode output as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode output as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether the error was caused by invalid configuration.
    /// Configuration errors are detected before any discovery request is sent.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::InvalidSortKey(_)
                | Error::NoCompatiblePrinter { .. }
                | Error::UnexpectedArguments(_)
        )
    }
}

/// Failures reported by a [`crate::catalog::CatalogSource`].
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The list of API groups (or core versions) itself could not be fetched.
    #[error("failed to list server API groups: {0}")]
    ListGroups(#[source] KubeError),

    /// Some group-versions failed; the others were returned.
    #[error(
        "unable to retrieve the complete list of server APIs: {}",
        join_group_failures(.0)
    )]
    GroupsFailed(Vec<(String, KubeError)>),

    /// Several unrelated failures happened during one fetch.
    #[error("{}", join_errors(.0))]
    Aggregate(Vec<DiscoveryError>),

    /// Any other failure of a non-kube source.
    #[error("{0}")]
    Other(String),
}

impl DiscoveryError {
    /// Combines the collected failures of one fetch into a single error.
    pub fn aggregate(mut errors: Vec<DiscoveryError>) -> Option<DiscoveryError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(DiscoveryError::Aggregate(errors)),
        }
    }
}

fn join_group_failures(failures: &[(String, KubeError)]) -> String {
    failures
        .iter()
        .map(|(group_version, err)| format!("{group_version}: {err}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_errors(errors: &[DiscoveryError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
