use std::{ffi::OsStr, path::PathBuf};

use clap_complete::engine::{ArgValueCompleter, CompletionCandidate};
use kube::config::Kubeconfig;

use crate::discover::{cached_api_groups, discovery_cache_path};

/// Create an `ArgValueCompleter` that lists contexts from the active kubeconfig.
pub fn context_value_completer() -> ArgValueCompleter {
    ArgValueCompleter::new(|input: &OsStr| -> Vec<CompletionCandidate> {
        let kubeconfig = match Kubeconfig::read() {
            Ok(config) => config,
            Err(_) => return Vec::new(),
        };

        // Convert OsStr to &str with trimmed whitespace
        let input = input.to_string_lossy();
        let input = input.trim();

        kubeconfig
            .contexts
            .iter()
            .filter(|named_context| named_context.name.starts_with(input))
            .map(|named_context| CompletionCandidate::new(named_context.name.as_str()))
            .collect()
    })
}

/// Create an `ArgValueCompleter` that lists API groups of the current context.
///
/// Candidates come from the discovery cache under `cache_dir` only; no live
/// discovery is performed. Returns no candidates when `cache_dir` is `None`,
/// no current context is set, or the cache cannot be read.
///
/// Limitation: The context specified by --context is not considered.
/// See https://github.com/clap-rs/clap/issues/1910 for more details.
pub fn api_group_value_completer(cache_dir: Option<PathBuf>) -> ArgValueCompleter {
    ArgValueCompleter::new(move |input: &OsStr| -> Vec<CompletionCandidate> {
        let Some(cache_dir) = cache_dir.as_ref() else {
            return Vec::new();
        };
        let Some(context) = Kubeconfig::read()
            .ok()
            .and_then(|kubeconfig| kubeconfig.current_context)
        else {
            return Vec::new();
        };

        let input = input.to_string_lossy();
        let input = input.trim();

        cached_api_groups(&discovery_cache_path(cache_dir, &context))
            .unwrap_or_default()
            .into_iter()
            .filter(|group| group.starts_with(input))
            .map(CompletionCandidate::new)
            .collect()
    })
}
