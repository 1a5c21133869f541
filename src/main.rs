use std::{io, path::PathBuf, process::ExitCode};

use clap::{CommandFactory, Parser};
use kubex_api_resources::{
    ApiResourcesArgs, ApiResourcesOptions, OutputOptions,
    claputil::{api_group_value_completer, context_value_completer},
    clap_complete::CompleteEnv,
    client_for_context, determine_context,
    discover::{CachedCatalog, client::DiscoverClient, default_cache_dir, discovery_cache_path},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "api-resources",
    about = "Print the supported API resources on the server",
    after_help = "Examples:
  # Print the supported API resources
  api-resources

  # Print the supported API resources with more information
  api-resources -o wide

  # Print the supported API resources sorted by a column
  api-resources --sort-by=name

  # Print the supported namespaced resources
  api-resources --namespaced=true

  # Print the supported non-namespaced resources
  api-resources --namespaced=false

  # Print the supported API resources with a specific APIGroup
  api-resources --api-group=rbac.authorization.k8s.io"
)]
struct Cli {
    /// Override the Kubernetes context to target.
    #[arg(long, add = context_value_completer())]
    context: Option<String>,

    /// Limit to resources in the specified API group.
    #[arg(long, default_value = "", add = api_group_value_completer(default_cache_dir()))]
    api_group: String,

    /// If false, non-namespaced resources will be returned, otherwise returning namespaced resources by default.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    namespaced: Option<bool>,

    /// Limit to resources that support the specified verbs.
    #[arg(long, value_delimiter = ',')]
    verbs: Vec<String>,

    /// Limit to resources that belong to the specified categories.
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// If non-empty, sort list of resources using specified field. The field can be either 'name' or 'kind'.
    #[arg(long, default_value = "")]
    sort_by: String,

    /// Use the cached list of resources if available.
    #[arg(long)]
    cached: bool,

    /// Output format. One of: (json, yaml, name, wide).
    #[arg(short, long, default_value = "")]
    output: String,

    /// When using the default output format, don't print headers (default print headers).
    #[arg(long)]
    no_headers: bool,

    /// Directory the discovery cache is kept in.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(hide = true)]
    args: Vec<String>,
}

impl Cli {
    fn api_resources_args(&self) -> ApiResourcesArgs {
        ApiResourcesArgs {
            api_group: self.api_group.clone(),
            namespaced: self.namespaced,
            verbs: non_empty(&self.verbs),
            categories: non_empty(&self.categories),
            sort_by: self.sort_by.clone(),
            cached: self.cached,
            output: OutputOptions {
                format: self.output.clone(),
                no_headers: self.no_headers,
            },
            args: self.args.clone(),
        }
    }
}

/// `--verbs=` parses to a single empty value, which means no constraint.
fn non_empty(values: &[String]) -> Vec<String> {
    values.iter().filter(|v| !v.is_empty()).cloned().collect()
}

/// Logs go to stderr so that they never mix with the printed resources.
/// `RUST_LOG` takes precedence over `-v`.
fn initialize_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let options = ApiResourcesOptions::try_from(cli.api_resources_args())?;

    let context = determine_context(&cli.context)?;
    let client = client_for_context(&context).await?;
    let cache_path = cli
        .cache_dir
        .or_else(default_cache_dir)
        .map(|dir| discovery_cache_path(&dir, &context));
    tracing::debug!(%context, ?cache_path, "discovering API resources");

    let mut catalog = CachedCatalog::new(DiscoverClient::new(client), cache_path);
    options.run(&mut catalog, io::stdout().lock()).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    CompleteEnv::with_factory(Cli::command).complete();

    let cli = Cli::parse();
    initialize_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
