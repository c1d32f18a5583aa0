mod config;

use clap::{Args, Parser};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
enum CliCommand {
    /// Run the tenant-scoped API gateway
    Gateway(GatewayArgs),
    /// Print the tenant slug a hostname resolves to
    ParseSlug(ParseSlugArgs),
}

#[derive(Args, Debug)]
struct GatewayArgs {
    #[arg(long)]
    config_file: PathBuf,
}

#[derive(Args, Debug)]
struct ParseSlugArgs {
    hostname: String,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("config file has no `{0}` section")]
    MissingSection(&'static str),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Gateway(#[from] gateway::errors::GatewayError),
}

fn main() {
    let cli = CliCommand::parse();

    let result = match cli {
        CliCommand::Gateway(args) => run_gateway(args),
        CliCommand::ParseSlug(args) => {
            match tenancy::parse_tenant_slug(&args.hostname) {
                Some(slug) => println!("{slug}"),
                None => println!("(no tenant)"),
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("bazaar: {e}");
        process::exit(1);
    }
}

fn run_gateway(args: GatewayArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config_file)?;
    let gateway_config = config
        .gateway
        .ok_or(CliError::MissingSection("gateway"))?;

    // Dropping the guard flushes pending sentry events
    let _sentry = init_logging(&config.common.logging.unwrap_or_default());
    if let Some(metrics_config) = &config.common.metrics {
        init_metrics(metrics_config)?;
    }

    tracing::info!(
        host = %gateway_config.listener.host,
        port = gateway_config.listener.port,
        "Starting gateway"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(gateway::run(gateway_config))?;
    Ok(())
}

fn init_logging(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(config.prefix.as_str()))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    shared::metrics_defs::describe_all(tenancy::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_all(gateway::metrics_defs::ALL_METRICS);
    Ok(())
}
