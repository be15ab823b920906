use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ra_cli::cli::call::CallRequest;
use ra_cli::cli::{Cli, Command, ConfigCommand};
use ra_domain::config::{LogFormat, LoggingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ra_cli::cli::load_config(&cli.config)?;

    match cli.command {
        Command::Config(ConfigCommand::Validate) => {
            if !ra_cli::cli::config::validate(&config, &cli.config) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => ra_cli::cli::config::show(&config),
        Command::Peers => {
            ra_cli::cli::config::list_peers(&config);
            Ok(())
        }
        Command::Discover { peer } => {
            init_tracing(&config.logging, cli.json_logs);
            ra_cli::cli::discover::run(&config, &peer).await
        }
        Command::Call {
            peer,
            query,
            args,
            trace_id,
            caller,
            no_share_stack,
        } => {
            init_tracing(&config.logging, cli.json_logs);
            let request = CallRequest {
                peer,
                query,
                args,
                trace_id,
                caller,
                no_share_stack,
            };
            ra_cli::cli::call::run(&config, request, shutdown_token()).await
        }
    }
}

/// Initialize tracing on stderr so stdout carries only event frames and
/// the final answer.
///
/// `RUST_LOG` overrides the configured filter.
fn init_tracing(logging: &LoggingConfig, force_json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if force_json || logging.format == LogFormat::Json {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

/// Token cancelled on the first Ctrl-C.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling call");
            child.cancel();
        }
    });
    token
}
