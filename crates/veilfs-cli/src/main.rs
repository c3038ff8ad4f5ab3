use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veilfs_cli::config::CliArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("veilfs_cli={log_level},veilfs_client={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = veilfs_cli::CliConfig::from(args);
    if let Err(err) = veilfs_cli::run(config).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
    Ok(())
}
