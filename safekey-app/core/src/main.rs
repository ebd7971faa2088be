use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use safekey_app_lib::AppConfig;

/// SafeKey: PIN and biometric app lock for a local credential vault
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding settings.json and accounts.json
    #[arg(long, default_value = "safekey-data")]
    data_dir: PathBuf,

    /// Keep settings in memory and accounts in a throwaway temp directory
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they do not interleave with shell output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("safekey=info".parse()?)
                .add_directive("safekey_app_lib=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!("Starting SafeKey");
    info!("Data directory: {:?}", args.data_dir);

    let config = AppConfig::new(args.data_dir, args.ephemeral);
    safekey_app_lib::run(config).await?;
    Ok(())
}
