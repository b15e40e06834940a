use anyhow::Result;
use tracing_subscriber::EnvFilter;

use brk::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("brk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run_cli().await
}
