use clap::Parser;

use keyspace::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let settings = cli::load_and_merge_config(&args)?;
    cli::init_logger_from_settings(&settings)?;

    tracing::debug!(
        version = keyspace::pkg_version(),
        backend = %settings.cache.backend,
        prefix = %settings.cache.prefix,
        "Starting keyspace"
    );

    let mut stdout = std::io::stdout().lock();
    cli::execute_command(&args, settings, &mut stdout).await
}
