use anyhow::Context;
use huddle::{cli::config_path_from_args, config::Config, logging::init_tracing, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging = init_tracing(&config.logging)?;

    let summary = server::run(config).await?;
    tracing::info!(
        target: "session",
        run_id = logging.run_id(),
        summary = ?summary,
        "session_summary"
    );
    Ok(())
}
