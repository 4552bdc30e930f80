use clap::Parser;
use color_eyre::eyre::Result;
use reward_claims::{
    app,
    config::AppConfig,
    telemetry,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::parse();
    let _log_guard = telemetry::init_tracing(&config.log_dir())?;
    app::run_app(config).await
}
