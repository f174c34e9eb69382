use anyhow::Context;
use lifegrid::{LifeApp, LifeConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = LifeConfig::from_env().context("invalid LIFEGRID_* environment")?;
    log::debug!("Starting with {config:?}");

    LifeApp::new(config)
        .context("failed to start the event loop")?
        .run()
        .context("lifegrid terminated with an error")
}
