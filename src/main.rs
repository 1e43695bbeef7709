use anyhow::Context;

use briefing_worker::{app::App, config::Config, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init().context("failed to initialize tracing")?;

    let config = Config::from_env().context("failed to load configuration")?;
    let app = App::build(&config).context("failed to build components")?;

    app.run().await
}
