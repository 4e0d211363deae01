use anyhow::{Context, Result};

use smartchat::{server, ChatEngine, Settings};

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("Invalid configuration")?;

    let engine = match ChatEngine::from_settings(&settings) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("{}", e);
            log::error!(
                "Make sure '{}' exists and lists intents with tags, patterns and responses.",
                settings.data.intents_file.display()
            );
            return Err(e).context("SmartChat cannot start");
        }
    };

    log::info!(
        "Serving {} intents, transcript at '{}'",
        engine.catalog().len(),
        settings.data.history_file.display()
    );
    server::run(engine, &settings.server).await?;
    Ok(())
}
