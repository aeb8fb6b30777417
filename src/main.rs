use std::sync::Arc;

use serenity::all::{ApplicationId, ClientBuilder, GatewayIntents};
use switchboard::discord::{hooks, BotContext, Handler, SubmissionPlan};
use switchboard::{commands, config::Config, Data, Dispatcher, RoutingEngine};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();
    let application_id = ApplicationId::new(config.application_id);

    let mut engine: RoutingEngine<BotContext> = RoutingEngine::new();
    commands::load(&mut engine)?;
    let schema = engine.build()?;
    info!(
        "Loaded {} commands and {} responder routes",
        schema.len(),
        engine.responders().len()
    );

    let plan = if config.register_commands {
        Some(SubmissionPlan::prepare(engine.commands_mut(), &config)?)
    } else {
        None
    };

    let data = Arc::new(Data {
        config,
        started_at: chrono::Utc::now(),
    });
    let dispatcher = Dispatcher::new(Arc::new(engine))
        .middleware(hooks::ignore_bots)
        .on_not_found(hooks::not_found)
        .on_error(hooks::report_error);

    let mut client = ClientBuilder::new(&discord_token, GatewayIntents::non_privileged())
        .application_id(application_id)
        .event_handler(Handler::new(dispatcher, data, plan))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
