use droptrack::game::scheduler::GameScheduler;
use droptrack::game::GameEngine;
use droptrack::gateway::{ChatGateway, DiscordGateway};
use droptrack::{commands, config::Config, game, Data};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::drop::drop()],
            event_handler: |_ctx, event, _framework, data| {
                Box::pin(async move {
                    if let serenity::FullEvent::Message { new_message } = event {
                        game::intake::handle_message(data, new_message).await?;
                    }
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready!");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                // Set bot status
                ctx.set_activity(Some(serenity::ActivityData::custom(&config.status_message)));

                let db = droptrack::db::Database::new(&config).expect("Failed to open database");
                db.execute_init().expect("Failed to initialize database");

                let gateway: Arc<dyn ChatGateway> =
                    Arc::new(DiscordGateway::new(ctx.http.clone()));
                let engine = Arc::new(GameEngine::new(
                    db.clone(),
                    gateway.clone(),
                    config.drop.clone(),
                    config.lock_grace_secs,
                ));

                // One periodic task drives every round transition.
                let scheduler = GameScheduler::new(
                    engine.clone(),
                    db.clone(),
                    gateway,
                    config.tick_interval_secs,
                );
                tokio::spawn(scheduler.run());

                Ok(Data { config, db, engine })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
