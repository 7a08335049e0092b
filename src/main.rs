use dh_core::config::Config;
use dh_core::status::PgStatusStore;
use dh_core::structs::{Data, Error};
use poise::serenity_prelude as serenity;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

async fn on_error(error: poise::FrameworkError<'_, Arc<Data>, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {error:?}"),
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error:?}", ctx.command().name);
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            let error_msg = error.map_or_else(
                || "You cannot execute this command.".to_owned(),
                |e| e.to_string(),
            );
            let _ = ctx.say(error_msg).await;
        }
        poise::FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            let minutes = remaining_cooldown.as_secs().div_ceil(60);
            let _ = ctx
                .say(format!(
                    "You are on cooldown. Try again in {minutes} minute(s)."
                ))
                .await;
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,serenity=warn".into()),
        )
        .init();

    if let Err(e) = dotenv {
        // A missing `.env` is normal in deployments.
        if !e.not_found() {
            warn!("Could not read .env: {e}");
        }
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let store = match config.database.connect_options() {
        Ok(options) => PgStatusStore::connect(options).await,
        Err(e) => Err(e),
    };
    let store = match store {
        Ok(store) => store,
        Err(e) => {
            error!("Could not connect to the dashboard database: {e}");
            std::process::exit(1);
        }
    };
    info!("Connected to the dashboard database");

    let shutdown = CancellationToken::new();
    let data = Arc::new(Data::new(&config, Arc::new(store), shutdown.clone()));

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let options = poise::FrameworkOptions {
        commands: dh_commands::commands(),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(config.prefix.clone()),
            edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                Duration::from_secs(300),
            ))),
            ..Default::default()
        },
        on_error: |error| Box::pin(on_error(error)),
        event_handler: |ctx, event, _framework, data| {
            Box::pin(dh_events::handler(ctx, event, data))
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .options(options)
        .build();

    let mut client = match serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("Could not create the client: {e}");
            std::process::exit(1);
        }
    };

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for ctrl-c: {e}");
            return;
        }
        info!("Shutting down");
        shutdown.cancel();
        shard_manager.shutdown_all().await;
    });

    if let Err(e) = client.start().await {
        error!("Client stopped: {e}");
    }
}
