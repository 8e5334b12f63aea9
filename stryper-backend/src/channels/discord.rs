use crate::catalog::CatalogStore;
use crate::channels::util::{DISCORD_MESSAGE_LIMIT, split_message};
use crate::config::Config;
use crate::discord_hooks::commands;
use crate::discord_hooks::history::{DiscordHistory, DiscordPoster};
use crate::scheduler::{ChannelPoster, Scheduler};
use crate::validators::LinkClassifier;
use serenity::all::{ChannelId, Client, Context, EventHandler, GatewayIntents, Message, Ready};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct StryperHandler {
    config: Config,
    store: Arc<CatalogStore>,
    classifier: Arc<dyn LinkClassifier>,
    /// Whether the catalog file existed before this run
    catalog_existed: bool,
    scheduler_started: AtomicBool,
}

impl StryperHandler {
    fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.config.channel_id)
    }
}

#[serenity::async_trait]
impl EventHandler for StryperHandler {
    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore messages from bots (including ourselves)
        if msg.author.bot {
            return;
        }

        let prefix = self.config.command_prefix.as_str();
        let Some(command) = commands::parse(&msg.content, prefix) else {
            return;
        };

        log::info!(
            "Discord: Command {:?} from {} ({})",
            command,
            msg.author.name,
            msg.author.id
        );

        if command.requires_privilege() && !self.config.is_privileged(&msg.author.name) {
            log::warn!("Discord: {} is not privileged", msg.author.name);
            let _ = msg
                .channel_id
                .say(&ctx.http, commands::permission_denied_message(prefix))
                .await;
            return;
        }

        let reply = commands::execute(
            command,
            prefix,
            &self.config.trigger,
            &self.config.signals.ritual_phrase,
            &self.store,
            self.classifier.as_ref(),
        )
        .await;
        if reply.success {
            log::info!("Discord: Replying with {} message(s)", reply.messages.len());
        } else {
            log::warn!("Discord: Command failed: {}", reply.messages.join(" | "));
        }

        for message in &reply.messages {
            for chunk in split_message(message, DISCORD_MESSAGE_LIMIT) {
                if let Err(e) = msg.channel_id.say(&ctx.http, &chunk).await {
                    log::error!("Failed to send Discord message: {}", e);
                }
            }
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("Discord: Bot connected as {}", ready.user.name);

        let poster = Arc::new(DiscordPoster::new(ctx.http.clone(), self.channel_id()));
        let setup_msg = self.config.trigger.setup_message();
        log::info!("{}", setup_msg);
        if let Err(e) = poster.post(&setup_msg).await {
            log::error!("Discord: {}", e);
        }

        if !self.catalog_existed {
            let msg = "ERROR: database is empty, please fill...";
            log::warn!("{}", msg);
            if let Err(e) = poster.post(msg).await {
                log::error!("Discord: {}", e);
            }
        }

        // Reconnects fire `ready` again; only one scheduler may run.
        if self.scheduler_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let scheduler = Arc::new(Scheduler::new(
            self.config.trigger.clone(),
            self.config.signals.clone(),
            ready.user.id.to_string(),
            self.config.history_timeout,
            self.store.clone(),
            self.classifier.clone(),
            Arc::new(DiscordHistory::new(ctx.http.clone(), self.channel_id())),
            poster,
        ));
        tokio::spawn(scheduler.run());
    }
}

/// Start the Discord bot and run until it stops or Ctrl-C is received
pub async fn start_discord_listener(
    config: Config,
    store: Arc<CatalogStore>,
    classifier: Arc<dyn LinkClassifier>,
    catalog_existed: bool,
) -> Result<(), String> {
    log::info!(
        "Starting Discord listener for channel {} ({})",
        config.channel_id,
        if config.is_debugging { "debug" } else { "deployed" }
    );

    // Message content is needed to read commands and history
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.bot_token.clone();
    let handler = StryperHandler {
        config,
        store,
        classifier,
        catalog_existed,
        scheduler_started: AtomicBool::new(false),
    };

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| format!("Failed to create Discord client: {}", e))?;

    log::info!("Discord: Client created successfully");

    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Discord listener received shutdown signal");
            shard_manager.shutdown_all().await;
        }
        result = client.start() => {
            match result {
                Ok(()) => log::info!("Discord listener stopped"),
                Err(e) => {
                    let error = format!("Discord client error: {}", e);
                    log::error!("{}", error);
                    return Err(error);
                }
            }
        }
    }

    Ok(())
}
