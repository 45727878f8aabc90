use crate::clock::humanize_seconds;
use crate::config::{DEFAULT_ALLOW_DOMAINS, MIN_ROUND_SECS};
use crate::db::{GuildSettings, SettingsPatch};
use crate::{clock, Context, Error};
use humantime::parse_duration;
use poise::serenity_prelude as serenity;
use tracing::info;

/// Drop The Track daily mini-game
#[poise::command(
    slash_command,
    subcommands("configure", "start", "end", "status"),
    guild_only
)]
pub async fn drop(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Configure Drop The Track for this server
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD", guild_only)]
pub async fn configure(
    ctx: Context<'_>,
    #[description = "Channel hosting the daily game (threads are created here)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
    #[description = "Role to ping when a round starts"] ping_role: Option<serenity::Role>,
    #[description = "Round duration (e.g., 10m, 45s, 1h)"] duration: Option<String>,
    #[description = "Start a round automatically every day at a random daytime slot"]
    daily: Option<bool>,
    #[description = "Comma-separated allowed link domains (empty resets to defaults)"]
    allow_domains: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    let data = ctx.data();

    // Ensure the settings row exists before patching it.
    data.engine.settings(guild_id).await?;

    let mut patch = SettingsPatch::default();
    if let Some(channel) = &channel {
        patch.channel_id = Some(channel.id.get());
    }
    if let Some(role) = &ping_role {
        patch.ping_role_id = Some(role.id.get());
    }
    if let Some(input) = &duration {
        let Ok(parsed) = parse_duration(input.trim()) else {
            ctx.say("❌ Invalid duration. Examples: `45s`, `10m`, `1h`.")
                .await?;
            return Ok(());
        };
        patch.duration_seconds = Some((parsed.as_secs() as i64).max(MIN_ROUND_SECS));
    }
    if let Some(daily) = daily {
        patch.daily_enabled = Some(daily);
    }
    if let Some(domains) = &allow_domains {
        let trimmed = domains.trim();
        patch.allow_domains = Some(if trimmed.is_empty() {
            DEFAULT_ALLOW_DOMAINS.to_string()
        } else {
            trimmed.to_string()
        });
    }

    if !patch.is_empty() {
        data.db
            .run_blocking(move |db| db.update_settings(guild_id, &patch))
            .await?;
        info!("Updated game settings for guild {}", guild_id);
    }

    let settings = data.engine.settings(guild_id).await?;
    let scheduled = data
        .engine
        .ensure_today_schedule(&settings, &clock::today_utc())
        .await?;

    let embed = serenity::CreateEmbed::new()
        .title("🎵 Drop The Track configured")
        .description(settings_summary(&settings, &scheduled))
        .color(0x5865F2);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Start a round now
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD", guild_only)]
pub async fn start(
    ctx: Context<'_>,
    #[description = "Channel to host the round (defaults to the configured channel)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
    #[description = "Round duration for this round only (e.g., 10m)"] duration: Option<String>,
    #[description = "Role to ping for this round only"] ping_role: Option<serenity::Role>,
    #[description = "Prompt text override"] prompt: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    let data = ctx.data();
    ctx.defer_ephemeral().await?;

    let running = data
        .db
        .run_blocking(move |db| db.get_running_round(guild_id))
        .await?;
    if let Some(round) = running {
        ctx.say(format!(
            "❌ There is already a running round in <#{}>.",
            round.thread_id
        ))
        .await?;
        return Ok(());
    }

    let settings = data.engine.settings(guild_id).await?;
    let Some(channel_id) = channel.as_ref().map(|c| c.id.get()).or(settings.channel_id) else {
        ctx.say("❌ No channel configured. Set one with `/drop configure` or pass one here.")
            .await?;
        return Ok(());
    };

    let duration_seconds = match &duration {
        Some(input) => match parse_duration(input.trim()) {
            Ok(parsed) => (parsed.as_secs() as i64).max(MIN_ROUND_SECS),
            Err(_) => {
                ctx.say("❌ Invalid duration. Examples: `45s`, `10m`, `1h`.")
                    .await?;
                return Ok(());
            }
        },
        None => settings.duration_seconds,
    };
    let ping_role_id = ping_role.as_ref().map(|r| r.id.get()).or(settings.ping_role_id);

    let started = data
        .engine
        .start_round(guild_id, channel_id, prompt, duration_seconds, ping_role_id)
        .await?;

    match started {
        Some(round_id) => {
            let round = data
                .db
                .run_blocking(move |db| db.fetch_round(round_id))
                .await?;
            let thread_id = round.map(|r| r.thread_id).unwrap_or_default();
            ctx.say(format!(
                "✅ Started a round in <#{}> (thread <#{}>), running {}.",
                channel_id,
                thread_id,
                humanize_seconds(duration_seconds)
            ))
            .await?;
        }
        None => {
            ctx.say(
                "❌ Could not start the round. Check that I can create threads here \
                 and that a delivery webhook is configured or creatable.",
            )
            .await?;
        }
    }
    Ok(())
}

/// End the current round now
#[poise::command(slash_command, required_permissions = "MANAGE_GUILD", guild_only)]
pub async fn end(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    ctx.defer_ephemeral().await?;

    if ctx.data().engine.force_end_running(guild_id).await? {
        ctx.say("✅ Ended the round and announced the results.").await?;
    } else {
        ctx.say("❌ There is no running round.").await?;
    }
    Ok(())
}

/// Show configuration and the current round
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    let data = ctx.data();

    let settings = data.engine.settings(guild_id).await?;
    let scheduled = data
        .engine
        .ensure_today_schedule(&settings, &clock::today_utc())
        .await?;
    let running = data
        .db
        .run_blocking(move |db| db.get_running_round(guild_id))
        .await?;

    let mut description = settings_summary(&settings, &scheduled);
    if let Some(round) = running {
        description.push_str(&format!(
            "\n**Running round:** `{}` in <#{}>\n**Ends:** <t:{}:R>",
            round.round_id, round.thread_id, round.end_time
        ));
    }

    let embed = serenity::CreateEmbed::new()
        .title("🎵 Drop The Track status")
        .description(description)
        .color(0x5865F2);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

fn settings_summary(settings: &GuildSettings, scheduled_hhmm: &str) -> String {
    format!(
        "**Channel:** {}\n\
         **Ping role:** {}\n\
         **Duration:** {}\n\
         **Daily:** {}\n\
         **Today's start (UTC):** {}\n\
         **Delivery webhook:** {}\n\
         **Allowed domains:** {}\n",
        settings
            .channel_id
            .map(|id| format!("<#{}>", id))
            .unwrap_or_else(|| "Not set".to_string()),
        settings
            .ping_role_id
            .map(|id| format!("<@&{}>", id))
            .unwrap_or_else(|| "None".to_string()),
        humanize_seconds(settings.duration_seconds),
        if settings.daily_enabled { "Enabled" } else { "Disabled" },
        scheduled_hhmm,
        if settings.webhook_url.is_some() { "Configured" } else { "Not set" },
        settings.allow_domains,
    )
}
