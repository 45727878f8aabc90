use crate::clock;
use crate::db::{Database, GuildSettings};
use crate::game::GameEngine;
use crate::gateway::ChatGateway;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, warn};

/// Periodic driver for all round transitions: ends overdue rounds and
/// fires daily auto-starts. One instance runs for the whole process.
pub struct GameScheduler {
    engine: Arc<GameEngine>,
    db: Database,
    gateway: Arc<dyn ChatGateway>,
    tick_interval: Duration,
}

impl GameScheduler {
    pub fn new(
        engine: Arc<GameEngine>,
        db: Database,
        gateway: Arc<dyn ChatGateway>,
        tick_interval_secs: u64,
    ) -> Self {
        Self {
            engine,
            db,
            gateway,
            tick_interval: Duration::from_secs(tick_interval_secs),
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.tick_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                error!("Scheduler tick failed: {}", e);
            }
        }
    }

    pub async fn tick(&self) -> anyhow::Result<()> {
        self.tick_at(
            clock::unix_now(),
            &clock::hhmm_now_utc(),
            &clock::today_utc(),
        )
        .await
    }

    /// One scheduling pass at an explicit instant. A failure on one round
    /// or guild never blocks the others.
    async fn tick_at(&self, now: i64, hhmm_now: &str, today: &str) -> anyhow::Result<()> {
        let overdue = self
            .db
            .run_blocking(move |db| db.list_overdue_rounds(now))
            .await?;
        for round in overdue {
            if let Err(e) = self.engine.end_round(&round).await {
                warn!("Failed ending round {}: {}", round.round_id, e);
            }
        }

        let candidates = self.db.run_blocking(|db| db.list_daily_candidates()).await?;
        for settings in candidates {
            let guild_id = settings.guild_id;
            if let Err(e) = self.maybe_start_daily(&settings, hhmm_now, today).await {
                warn!("Daily start failed for guild {}: {}", guild_id, e);
            }
        }
        Ok(())
    }

    async fn maybe_start_daily(
        &self,
        settings: &GuildSettings,
        hhmm_now: &str,
        today: &str,
    ) -> anyhow::Result<()> {
        let guild_id = settings.guild_id;
        let scheduled = self.engine.ensure_today_schedule(settings, today).await?;
        if scheduled != hhmm_now {
            return Ok(());
        }

        let running = self
            .db
            .run_blocking(move |db| db.get_running_round(guild_id))
            .await?;
        if running.is_some() {
            return Ok(());
        }

        let today_owned = today.to_string();
        if self
            .db
            .run_blocking(move |db| db.round_started_today(guild_id, &today_owned))
            .await?
        {
            return Ok(());
        }

        let Some(channel_id) = settings.channel_id else {
            return Ok(());
        };
        if let Err(e) = self.gateway.resolve_text_channel(channel_id).await {
            debug!(
                "Guild {}: configured channel {} unresolvable, skipping daily start: {}",
                guild_id, channel_id, e
            );
            return Ok(());
        }

        self.engine
            .start_round(
                guild_id,
                channel_id,
                None,
                settings.duration_seconds,
                settings.ping_role_id,
            )
            .await?;
        Ok(())
    }
}
