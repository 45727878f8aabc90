use crate::clock;
use crate::config::{DropDefaults, DEFAULT_PROMPT, MIN_ROUND_SECS, WEBHOOK_NAME};
use crate::db::{
    Database, GuildSettings, NewRound, NewSubmission, RoundRecord, RoundStatus, RoundWinner,
    SettingsPatch,
};
use crate::gateway::{ChatGateway, MentionScope};
use crate::links;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub mod intake;
pub mod scheduler;

/// The designated reaction used to score submissions.
pub const VOTE_EMOJI: &str = "🔥";

const NO_WINNER_MESSAGE: &str = "No valid submissions this round. Try again tomorrow 🎵";
const CLOSING_MESSAGE: &str = "Thanks for dropping! See you tomorrow 🎵";

const PROMPT_VARIANTS: &[&str] = &[
    "Time to spill your queue while it's hot, clock's ticking, {duration}",
    "Drop your current obsession before the timer runs dry — {duration}",
    "Queue confession booth is open for {duration}; make it count",
    "Hit send with your hottest track — only {duration} on the clock",
    "This is your sign to share that repeat-worthy tune ({duration})",
    "Your aux moment starts now: post a track within {duration}",
    "No gatekeeping — reveal the song looped in your brain in {duration}",
    "Quick fire round: drop one song before {duration} disappears",
    "The floor is yours for {duration}; show us what you're playing",
    "Current mood in audio form, please. Deadline: {duration}",
    "Pass the aux and flex a track before the {duration} timer ends",
    "Music dump window is open for {duration}; go go go",
    "What track defines your vibe right now? You've got {duration}",
    "Post your banger of the moment while the {duration} countdown rolls",
    "Speedrun your best recommendation — submission window: {duration}",
    "One link, big energy. Drop it in the next {duration}",
    "We need your song of the day, and we need it in {duration}",
    "Thread's live. Bring your top pick before {duration} is up",
    "Got a heater? Prove it. Timer says {duration}",
    "Now playing challenge: share one track in {duration}",
    "Tell us what's in your headphones before {duration} expires",
    "Queue roulette starts now — submit your entry in {duration}",
    "Your soundtrack check-in starts now: {duration}",
    "Drop one song that deserves the spotlight. Time left: {duration}",
    "Playlist architects, assemble. Submission timer: {duration}",
    "The beat clock is running — share your pick within {duration}",
    "What song should everyone hear next? You get {duration}",
    "Today's sonic flex round lasts {duration}; drop your link",
    "Incoming track battle: submit before {duration} is gone",
    "You've got {duration} to post the song you can't stop replaying",
    "Let the music speak — one submission, {duration} max",
    "Need fresh tunes. Add your best one in {duration}",
    "Call your shot with one track before {duration} wraps",
    "Drop a tune that deserves 🔥 reactions in the next {duration}",
    "The queue is hungry — feed it within {duration}",
    "Share your latest earworm while the {duration} window is open",
    "This round is live for {duration}; bring your strongest link",
    "Turn your current vibe into a URL and post in {duration}",
    "Aux cord draft is open for {duration}; claim your spot",
    "Moment of truth: what's your track pick? Timer: {duration}",
];

/// A guild message as seen by the submission intake path.
pub struct ThreadMessage {
    pub guild_id: u64,
    pub thread_id: u64,
    pub message_id: u64,
    pub user_id: u64,
    pub content: String,
}

/// Drives the round state machine. Holds no round state itself: every
/// operation re-reads the store, which stays the single source of truth
/// across restarts.
pub struct GameEngine {
    db: Database,
    gateway: Arc<dyn ChatGateway>,
    defaults: DropDefaults,
    lock_grace: Duration,
}

impl GameEngine {
    pub fn new(
        db: Database,
        gateway: Arc<dyn ChatGateway>,
        defaults: DropDefaults,
        lock_grace_secs: u64,
    ) -> Self {
        Self {
            db,
            gateway,
            defaults,
            lock_grace: Duration::from_secs(lock_grace_secs),
        }
    }

    pub async fn settings(&self, guild_id: u64) -> anyhow::Result<GuildSettings> {
        let defaults = self.defaults.clone();
        self.db
            .run_blocking(move |db| db.get_or_create_settings(guild_id, &defaults))
            .await
    }

    /// Creates the round thread, posts the prompt through the delivery
    /// endpoint and persists the round. Returns None on a hard failure
    /// (no endpoint, thread creation refused); a failed prompt post is
    /// tolerated and leaves the round without a prompt message reference.
    pub async fn start_round(
        &self,
        guild_id: u64,
        channel_id: u64,
        prompt_override: Option<String>,
        duration_seconds: i64,
        ping_role_id: Option<u64>,
    ) -> anyhow::Result<Option<i64>> {
        let Some(webhook_url) = self.resolve_webhook_url(guild_id, channel_id).await? else {
            error!(
                "No delivery endpoint for guild {}: set a webhook URL in settings \
                 or grant the bot webhook management on the channel",
                guild_id
            );
            return Ok(None);
        };

        let thread_name = format!("Drop • {}", clock::today_utc());
        let thread_id = match self
            .gateway
            .create_round_thread(channel_id, &thread_name)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to create round thread in channel {}: {}", channel_id, e);
                return Ok(None);
            }
        };

        let start_time = clock::unix_now();
        let duration = duration_seconds.max(MIN_ROUND_SECS);
        let end_time = start_time + duration;

        let prompt = prompt_override
            .or_else(|| self.defaults.prompt_text.clone())
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string())
            .trim()
            .to_string();
        let variant = PROMPT_VARIANTS[rand::rng().random_range(0..PROMPT_VARIANTS.len())]
            .replace("{duration}", &clock::humanize_seconds(duration));
        let ping = ping_role_id
            .map(|id| format!("<@&{}>\n", id))
            .unwrap_or_default();
        let content = format!("{}{}\n\n{}", ping, prompt, variant);

        let prompt_message_id = match self
            .gateway
            .webhook_send(&webhook_url, &content, Some(thread_id), MentionScope::RolesOnly)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to post prompt into thread {}: {}", thread_id, e);
                None
            }
        };

        let new_round = NewRound {
            guild_id,
            channel_id,
            thread_id,
            start_time,
            end_time,
            prompt_text: prompt,
            prompt_message_id,
        };
        let round_id = self
            .db
            .run_blocking(move |db| db.insert_round(&new_round))
            .await?;

        info!(
            "Started round {} for guild {} in thread {}, running {}",
            round_id,
            guild_id,
            thread_id,
            clock::humanize_seconds(duration)
        );
        Ok(Some(round_id))
    }

    /// Intake for one inbound thread message. Silently ignores anything
    /// that is not a first-time, allow-listed link submission to a running
    /// round. Duplicate message deliveries are absorbed by the store.
    pub async fn record_submission(&self, message: &ThreadMessage) -> anyhow::Result<()> {
        let (guild_id, thread_id) = (message.guild_id, message.thread_id);
        let Some(round) = self
            .db
            .run_blocking(move |db| db.get_running_round_in_thread(guild_id, thread_id))
            .await?
        else {
            return Ok(());
        };

        // Past its end time the round is conceptually closed, even if the
        // scheduler has not processed it yet.
        if round.end_time <= clock::unix_now() {
            return Ok(());
        }

        let settings = self.settings(guild_id).await?;
        let Some(url) = links::extract_first_url(&message.content) else {
            return Ok(());
        };
        if !links::is_domain_allowed(url, &settings.allow_domains) {
            return Ok(());
        }

        let round_id = round.round_id;
        let user_id = message.user_id;
        if self
            .db
            .run_blocking(move |db| db.has_user_submitted(round_id, user_id))
            .await?
        {
            return Ok(());
        }

        let submission = NewSubmission {
            round_id,
            guild_id,
            thread_id,
            message_id: message.message_id,
            user_id,
            submitted_at: clock::unix_now(),
            url: url.to_string(),
        };
        let inserted = self
            .db
            .run_blocking(move |db| db.insert_submission_if_absent(&submission))
            .await?;

        if inserted {
            if let Err(e) = self
                .gateway
                .add_reaction(thread_id, message.message_id, VOTE_EMOJI)
                .await
            {
                debug!(
                    "Could not add vote marker to message {}: {}",
                    message.message_id, e
                );
            }
        }
        Ok(())
    }

    /// Scores the round, persists the terminal state and announces the
    /// winner. Idempotent: a round that is no longer running is left
    /// untouched. When channel or thread cannot be resolved the round stays
    /// running and the next tick retries.
    pub async fn end_round(&self, round: &RoundRecord) -> anyhow::Result<()> {
        let round_id = round.round_id;
        let Some(round) = self.db.run_blocking(move |db| db.fetch_round(round_id)).await? else {
            return Ok(());
        };
        if round.status != RoundStatus::Running {
            return Ok(());
        }

        if let Err(e) = self.gateway.resolve_text_channel(round.channel_id).await {
            warn!(
                "Round {}: channel {} unresolvable, retrying next tick: {}",
                round.round_id, round.channel_id, e
            );
            return Ok(());
        }
        if let Err(e) = self.gateway.resolve_thread(round.thread_id).await {
            warn!(
                "Round {}: thread {} unresolvable, retrying next tick: {}",
                round.round_id, round.thread_id, e
            );
            return Ok(());
        }

        let settings = self.settings(round.guild_id).await?;
        let Some(webhook_url) = self
            .resolve_webhook_url(round.guild_id, round.channel_id)
            .await?
        else {
            error!(
                "Cannot end round {} for guild {}: no delivery endpoint",
                round.round_id, round.guild_id
            );
            return Ok(());
        };

        let submissions = self
            .db
            .run_blocking(move |db| db.list_submissions(round_id))
            .await?;

        // Strictly-greater comparison: on ties the earliest submission in
        // the list keeps the win.
        let mut best: Option<(RoundWinner, String)> = None;
        for sub in &submissions {
            let score = match self
                .gateway
                .reaction_count(round.thread_id, sub.message_id, VOTE_EMOJI)
                .await
            {
                Ok(count) => count as i64,
                Err(e) => {
                    debug!(
                        "Round {}: skipping unreadable submission message {}: {}",
                        round.round_id, sub.message_id, e
                    );
                    continue;
                }
            };
            // The allow-list may have changed since submission.
            if !links::is_domain_allowed(&sub.url, &settings.allow_domains) {
                continue;
            }
            let replaces = match &best {
                None => true,
                Some((incumbent, _)) => score > incumbent.score,
            };
            if replaces {
                best = Some((
                    RoundWinner {
                        user_id: sub.user_id,
                        message_id: sub.message_id,
                        score,
                    },
                    sub.url.clone(),
                ));
            }
        }

        let announcement = match &best {
            Some((winner, url)) => format!(
                "🔥 **Top Track Drop** by <@{}> with **{}** 🔥\n{}",
                winner.user_id, winner.score, url
            ),
            None => NO_WINNER_MESSAGE.to_string(),
        };

        // The terminal transition goes to the store first, so a crash below
        // never re-processes this round as running.
        let winner = best.map(|(w, _)| w);
        self.db
            .run_blocking(move |db| db.mark_round_ended(round_id, winner.as_ref()))
            .await?;

        let winners_message_id = match self
            .gateway
            .webhook_send(&webhook_url, &announcement, None, MentionScope::UsersOnly)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("Round {}: winner announcement failed: {}", round.round_id, e);
                None
            }
        };
        self.db
            .run_blocking(move |db| db.set_winners_message(round_id, winners_message_id))
            .await?;

        if let Err(e) = self
            .gateway
            .webhook_send(
                &webhook_url,
                CLOSING_MESSAGE,
                Some(round.thread_id),
                MentionScope::None,
            )
            .await
        {
            warn!("Round {}: closing message failed: {}", round.round_id, e);
        }

        self.schedule_thread_lock(round.thread_id);
        info!("Ended round {} for guild {}", round.round_id, round.guild_id);
        Ok(())
    }

    /// Pulls the running round forward to now and ends it immediately.
    /// Returns false when nothing is running.
    pub async fn force_end_running(&self, guild_id: u64) -> anyhow::Result<bool> {
        let Some(round) = self
            .db
            .run_blocking(move |db| db.get_running_round(guild_id))
            .await?
        else {
            return Ok(false);
        };

        let round_id = round.round_id;
        let now = clock::unix_now();
        self.db
            .run_blocking(move |db| db.set_round_end_time(round_id, now))
            .await?;
        let Some(round) = self.db.run_blocking(move |db| db.fetch_round(round_id)).await? else {
            return Ok(false);
        };
        self.end_round(&round).await?;
        Ok(true)
    }

    /// Returns today's scheduled start time, drawing and persisting a fresh
    /// random one the first time each day (or when the stored value is
    /// unusable). The draw is explicit here rather than a side effect of
    /// reading settings.
    pub async fn ensure_today_schedule(
        &self,
        settings: &GuildSettings,
        today: &str,
    ) -> anyhow::Result<String> {
        let current = settings
            .daily_hhmm_utc
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string();
        let drawn_today = settings.daily_random_date_utc.as_deref() == Some(today);
        if drawn_today && clock::parse_hhmm(&current).is_some() {
            return Ok(current);
        }

        let scheduled = clock::random_daily_hhmm();
        let guild_id = settings.guild_id;
        let patch = SettingsPatch {
            daily_hhmm_utc: Some(scheduled.clone()),
            daily_random_date_utc: Some(today.to_string()),
            ..Default::default()
        };
        self.db
            .run_blocking(move |db| db.update_settings(guild_id, &patch))
            .await?;
        debug!("Guild {}: today's round scheduled at {} UTC", guild_id, scheduled);
        Ok(scheduled)
    }

    async fn resolve_webhook_url(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> anyhow::Result<Option<String>> {
        let settings = self.settings(guild_id).await?;
        if let Some(url) = settings.webhook_url.filter(|u| !u.trim().is_empty()) {
            return Ok(Some(url));
        }

        if let Some(url) = self
            .defaults
            .webhook_url
            .clone()
            .filter(|u| !u.trim().is_empty())
        {
            self.persist_webhook_url(guild_id, url.clone()).await?;
            return Ok(Some(url));
        }

        match self.gateway.create_webhook(channel_id, WEBHOOK_NAME).await {
            Ok(url) => {
                self.persist_webhook_url(guild_id, url.clone()).await?;
                info!("Provisioned webhook on channel {} for guild {}", channel_id, guild_id);
                Ok(Some(url))
            }
            Err(e) => {
                warn!("Could not provision webhook on channel {}: {}", channel_id, e);
                Ok(None)
            }
        }
    }

    async fn persist_webhook_url(&self, guild_id: u64, url: String) -> anyhow::Result<()> {
        self.db
            .run_blocking(move |db| {
                db.update_settings(
                    guild_id,
                    &SettingsPatch {
                        webhook_url: Some(url),
                        ..Default::default()
                    },
                )
            })
            .await
    }

    /// Fire-and-forget: the timer lives in this process only, so a restart
    /// drops it and the thread simply stays open.
    fn schedule_thread_lock(&self, thread_id: u64) {
        let gateway = Arc::clone(&self.gateway);
        let grace = self.lock_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if gateway.set_thread_flags(thread_id, true, true).await.is_err() {
                // Archiving can be refused (e.g. permissions); a bare lock
                // is still better than leaving the thread open.
                if let Err(e) = gateway.set_thread_flags(thread_id, true, false).await {
                    warn!(
                        "Failed to lock thread {} after grace period: {}",
                        thread_id, e
                    );
                }
            }
        });
    }
}
