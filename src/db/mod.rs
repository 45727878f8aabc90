use crate::config::{Config, DropDefaults, MIN_ROUND_SECS};
use rusqlite::{Connection, Result, Row};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Running,
    Ended,
    Cancelled,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Running => "running",
            RoundStatus::Ended => "ended",
            RoundStatus::Cancelled => "cancelled",
        }
    }

    fn parse(s: &str) -> RoundStatus {
        match s {
            "ended" => RoundStatus::Ended,
            "cancelled" => RoundStatus::Cancelled,
            _ => RoundStatus::Running,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuildSettings {
    pub guild_id: u64,
    pub channel_id: Option<u64>,
    pub ping_role_id: Option<u64>,
    pub duration_seconds: i64,
    pub daily_enabled: bool,
    pub daily_hhmm_utc: Option<String>,
    pub daily_random_date_utc: Option<String>,
    pub webhook_url: Option<String>,
    pub allow_domains: String,
}

#[derive(Debug, Clone)]
pub struct RoundRecord {
    pub round_id: i64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub thread_id: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub status: RoundStatus,
    pub prompt_text: Option<String>,
    pub prompt_message_id: Option<u64>,
    pub winners_message_id: Option<u64>,
    pub winner_user_id: Option<u64>,
    pub winner_message_id: Option<u64>,
    pub winner_score: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub round_id: i64,
    pub guild_id: u64,
    pub thread_id: u64,
    pub message_id: u64,
    pub user_id: u64,
    pub submitted_at: i64,
    pub url: String,
}

pub struct NewRound {
    pub guild_id: u64,
    pub channel_id: u64,
    pub thread_id: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub prompt_text: String,
    pub prompt_message_id: Option<u64>,
}

pub struct NewSubmission {
    pub round_id: i64,
    pub guild_id: u64,
    pub thread_id: u64,
    pub message_id: u64,
    pub user_id: u64,
    pub submitted_at: i64,
    pub url: String,
}

pub struct RoundWinner {
    pub user_id: u64,
    pub message_id: u64,
    pub score: i64,
}

/// Partial settings update. `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct SettingsPatch {
    pub channel_id: Option<u64>,
    pub ping_role_id: Option<u64>,
    pub duration_seconds: Option<i64>,
    pub daily_enabled: Option<bool>,
    pub daily_hhmm_utc: Option<String>,
    pub daily_random_date_utc: Option<String>,
    pub webhook_url: Option<String>,
    pub allow_domains: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.channel_id.is_none()
            && self.ping_role_id.is_none()
            && self.duration_seconds.is_none()
            && self.daily_enabled.is_none()
            && self.daily_hhmm_utc.is_none()
            && self.daily_random_date_utc.is_none()
            && self.webhook_url.is_none()
            && self.allow_domains.is_none()
    }
}

fn settings_from_row(row: &Row) -> Result<GuildSettings> {
    Ok(GuildSettings {
        guild_id: row.get("guild_id")?,
        channel_id: row.get("channel_id")?,
        ping_role_id: row.get("ping_role_id")?,
        duration_seconds: row.get("duration_seconds")?,
        daily_enabled: row.get("daily_enabled")?,
        daily_hhmm_utc: row.get("daily_hhmm_utc")?,
        daily_random_date_utc: row.get("daily_random_date_utc")?,
        webhook_url: row.get("webhook_url")?,
        allow_domains: row.get("allow_domains")?,
    })
}

fn round_from_row(row: &Row) -> Result<RoundRecord> {
    let status: String = row.get("status")?;
    Ok(RoundRecord {
        round_id: row.get("round_id")?,
        guild_id: row.get("guild_id")?,
        channel_id: row.get("channel_id")?,
        thread_id: row.get("thread_id")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        status: RoundStatus::parse(&status),
        prompt_text: row.get("prompt_text")?,
        prompt_message_id: row.get("prompt_message_id")?,
        winners_message_id: row.get("winners_message_id")?,
        winner_user_id: row.get("winner_user_id")?,
        winner_message_id: row.get("winner_message_id")?,
        winner_score: row.get("winner_score")?,
        created_at: row.get("created_at")?,
    })
}

fn submission_from_row(row: &Row) -> Result<SubmissionRecord> {
    Ok(SubmissionRecord {
        round_id: row.get("round_id")?,
        guild_id: row.get("guild_id")?,
        thread_id: row.get("thread_id")?,
        message_id: row.get("message_id")?,
        user_id: row.get("user_id")?,
        submitted_at: row.get("submitted_at")?,
        url: row.get("url")?,
    })
}

impl Database {
    pub fn new(config: &Config) -> Result<Self> {
        let conn = Connection::open(&config.database_url)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs a blocking store operation on the blocking thread pool.
    pub async fn run_blocking<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    pub fn execute_init(&self) -> anyhow::Result<()> {
        info!("Database: Initializing schema...");
        let sql = "
            CREATE TABLE IF NOT EXISTS drop_settings (
                guild_id INTEGER PRIMARY KEY,
                channel_id INTEGER,
                ping_role_id INTEGER,
                duration_seconds INTEGER NOT NULL DEFAULT 600,
                daily_enabled INTEGER NOT NULL DEFAULT 0,
                daily_hhmm_utc TEXT,
                daily_random_date_utc TEXT,
                webhook_url TEXT,
                allow_domains TEXT NOT NULL DEFAULT 'youtube.com,youtu.be,open.spotify.com,music.apple.com,soundcloud.com'
            );

            CREATE TABLE IF NOT EXISTS drop_rounds (
                round_id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                thread_id INTEGER NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'running',
                prompt_text TEXT,
                prompt_message_id INTEGER,
                winners_message_id INTEGER,
                winner_user_id INTEGER,
                winner_message_id INTEGER,
                winner_score INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rounds_status_end ON drop_rounds (status, end_time);
            CREATE INDEX IF NOT EXISTS idx_rounds_guild_created ON drop_rounds (guild_id, created_at);

            CREATE TABLE IF NOT EXISTS drop_submissions (
                round_id INTEGER NOT NULL,
                guild_id INTEGER NOT NULL,
                thread_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                submitted_at INTEGER NOT NULL,
                url TEXT NOT NULL,
                PRIMARY KEY (round_id, message_id)
            );
        ";
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)?;

        // Older installations predate the per-day randomized schedule column.
        let _ = conn.execute(
            "ALTER TABLE drop_settings ADD COLUMN daily_random_date_utc TEXT",
            [],
        );

        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    // --- Settings ---

    pub fn get_or_create_settings(
        &self,
        guild_id: u64,
        defaults: &DropDefaults,
    ) -> anyhow::Result<GuildSettings> {
        let conn = self.conn.lock().unwrap();

        {
            let mut stmt = conn.prepare("SELECT * FROM drop_settings WHERE guild_id = ?1")?;
            let mut rows = stmt.query([guild_id])?;
            if let Some(row) = rows.next()? {
                return Ok(settings_from_row(row)?);
            }
        }

        conn.execute(
            "INSERT INTO drop_settings
                (guild_id, channel_id, ping_role_id, duration_seconds, daily_enabled,
                 daily_hhmm_utc, daily_random_date_utc, webhook_url, allow_domains)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, ?6, ?7)",
            (
                guild_id,
                defaults.channel_id,
                defaults.ping_role_id,
                defaults.duration_seconds.max(MIN_ROUND_SECS),
                defaults.daily_enabled,
                defaults.webhook_url.as_deref(),
                defaults.allow_domains.as_str(),
            ),
        )?;

        let mut stmt = conn.prepare("SELECT * FROM drop_settings WHERE guild_id = ?1")?;
        let mut rows = stmt.query([guild_id])?;
        let row = rows
            .next()?
            .ok_or_else(|| anyhow::anyhow!("settings row missing after insert"))?;
        Ok(settings_from_row(row)?)
    }

    pub fn update_settings(&self, guild_id: u64, patch: &SettingsPatch) -> anyhow::Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(v) = patch.channel_id {
            sets.push("channel_id = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = patch.ping_role_id {
            sets.push("ping_role_id = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = patch.duration_seconds {
            sets.push("duration_seconds = ?");
            params.push(Box::new(v.max(MIN_ROUND_SECS)));
        }
        if let Some(v) = patch.daily_enabled {
            sets.push("daily_enabled = ?");
            params.push(Box::new(v));
        }
        if let Some(ref v) = patch.daily_hhmm_utc {
            sets.push("daily_hhmm_utc = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(ref v) = patch.daily_random_date_utc {
            sets.push("daily_random_date_utc = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(ref v) = patch.webhook_url {
            sets.push("webhook_url = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(ref v) = patch.allow_domains {
            sets.push("allow_domains = ?");
            params.push(Box::new(v.clone()));
        }

        params.push(Box::new(guild_id));
        let sql = format!(
            "UPDATE drop_settings SET {} WHERE guild_id = ?",
            sets.join(", ")
        );

        let conn = self.conn.lock().unwrap();
        let params_slice: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, &params_slice[..])?;
        Ok(())
    }

    pub fn list_daily_candidates(&self) -> anyhow::Result<Vec<GuildSettings>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM drop_settings WHERE daily_enabled = 1 AND channel_id IS NOT NULL",
        )?;
        let rows = stmt.query_map([], settings_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // --- Rounds ---

    pub fn insert_round(&self, round: &NewRound) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO drop_rounds
                (guild_id, channel_id, thread_id, start_time, end_time, status,
                 prompt_text, prompt_message_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'running', ?6, ?7, ?8)",
            (
                round.guild_id,
                round.channel_id,
                round.thread_id,
                round.start_time,
                round.end_time,
                round.prompt_text.as_str(),
                round.prompt_message_id,
                round.start_time,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn fetch_round(&self, round_id: i64) -> anyhow::Result<Option<RoundRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM drop_rounds WHERE round_id = ?1")?;
        let mut rows = stmt.query([round_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(round_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// The guild's running round with the soonest end time, if any.
    pub fn get_running_round(&self, guild_id: u64) -> anyhow::Result<Option<RoundRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM drop_rounds
             WHERE guild_id = ?1 AND status = 'running'
             ORDER BY end_time ASC
             LIMIT 1",
        )?;
        let mut rows = stmt.query([guild_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(round_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_running_round_in_thread(
        &self,
        guild_id: u64,
        thread_id: u64,
    ) -> anyhow::Result<Option<RoundRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM drop_rounds
             WHERE guild_id = ?1 AND thread_id = ?2 AND status = 'running'
             ORDER BY end_time DESC
             LIMIT 1",
        )?;
        let mut rows = stmt.query((guild_id, thread_id))?;
        if let Some(row) = rows.next()? {
            Ok(Some(round_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Any round (regardless of status) created on the given UTC day.
    pub fn round_started_today(&self, guild_id: u64, today: &str) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT 1 FROM drop_rounds
             WHERE guild_id = ?1 AND date(created_at, 'unixepoch') = ?2
             LIMIT 1",
        )?;
        Ok(stmt.exists((guild_id, today))?)
    }

    pub fn list_overdue_rounds(&self, now: i64) -> anyhow::Result<Vec<RoundRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM drop_rounds
             WHERE status = 'running' AND end_time <= ?1
             ORDER BY end_time ASC",
        )?;
        let rows = stmt.query_map([now], round_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Commits the running -> ended transition together with the winner
    /// fields. Announcements happen only after this returns.
    pub fn mark_round_ended(
        &self,
        round_id: i64,
        winner: Option<&RoundWinner>,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE drop_rounds
             SET status = 'ended',
                 winner_user_id = ?1,
                 winner_message_id = ?2,
                 winner_score = ?3
             WHERE round_id = ?4",
            (
                winner.map(|w| w.user_id),
                winner.map(|w| w.message_id),
                winner.map(|w| w.score).unwrap_or(0),
                round_id,
            ),
        )?;
        Ok(())
    }

    pub fn set_winners_message(
        &self,
        round_id: i64,
        message_id: Option<u64>,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE drop_rounds SET winners_message_id = ?1 WHERE round_id = ?2",
            (message_id, round_id),
        )?;
        Ok(())
    }

    pub fn set_round_end_time(&self, round_id: i64, end_time: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE drop_rounds SET end_time = ?1 WHERE round_id = ?2",
            (end_time, round_id),
        )?;
        Ok(())
    }

    // --- Submissions ---

    /// Inserts a submission unless the (round, message) key already exists.
    /// Returns false on re-delivery of the same message.
    pub fn insert_submission_if_absent(&self, sub: &NewSubmission) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO drop_submissions
                (round_id, guild_id, thread_id, message_id, user_id, submitted_at, url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                sub.round_id,
                sub.guild_id,
                sub.thread_id,
                sub.message_id,
                sub.user_id,
                sub.submitted_at,
                sub.url.as_str(),
            ),
        )?;
        Ok(inserted > 0)
    }

    pub fn has_user_submitted(&self, round_id: i64, user_id: u64) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT 1 FROM drop_submissions WHERE round_id = ?1 AND user_id = ?2 LIMIT 1",
        )?;
        Ok(stmt.exists((round_id, user_id))?)
    }

    /// Submissions in submission order. rowid breaks same-second ties so the
    /// earliest insert stays first.
    pub fn list_submissions(&self, round_id: i64) -> anyhow::Result<Vec<SubmissionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM drop_submissions
             WHERE round_id = ?1
             ORDER BY submitted_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([round_id], submission_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::test_config;

    fn test_db() -> Database {
        let config = test_config();
        let db = Database::new(&config).unwrap();
        db.execute_init().unwrap();
        db
    }

    fn defaults() -> DropDefaults {
        DropDefaults::default()
    }

    fn sample_round(guild_id: u64, start: i64, end: i64) -> NewRound {
        NewRound {
            guild_id,
            channel_id: 10,
            thread_id: 20,
            start_time: start,
            end_time: end,
            prompt_text: "🎵 **What's stuck in your head?**".to_string(),
            prompt_message_id: Some(555),
        }
    }

    fn sample_submission(round_id: i64, message_id: u64, user_id: u64, at: i64) -> NewSubmission {
        NewSubmission {
            round_id,
            guild_id: 1,
            thread_id: 20,
            message_id,
            user_id,
            submitted_at: at,
            url: "https://youtu.be/abc".to_string(),
        }
    }

    #[test]
    fn test_settings_created_with_defaults() {
        let db = test_db();
        let mut d = defaults();
        d.duration_seconds = 10; // below the floor
        d.channel_id = Some(42);

        let s = db.get_or_create_settings(1, &d).unwrap();
        assert_eq!(s.guild_id, 1);
        assert_eq!(s.channel_id, Some(42));
        assert_eq!(s.duration_seconds, 30);
        assert!(!s.daily_enabled);
        assert!(s.daily_hhmm_utc.is_none());
        assert!(s.allow_domains.contains("youtu.be"));

        // Second call reads the same row back, no duplicate insert.
        let again = db.get_or_create_settings(1, &defaults()).unwrap();
        assert_eq!(again.channel_id, Some(42));
        assert_eq!(again.duration_seconds, 30);
    }

    #[test]
    fn test_settings_partial_update() {
        let db = test_db();
        db.get_or_create_settings(1, &defaults()).unwrap();

        db.update_settings(
            1,
            &SettingsPatch {
                daily_enabled: Some(true),
                duration_seconds: Some(5),
                ..Default::default()
            },
        )
        .unwrap();

        let s = db.get_or_create_settings(1, &defaults()).unwrap();
        assert!(s.daily_enabled);
        assert_eq!(s.duration_seconds, 30); // clamped
        assert!(s.channel_id.is_none()); // untouched

        // Empty patch is a no-op.
        db.update_settings(1, &SettingsPatch::default()).unwrap();
        let s = db.get_or_create_settings(1, &defaults()).unwrap();
        assert!(s.daily_enabled);
    }

    #[test]
    fn test_daily_candidates_need_channel_and_flag() {
        let db = test_db();
        db.get_or_create_settings(1, &defaults()).unwrap();
        db.get_or_create_settings(2, &defaults()).unwrap();
        db.get_or_create_settings(3, &defaults()).unwrap();

        db.update_settings(
            1,
            &SettingsPatch {
                daily_enabled: Some(true),
                channel_id: Some(10),
                ..Default::default()
            },
        )
        .unwrap();
        // Enabled but no channel: not a candidate.
        db.update_settings(
            2,
            &SettingsPatch {
                daily_enabled: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let candidates = db.list_daily_candidates().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].guild_id, 1);
    }

    #[test]
    fn test_round_roundtrip_and_running_lookup() {
        let db = test_db();
        let id = db.insert_round(&sample_round(1, 1000, 1600)).unwrap();

        let round = db.fetch_round(id).unwrap().unwrap();
        assert_eq!(round.status, RoundStatus::Running);
        assert_eq!(round.created_at, 1000);
        assert_eq!(round.prompt_message_id, Some(555));
        assert_eq!(round.winner_score, 0);

        let running = db.get_running_round(1).unwrap().unwrap();
        assert_eq!(running.round_id, id);
        assert!(db.get_running_round(2).unwrap().is_none());

        let in_thread = db.get_running_round_in_thread(1, 20).unwrap().unwrap();
        assert_eq!(in_thread.round_id, id);
        assert!(db.get_running_round_in_thread(1, 99).unwrap().is_none());
    }

    #[test]
    fn test_mark_round_ended() {
        let db = test_db();
        let id = db.insert_round(&sample_round(1, 1000, 1600)).unwrap();

        db.mark_round_ended(
            id,
            Some(&RoundWinner {
                user_id: 7,
                message_id: 70,
                score: 3,
            }),
        )
        .unwrap();

        let round = db.fetch_round(id).unwrap().unwrap();
        assert_eq!(round.status, RoundStatus::Ended);
        assert_eq!(round.winner_user_id, Some(7));
        assert_eq!(round.winner_message_id, Some(70));
        assert_eq!(round.winner_score, 3);
        assert!(db.get_running_round(1).unwrap().is_none());

        db.set_winners_message(id, Some(900)).unwrap();
        let round = db.fetch_round(id).unwrap().unwrap();
        assert_eq!(round.winners_message_id, Some(900));
    }

    #[test]
    fn test_mark_round_ended_without_winner() {
        let db = test_db();
        let id = db.insert_round(&sample_round(1, 1000, 1600)).unwrap();
        db.mark_round_ended(id, None).unwrap();

        let round = db.fetch_round(id).unwrap().unwrap();
        assert_eq!(round.status, RoundStatus::Ended);
        assert_eq!(round.winner_user_id, None);
        assert_eq!(round.winner_message_id, None);
        assert_eq!(round.winner_score, 0);
    }

    #[test]
    fn test_overdue_listing_ordered_by_end_time() {
        let db = test_db();
        let late = db.insert_round(&sample_round(1, 1000, 3000)).unwrap();
        let early = db.insert_round(&sample_round(2, 1000, 2000)).unwrap();
        let future = db.insert_round(&sample_round(3, 1000, 9000)).unwrap();
        let ended = db.insert_round(&sample_round(4, 1000, 1500)).unwrap();
        db.mark_round_ended(ended, None).unwrap();

        let overdue = db.list_overdue_rounds(3000).unwrap();
        let ids: Vec<i64> = overdue.iter().map(|r| r.round_id).collect();
        assert_eq!(ids, vec![early, late]);
        assert!(!ids.contains(&future));
        assert!(!ids.contains(&ended));
    }

    #[test]
    fn test_round_started_today_matches_created_at_day() {
        let db = test_db();
        // 2021-06-01 12:00:00 UTC
        let ts = 1622548800;
        db.insert_round(&sample_round(1, ts, ts + 600)).unwrap();

        assert!(db.round_started_today(1, "2021-06-01").unwrap());
        assert!(!db.round_started_today(1, "2021-06-02").unwrap());
        assert!(!db.round_started_today(2, "2021-06-01").unwrap());
    }

    #[test]
    fn test_submission_idempotence_and_order() {
        let db = test_db();
        let round_id = db.insert_round(&sample_round(1, 1000, 1600)).unwrap();

        let sub = sample_submission(round_id, 100, 7, 1100);
        assert!(db.insert_submission_if_absent(&sub).unwrap());
        // Re-delivery of the same message id is absorbed.
        assert!(!db.insert_submission_if_absent(&sub).unwrap());

        assert!(db.has_user_submitted(round_id, 7).unwrap());
        assert!(!db.has_user_submitted(round_id, 8).unwrap());

        // Same second, later insert: must list after the first.
        assert!(db
            .insert_submission_if_absent(&sample_submission(round_id, 101, 8, 1100))
            .unwrap());

        let subs = db.list_submissions(round_id).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].message_id, 100);
        assert_eq!(subs[1].message_id, 101);
    }

    #[test]
    fn test_init_is_repeatable() {
        let db = test_db();
        // Simulates a restart against an existing file: second init (including
        // the ALTER migration attempt) must not fail.
        db.execute_init().unwrap();
        db.get_or_create_settings(1, &defaults()).unwrap();
        db.execute_init().unwrap();
        let s = db.get_or_create_settings(1, &defaults()).unwrap();
        assert_eq!(s.guild_id, 1);
    }
}
