use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;

/// Rounds can never run shorter than this, whatever the operator asks for.
pub const MIN_ROUND_SECS: i64 = 30;
pub const DEFAULT_ROUND_SECS: i64 = 600;
pub const DEFAULT_ALLOW_DOMAINS: &str =
    "youtube.com,youtu.be,open.spotify.com,music.apple.com,soundcloud.com";
pub const DEFAULT_PROMPT: &str = "🎵 **What's stuck in your head?**";
/// Display name used when the bot has to provision its own webhook.
pub const WEBHOOK_NAME: &str = "Drop The Track";

const FEATURE_FILE: &str = "droptrack.toml";

#[derive(Clone, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub application_id: u64,
    pub database_url: String,
    pub status_message: String,
    pub tick_interval_secs: u64,
    pub lock_grace_secs: u64,
    pub drop: DropDefaults,
}

/// Per-guild defaults applied when a guild's settings row is first created,
/// and fallbacks for values a guild never configured.
#[derive(Clone, Deserialize)]
pub struct DropDefaults {
    #[serde(default)]
    pub channel_id: Option<u64>,
    #[serde(default)]
    pub ping_role_id: Option<u64>,
    #[serde(default = "default_round_secs")]
    pub duration_seconds: i64,
    #[serde(default)]
    pub daily_enabled: bool,
    #[serde(default = "default_allow_domains")]
    pub allow_domains: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub prompt_text: Option<String>,
}

fn default_round_secs() -> i64 {
    DEFAULT_ROUND_SECS
}

fn default_allow_domains() -> String {
    DEFAULT_ALLOW_DOMAINS.to_string()
}

impl Default for DropDefaults {
    fn default() -> Self {
        DropDefaults {
            channel_id: None,
            ping_role_id: None,
            duration_seconds: DEFAULT_ROUND_SECS,
            daily_enabled: false,
            allow_domains: default_allow_domains(),
            webhook_url: None,
            prompt_text: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            application_id: env::var("APPLICATION_ID")
                .map_err(|_| anyhow::anyhow!("APPLICATION_ID must be set"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("APPLICATION_ID must be a valid u64"))?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/droptrack.db".to_string()),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Dropping tracks 🎵".to_string()),
            tick_interval_secs: env::var("TICK_INTERVAL_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
            lock_grace_secs: env::var("LOCK_GRACE_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
            drop: Self::load_drop_defaults(),
        })
    }

    /// Feature defaults come from `droptrack.toml` when present, then from
    /// `DROP_*` environment variables, then hardcoded defaults.
    pub fn load_drop_defaults() -> DropDefaults {
        if let Ok(content) = fs::read_to_string(FEATURE_FILE) {
            #[derive(Deserialize)]
            struct FeatureFile {
                drop_the_track: Option<DropDefaults>,
            }
            match toml::from_str::<FeatureFile>(&content) {
                Ok(file) => {
                    if let Some(defaults) = file.drop_the_track {
                        return defaults;
                    }
                }
                Err(e) => {
                    tracing::warn!("Ignoring malformed {}: {}", FEATURE_FILE, e);
                }
            }
        }

        DropDefaults {
            channel_id: env::var("DROP_CHANNEL_ID").ok().and_then(|v| v.parse().ok()),
            ping_role_id: env::var("DROP_PING_ROLE_ID")
                .ok()
                .and_then(|v| v.parse().ok()),
            duration_seconds: env::var("DROP_DURATION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_ROUND_SECS),
            daily_enabled: env::var("DROP_DAILY_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            allow_domains: env::var("DROP_ALLOW_DOMAINS")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(default_allow_domains),
            webhook_url: env::var("DROP_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            prompt_text: env::var("DROP_PROMPT_TEXT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("application_id", &self.application_id)
            .field("database_url", &self.database_url)
            .field("status_message", &self.status_message)
            .field("tick_interval_secs", &self.tick_interval_secs)
            .field("lock_grace_secs", &self.lock_grace_secs)
            .field("drop", &self.drop)
            .finish()
    }
}

impl std::fmt::Debug for DropDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropDefaults")
            .field("channel_id", &self.channel_id)
            .field("ping_role_id", &self.ping_role_id)
            .field("duration_seconds", &self.duration_seconds)
            .field("daily_enabled", &self.daily_enabled)
            .field("allow_domains", &self.allow_domains)
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("prompt_text", &self.prompt_text)
            .finish()
    }
}
