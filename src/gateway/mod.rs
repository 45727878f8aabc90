use async_trait::async_trait;

pub mod discord;
#[cfg(test)]
pub mod mock;

pub use discord::DiscordGateway;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("platform request failed: {0}")]
    Http(#[from] serenity::Error),
    #[error("channel or thread {0} not found")]
    NotFound(u64),
    #[error("delivery endpoint rejected or malformed")]
    BadEndpoint,
}

/// Mention scoping for outbound messages. Everything not explicitly opted
/// into stays suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionScope {
    None,
    RolesOnly,
    UsersOnly,
}

/// Everything the round engine needs from the chat platform. The engine
/// never touches the platform client directly, so the whole game logic can
/// run against a fake in tests.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Creates a public discussion thread under a channel with 24h
    /// auto-archive. Returns the new thread id.
    async fn create_round_thread(
        &self,
        channel_id: u64,
        name: &str,
    ) -> Result<u64, GatewayError>;

    /// Provisions a delivery endpoint on the channel. Returns its URL.
    async fn create_webhook(&self, channel_id: u64, name: &str) -> Result<String, GatewayError>;

    /// Sends through a delivery endpoint, optionally into a thread, waiting
    /// for the acknowledged message id.
    async fn webhook_send(
        &self,
        webhook_url: &str,
        content: &str,
        thread_id: Option<u64>,
        mentions: MentionScope,
    ) -> Result<Option<u64>, GatewayError>;

    /// Current count of `emoji` reactions on a message, re-fetched from the
    /// platform. 0 when nobody reacted with it.
    async fn reaction_count(
        &self,
        thread_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<u64, GatewayError>;

    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), GatewayError>;

    async fn set_thread_flags(
        &self,
        thread_id: u64,
        locked: bool,
        archived: bool,
    ) -> Result<(), GatewayError>;

    /// Fails unless the id resolves to a guild text channel.
    async fn resolve_text_channel(&self, channel_id: u64) -> Result<(), GatewayError>;

    /// Fails unless the id resolves to a thread.
    async fn resolve_thread(&self, thread_id: u64) -> Result<(), GatewayError>;
}
