use super::{ChatGateway, GatewayError, MentionScope};
use async_trait::async_trait;
use serenity::all::{
    AutoArchiveDuration, Channel, ChannelId, ChannelType, CreateAllowedMentions, CreateThread,
    CreateWebhook, EditThread, ExecuteWebhook, MessageId, ReactionType, Webhook,
};
use serenity::http::Http;
use std::sync::Arc;
use tracing::debug;

pub struct DiscordGateway {
    http: Arc<Http>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn allowed_mentions(scope: MentionScope) -> CreateAllowedMentions {
        match scope {
            MentionScope::None => CreateAllowedMentions::new(),
            MentionScope::RolesOnly => CreateAllowedMentions::new().all_roles(true),
            MentionScope::UsersOnly => CreateAllowedMentions::new().all_users(true),
        }
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn create_round_thread(
        &self,
        channel_id: u64,
        name: &str,
    ) -> Result<u64, GatewayError> {
        let builder = CreateThread::new(name)
            .kind(ChannelType::PublicThread)
            .auto_archive_duration(AutoArchiveDuration::OneDay);
        let thread = ChannelId::new(channel_id)
            .create_thread(&self.http, builder)
            .await?;
        debug!("Created round thread {} in channel {}", thread.id, channel_id);
        Ok(thread.id.get())
    }

    async fn create_webhook(&self, channel_id: u64, name: &str) -> Result<String, GatewayError> {
        let webhook = ChannelId::new(channel_id)
            .create_webhook(&self.http, CreateWebhook::new(name))
            .await?;
        webhook.url().map_err(|_| GatewayError::BadEndpoint)
    }

    async fn webhook_send(
        &self,
        webhook_url: &str,
        content: &str,
        thread_id: Option<u64>,
        mentions: MentionScope,
    ) -> Result<Option<u64>, GatewayError> {
        let webhook = Webhook::from_url(&self.http, webhook_url)
            .await
            .map_err(|_| GatewayError::BadEndpoint)?;

        let mut builder = ExecuteWebhook::new()
            .content(content)
            .allowed_mentions(Self::allowed_mentions(mentions));
        if let Some(thread_id) = thread_id {
            builder = builder.in_thread(ChannelId::new(thread_id));
        }

        let message = webhook.execute(&self.http, true, builder).await?;
        Ok(message.map(|m| m.id.get()))
    }

    async fn reaction_count(
        &self,
        thread_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<u64, GatewayError> {
        let message = ChannelId::new(thread_id)
            .message(&self.http, MessageId::new(message_id))
            .await?;
        Ok(message
            .reactions
            .iter()
            .find(|r| r.reaction_type.to_string() == emoji)
            .map(|r| r.count)
            .unwrap_or(0))
    }

    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), GatewayError> {
        self.http
            .create_reaction(
                ChannelId::new(channel_id),
                MessageId::new(message_id),
                &ReactionType::Unicode(emoji.to_string()),
            )
            .await?;
        Ok(())
    }

    async fn set_thread_flags(
        &self,
        thread_id: u64,
        locked: bool,
        archived: bool,
    ) -> Result<(), GatewayError> {
        ChannelId::new(thread_id)
            .edit_thread(
                &self.http,
                EditThread::new().locked(locked).archived(archived),
            )
            .await?;
        Ok(())
    }

    async fn resolve_text_channel(&self, channel_id: u64) -> Result<(), GatewayError> {
        match self.http.get_channel(ChannelId::new(channel_id)).await? {
            Channel::Guild(channel) if channel.kind == ChannelType::Text => Ok(()),
            _ => Err(GatewayError::NotFound(channel_id)),
        }
    }

    async fn resolve_thread(&self, thread_id: u64) -> Result<(), GatewayError> {
        match self.http.get_channel(ChannelId::new(thread_id)).await? {
            Channel::Guild(channel)
                if matches!(
                    channel.kind,
                    ChannelType::PublicThread
                        | ChannelType::PrivateThread
                        | ChannelType::NewsThread
                ) =>
            {
                Ok(())
            }
            _ => Err(GatewayError::NotFound(thread_id)),
        }
    }
}
