use super::{ChatGateway, GatewayError, MentionScope};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-memory gateway for engine and scheduler tests. Ids are handed out
/// sequentially: threads from 1000, messages from 5000.
pub struct MockGateway {
    state: Mutex<MockState>,
}

#[derive(Clone, Debug)]
pub struct SentMessage {
    pub id: u64,
    pub webhook_url: String,
    pub content: String,
    pub thread_id: Option<u64>,
    pub mentions: MentionScope,
}

#[derive(Default)]
struct MockState {
    next_thread_id: u64,
    next_message_id: u64,
    next_webhook_seq: u64,
    text_channels: HashSet<u64>,
    threads: HashSet<u64>,
    sent: Vec<SentMessage>,
    // (thread, message) -> emoji -> count
    reactions: HashMap<(u64, u64), HashMap<String, u64>>,
    unreadable_messages: HashSet<u64>,
    added_reactions: Vec<(u64, u64, String)>,
    thread_flags: Vec<(u64, bool, bool)>,
    fail_thread_create: bool,
    fail_webhook_create: bool,
    fail_send: bool,
    fail_archive: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_thread_id: 1000,
                next_message_id: 5000,
                ..Default::default()
            }),
        }
    }

    pub fn add_text_channel(&self, channel_id: u64) {
        self.state.lock().unwrap().text_channels.insert(channel_id);
    }

    pub fn remove_thread(&self, thread_id: u64) {
        self.state.lock().unwrap().threads.remove(&thread_id);
    }

    pub fn set_reaction_count(&self, thread_id: u64, message_id: u64, emoji: &str, count: u64) {
        self.state
            .lock()
            .unwrap()
            .reactions
            .entry((thread_id, message_id))
            .or_default()
            .insert(emoji.to_string(), count);
    }

    /// Marks a message as unfetchable, as if it had been deleted.
    pub fn set_message_unreadable(&self, message_id: u64) {
        self.state
            .lock()
            .unwrap()
            .unreadable_messages
            .insert(message_id);
    }

    pub fn fail_thread_creation(&self) {
        self.state.lock().unwrap().fail_thread_create = true;
    }

    pub fn fail_webhook_creation(&self) {
        self.state.lock().unwrap().fail_webhook_create = true;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_send = fail;
    }

    pub fn fail_archive(&self) {
        self.state.lock().unwrap().fail_archive = true;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn added_reactions(&self) -> Vec<(u64, u64, String)> {
        self.state.lock().unwrap().added_reactions.clone()
    }

    pub fn thread_flags(&self) -> Vec<(u64, bool, bool)> {
        self.state.lock().unwrap().thread_flags.clone()
    }

    pub fn webhooks_created(&self) -> u64 {
        self.state.lock().unwrap().next_webhook_seq
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn create_round_thread(
        &self,
        channel_id: u64,
        _name: &str,
    ) -> Result<u64, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_thread_create || !state.text_channels.contains(&channel_id) {
            return Err(GatewayError::NotFound(channel_id));
        }
        state.next_thread_id += 1;
        let id = state.next_thread_id;
        state.threads.insert(id);
        Ok(id)
    }

    async fn create_webhook(&self, channel_id: u64, _name: &str) -> Result<String, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_webhook_create || !state.text_channels.contains(&channel_id) {
            return Err(GatewayError::BadEndpoint);
        }
        state.next_webhook_seq += 1;
        Ok(format!(
            "https://discord.test/api/webhooks/{}/token",
            state.next_webhook_seq
        ))
    }

    async fn webhook_send(
        &self,
        webhook_url: &str,
        content: &str,
        thread_id: Option<u64>,
        mentions: MentionScope,
    ) -> Result<Option<u64>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_send {
            return Err(GatewayError::Http(serenity::Error::Other("send failed")));
        }
        state.next_message_id += 1;
        let id = state.next_message_id;
        state.sent.push(SentMessage {
            id,
            webhook_url: webhook_url.to_string(),
            content: content.to_string(),
            thread_id,
            mentions,
        });
        Ok(Some(id))
    }

    async fn reaction_count(
        &self,
        thread_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<u64, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.unreadable_messages.contains(&message_id) {
            return Err(GatewayError::NotFound(message_id));
        }
        Ok(state
            .reactions
            .get(&(thread_id, message_id))
            .and_then(|by_emoji| by_emoji.get(emoji))
            .copied()
            .unwrap_or(0))
    }

    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<(), GatewayError> {
        self.state
            .lock()
            .unwrap()
            .added_reactions
            .push((channel_id, message_id, emoji.to_string()));
        Ok(())
    }

    async fn set_thread_flags(
        &self,
        thread_id: u64,
        locked: bool,
        archived: bool,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        if archived && state.fail_archive {
            return Err(GatewayError::Http(serenity::Error::Other(
                "archive rejected",
            )));
        }
        state.thread_flags.push((thread_id, locked, archived));
        Ok(())
    }

    async fn resolve_text_channel(&self, channel_id: u64) -> Result<(), GatewayError> {
        if self.state.lock().unwrap().text_channels.contains(&channel_id) {
            Ok(())
        } else {
            Err(GatewayError::NotFound(channel_id))
        }
    }

    async fn resolve_thread(&self, thread_id: u64) -> Result<(), GatewayError> {
        if self.state.lock().unwrap().threads.contains(&thread_id) {
            Ok(())
        } else {
            Err(GatewayError::NotFound(thread_id))
        }
    }
}
