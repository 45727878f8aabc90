use crate::game::ThreadMessage;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;

/// Feeds guild messages into the submission intake. Runs for every inbound
/// message event; anything outside a running round's thread is dropped by
/// the engine's lookup.
pub async fn handle_message(data: &Data, message: &serenity::Message) -> Result<(), Error> {
    if message.author.bot {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    data.engine
        .record_submission(&ThreadMessage {
            guild_id: guild_id.get(),
            thread_id: message.channel_id.get(),
            message_id: message.id.get(),
            user_id: message.author.id.get(),
            content: message.content.clone(),
        })
        .await?;
    Ok(())
}
