use {
    async_trait::async_trait,
    teloxide::{
        RequestError, payloads::SendMessageSetters, prelude::*, types::ParseMode,
    },
    tracing::{debug, info, warn},
};

use {
    reshare_channels::{
        Error, PublisherPlugin, Result,
        format::{check_rendered, escape_html, render_event_message},
    },
    reshare_common::{Channel, Event},
};

use crate::{TELEGRAM_MAX_MESSAGE_LEN, config::TelegramConfig};

const CHANNEL: &str = "telegram";

/// Publishes events to a Telegram chat through the Bot API.
pub struct TelegramPublisher {
    config: TelegramConfig,
    bot: Bot,
}

impl TelegramPublisher {
    pub fn new(config: TelegramConfig) -> Self {
        let bot = Bot::new(config.token());
        Self { config, bot }
    }

    /// Use a pre-built bot, e.g. one pointed at a different API URL.
    pub fn with_bot(config: TelegramConfig, bot: Bot) -> Self {
        Self { config, bot }
    }

    /// Build from the `[channels.telegram]` options table.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: TelegramConfig = serde_json::from_value(value)?;
        if config.token().trim().is_empty() {
            return Err(Error::config("telegram token is empty"));
        }
        Ok(Self::new(config))
    }

    fn render(event: &Event) -> String {
        escape_html(&render_event_message(event))
    }
}

fn describe(error: &RequestError) -> String {
    match error {
        RequestError::RetryAfter(wait) => {
            format!("rate limited, retry after {}s", wait.duration().as_secs())
        },
        other => other.to_string(),
    }
}

#[async_trait]
impl PublisherPlugin for TelegramPublisher {
    fn id(&self) -> &str {
        CHANNEL
    }

    async fn validate_credentials(&self, channel: &Channel) -> Result<()> {
        let me = self.bot.get_me().await.map_err(|e| {
            warn!(channel = %channel.name, error = %e, "telegram getMe failed");
            Error::invalid_credentials(CHANNEL, describe(&e))
        })?;

        let expected = self.config.bare_username();
        match me.username.as_deref() {
            Some(actual) if actual.eq_ignore_ascii_case(expected) => {
                debug!(channel = %channel.name, username = actual, "telegram credentials ok");
                Ok(())
            },
            actual => Err(Error::invalid_credentials(
                CHANNEL,
                format!(
                    "bot username {:?} does not match configured \"{expected}\"",
                    actual.unwrap_or_default()
                ),
            )),
        }
    }

    /// Telegram measures the text after entity parsing, so the limit
    /// applies to the unescaped message.
    async fn validate_content(&self, event: &Event) -> Result<()> {
        check_rendered(
            CHANNEL,
            event,
            &render_event_message(event),
            TELEGRAM_MAX_MESSAGE_LEN,
        )
    }

    async fn deliver(&self, event: &Event, channel: &Channel) -> Result<()> {
        let html = Self::render(event);
        let message = self
            .bot
            .send_message(self.config.recipient(), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| Error::delivery(CHANNEL, describe(&e)))?;
        info!(
            channel = %channel.name,
            event_id = %event.external_id,
            message_id = message.id.0,
            "telegram message sent"
        );
        Ok(())
    }
}
