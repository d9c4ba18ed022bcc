use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    teloxide::types::{ChatId, Recipient},
};

/// Settings for the Telegram channel, read from `[channels.telegram]`.
#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,

    /// Numeric chat id (e.g. "-100123") or public channel name ("@events").
    pub chat_id: String,

    /// Expected bot username; credential checks fail if `getMe` disagrees.
    pub username: String,
}

impl TelegramConfig {
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Where messages go: a numeric chat or a `@channel` username.
    pub fn recipient(&self) -> Recipient {
        let chat = self.chat_id.trim();
        match chat.parse::<i64>() {
            Ok(id) => Recipient::Id(ChatId(id)),
            Err(_) if chat.starts_with('@') => Recipient::ChannelUsername(chat.to_string()),
            Err(_) => Recipient::ChannelUsername(format!("@{chat}")),
        }
    }

    /// Configured username without a leading `@`.
    pub fn bare_username(&self) -> &str {
        self.username.trim().trim_start_matches('@')
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .field("username", &self.username)
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn config(chat_id: &str) -> TelegramConfig {
        serde_json::from_value(serde_json::json!({
            "token": "123:ABC",
            "chat_id": chat_id,
            "username": "@events_bot",
        }))
        .unwrap()
    }

    #[rstest]
    #[case("-100123", Recipient::Id(ChatId(-100123)))]
    #[case("42", Recipient::Id(ChatId(42)))]
    #[case("@events", Recipient::ChannelUsername("@events".into()))]
    #[case("events", Recipient::ChannelUsername("@events".into()))]
    fn recipient_from_chat_id(#[case] chat_id: &str, #[case] expected: Recipient) {
        assert_eq!(config(chat_id).recipient(), expected);
    }

    #[test]
    fn deserialize_from_channel_options() {
        let cfg = config("-1");
        assert_eq!(cfg.token(), "123:ABC");
        assert_eq!(cfg.bare_username(), "events_bot");
    }

    #[test]
    fn missing_token_is_rejected() {
        let result: Result<TelegramConfig, _> =
            serde_json::from_value(serde_json::json!({ "chat_id": "1", "username": "bot" }));
        assert!(result.is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", config("1"));
        assert!(!rendered.contains("123:ABC"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
