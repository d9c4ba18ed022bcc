use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Settings for the Zulip channel, read from `[channels.zulip]`.
#[derive(Clone, Deserialize)]
pub struct ZulipConfig {
    /// Base URL of the organisation, e.g. `https://events.zulipchat.com`.
    pub instance: String,
    /// Stream messages are posted to.
    pub chat_id: String,
    /// Topic within the stream.
    pub subject: String,
    pub bot_email: String,
    pub bot_token: Secret<String>,
}

impl ZulipConfig {
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.instance.trim_end_matches('/'))
    }

    pub fn bot_token(&self) -> &str {
        self.bot_token.expose_secret()
    }
}

impl std::fmt::Debug for ZulipConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZulipConfig")
            .field("instance", &self.instance)
            .field("chat_id", &self.chat_id)
            .field("subject", &self.subject)
            .field("bot_email", &self.bot_email)
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}
