use {
    async_trait::async_trait,
    reshare_common::{Channel, Event},
};

use crate::Result;

/// Capability every output channel implements.
///
/// The two validation methods must not send anything; only [`deliver`]
/// talks to the outside world with the event's content.
///
/// [`deliver`]: PublisherPlugin::deliver
#[async_trait]
pub trait PublisherPlugin: Send + Sync {
    /// Channel type identifier (e.g. "telegram", "zulip").
    fn id(&self) -> &str;

    /// Check that the configured account is reachable and authorized.
    async fn validate_credentials(&self, channel: &Channel) -> Result<()>;

    /// Check that the event renders within the channel's constraints.
    async fn validate_content(&self, event: &Event) -> Result<()>;

    /// Send the event. Called at most once per channel per publish call.
    async fn deliver(&self, event: &Event, channel: &Channel) -> Result<()>;
}
